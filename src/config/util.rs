//! Configuration file discovery.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from `start`.
///
/// ```text
/// /home/user/site/content/posts/  ← start
/// /home/user/site/folio.toml      ← found
/// ```
pub fn find_config_file(config_name: &Path, start: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}
