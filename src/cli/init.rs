//! `folio init`: write a commented configuration template.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::config::section::SITE_CONFIG_CANDIDATES;
use crate::config::{BacktestSection, CheckSection, ConfigError, SiteSection};
use crate::log;

/// Default config filename
pub const CONFIG_FILE: &str = "folio.toml";

/// Generate folio.toml content with comments, filled with the defaults.
pub fn generate_config_template() -> String {
    let site = SiteSection::default();
    let check = CheckSection::default();
    let bt = BacktestSection::default();
    let required = check
        .required
        .iter()
        .map(|field| format!("\"{field}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::new();
    out.push_str(&format!(
        "# folio configuration file (v{})\n\n",
        env!("CARGO_PKG_VERSION")
    ));

    out.push_str("[site]\n");
    out.push_str(&format!(
        "# Site config document; auto-detected among {} when unset\n",
        SITE_CONFIG_CANDIDATES.join(", ")
    ));
    out.push_str("# config = \"hugo.toml\"\n");
    out.push_str(&format!("content = \"{}\"\n", site.content.display()));
    out.push_str(&format!("static = \"{}\"\n\n", site.static_dir.display()));

    out.push_str("[check]\n");
    out.push_str("# Front-matter fields every page must carry\n");
    out.push_str(&format!("required = [{required}]\n"));
    out.push_str("# Check draft pages too\n");
    out.push_str(&format!("drafts = {}\n", check.drafts));
    out.push_str("# error | warn | off\n");
    out.push_str("links = \"warn\"\n");
    out.push_str("menu_order = \"warn\"\n\n");

    out.push_str("[backtest]\n");
    out.push_str("# CSV inputs, relative to `data`\n");
    out.push_str(&format!("data = \"{}\"\n", bt.data.display()));
    out.push_str(&format!("membership = \"{}\"\n", bt.membership.display()));
    out.push_str(&format!("snapshots = \"{}\"\n", bt.snapshots.display()));
    out.push_str(&format!("prices = \"{}\"\n", bt.prices.display()));
    out.push_str("benchmark = \"benchmark.csv\"\n");
    out.push_str("# Momentum lookback in trading days\n");
    out.push_str(&format!("lookback = {}\n", bt.lookback));
    out.push_str(&format!("top = {}\n", bt.top));
    out.push_str("# daily | weekly | monthly\n");
    out.push_str(&format!("rebalance = \"{}\"\n", bt.rebalance));
    out.push_str("# start = \"2019-01-02\"\n");
    out.push_str("# end = \"2023-12-29\"\n");
    out.push_str(&format!("capital = {:.1}\n", bt.capital));
    out.push_str(&format!("cost_bps = {:.1}\n", bt.cost_bps));

    out
}

/// Write the template into `root`, or print it when `dry_run` is set.
pub fn init_config(root: &Path, dry_run: bool, force: bool) -> Result<()> {
    let content = generate_config_template();
    if dry_run {
        print!("{content}");
        return Ok(());
    }

    let path = config_path(root);
    if path.exists() && !force {
        bail!(
            "`{}` already exists (use --force to overwrite)",
            path.display()
        );
    }
    fs::write(&path, content).map_err(|err| ConfigError::Write(path.clone(), err))?;

    log!("init"; "wrote {}", path.display());
    Ok(())
}

fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}
