//! URL slugs and heading anchors in the generator's style.

use deunicode::deunicode;

/// Slugify free text: transliterate to ASCII, lowercase, collapse runs of
/// non-alphanumerics into a single `-`.
pub fn urlize(text: &str) -> String {
    let ascii = deunicode(text);
    let mut out = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

/// Normalize a path segment taken from a file or directory name. Unlike
/// [`urlize`] punctuation and non-ASCII text are kept; only whitespace is
/// dashed and the result lowercased, as the generator does for paths.
pub fn path_segment(segment: &str) -> String {
    segment
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Heading anchor ID: lowercase, letters, digits, `-` and `_` kept, spaces
/// become `-`, everything else dropped.
pub fn anchorize(text: &str) -> String {
    text.trim()
        .chars()
        .filter_map(|ch| match ch {
            ' ' => Some('-'),
            '-' | '_' => Some(ch),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlize_basic() {
        assert_eq!(urlize("Hello, World!"), "hello-world");
        assert_eq!(urlize("  Momentum  Backtest  "), "momentum-backtest");
        assert_eq!(urlize("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn test_urlize_unicode() {
        assert_eq!(urlize("Café Crème"), "cafe-creme");
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("My First Post"), "my-first-post");
        assert_eq!(path_segment("hello"), "hello");
    }

    #[test]
    fn test_anchorize() {
        assert_eq!(anchorize("Rank & Select"), "rank--select");
        assert_eq!(anchorize("Step 2: NAV"), "step-2-nav");
        assert_eq!(anchorize("Données"), "données");
    }
}
