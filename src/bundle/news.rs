//! Release notes lookup in a bundle's `NEWS` file.
//!
//! NEWS files are a sequence of blank-line separated blocks. A version
//! heading block is followed by the block holding that release's notes.

/// Location of the changelog relative to the bundle root.
pub const NEWS_PATH: &str = "NEWS";

/// Blocks at most this long are treated as version headings by the
/// fallback scan.
const SHORT_BLOCK_CHARS: usize = 6;

/// Find the notes for `version` in `news`.
///
/// A block equal to `version` or `v<version>` selects the following block.
/// Failing that, the first short block containing `version` does. A heading
/// with nothing after it yields `None`.
pub fn latest_release_notes(news: &str, version: Option<&str>) -> Option<String> {
    let version = version?;
    let blocks: Vec<&str> = news.split("\n\n").collect();
    let prefixed = format!("v{version}");

    if let Some(pos) = blocks
        .iter()
        .position(|block| *block == version || *block == prefixed)
    {
        return blocks.get(pos + 1).map(|b| b.to_string());
    }

    blocks
        .iter()
        .enumerate()
        .find(|(_, block)| block.chars().count() < SHORT_BLOCK_CHARS && block.contains(version))
        .and_then(|(pos, _)| blocks.get(pos + 1))
        .map(|b| b.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEWS: &str = "v6\n\n* Python 3 port\n* New icons\n\n5\n\n* Bug fixes";

    #[test]
    fn test_exact_and_prefixed_matches() {
        assert_eq!(
            latest_release_notes(NEWS, Some("6")).as_deref(),
            Some("* Python 3 port\n* New icons")
        );
        assert_eq!(
            latest_release_notes(NEWS, Some("5")).as_deref(),
            Some("* Bug fixes")
        );
    }

    #[test]
    fn test_match_in_last_block_returns_none() {
        assert_eq!(latest_release_notes("* Notes\n\n7", Some("7")), None);
    }

    #[test]
    fn test_short_block_fallback() {
        let news = "Release 9\n\nlong text\n\n9:\n\n* Fixed crash";
        assert_eq!(
            latest_release_notes(news, Some("9")).as_deref(),
            Some("* Fixed crash")
        );
    }

    #[test]
    fn test_no_match_or_no_version() {
        assert_eq!(latest_release_notes(NEWS, Some("42")), None);
        assert_eq!(latest_release_notes(NEWS, None), None);
    }
}
