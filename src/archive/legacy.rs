//! Parser for the legacy archive layout.
//!
//! Legacy files have no tags and no comment blocks. A header is any line that
//! matches the five-field pattern in full; every other line is body text of the
//! post above it. Completed posts go through [`Reconciler`] so the result comes
//! back with duplicates dropped, swaps repaired and gaps backfilled.

use std::sync::LazyLock;

use regex::Regex;

use super::line::{parse_legacy_header, ParseError};
use super::models::Post;
use super::reconcile::Reconciler;

static LEGACY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+ [0-9]+-[0-9]+-[0-9]+ [0-9]+:[0-9]+:[0-9]+ -?[0-9]+ -?[0-9]+$")
        .expect("valid legacy header regex")
});

/// Whether a line is a legacy post header.
#[must_use]
pub fn is_legacy_header(line: &str) -> bool {
    LEGACY_HEADER.is_match(line)
}

/// Parse a legacy archive, reconciling posts as they complete.
///
/// Empty input yields an empty list.
///
/// # Errors
///
/// Returns an error if the first line is not a header or a header fails to
/// decode.
pub fn parse_legacy_posts(text: &str) -> Result<Vec<Post>, ParseError> {
    let mut lines = text.lines().enumerate();
    let Some((_, first)) = lines.next() else {
        return Ok(Vec::new());
    };
    if !is_legacy_header(first) {
        return Err(ParseError::MissingHeader { line: 1 });
    }

    let mut reconciler = Reconciler::new();
    let mut current = parse_legacy_header(first, 1)?;
    let mut current_line = 1;

    for (idx, line) in lines {
        if is_legacy_header(line) {
            let next = parse_legacy_header(line, idx + 1)?;
            let done = std::mem::replace(&mut current, next);
            reconciler
                .push(done)
                .map_err(|source| ParseError::GapTooLarge {
                    line: current_line,
                    source,
                })?;
            current_line = idx + 1;
        } else {
            current.body.push_str(line);
            current.body.push('\n');
        }
    }
    reconciler
        .push(current)
        .map_err(|source| ParseError::GapTooLarge {
            line: current_line,
            source,
        })?;

    Ok(reconciler.into_posts())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_pattern() {
        assert!(is_legacy_header("100 2016-01-02 03:04:05 3 4"));
        assert!(is_legacy_header("100 2016-01-02 03:04:05 -3 -1"));
        assert!(!is_legacy_header("#p 100 2016-01-02 03:04:05 3 4"));
        assert!(!is_legacy_header("100 2016-01-02 03:04:05 3"));
        assert!(!is_legacy_header("100  2016-01-02 03:04:05 3 4"));
        assert!(!is_legacy_header("100 2016-01-02 03:04:05 3 4 trailing"));
        assert!(!is_legacy_header("-100 2016-01-02 03:04:05 3 4"));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_legacy_posts("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_dense_sequence() {
        let text = "\
12 2016-01-02 03:04:05 1 0
twelve

11 2016-01-02 03:03:00 0 2
eleven
still eleven

";
        let posts = parse_legacy_posts(text).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, 12);
        assert_eq!(posts[0].body, "twelve\n\n");
        assert_eq!(posts[1].id, 11);
        assert_eq!(posts[1].reply_count, 2);
        assert_eq!(posts[1].body, "eleven\nstill eleven\n\n");
    }

    #[test]
    fn test_parse_repairs_sequence() {
        let text = "\
20 2016-01-02 03:04:05 0 0
a

20 2016-01-02 03:04:05 0 0
a again

17 2016-01-02 03:01:00 0 0
d

";
        let posts = parse_legacy_posts(text).unwrap();
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![20, 19, 18, 17]);
        assert_eq!(posts[0].body, "a\n\n");
        assert!(posts[1].is_placeholder());
        assert!(posts[2].is_placeholder());
        assert_eq!(posts[1].created_at, posts[3].created_at);
    }

    #[test]
    fn test_header_like_text_with_extra_spaces_is_body() {
        let text = "5 2016-01-02 03:04:05 0 0\n4  2016-01-02 03:04:05 0 0\n\n";
        let posts = parse_legacy_posts(text).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].body, "4  2016-01-02 03:04:05 0 0\n\n");
    }

    #[test]
    fn test_missing_leading_header() {
        let err = parse_legacy_posts("no header here\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingHeader { line: 1 }));
    }

    #[test]
    fn test_matching_header_with_bad_date_is_fatal() {
        let text = "5 2016-01-02 03:04:05 0 0\nbody\n4 2016-99-02 03:04:05 0 0\n";
        let err = parse_legacy_posts(text).unwrap_err();
        assert!(matches!(err, ParseError::InvalidTimestamp { line: 3, .. }));
    }

    #[test]
    fn test_absurd_gap_fails_the_parse() {
        let text = "9000000000000000000 2016-01-02 03:04:05 0 0\na\n\n0 2016-01-02 03:04:00 0 0\nb\n\n";
        let err = parse_legacy_posts(text).unwrap_err();
        assert!(matches!(err, ParseError::GapTooLarge { line: 4, .. }));
    }
}
