//! Line classification and header field decoding for archive files.
//!
//! Every line of an archive is exactly one of: a post header (`#p ...`), a
//! comment header (`#c ...`) or a line of body text. Classification only looks
//! at the two-character prefix; decoding a header is strict and any deviation
//! is reported as a [`ParseError`].

use chrono::NaiveDateTime;
use thiserror::Error;

use super::models::{Comment, Post};
use super::reconcile::GapTooLarge;
use crate::constants::{COMMENT_TAG, POST_TAG, TIMESTAMP_FORMAT};

/// Errors raised while decoding an archive file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: archive does not start with a post header")]
    MissingHeader { line: usize },
    #[error("line {line}: expected {expected} header fields, found {found}")]
    TokenCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid {field} '{value}'")]
    InvalidInteger {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("line {line}: invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        line: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("line {line}: {source}")]
    GapTooLarge {
        line: usize,
        #[source]
        source: GapTooLarge,
    },
}

/// The role a single line plays in the current archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    PostHeader,
    CommentHeader,
    Text,
}

/// Classify a line by its two-character prefix tag.
#[must_use]
pub fn classify(line: &str) -> LineKind {
    match line.get(..2) {
        Some(POST_TAG) => LineKind::PostHeader,
        Some(COMMENT_TAG) => LineKind::CommentHeader,
        _ => LineKind::Text,
    }
}

/// Decode `#p <id> <date> <time> <like_count> <reply_count>`.
///
/// # Errors
///
/// Returns an error if the line does not hold exactly six fields or any field
/// fails to parse.
pub fn parse_post_header(line: &str, line_no: usize) -> Result<Post, ParseError> {
    let fields = split_fields(line, 6, line_no)?;
    Ok(Post::new(
        parse_int(fields[1], "post id", line_no)?,
        parse_timestamp(fields[2], fields[3], line_no)?,
        parse_int(fields[4], "like count", line_no)?,
        parse_int(fields[5], "reply count", line_no)?,
    ))
}

/// Decode `#c <id> <date> <time>`.
///
/// # Errors
///
/// Returns an error if the line does not hold exactly four fields or any field
/// fails to parse.
pub fn parse_comment_header(line: &str, line_no: usize) -> Result<Comment, ParseError> {
    let fields = split_fields(line, 4, line_no)?;
    Ok(Comment::new(
        parse_int(fields[1], "comment id", line_no)?,
        parse_timestamp(fields[2], fields[3], line_no)?,
    ))
}

/// Decode an untagged legacy header `<id> <date> <time> <field4> <field5>`.
///
/// # Errors
///
/// Returns an error if the line does not hold exactly five fields or any field
/// fails to parse.
pub fn parse_legacy_header(line: &str, line_no: usize) -> Result<Post, ParseError> {
    let fields = split_fields(line, 5, line_no)?;
    Ok(Post::new(
        parse_int(fields[0], "post id", line_no)?,
        parse_timestamp(fields[1], fields[2], line_no)?,
        parse_int(fields[3], "like count", line_no)?,
        parse_int(fields[4], "reply count", line_no)?,
    ))
}

/// Render a timestamp the way header lines carry it.
#[must_use]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn split_fields(line: &str, expected: usize, line_no: usize) -> Result<Vec<&str>, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != expected {
        return Err(ParseError::TokenCount {
            line: line_no,
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn parse_int(value: &str, field: &'static str, line_no: usize) -> Result<i64, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidInteger {
        line: line_no,
        field,
        value: value.to_string(),
    })
}

fn parse_timestamp(date: &str, time: &str, line_no: usize) -> Result<NaiveDateTime, ParseError> {
    let value = format!("{date} {time}");
    NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT).map_err(|source| {
        ParseError::InvalidTimestamp {
            line: line_no,
            value,
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("#p 1 2017-01-01 00:00:00 0 0"), LineKind::PostHeader);
        assert_eq!(classify("#c 5 2017-01-01 00:00:00"), LineKind::CommentHeader);
        assert_eq!(classify("hello"), LineKind::Text);
        assert_eq!(classify(""), LineKind::Text);
        assert_eq!(classify("#"), LineKind::Text);
        assert_eq!(classify("# p"), LineKind::Text);
        // Multi-byte first character must not panic on slicing
        assert_eq!(classify("树洞"), LineKind::Text);
    }

    #[test]
    fn test_parse_post_header() {
        let post = parse_post_header("#p 123 2017-05-04 12:34:56 7 2", 1).unwrap();
        assert_eq!(post.id, 123);
        assert_eq!(format_timestamp(&post.created_at), "2017-05-04 12:34:56");
        assert_eq!(post.like_count, 7);
        assert_eq!(post.reply_count, 2);
        assert!(post.body.is_empty());
        assert!(post.comments.is_empty());
    }

    #[test]
    fn test_parse_post_header_allows_placeholder_count() {
        let post = parse_post_header("#p 9 2017-05-04 12:34:56 0 -1", 1).unwrap();
        assert_eq!(post.reply_count, -1);
    }

    #[test]
    fn test_parse_post_header_wrong_token_count() {
        let err = parse_post_header("#p 123 2017-05-04 12:34:56 7", 3).unwrap_err();
        assert!(matches!(
            err,
            ParseError::TokenCount {
                line: 3,
                expected: 6,
                found: 5
            }
        ));
    }

    #[test]
    fn test_parse_post_header_bad_date() {
        let err = parse_post_header("#p 123 2017-13-04 12:34:56 7 2", 8).unwrap_err();
        assert!(matches!(err, ParseError::InvalidTimestamp { line: 8, .. }));
    }

    #[test]
    fn test_parse_comment_header() {
        let comment = parse_comment_header("#c 55 2017-05-04 13:00:00", 2).unwrap();
        assert_eq!(comment.id, 55);
        assert_eq!(format_timestamp(&comment.created_at), "2017-05-04 13:00:00");

        let err = parse_comment_header("#c x 2017-05-04 13:00:00", 2).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidInteger {
                field: "comment id",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_legacy_header() {
        let post = parse_legacy_header("100 2016-01-02 03:04:05 -3 4", 1).unwrap();
        assert_eq!(post.id, 100);
        assert_eq!(post.like_count, -3);
        assert_eq!(post.reply_count, 4);
    }
}
