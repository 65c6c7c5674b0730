//! Current-format archive parser.
//!
//! The parser is a small state machine driven line by line:
//!
//! - `ExpectingPostHeader`: nothing read yet; only a post header is legal.
//! - `PostBody`: text lines extend the open post's body.
//! - `CommentBody`: text lines extend the open comment's body.
//!
//! A post header closes the open comment (if any) and the open post, a comment
//! header closes only the open comment. End of input closes everything.

use super::line::{classify, parse_comment_header, parse_post_header, LineKind, ParseError};
use super::models::{Comment, Post};

enum State {
    ExpectingPostHeader,
    PostBody(Post),
    CommentBody(Post, Comment),
}

impl State {
    fn step(self, line: &str, line_no: usize, out: &mut Vec<Post>) -> Result<Self, ParseError> {
        let kind = classify(line);
        match (self, kind) {
            (Self::ExpectingPostHeader, LineKind::PostHeader) => {
                Ok(Self::PostBody(parse_post_header(line, line_no)?))
            }
            (Self::ExpectingPostHeader, _) => Err(ParseError::MissingHeader { line: line_no }),
            (state, LineKind::PostHeader) => {
                out.extend(state.close());
                Ok(Self::PostBody(parse_post_header(line, line_no)?))
            }
            (Self::PostBody(post), LineKind::CommentHeader) => {
                Ok(Self::CommentBody(post, parse_comment_header(line, line_no)?))
            }
            (Self::CommentBody(mut post, comment), LineKind::CommentHeader) => {
                post.comments.push(comment);
                Ok(Self::CommentBody(post, parse_comment_header(line, line_no)?))
            }
            (Self::PostBody(mut post), LineKind::Text) => {
                push_line(&mut post.body, line);
                Ok(Self::PostBody(post))
            }
            (Self::CommentBody(post, mut comment), LineKind::Text) => {
                push_line(&mut comment.body, line);
                Ok(Self::CommentBody(post, comment))
            }
        }
    }

    /// Flush the open comment into its post and hand back the post.
    fn close(self) -> Option<Post> {
        match self {
            Self::CommentBody(mut post, comment) => {
                post.comments.push(comment);
                Some(post)
            }
            Self::PostBody(post) => Some(post),
            Self::ExpectingPostHeader => None,
        }
    }
}

fn push_line(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}

/// Parse the full text of a current-format archive into its posts, in file order.
///
/// Empty input yields an empty list.
///
/// # Errors
///
/// Returns an error on the first malformed header, or if the first line is not
/// a post header. No partial result is returned.
pub fn parse_posts(text: &str) -> Result<Vec<Post>, ParseError> {
    let mut posts = Vec::new();
    let mut state = State::ExpectingPostHeader;

    for (idx, line) in text.lines().enumerate() {
        state = state.step(line, idx + 1, &mut posts)?;
    }

    posts.extend(state.close());

    Ok(posts)
}
