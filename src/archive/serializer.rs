use std::fmt::Write as _;

use super::line::format_timestamp;
use super::models::Post;
use crate::constants::{COMMENT_TAG, POST_TAG};

/// Render posts in the current archive format.
///
/// Bodies are written verbatim, so posts whose bodies end in a blank line
/// read back identically through [`super::parse_posts`].
#[must_use]
pub fn serialize_posts(posts: &[Post]) -> String {
    let mut out = String::new();
    for post in posts {
        write_post(&mut out, post);
    }
    out
}

fn write_post(out: &mut String, post: &Post) {
    // Writing into a String cannot fail
    let _ = writeln!(
        out,
        "{POST_TAG} {} {} {} {}",
        post.id,
        format_timestamp(&post.created_at),
        post.like_count,
        post.reply_count
    );
    out.push_str(&post.body);

    for comment in &post.comments {
        let _ = writeln!(
            out,
            "{COMMENT_TAG} {} {}",
            comment.id,
            format_timestamp(&comment.created_at)
        );
        out.push_str(&comment.body);
    }
}
