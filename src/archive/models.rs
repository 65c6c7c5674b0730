use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::constants::MISSED_BODY;

/// An archived forum submission with its metadata, body and replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub like_count: i64,
    /// `-1` marks a placeholder whose replies were never fetched.
    pub reply_count: i64,
    /// Body text, terminated by a blank line.
    pub body: String,
    /// Replies in fetch order.
    pub comments: Vec<Comment>,
}

/// A reply attached to a [`Post`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub body: String,
}

impl Post {
    /// Create a post from its header fields with an empty body.
    #[must_use]
    pub fn new(id: i64, created_at: NaiveDateTime, like_count: i64, reply_count: i64) -> Self {
        Self {
            id,
            created_at,
            like_count,
            reply_count,
            body: String::new(),
            comments: Vec::new(),
        }
    }

    /// Synthesize a stand-in for a post that is known to exist but was never seen.
    #[must_use]
    pub fn placeholder(id: i64, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            created_at,
            like_count: 0,
            reply_count: -1,
            body: MISSED_BODY.to_string(),
            comments: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.reply_count == -1 && self.body == MISSED_BODY
    }

    /// Whether the stored replies disagree with the advertised reply count.
    #[must_use]
    pub fn needs_comments(&self) -> bool {
        self.reply_count > 0 && self.comments.len() as i64 != self.reply_count
    }
}

impl Comment {
    #[must_use]
    pub fn new(id: i64, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            created_at,
            body: String::new(),
        }
    }
}
