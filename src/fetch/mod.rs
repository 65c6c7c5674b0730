//! Comment fetching for archived posts.
//!
//! A request for a post's comments is retried according to a [`RetryPolicy`]
//! until the server answers at all. Once it has answered, problems with the
//! answer itself (not JSON, an error code, items that don't decode) are soft
//! failures: the post comes back exactly as it went in and the caller moves on.
//! A successful fetch is visible to the caller as a changed `reply_count` or a
//! non-empty comment list.

mod retry;

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive::{Comment, Post};
use crate::config::Config;
use crate::constants::FETCH_USER_AGENT;

pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("post {post_id} request failed after {attempts} attempts: {source}")]
    RequestFailed {
        post_id: i64,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("operation aborted")]
    Cancelled,
}

/// Response envelope of the comment endpoint.
#[derive(Debug, Deserialize)]
struct CommentEnvelope {
    code: i64,
    #[serde(default)]
    data: serde_json::Value,
}

/// A single comment as returned by the endpoint.
#[derive(Debug, Deserialize)]
struct RawComment {
    cid: Number,
    timestamp: Number,
    text: String,
}

/// The endpoint sends numbers either bare or quoted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Number {
    Int(i64),
    Text(String),
}

impl Number {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Convert Unix seconds to local wall-clock time.
#[must_use]
pub fn local_time(secs: i64) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp(secs, 0).map(|utc| utc.with_timezone(&Local).naive_local())
}

/// Zero a post's reply count without touching its comments.
#[must_use]
pub fn clear_reply_count(mut post: Post) -> Post {
    post.reply_count = 0;
    post
}

/// Client for the comment endpoint.
#[derive(Debug, Clone)]
pub struct CommentFetcher {
    client: Client,
    endpoint: String,
    policy: RetryPolicy,
}

impl CommentFetcher {
    /// Create a fetcher for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: &str, policy: RetryPolicy, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(FETCH_USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            policy,
        })
    }

    /// Create a fetcher from application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(
            &config.comment_api_url,
            config.retry_policy(),
            config.fetch_timeout,
        )
    }

    /// Fetch the comments of `post` and append them to it.
    ///
    /// On success `reply_count` is set to the resulting number of comments.
    /// An answer that cannot be used returns `post` unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::RequestFailed`] if no attempt got an answer and
    /// [`FetchError::Cancelled`] if `cancel` fires before or between attempts.
    pub async fn fetch_comments(
        &self,
        mut post: Post,
        cancel: &CancellationToken,
    ) -> Result<Post, FetchError> {
        let max_attempts = self.policy.attempts();
        let mut attempt = 0;

        let response = loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            attempt += 1;

            match self.request(post.id).await {
                Ok(response) => break response,
                Err(e) if attempt >= max_attempts => {
                    return Err(FetchError::RequestFailed {
                        post_id: post.id,
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => {
                    debug!(post_id = post.id, error = %e, "Comment request failed");
                    pause(self.policy.backoff(), cancel).await?;
                    info!(post_id = post.id, attempt, "Post {} retry {}", post.id, attempt - 1);
                }
            }
        };

        pause(self.policy.settle(), cancel).await?;

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(post_id = post.id, error = %e, "Failed to read comment response");
                return Ok(post);
            }
        };

        let Some(comments) = decode_comments(post.id, &body) else {
            return Ok(post);
        };

        post.comments.extend(comments);
        post.reply_count = post.comments.len() as i64;
        debug!(post_id = post.id, comments = post.reply_count, "Fetched comments");
        Ok(post)
    }

    async fn request(&self, post_id: i64) -> Result<reqwest::Response, reqwest::Error> {
        let pid = post_id.to_string();
        self.client
            .get(&self.endpoint)
            .query(&[("action", "getcomment"), ("pid", pid.as_str())])
            .send()
            .await
    }
}

/// Decode a comment response body, logging and returning `None` when it is unusable.
fn decode_comments(post_id: i64, body: &[u8]) -> Option<Vec<Comment>> {
    let envelope: CommentEnvelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(post_id, error = %e, "Post {post_id} parse json error");
            return None;
        }
    };

    if envelope.code != 0 {
        warn!(post_id, code = envelope.code, data = %envelope.data, "Post {post_id} get comment error");
        return None;
    }

    let raw: Vec<RawComment> = match serde_json::from_value(envelope.data) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(post_id, error = %e, "Post {post_id} comment list malformed");
            return None;
        }
    };

    let mut comments = Vec::with_capacity(raw.len());
    for item in raw {
        let decoded = item.cid.as_i64().and_then(|id| {
            let created_at = item.timestamp.as_i64().and_then(local_time)?;
            Some(Comment {
                id,
                created_at,
                body: format!("{}\n\n", item.text),
            })
        });
        let Some(comment) = decoded else {
            warn!(post_id, "Post {post_id} comment has invalid id or timestamp");
            return None;
        };
        comments.push(comment);
    }
    Some(comments)
}

async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<(), FetchError> {
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        () = tokio::time::sleep(duration) => Ok(()),
        () = cancel.cancelled() => Err(FetchError::Cancelled),
    }
}
