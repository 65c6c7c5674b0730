//! Ordering repair for posts read newest-first from an unreliable source.
//!
//! Identifiers in a healthy archive form a dense sequence that drops by
//! exactly one per entry. Three kinds of damage are repaired as posts arrive:
//!
//! - two neighbouring posts emitted in swapped order
//! - the same post emitted twice in a row
//! - posts missing entirely, which are backfilled with placeholders
//!
//! Only the last two entries are examined. A post that reappears further back
//! than that is treated as a gap with nothing to backfill and appended as is.
//! A gap wider than [`MAX_BACKFILL`] placeholders is refused.

use thiserror::Error;
use tracing::info;

use super::models::Post;
use crate::constants::MAX_BACKFILL;

/// A gap too wide to backfill.
#[derive(Debug, Error)]
#[error("gap between post {last_id} and post {id} needs {missing} placeholders")]
pub struct GapTooLarge {
    pub id: i64,
    pub last_id: i64,
    pub missing: u64,
}

/// Where a post ended up after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Replaced the second-to-last entry with the same id.
    Reordered,
    /// Dropped because the last entry already has this id.
    Duplicate,
    /// Appended after `missing` placeholder posts.
    Backfilled { missing: usize },
    /// Appended directly.
    Appended,
}

/// Place `cur` into `seq`, repairing reorders, duplicates and gaps.
///
/// # Errors
///
/// Returns [`GapTooLarge`] if backfilling the gap above `cur` would take more
/// than [`MAX_BACKFILL`] placeholders. `seq` is left untouched in that case.
pub fn reconcile(seq: &mut Vec<Post>, cur: Post) -> Result<Placement, GapTooLarge> {
    let len = seq.len();

    if len > 2 && seq[len - 2].id == cur.id {
        info!(post_id = cur.id, "Rec {}", cur.id);
        seq[len - 2] = cur;
        return Ok(Placement::Reordered);
    }

    let Some(last_id) = seq.last().map(|p| p.id) else {
        seq.push(cur);
        return Ok(Placement::Appended);
    };

    if cur.id == last_id {
        info!(post_id = cur.id, "Dup {}", cur.id);
        return Ok(Placement::Duplicate);
    }

    if last_id.checked_sub(1) != Some(cur.id) {
        // Upward jumps have nothing below them to fill
        let missing = if cur.id < last_id {
            last_id.abs_diff(cur.id) - 1
        } else {
            0
        };
        if missing > MAX_BACKFILL {
            return Err(GapTooLarge {
                id: cur.id,
                last_id,
                missing,
            });
        }

        info!(post_id = cur.id, last_id, "Mis {} {}", cur.id, last_id);
        let before = seq.len();
        if cur.id < last_id {
            seq.extend(
                ((cur.id + 1)..last_id)
                    .rev()
                    .map(|id| Post::placeholder(id, cur.created_at)),
            );
        }
        let missing = seq.len() - before;
        seq.push(cur);
        return Ok(Placement::Backfilled { missing });
    }

    seq.push(cur);
    Ok(Placement::Appended)
}

/// An archive sequence that keeps itself in repaired order as posts arrive.
#[derive(Debug, Default)]
pub struct Reconciler {
    posts: Vec<Post>,
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`GapTooLarge`] as [`reconcile`] does.
    pub fn push(&mut self, post: Post) -> Result<Placement, GapTooLarge> {
        reconcile(&mut self.posts, post)
    }

    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn into_posts(self) -> Vec<Post> {
        self.posts
    }
}
