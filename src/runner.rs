//! Whole-archive operations: legacy migration and comment refresh.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive::{self, Post};
use crate::fetch::{clear_reply_count, CommentFetcher};

/// Counts from one comment refresh run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Posts whose comments were fetched.
    pub fetched: usize,
    /// Posts the endpoint gave no usable answer for.
    pub unchanged: usize,
    /// Of `unchanged`, posts whose reply count was cleared.
    pub cleared: usize,
    /// Posts that already had all their comments.
    pub skipped: usize,
}

/// Options for [`refresh_comments`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshOptions {
    /// Zero the reply count of posts whose fetch soft-failed, so they are not
    /// retried on every run.
    pub clear_on_soft_failure: bool,
}

/// Convert a legacy archive at `src` into a current-format archive at `dst`.
///
/// Returns the number of posts written, placeholders included, or `None` if
/// `dst` already exists. An existing archive may hold fetched comments and is
/// never replaced.
///
/// # Errors
///
/// Returns an error if either file cannot be read, parsed or written.
pub async fn migrate_legacy(src: &Path, dst: &Path) -> Result<Option<usize>> {
    let exists = tokio::fs::try_exists(dst)
        .await
        .with_context(|| format!("Failed to check archive {}", dst.display()))?;
    if exists {
        info!(
            src = %src.display(),
            dst = %dst.display(),
            "Archive already exists, skipping legacy migration"
        );
        return Ok(None);
    }

    let src_buf = src.to_path_buf();
    let posts = tokio::task::spawn_blocking(move || archive::read_legacy_posts(&src_buf))
        .await
        .context("Legacy read task panicked")?
        .with_context(|| format!("Failed to read legacy archive {}", src.display()))?;

    let placeholders = posts.iter().filter(|p| p.is_placeholder()).count();
    let count = posts.len();
    write_blocking(dst.to_path_buf(), posts).await?;

    info!(
        src = %src.display(),
        dst = %dst.display(),
        posts = count,
        placeholders,
        "Migrated legacy archive"
    );
    Ok(Some(count))
}

/// Fetch comments for every post in the archive at `path` that is missing
/// some, then rewrite the archive.
///
/// Nothing is written if a fetch fails terminally or `cancel` fires.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or written, if a request
/// exhausts its retries, or if the run is cancelled.
pub async fn refresh_comments(
    path: &Path,
    fetcher: &CommentFetcher,
    options: RefreshOptions,
    cancel: &CancellationToken,
) -> Result<RefreshSummary> {
    let path_buf = path.to_path_buf();
    let posts = tokio::task::spawn_blocking(move || archive::read_posts(&path_buf))
        .await
        .context("Archive read task panicked")?
        .with_context(|| format!("Failed to read archive {}", path.display()))?;

    let mut summary = RefreshSummary::default();
    let mut refreshed = Vec::with_capacity(posts.len());

    for post in posts {
        if !post.needs_comments() {
            summary.skipped += 1;
            refreshed.push(post);
            continue;
        }
        if cancel.is_cancelled() {
            anyhow::bail!("Refresh of {} cancelled", path.display());
        }

        let request = Post {
            comments: Vec::new(),
            ..post.clone()
        };
        let fetched = fetcher
            .fetch_comments(request.clone(), cancel)
            .await
            .with_context(|| format!("Failed to fetch comments for post {}", post.id))?;

        // A post that still needs comments has a positive reply count, so any
        // real answer (even an empty one) changes it.
        if fetched == request {
            summary.unchanged += 1;
            if options.clear_on_soft_failure {
                warn!(post_id = post.id, "Clearing reply count after failed comment fetch");
                summary.cleared += 1;
                refreshed.push(clear_reply_count(post));
            } else {
                refreshed.push(post);
            }
        } else {
            debug!(post_id = fetched.id, comments = fetched.comments.len(), "Refreshed post");
            summary.fetched += 1;
            refreshed.push(fetched);
        }
    }

    if summary.fetched > 0 || summary.cleared > 0 {
        write_blocking(path.to_path_buf(), refreshed).await?;
    }

    info!(
        path = %path.display(),
        fetched = summary.fetched,
        unchanged = summary.unchanged,
        cleared = summary.cleared,
        skipped = summary.skipped,
        "Comment refresh complete"
    );
    Ok(summary)
}

async fn write_blocking(path: PathBuf, posts: Vec<Post>) -> Result<()> {
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || archive::write_posts(&path, &posts))
        .await
        .context("Archive write task panicked")?
        .with_context(|| format!("Failed to write archive {display}"))
}
