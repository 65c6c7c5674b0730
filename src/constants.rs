//! Shared constants used across the application.

/// User agent string used for comment requests.
///
/// A realistic browser user agent so requests look like normal browser traffic.
pub const FETCH_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Timestamp layout used by every header line in an archive file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Prefix tag of a post header line.
pub const POST_TAG: &str = "#p";

/// Prefix tag of a comment header line.
pub const COMMENT_TAG: &str = "#c";

/// Body written for placeholder posts filling an identifier gap.
pub const MISSED_BODY: &str = "#MISSED\n\n";

/// Most placeholder posts a single identifier gap may be backfilled with.
pub const MAX_BACKFILL: u64 = 100_000;

/// Suffix of the lock file guarding reads of an archive.
pub const READ_LOCK_SUFFIX: &str = ".readlock";

/// Suffix of the lock file guarding writes of an archive.
pub const WRITE_LOCK_SUFFIX: &str = ".writelock";
