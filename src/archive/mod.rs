//! The archive text format: records, parsing, serialization and sequence repair.

pub mod legacy;
pub mod line;
pub mod lock;
pub mod models;
pub mod parser;
pub mod reconcile;
pub mod serializer;
pub mod store;

pub use legacy::parse_legacy_posts;
pub use line::ParseError;
pub use models::{Comment, Post};
pub use parser::parse_posts;
pub use reconcile::{reconcile, GapTooLarge, Placement, Reconciler};
pub use serializer::serialize_posts;
pub use store::{force_remove, read_legacy_posts, read_posts, write_posts, StoreError};
