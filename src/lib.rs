//! Hole archiver library.
//!
//! Keeps anonymous-forum posts and their comments in a line-oriented text
//! archive: parsing and writing the format, repairing post sequences read from
//! an unreliable feed, and filling in comments from the forum's API.

pub mod archive;
pub mod config;
pub mod constants;
pub mod fetch;
pub mod runner;
