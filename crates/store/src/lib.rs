//! Persistence for `User` documents, one per principal.

pub mod document;
pub mod json_file;

pub use document::{UserRecord, UserStore};
pub use json_file::JsonFileStore;
