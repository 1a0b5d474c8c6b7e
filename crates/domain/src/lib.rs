//! Shared types for threadline: configuration, the error taxonomy, the
//! `User` document model and structured trace events.
//!
//! This crate performs no I/O of its own; the provider client, the
//! document store and the HTTP gateway all depend on it.

pub mod config;
pub mod error;
pub mod model;
pub mod trace;
