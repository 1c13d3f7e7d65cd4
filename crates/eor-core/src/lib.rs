//! Core types and trait definitions for the EoR observatory status service.
//!
//! This crate is free of HTTP and database dependencies. It holds the tag
//! codec, the observation-log and user rules, and the storage traits every
//! other crate builds on.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod download;
pub mod error;
pub mod graph;
pub mod log;
pub mod observation;
pub mod store;
pub mod tag;
pub mod user;

pub use error::{Error, Result};
