//! Core types and trait definitions for the university portal.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The store backend and the HTTP server both depend on it.

// Native `async fn` in traits; the store trait spells out its `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod classify;
pub mod document;
pub mod error;
pub mod principal;
pub mod store;
pub mod taxonomy;

pub use error::{Error, Result};
