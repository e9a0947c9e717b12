//! Core types and trait definitions for the Beacon signal store.
//!
//! This crate is deliberately free of database dependencies. Storage backends
//! implement [`store::SignalStore`]; everything above them depends on this
//! abstraction only.

#![allow(async_fn_in_trait)]

pub mod company;
pub mod content;
pub mod embedding;
pub mod error;
pub mod index;
pub mod signal;
pub mod snapshot;
pub mod source;
pub mod store;

pub use error::{Error, Result};
