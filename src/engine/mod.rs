//! # Engine Module
//!
//! Internal storage-core implementation.
//!
//! This module contains all core building blocks:
//! - Packed handles and identifiers
//! - Schema composition and the meta registry
//! - Chunked, columnar archetype storage
//! - The record registry facade
//! - Lane-width batch dispatch
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod handle;
pub mod schema;
pub mod meta;
pub mod chunk;
pub mod archetype;
pub mod registry;
pub mod batch;
