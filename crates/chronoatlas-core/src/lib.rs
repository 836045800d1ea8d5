//! Temporal reconstruction and spatial containment for year-indexed fantasy
//! maps.
//!
//! Entities (locations and regions) are stored once in their current form.
//! Every historical edit is a dated [`ledger::ChangeRecord`]; the state of the
//! map in any year is derived by replaying those records. This crate is free
//! of I/O: storage backends and front-ends depend on it, never the reverse.

pub mod atlas;
pub mod containment;
pub mod diff;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod hierarchy;
pub mod ledger;
pub mod reconstruct;
pub mod store;

pub use error::{Error, Result};
