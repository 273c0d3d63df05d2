//! Cross-crate integration tests for the ebb workspace.
//!
//! The tests live in `tests/`; this crate only carries the shared helpers.

pub mod helpers;
