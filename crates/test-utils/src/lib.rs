//! Shared test utilities for the load generator workspace.
//!
//! This crate provides:
//! - An in-process mock target service that records every request
//! - Helpers for addresses that refuse connections
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../../crates/test-utils" }
//! ```
//!
//! Then in an async test:
//!
//! ```ignore
//! use test_utils::MockTarget;
//!
//! #[tokio::test]
//! async fn test_hits_target() {
//!     let target = MockTarget::start().await;
//!     // point the code under test at target.base_url() ...
//!     assert_eq!(target.hit_count(), 1);
//! }
//! ```

pub mod fixtures;
pub mod mock_target;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use mock_target::*;
