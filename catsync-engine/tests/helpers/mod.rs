//! Test Helper Utilities
//!
//! Shared utilities for testing catsync-engine

#![allow(dead_code)]

pub mod fixtures;
pub mod mock_provider;

pub use fixtures::{anime, list, manga, point10, point100};
pub use mock_provider::{MockProvider, MockTitleSource};
