//! Test Helper Utilities
//!
//! Shared utilities for testing remix-engine

#![allow(dead_code)]

pub mod fake_backend;
pub mod mock_functions;

pub use fake_backend::{
    drain_events, error_notifications, sample_analysis, sample_match, test_engine, FakeBackend,
};
pub use mock_functions::{MockFunctions, RecordedRequest};
