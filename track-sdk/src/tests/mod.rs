//! Unit tests for the Track SDK
//!
//! This module contains tests for various components of the SDK.

pub mod config_tests;
pub mod tracks_mock_tests;
