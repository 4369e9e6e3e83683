//! Service-specific client implementations
//!
//! This module contains the typed clients built on top of the core
//! abstractions: the track API and the external article search provider.

pub mod articles;
pub mod tracks;
