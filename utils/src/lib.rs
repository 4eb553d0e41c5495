//! Shared utilities for the Foodgram workspace.
//!
//! Holds build metadata that the services crate reports from its health
//! endpoint.

pub mod version_info;
