//! # UI Module
//!
//! Shared styling for the live dashboard view.

pub mod styles;
