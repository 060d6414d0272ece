//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the viewer:
//! - Math types and camera matrix helpers
//! - Frame timing
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
