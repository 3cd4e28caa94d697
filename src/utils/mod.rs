//! Utility modules for common functionality
//!
//! This module provides various utility functions and types used throughout the application.

pub mod date_utils;
pub mod logger;
pub mod progress;
pub(crate) mod tag_utils;
pub(crate) mod tiff_utils;
pub(crate) mod write_utils;
