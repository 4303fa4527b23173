//! # Nebula Development Tools
//!
//! Command-line helpers for working with scenario files:
//! - Scenario loading and validation
//! - Advisor and planner reports
//! - Ground battle forecasts

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod load;
pub mod report;

pub use error::{Result, ToolError};
