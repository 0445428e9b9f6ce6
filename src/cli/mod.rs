//! Command-line entry: argument parsing, logging setup, and action dispatch.

pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod start;

pub use start::start;
