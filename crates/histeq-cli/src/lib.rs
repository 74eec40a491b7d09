//! Shared utilities for histeq-cli
//!
//! PNG load/save helpers and report formatting, kept out of main.rs so
//! they can be unit tested without touching the filesystem boundary.

pub mod io;
pub mod report;

pub use io::{load_png, save_png};
pub use report::{format_array, format_timing};
