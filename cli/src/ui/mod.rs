//! UI utilities for terminal output.

mod banner;

pub use banner::{format_preview, format_time, print_banner};
