//! Terminal front-end helpers

mod console;

pub use console::{format_duration, Console};
