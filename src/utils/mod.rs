//! Small shared helpers.

pub mod text;
pub mod time;

pub use text::{contains_any, truncate};
pub use time::format_duration;
