//! Small shared helpers: tuning constants and URL normalization.

pub mod constants;
pub mod urls;
