pub mod base;
pub mod incremental;
