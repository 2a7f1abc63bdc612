//! CLI command implementations

pub mod config;
pub mod evidence;
pub mod lint;
pub mod vitals;
