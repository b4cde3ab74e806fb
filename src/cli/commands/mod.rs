//! Command implementations

pub mod completions;
pub mod config;
pub mod fixture;
pub mod init;
pub mod log;
pub mod measure;
