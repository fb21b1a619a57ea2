// Library exports for Streamlog

pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
