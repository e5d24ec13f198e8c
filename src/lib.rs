pub mod browser;
pub mod config;
pub mod engine;
pub mod error;
