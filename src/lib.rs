pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod parser;
pub mod platform;
pub mod query;
pub mod records;
pub mod runner;
pub mod terminate;
pub mod utils;

pub use error::{Error, Result};
