pub mod aggregate;
pub mod cli;
pub mod config;
pub mod discover;
pub mod parser;
pub mod record;
pub mod report;
pub mod runner;
pub mod util;
