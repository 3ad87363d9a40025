pub mod config;
pub mod dedup;
