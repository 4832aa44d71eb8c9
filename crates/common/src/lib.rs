pub mod config;
pub mod destination;
pub mod error;
pub mod types;
