//! Library crate for portsweep: a concurrent TCP connect scanner.
pub mod config;
pub mod error;
pub mod ports;
pub mod probe;
pub mod report;
pub mod scanner;
pub mod types;
