//! Parsing, fragmentation math and rendering

pub mod config;
pub mod error;
pub mod fragmentation;
pub mod histogram;
pub mod parser;
pub mod report;
pub mod source;
