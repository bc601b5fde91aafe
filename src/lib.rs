pub mod chain;
pub mod config;
pub mod handoff;
pub mod output;
pub mod pipeline;
pub mod plus_code;
pub mod reader;
pub mod records;
pub mod stats;
pub mod windows;
