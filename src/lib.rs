pub mod base;
pub mod changes;
pub mod cli;
pub mod config;
pub mod deps;
pub mod error;
pub mod extract;
pub mod git;
pub mod linter;
pub mod mcp;
pub mod model;
pub mod observer;
pub mod orchestrator;
pub mod process;
pub mod project;
pub mod util;
