//! Roamer library
//!
//! Multi-source travel planning: trip extraction, parallel web and Reddit
//! search, per-source analysis and a synthesized answer, exposed through
//! the CLI and an HTTP API.

pub mod cli;
pub mod config;
pub mod event;
pub mod graph;
pub mod llm;
pub mod logging;
pub mod nodes;
pub mod planner;
pub mod prompts;
pub mod search;
pub mod server;
pub mod trip;
