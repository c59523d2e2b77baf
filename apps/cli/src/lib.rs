//! Collects a user's GitHub commits into a markdown document and turns that
//! document into a resume with an LLM.

pub mod cli;
pub mod config;
pub mod document;
pub mod errors;
pub mod generation;
pub mod github;
pub mod grouping;
pub mod harvest;
pub mod llm_client;
pub mod models;
pub mod pipeline;
pub mod process;
pub mod scheduler;
pub mod state;
pub mod terminal;
pub mod ui;

#[cfg(test)]
mod test_helpers;
