//! # AutoDev Team
//!
//! A four-agent code generation pipeline behind a small web UI.
//!
//! ## Task Flow
//! 1. Receive a natural-language task via the UI or the CLI
//! 2. Run the crew: architect, coder, reviewer, tester, one LLM call each
//! 3. Extract fenced code blocks from the combined output
//! 4. Write each block (and the full result) to the output directory
//!
//! ```text
//!  UI / CLI ──▶ Crew ──▶ LlmClient (chat completions)
//!                 │
//!                 ▼
//!        extract_code_blocks ──▶ OutputStore
//! ```
//!
//! ## Modules
//! - `agents`: role profiles and the per-step agent
//! - `task`: task records and step prompts
//! - `crew`: the sequential runner
//! - `extract`: fenced code-block extraction
//! - `files`: file naming and the output directory
//! - `llm`: chat-completion client
//! - `api`: HTTP server and UI

pub mod agents;
pub mod api;
pub mod config;
pub mod crew;
pub mod extract;
pub mod files;
pub mod llm;
pub mod task;

pub use config::Config;
pub use crew::Crew;
pub use extract::{extract_code_blocks, CodeBlock, Section};
pub use files::{GeneratedFile, OutputStore};
