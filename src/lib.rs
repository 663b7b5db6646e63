//! # trace-viewer-rs
//!
//! Normalizes agent/LLM conversation traces (JSONL) into a uniform event
//! list a viewer can render. Two producer schemas are understood:
//!
//! - flat chat logs, one OpenAI-style message per line
//! - Claude Code session logs, where one assistant message is split across
//!   several records that share a message id
//!
//! ```text
//! text ─▶ decode ─▶ detect ─▶ reconstruct ─▶ extract ─▶ TraceData
//!                              (openai │ claude)   (events, title)
//! ```
//!
//! Around the pipeline: saved threads, share links, tool-renderer lookup and
//! the loaders used by the `trace-viewer` server.

pub mod block;
pub mod claude;
pub mod config;
pub mod decode;
pub mod detect;
pub mod error;
pub mod events;
pub mod loader;
pub mod normalizer;
pub mod openai;
pub mod pairing;
pub mod share;
pub mod text;
pub mod threads;
pub mod titles;
pub mod tools;
pub mod trace;

pub use detect::TraceFormat;
pub use normalizer::normalize;
pub use trace::{Content, Role, TraceData, TraceEvent, UniformMessage};
