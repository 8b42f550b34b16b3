//! LSP (Language Server Protocol) implementation layer
//!
//! This module handles communication with editors via LSP and turns the
//! evaluation of each `package.json` dependency into editor features.
//!
//! # Modules
//!
//! - [`backend`]: Main LSP backend implementing `LanguageServer` trait
//! - [`evaluator`]: Fetch, classify, audit and recommend per dependency
//! - [`code_lens`]: Vulnerability warnings and upgrade buttons
//! - [`code_action`]: Version picker quick fixes
//! - [`diagnostics`]: Warnings for pinned versions with blocking advisories
//! - [`server`]: LSP server initialization and lifecycle

pub mod backend;
pub mod code_action;
pub mod code_lens;
pub mod diagnostics;
pub mod evaluator;
pub mod server;
