//! Shared helpers for LSP end-to-end tests

#![allow(dead_code)]

mod lsp;
mod registry;

pub use lsp::*;
pub use registry::*;
