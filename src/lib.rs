pub mod config;
pub mod lsp;
pub mod package_manager;
pub mod parser;
pub mod version;
