//! `ralph-lsp`: the presentation compiler for the Ralph smart-contract
//! language. Wraps the batch compiler in `ralph-compiler` with an
//! incremental, editor-facing workspace state machine.
//!
//! Module map:
//!
//! | Responsibility | Module |
//! |---|---|
//! | File access | [`file_access`] |
//! | Compiler facade | [`compiler_facade`] |
//! | Build model & validator | [`build`] |
//! | Dependency loader | [`dependency`] |
//! | Source-code state | [`source`] |
//! | Import resolver | [`import`] |
//! | Workspace engine | [`workspace`] |
//! | Search/AST utilities | [`search`] |
//! | Go-to-definition | [`definition`] |
//! | Completion | [`completion`] |
//! | Server adapter | [`server`] |

pub mod analyzer;
pub mod build;
pub mod compiler_facade;
pub mod completion;
pub mod definition;
pub mod dependency;
pub mod error;
pub mod file_access;
pub mod import;
pub mod location;
pub mod search;
pub mod server;
pub mod source;
pub mod uri;
pub mod workspace;

pub use analyzer::Analyzer;
pub use error::CoreError;
pub use uri::Uri;
