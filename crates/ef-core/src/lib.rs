//! Core of e2e-forge: data model, source scanner, component graph, call-shape
//! and integration catalogs, naming rules and the text rewriter.

pub mod catalog;
pub mod error;
pub mod graph;
pub mod logging;
pub mod models;
pub mod naming;
pub mod parsers;
pub mod rewrite;

pub use error::{EfError, EfResult};
pub use logging::{init, init_default, init_from_args, LogFormat};
