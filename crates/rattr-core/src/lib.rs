//! Core analyser library: context, per-function/class IR analysis, call
//! graph simplification, results generation, and caching for a static
//! effect-summary analyser over a pre-parsed syntax tree.
//!
//! A full run: parse a tree (out of scope, see `ast.rs`'s module doc) →
//! [`root_context::build_root_context`] → [`file_analyser::analyse_module`]
//! → [`results::generate_results_from_ir`] → optionally [`cache`] the
//! record. `config` and `diagnostics` are process-wide and threaded through
//! every stage; `plugins` customises call-site analysis for a handful of
//! builtins the core cannot special-case by syntax alone.

pub mod analyser;
pub mod ast;
pub mod cache;
pub mod class_analyser;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod file_analyser;
pub mod ir;
pub mod location;
pub mod module_locator;
pub mod names;
pub mod plugins;
pub mod results;
pub mod root_context;
pub mod simplify;
pub mod symbol;
pub mod symbol_table;
