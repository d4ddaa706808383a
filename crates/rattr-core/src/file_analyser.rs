//! Top-level driver: build one module's root context, then analyse every
//! top-level function and class against it, assembling a [`FileIr`]
//! (spec.md §4.4 through §4.6 combined).
//!
//! `root_context::build_root_context` has already registered every
//! top-level `def`/`class` as a bare `Func`/`Class` symbol (so a forward
//! reference to a not-yet-visited callable still resolves); this module is
//! the second pass that actually analyses each one's body and records its
//! `FunctionIr`, mirroring how the original's `rattr.analyser.main` drives
//! `FunctionAnalyser`/`ClassAnalyser` over a module one top-level
//! definition at a time.

use std::path::PathBuf;
use std::rc::Rc;

use crate::analyser::analyse_function;
use crate::ast::{Module, Stmt};
use crate::class_analyser::analyse_class;
use crate::context::Context;
use crate::diagnostics::DiagnosticSink;
use crate::ir::FileIr;
use crate::module_locator::ModuleLocator;
use crate::plugins::PluginRegistry;
use crate::root_context::build_root_context;

/// Analyse one parsed module end to end: build its root context, then
/// analyse every top-level function and class, returning both.
pub fn analyse_module(
    module: &Module,
    file: impl Into<PathBuf>,
    locator: Rc<dyn ModuleLocator>,
    plugins: &PluginRegistry,
    sink: &mut DiagnosticSink,
) -> (Context, FileIr) {
    let file = file.into();
    let ctx = build_root_context(module, file, locator, sink);
    let mut file_ir = FileIr::new();

    for stmt in &module.body {
        match stmt {
            Stmt::FunctionDef {
                name,
                args,
                body,
                is_async,
                pos,
                ..
            } => {
                let ir = analyse_function(args, body, &ctx, plugins, sink);
                let symbol = ctx.get(name).unwrap_or_else(|| crate::symbol::Symbol::Func {
                    name: name.clone(),
                    interface: crate::symbol::CallInterface::from_arguments(args),
                    is_async: *is_async,
                    location: Some(pos.to_location(ctx.file())),
                });
                file_ir.insert(symbol, ir);
            }
            Stmt::ClassDef {
                name,
                bases,
                body,
                decorator_list,
                pos,
            } => {
                let location = Some(pos.to_location(ctx.file()));
                let analysis = analyse_class(name, bases, body, decorator_list, location, &ctx, plugins, sink);
                if let Some((symbol, ir)) = analysis.class {
                    file_ir.insert(symbol, ir);
                }
                for (symbol, ir) in analysis.static_methods {
                    file_ir.insert(symbol, ir);
                }
            }
            _ => {}
        }
    }

    (ctx, file_ir)
}
