//! Custom per-builtin analysers and whole-module assertors.
//!
//! Grounded on `plugins/analysers/builtins.py` (the four attribute-access
//! builtins plus `sorted(..., key=...)`) and `plugins/assertors/import_clobbering.py`
//! (the one assertor the original ships). `defaultdict(factory)` is a
//! supplemented addition (`SPEC_FULL.md` §2), built the same way
//! `SortedAnalyser` is: recognise the call shape, then fold the factory's
//! own effects into the caller instead of leaving them invisible.

use std::collections::BTreeMap;

use crate::ast::{Expr, Keyword, Module, Stmt};
use crate::context::Context;
use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::ir::FunctionIr;
use crate::location::Location;
use crate::names::{self, xattr_object_fullname};
use crate::symbol::{CallArguments, Symbol};

/// A plugin that overrides or augments how one specific builtin's call is
/// analysed, triggered by the callee's bare name.
pub trait CustomFunctionAnalyser {
    fn triggers_on(&self) -> &'static str;

    /// Called instead of the generic call-registration logic once the
    /// callee name matches. `analyse_expr` is the analyser's own
    /// expression-effect collector, passed in so a plugin can recurse into
    /// a sub-expression (a lambda body, an argument) without this module
    /// depending on `analyser` directly.
    #[allow(clippy::too_many_arguments)]
    fn on_call(
        &self,
        func: &Expr,
        args: &[Expr],
        keywords: &[Keyword],
        location: Option<Location>,
        ctx: &Context,
        ir: &mut FunctionIr,
        sink: &mut DiagnosticSink,
        analyse_expr: &dyn Fn(&Expr, &Context, &mut FunctionIr, &mut DiagnosticSink),
    );
}

/// Every proper dotted prefix of a fullname, shortest excluded: `"o.b.f"` ->
/// `["o", "o.b"]`. Grounded on the original's `iter_lhs_names`, used to
/// record the base object (and any intermediate attribute) of an
/// attribute-access builtin's target as a `get`, in addition to the target
/// attribute itself.
fn iter_lhs_names(fullname: &str) -> Vec<String> {
    let mut segments: Vec<&str> = fullname.split('.').collect();
    segments.pop();
    let mut out = Vec::with_capacity(segments.len());
    let mut acc = String::new();
    for seg in segments {
        if acc.is_empty() {
            acc.push_str(seg);
        } else {
            acc.push('.');
            acc.push_str(seg);
        }
        out.push(acc.clone());
    }
    out
}

/// `getattr`/`hasattr` read the target attribute; `setattr` writes it;
/// `delattr` deletes it. All four are still registered as ordinary calls to
/// a builtin by the analyser before the plugin runs -- this only adds the
/// attribute-level effect `has_affect` promises downstream consumers is
/// there to find.
struct AttrAccessAnalyser {
    name: &'static str,
}

impl CustomFunctionAnalyser for AttrAccessAnalyser {
    fn triggers_on(&self) -> &'static str {
        self.name
    }

    fn on_call(
        &self,
        _func: &Expr,
        args: &[Expr],
        _keywords: &[Keyword],
        location: Option<Location>,
        ctx: &Context,
        ir: &mut FunctionIr,
        sink: &mut DiagnosticSink,
        _analyse_expr: &dyn Fn(&Expr, &Context, &mut FunctionIr, &mut DiagnosticSink),
    ) {
        match xattr_object_fullname(args, true) {
            Ok(Some(fullname)) => {
                // No location: `fullname` and its lhs prefixes are synthesized
                // from the call's string-literal argument, not read off a
                // visited AST node the way an ordinary name load is.
                for lhs in iter_lhs_names(&fullname) {
                    ir.gets.insert(Symbol::as_name(lhs));
                }
                let symbol = Symbol::as_name(fullname);
                match self.name {
                    "setattr" => ir.sets.insert(symbol),
                    "delattr" => ir.dels.insert(symbol),
                    _ => ir.gets.insert(symbol),
                };
            }
            Ok(None) => {
                sink.push(Diagnostic {
                    severity: Severity::Warning,
                    message: format!("{}() called with a non-literal attribute name", self.name),
                    file: ctx.file().to_path_buf(),
                    location,
                });
            }
            Err(err) => {
                sink.push(Diagnostic {
                    severity: Severity::Warning,
                    message: err.to_string(),
                    file: ctx.file().to_path_buf(),
                    location,
                });
            }
        }
    }
}

/// `sorted(iterable, key=lambda x: ...)`: the key function is called once
/// per element of `iterable`, so its body is analysed as if inlined, with
/// its single parameter standing for the iterable itself.
struct SortedAnalyser;

impl CustomFunctionAnalyser for SortedAnalyser {
    fn triggers_on(&self) -> &'static str {
        "sorted"
    }

    fn on_call(
        &self,
        _func: &Expr,
        args: &[Expr],
        keywords: &[Keyword],
        _location: Option<Location>,
        ctx: &Context,
        ir: &mut FunctionIr,
        sink: &mut DiagnosticSink,
        analyse_expr: &dyn Fn(&Expr, &Context, &mut FunctionIr, &mut DiagnosticSink),
    ) {
        let Some(iterable) = args.first() else {
            return;
        };
        analyse_expr(iterable, ctx, ir, sink);

        let Some(key_kw) = keywords.iter().find(|k| k.arg.as_deref() == Some("key")) else {
            return;
        };
        if let Expr::Lambda { args: lambda_args, body, .. } = &key_kw.value {
            let Ok(iterable_name) = names::fullname(iterable, true) else {
                return;
            };
            let child = ctx.child();
            if let Some(param) = lambda_args.args.first() {
                let param_location = body.pos().to_location(ctx.file());
                child.add_argument(Symbol::as_name_with_location(param.arg.clone(), param_location.clone()));
                // The lambda binds `param` the same way a comprehension's `for`
                // target does: recorded as a plain, unswapped set alongside the
                // unbound effects of its body (spec.md §8 scenario 2).
                ir.sets.insert(Symbol::as_name_with_location(param.arg.clone(), param_location));

                let mut lambda_ir = FunctionIr::new();
                analyse_expr(body, &child, &mut lambda_ir, sink);
                let swaps = BTreeMap::from([(param.arg.clone(), iterable_name)]);
                ir.union(&crate::simplify::unbind_ir_with_call_swaps(&lambda_ir, &swaps));
            } else {
                analyse_expr(body, &child, ir, sink);
            }
        }
    }
}

/// `defaultdict(factory)`: the factory is invoked (with no arguments) the
/// first time a missing key is accessed, so its effects belong to whatever
/// scope constructs the `defaultdict`.
struct DefaultdictAnalyser;

impl CustomFunctionAnalyser for DefaultdictAnalyser {
    fn triggers_on(&self) -> &'static str {
        "defaultdict"
    }

    fn on_call(
        &self,
        _func: &Expr,
        args: &[Expr],
        _keywords: &[Keyword],
        location: Option<Location>,
        ctx: &Context,
        ir: &mut FunctionIr,
        sink: &mut DiagnosticSink,
        analyse_expr: &dyn Fn(&Expr, &Context, &mut FunctionIr, &mut DiagnosticSink),
    ) {
        let Some(factory) = args.first() else {
            return;
        };
        match factory {
            Expr::Lambda { body, .. } => analyse_expr(body, ctx, ir, sink),
            Expr::Name { id, .. } => {
                let call_name = format!("{id}()");
                let target = ctx.get_call_target(&call_name, location.clone(), sink);
                let symbol = match location {
                    Some(loc) => Symbol::as_name_with_location(call_name, loc),
                    None => Symbol::as_name(call_name),
                };
                if let Symbol::Name { name, .. } = &symbol {
                    ir.calls.insert(Symbol::Call {
                        name: name.clone(),
                        args: CallArguments::default(),
                        target: target.map(Box::new),
                    });
                }
            }
            _ => {}
        }
    }
}

/// The set of custom analysers active for one run, keyed by the callee name
/// that triggers each.
pub struct PluginRegistry {
    analysers: Vec<Box<dyn CustomFunctionAnalyser>>,
}

impl PluginRegistry {
    pub fn with_builtins() -> Self {
        let mut analysers: Vec<Box<dyn CustomFunctionAnalyser>> = vec![
            Box::new(AttrAccessAnalyser { name: "getattr" }),
            Box::new(AttrAccessAnalyser { name: "setattr" }),
            Box::new(AttrAccessAnalyser { name: "hasattr" }),
            Box::new(AttrAccessAnalyser { name: "delattr" }),
            Box::new(SortedAnalyser),
            Box::new(DefaultdictAnalyser),
        ];
        analysers.shrink_to_fit();
        PluginRegistry { analysers }
    }

    pub fn find(&self, callee_name: &str) -> Option<&dyn CustomFunctionAnalyser> {
        self.analysers
            .iter()
            .find(|a| a.triggers_on() == callee_name)
            .map(|b| b.as_ref())
    }

    /// The trigger name of every registered analyser, for cache-key hashing
    /// (`cache.rs`'s `hash_plugins`).
    pub fn trigger_names(&self) -> Vec<&'static str> {
        self.analysers.iter().map(|a| a.triggers_on()).collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        PluginRegistry::with_builtins()
    }
}

/// A whole-module check run once, after the root context is built but
/// before any function is analysed -- unlike [`CustomFunctionAnalyser`],
/// an assertor inspects the full tree, not one call at a time.
pub trait Assertor {
    fn check(&self, module: &Module, ctx: &Context, sink: &mut DiagnosticSink);
}

/// Warns when an assignment, loop variable, `with` target, function, or
/// class rebinds a name that an `import` brought into scope -- almost
/// always a typo, since it silently makes the import unreachable from that
/// point on.
pub struct ImportClobberingAssertor;

impl Assertor for ImportClobberingAssertor {
    fn check(&self, module: &Module, ctx: &Context, sink: &mut DiagnosticSink) {
        for stmt in &module.body {
            self.visit_stmt(stmt, ctx, sink);
        }
    }
}

impl ImportClobberingAssertor {
    fn visit_stmt(&self, stmt: &Stmt, ctx: &Context, sink: &mut DiagnosticSink) {
        match stmt {
            Stmt::Assign { targets, pos, .. } => {
                for t in targets {
                    self.check_target(t, ctx, pos.to_location(ctx.file()), sink);
                }
            }
            Stmt::AnnAssign { target, pos, .. } | Stmt::AugAssign { target, pos, .. } => {
                self.check_target(target, ctx, pos.to_location(ctx.file()), sink);
            }
            Stmt::Delete { targets, pos } => {
                for t in targets {
                    self.check_target(t, ctx, pos.to_location(ctx.file()), sink);
                }
            }
            Stmt::FunctionDef { name, body, pos, .. } => {
                self.check_name(name, ctx, pos.to_location(ctx.file()), sink);
                for s in body {
                    self.visit_stmt(s, ctx, sink);
                }
            }
            Stmt::ClassDef { name, body, pos, .. } => {
                self.check_name(name, ctx, pos.to_location(ctx.file()), sink);
                for s in body {
                    self.visit_stmt(s, ctx, sink);
                }
            }
            Stmt::For { target, body, orelse, pos, .. } => {
                self.check_target(target, ctx, pos.to_location(ctx.file()), sink);
                for s in body.iter().chain(orelse) {
                    self.visit_stmt(s, ctx, sink);
                }
            }
            Stmt::While { body, orelse, .. } | Stmt::If { body, orelse, .. } => {
                for s in body.iter().chain(orelse) {
                    self.visit_stmt(s, ctx, sink);
                }
            }
            Stmt::With { items, body, pos, .. } => {
                for item in items {
                    if let Some(v) = &item.optional_vars {
                        self.check_target(v, ctx, pos.to_location(ctx.file()), sink);
                    }
                }
                for s in body {
                    self.visit_stmt(s, ctx, sink);
                }
            }
            Stmt::Try { body, handlers, orelse, finalbody, .. } => {
                for s in body.iter().chain(orelse).chain(finalbody) {
                    self.visit_stmt(s, ctx, sink);
                }
                for h in handlers {
                    for s in &h.body {
                        self.visit_stmt(s, ctx, sink);
                    }
                }
            }
            _ => {}
        }
    }

    fn check_target(&self, target: &Expr, ctx: &Context, location: Location, sink: &mut DiagnosticSink) {
        if let Ok(names) = names::unravel_names(target, true) {
            for name in names {
                let basename = name.trim_start_matches('*').split('.').next().unwrap_or("").to_string();
                self.check_name(&basename, ctx, location.clone(), sink);
            }
        }
    }

    fn check_name(&self, name: &str, ctx: &Context, location: Location, sink: &mut DiagnosticSink) {
        if ctx.is_import(name) {
            sink.push(Diagnostic {
                severity: Severity::Warning,
                message: format!("'{name}' shadows an earlier import"),
                file: ctx.file().to_path_buf(),
                location: Some(location),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_locator::StaticModuleLocator;
    use std::rc::Rc;

    fn root() -> Context {
        Context::new_root("m.py", Rc::new(StaticModuleLocator::new()))
    }

    fn noop_analyse(_e: &Expr, _c: &Context, _ir: &mut FunctionIr, _s: &mut DiagnosticSink) {}

    #[test]
    fn registry_finds_builtin_plugins_by_name() {
        let registry = PluginRegistry::with_builtins();
        assert!(registry.find("getattr").is_some());
        assert!(registry.find("sorted").is_some());
        assert!(registry.find("defaultdict").is_some());
        assert!(registry.find("len").is_none());
    }

    #[test]
    fn getattr_plugin_registers_a_get() {
        let plugin = AttrAccessAnalyser { name: "getattr" };
        let ctx = root();
        let mut ir = FunctionIr::new();
        let mut sink = DiagnosticSink::new();
        let args = vec![
            Expr::Name {
                id: "o".into(),
                pos: crate::ast::Pos { lineno: 1, col_offset: 0, end_lineno: None, end_col_offset: None },
            },
            Expr::Constant {
                value: Some(serde_json::Value::String("f".into())),
                pos: crate::ast::Pos { lineno: 1, col_offset: 0, end_lineno: None, end_col_offset: None },
            },
        ];
        plugin.on_call(
            &args[0],
            &args,
            &[],
            None,
            &ctx,
            &mut ir,
            &mut sink,
            &noop_analyse,
        );
        assert_eq!(
            ir.gets.iter().map(Symbol::name).collect::<std::collections::BTreeSet<_>>(),
            ["o", "o.f"].into_iter().collect(),
        );
    }

    #[test]
    fn setattr_plugin_registers_a_set() {
        let plugin = AttrAccessAnalyser { name: "setattr" };
        let ctx = root();
        let mut ir = FunctionIr::new();
        let mut sink = DiagnosticSink::new();
        let pos = crate::ast::Pos { lineno: 1, col_offset: 0, end_lineno: None, end_col_offset: None };
        let args = vec![
            Expr::Name { id: "o".into(), pos: pos.clone() },
            Expr::Constant { value: Some(serde_json::Value::String("f".into())), pos: pos.clone() },
        ];
        plugin.on_call(&args[0], &args, &[], None, &ctx, &mut ir, &mut sink, &noop_analyse);
        assert_eq!(ir.sets.len(), 1);
        assert_eq!(ir.gets.iter().map(Symbol::name).collect::<Vec<_>>(), vec!["o"]);
    }

    #[test]
    fn import_clobbering_assertor_flags_reassigned_import() {
        let ctx = root();
        ctx.add(Symbol::Import {
            name: "os".into(),
            qualified_name: "os".into(),
            module_name: None,
            location: None,
        });
        let module = Module {
            body: vec![Stmt::Assign {
                targets: vec![Expr::Name {
                    id: "os".into(),
                    pos: crate::ast::Pos { lineno: 2, col_offset: 0, end_lineno: None, end_col_offset: None },
                }],
                value: Expr::Constant {
                    value: None,
                    pos: crate::ast::Pos { lineno: 2, col_offset: 5, end_lineno: None, end_col_offset: None },
                },
                pos: crate::ast::Pos { lineno: 2, col_offset: 0, end_lineno: None, end_col_offset: None },
            }],
        };
        let mut sink = DiagnosticSink::new();
        ImportClobberingAssertor.check(&module, &ctx, &mut sink);
        assert_eq!(sink.diagnostics().len(), 1);
    }
}
