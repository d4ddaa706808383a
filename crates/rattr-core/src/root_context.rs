//! The module root context: one pass over a module's top-level statements
//! that registers names visible file-wide (spec.md §4.4).
//!
//! Grounded on the original's `models/context/_root_context.py`: dispatch by
//! statement kind, recursing into control-flow bodies (`If`/`For`/`While`/
//! `Try`/`With`) since they do not introduce a new Python scope, but never
//! recursing into a `FunctionDef`/`ClassDef` body -- those are analysed
//! later, each against its own child scope, by [`crate::analyser`] and
//! [`crate::class_analyser`].

use std::path::PathBuf;
use std::rc::Rc;

use crate::ast::{Expr, Module, Stmt};
use crate::context::Context;
use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::module_locator::{resolve_relative_module, ModuleLocator};
use crate::names::unravel_names;
use crate::symbol::{CallInterface, Symbol, PYTHON_BUILTINS};

/// Module-level names CPython injects into every module's namespace, so
/// referencing them never looks "undefined".
const MODULE_LEVEL_DUNDER_ATTRS: &[&str] = &[
    "__name__",
    "__file__",
    "__doc__",
    "__package__",
    "__spec__",
    "__loader__",
    "__builtins__",
    "__path__",
    "__all__",
    "__dict__",
];

/// Build the root [`Context`] for one module: a fresh scope seeded with the
/// language's builtins and the dunder attributes, then populated by walking
/// `module.body`.
pub fn build_root_context(
    module: &Module,
    file: impl Into<PathBuf>,
    locator: Rc<dyn ModuleLocator>,
    sink: &mut DiagnosticSink,
) -> Context {
    let ctx = Context::new_root(file, locator);

    for name in PYTHON_BUILTINS {
        ctx.add(Symbol::Builtin {
            name: name.to_string(),
            has_affect: crate::symbol::has_affect(name),
        });
    }
    for name in MODULE_LEVEL_DUNDER_ATTRS {
        ctx.add(Symbol::Builtin {
            name: name.to_string(),
            has_affect: false,
        });
    }

    register_stmts(&module.body, &ctx, sink);
    ctx
}

fn register_stmts(stmts: &[Stmt], ctx: &Context, sink: &mut DiagnosticSink) {
    for stmt in stmts {
        register_stmt(stmt, ctx, sink);
    }
}

fn register_stmt(stmt: &Stmt, ctx: &Context, sink: &mut DiagnosticSink) {
    match stmt {
        Stmt::Import { names, pos } => {
            let location = Some(pos.to_location(ctx.file()));
            if names.len() > 1 {
                info(sink, ctx, "import statement imports more than one module", location.clone());
            }
            for alias in names {
                ctx.add(make_import_symbol(&alias.name, alias.asname.as_deref(), None, location.clone()));
            }
        }

        Stmt::ImportFrom {
            module,
            names,
            level,
            pos,
        } => {
            let absolute_module = if *level > 0 {
                resolve_relative_module(ctx.file(), *level, module.as_deref())
            } else {
                module.clone()
            };
            let location = Some(pos.to_location(ctx.file()));
            for alias in names {
                if alias.name == "*" {
                    if let Some(m) = &absolute_module {
                        ctx.add(Symbol::Import {
                            name: format!("{m}.*"),
                            qualified_name: format!("{m}.*"),
                            module_name: Some(m.clone()),
                            location: location.clone(),
                        });
                    } else {
                        rattr(sink, ctx, "relative wildcard import has no resolvable module", location.clone());
                    }
                    continue;
                }
                let qualified_name = match &absolute_module {
                    Some(m) => format!("{m}.{}", alias.name),
                    None => alias.name.clone(),
                };
                ctx.add(make_import_symbol(
                    &alias.name,
                    alias.asname.as_deref(),
                    Some(qualified_name),
                    location.clone(),
                ));
            }
        }

        Stmt::Assign { targets, value, pos } => {
            let location = Some(pos.to_location(ctx.file()));
            register_any_assign(targets, value, ctx, &location, sink);
        }

        Stmt::AnnAssign { target, value, pos } => {
            let location = Some(pos.to_location(ctx.file()));
            match value {
                Some(v) => register_any_assign(std::slice::from_ref(target), v, ctx, &location, sink),
                None => register_assignment_target(target, ctx, &location, sink),
            }
        }

        Stmt::AugAssign { target, value, pos } => {
            let location = Some(pos.to_location(ctx.file()));
            register_any_assign(std::slice::from_ref(target), value, ctx, &location, sink);
        }

        Stmt::Delete { targets, pos } => {
            let location = Some(pos.to_location(ctx.file()));
            for target in targets {
                if let Ok(names) = unravel_names(target, true) {
                    for name in names {
                        let id = name.trim_start_matches('*');
                        if ctx.is_import(id) {
                            sink.push(Diagnostic {
                                severity: Severity::Warning,
                                message: format!("'{id}' is an imported name, deleting it at module level is unusual"),
                                file: ctx.file().to_path_buf(),
                                location: location.clone(),
                            });
                        }
                        ctx.remove(id);
                    }
                }
            }
        }

        Stmt::FunctionDef {
            name,
            args,
            is_async,
            pos,
            ..
        } => {
            ctx.add(Symbol::Func {
                name: name.clone(),
                interface: CallInterface::from_arguments(args),
                is_async: *is_async,
                location: Some(pos.to_location(ctx.file())),
            });
        }

        Stmt::ClassDef { name, pos, .. } => {
            // Interface is filled in later once `class_analyser` finds (or
            // synthesizes) an initialiser; a bare class is still callable.
            ctx.add(Symbol::Class {
                name: name.clone(),
                interface: None,
                location: Some(pos.to_location(ctx.file())),
            });
        }

        Stmt::If { body, orelse, .. } => {
            register_stmts(body, ctx, sink);
            register_stmts(orelse, ctx, sink);
        }

        Stmt::For {
            target, body, orelse, pos, ..
        } => {
            let location = Some(pos.to_location(ctx.file()));
            register_assignment_target(target, ctx, &location, sink);
            register_stmts(body, ctx, sink);
            register_stmts(orelse, ctx, sink);
        }

        Stmt::While { body, orelse, .. } => {
            register_stmts(body, ctx, sink);
            register_stmts(orelse, ctx, sink);
        }

        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        } => {
            register_stmts(body, ctx, sink);
            for handler in handlers {
                if let Some(name) = &handler.name {
                    ctx.add(Symbol::as_name(name.clone()));
                }
                register_stmts(&handler.body, ctx, sink);
            }
            register_stmts(orelse, ctx, sink);
            register_stmts(finalbody, ctx, sink);
        }

        Stmt::With { items, body, pos, .. } => {
            let location = Some(pos.to_location(ctx.file()));
            for item in items {
                if let Some(target) = &item.optional_vars {
                    register_assignment_target(target, ctx, &location, sink);
                }
            }
            register_stmts(body, ctx, sink);
        }

        Stmt::Return { .. }
        | Stmt::Expr { .. }
        | Stmt::Global { .. }
        | Stmt::Nonlocal { .. }
        | Stmt::Pass { .. } => {}
    }
}

/// Registers a module-level assignment, recognising the same two shapes
/// [`crate::analyser`]'s function-body visitor does: a bare lambda binds a
/// `Func`, a `namedtuple(...)` call binds a `Class` with the declared
/// attributes as its initialiser's parameters. Anything else falls back to
/// registering the assignment's leaf identifiers as plain names.
fn register_any_assign(
    targets: &[Expr],
    value: &Expr,
    ctx: &Context,
    location: &Option<crate::location::Location>,
    sink: &mut DiagnosticSink,
) {
    use crate::analyser::{assignment_is_one_to_one, find_namedtuple_call, get_namedtuple_attrs, lambda_in_rhs};
    use crate::names::fullname;

    if lambda_in_rhs(value) {
        if !assignment_is_one_to_one(targets, value) {
            rattr(sink, ctx, "lambda assignment must be one-to-one", location.clone());
            return;
        }
        let Expr::Lambda { args, .. } = value else {
            rattr(sink, ctx, "unable to find lambda in rhs", location.clone());
            return;
        };
        let Ok(name) = fullname(&targets[0], true) else {
            return;
        };
        ctx.add(Symbol::Func {
            name,
            interface: CallInterface::from_arguments(args),
            is_async: false,
            location: location.clone(),
        });
        return;
    }

    if let Some(call_expr) = find_namedtuple_call(value) {
        if !assignment_is_one_to_one(targets, value) {
            rattr(sink, ctx, "namedtuple assignment must be one-to-one", location.clone());
            return;
        }
        let Ok(name) = fullname(&targets[0], true) else {
            return;
        };
        match get_namedtuple_attrs(call_expr) {
            Ok(attrs) => {
                let mut args = vec!["self".to_string()];
                args.extend(attrs);
                ctx.add(Symbol::Class {
                    name,
                    interface: Some(CallInterface {
                        posonlyargs: vec![],
                        args,
                        vararg: None,
                        kwonlyargs: vec![],
                        kwarg: None,
                    }),
                    location: location.clone(),
                });
            }
            Err(message) => rattr(sink, ctx, message, location.clone()),
        }
        return;
    }

    for target in targets {
        register_assignment_target(target, ctx, location, sink);
    }
}

fn register_assignment_target(
    target: &Expr,
    ctx: &Context,
    location: &Option<crate::location::Location>,
    sink: &mut DiagnosticSink,
) {
    match unravel_names(target, true) {
        Ok(names) => {
            for name in names {
                let symbol = match location {
                    Some(loc) => Symbol::as_name_with_location(name, loc.clone()),
                    None => Symbol::as_name(name),
                };
                ctx.add(symbol);
            }
        }
        Err(err) => rattr(sink, ctx, &err.to_string(), location.clone()),
    }
}

fn make_import_symbol(
    imported_name: &str,
    asname: Option<&str>,
    qualified_module: Option<String>,
    location: Option<crate::location::Location>,
) -> Symbol {
    let binding = asname.unwrap_or(imported_name).to_string();
    let qualified_name = match qualified_module {
        Some(m) => m,
        None => imported_name.to_string(),
    };
    Symbol::Import {
        name: binding,
        qualified_name,
        module_name: None,
        location,
    }
}

fn info(sink: &mut DiagnosticSink, ctx: &Context, message: &str, location: Option<crate::location::Location>) {
    sink.push(Diagnostic {
        severity: Severity::Info,
        message: message.to_string(),
        file: ctx.file().to_path_buf(),
        location,
    });
}

fn rattr(sink: &mut DiagnosticSink, ctx: &Context, message: &str, location: Option<crate::location::Location>) {
    sink.push(Diagnostic {
        severity: Severity::Rattr,
        message: message.to_string(),
        file: ctx.file().to_path_buf(),
        location,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_locator::StaticModuleLocator;

    fn locator() -> Rc<dyn ModuleLocator> {
        Rc::new(StaticModuleLocator::new())
    }

    fn module_from(json: serde_json::Value) -> Module {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn registers_plain_import_binding() {
        let module = module_from(serde_json::json!({
            "body": [
                {"kind": "Import", "names": [{"name": "os"}], "lineno": 1, "col_offset": 0}
            ]
        }));
        let mut sink = DiagnosticSink::new();
        let ctx = build_root_context(&module, "m.py", locator(), &mut sink);
        assert!(matches!(ctx.get("os"), Some(Symbol::Import { .. })));
    }

    #[test]
    fn registers_aliased_import() {
        let module = module_from(serde_json::json!({
            "body": [
                {"kind": "Import", "names": [{"name": "numpy", "asname": "np"}], "lineno": 1, "col_offset": 0}
            ]
        }));
        let mut sink = DiagnosticSink::new();
        let ctx = build_root_context(&module, "m.py", locator(), &mut sink);
        match ctx.get("np") {
            Some(Symbol::Import { qualified_name, .. }) => assert_eq!(qualified_name, "numpy"),
            other => panic!("expected Import, got {other:?}"),
        }
    }

    #[test]
    fn registers_from_import_with_qualified_name() {
        let module = module_from(serde_json::json!({
            "body": [
                {"kind": "ImportFrom", "module": "pkg.sub", "names": [{"name": "thing"}],
                 "level": 0, "lineno": 1, "col_offset": 0}
            ]
        }));
        let mut sink = DiagnosticSink::new();
        let ctx = build_root_context(&module, "m.py", locator(), &mut sink);
        match ctx.get("thing") {
            Some(Symbol::Import { qualified_name, .. }) => assert_eq!(qualified_name, "pkg.sub.thing"),
            other => panic!("expected Import, got {other:?}"),
        }
    }

    #[test]
    fn relative_import_resolves_against_file_path() {
        let module = module_from(serde_json::json!({
            "body": [
                {"kind": "ImportFrom", "module": "sibling", "names": [{"name": "x"}],
                 "level": 1, "lineno": 1, "col_offset": 0}
            ]
        }));
        let mut sink = DiagnosticSink::new();
        let ctx = build_root_context(&module, "pkg/mod.py", locator(), &mut sink);
        match ctx.get("x") {
            Some(Symbol::Import { qualified_name, .. }) => assert_eq!(qualified_name, "pkg.sibling.x"),
            other => panic!("expected Import, got {other:?}"),
        }
    }

    #[test]
    fn registers_function_and_class_defs() {
        let module = module_from(serde_json::json!({
            "body": [
                {"kind": "FunctionDef", "name": "f", "args": {}, "body": [], "lineno": 1, "col_offset": 0},
                {"kind": "ClassDef", "name": "C", "body": [], "lineno": 2, "col_offset": 0}
            ]
        }));
        let mut sink = DiagnosticSink::new();
        let ctx = build_root_context(&module, "m.py", locator(), &mut sink);
        assert!(matches!(ctx.get("f"), Some(Symbol::Func { .. })));
        assert!(matches!(ctx.get("C"), Some(Symbol::Class { .. })));
    }

    #[test]
    fn recurses_into_if_but_not_into_nested_def() {
        let module = module_from(serde_json::json!({
            "body": [
                {"kind": "If", "test": {"kind": "Name", "id": "cond", "lineno": 1, "col_offset": 0},
                 "body": [
                     {"kind": "Assign", "targets": [{"kind": "Name", "id": "x", "lineno": 2, "col_offset": 0}],
                      "value": {"kind": "Constant", "lineno": 2, "col_offset": 4}, "lineno": 2, "col_offset": 0},
                     {"kind": "FunctionDef", "name": "inner", "args": {}, "body": [
                         {"kind": "Assign", "targets": [{"kind": "Name", "id": "hidden", "lineno": 4, "col_offset": 4}],
                          "value": {"kind": "Constant", "lineno": 4, "col_offset": 12}, "lineno": 4, "col_offset": 4}
                     ], "lineno": 3, "col_offset": 4}
                 ],
                 "orelse": [], "lineno": 1, "col_offset": 0}
            ]
        }));
        let mut sink = DiagnosticSink::new();
        let ctx = build_root_context(&module, "m.py", locator(), &mut sink);
        assert!(ctx.contains("x"));
        assert!(ctx.contains("inner"));
        assert!(!ctx.contains("hidden"));
    }

    #[test]
    fn builtins_and_dunders_are_preregistered() {
        let module = module_from(serde_json::json!({"body": []}));
        let mut sink = DiagnosticSink::new();
        let ctx = build_root_context(&module, "m.py", locator(), &mut sink);
        assert!(matches!(ctx.get("len"), Some(Symbol::Builtin { .. })));
        assert!(matches!(ctx.get("__name__"), Some(Symbol::Builtin { .. })));
    }

    #[test]
    fn delete_removes_from_module_scope() {
        let module = module_from(serde_json::json!({
            "body": [
                {"kind": "Assign", "targets": [{"kind": "Name", "id": "x", "lineno": 1, "col_offset": 0}],
                 "value": {"kind": "Constant", "lineno": 1, "col_offset": 4}, "lineno": 1, "col_offset": 0},
                {"kind": "Delete", "targets": [{"kind": "Name", "id": "x", "lineno": 2, "col_offset": 4}],
                 "lineno": 2, "col_offset": 0}
            ]
        }));
        let mut sink = DiagnosticSink::new();
        let ctx = build_root_context(&module, "m.py", locator(), &mut sink);
        assert!(!ctx.declares("x"));
    }

    #[test]
    fn importing_multiple_modules_on_one_line_is_flagged() {
        let module = module_from(serde_json::json!({
            "body": [
                {"kind": "Import", "names": [{"name": "os"}, {"name": "sys"}], "lineno": 1, "col_offset": 0}
            ]
        }));
        let mut sink = DiagnosticSink::new();
        build_root_context(&module, "m.py", locator(), &mut sink);
        assert_eq!(sink.diagnostics().len(), 1);
        assert_eq!(sink.diagnostics()[0].severity, Severity::Info);
    }

    #[test]
    fn deleting_an_imported_name_at_module_level_warns() {
        let module = module_from(serde_json::json!({
            "body": [
                {"kind": "Import", "names": [{"name": "os"}], "lineno": 1, "col_offset": 0},
                {"kind": "Delete", "targets": [{"kind": "Name", "id": "os", "lineno": 2, "col_offset": 4}],
                 "lineno": 2, "col_offset": 0}
            ]
        }));
        let mut sink = DiagnosticSink::new();
        let ctx = build_root_context(&module, "m.py", locator(), &mut sink);
        assert!(!ctx.declares("os"));
        assert!(sink.diagnostics().iter().any(|d| d.severity == Severity::Warning));
    }

    #[test]
    fn module_level_lambda_assignment_registers_func() {
        let module = module_from(serde_json::json!({
            "body": [
                {"kind": "Assign",
                 "targets": [{"kind": "Name", "id": "f", "lineno": 1, "col_offset": 0}],
                 "value": {"kind": "Lambda",
                           "args": {"args": [{"arg": "x"}]},
                           "body": {"kind": "Name", "id": "x", "lineno": 1, "col_offset": 12},
                           "lineno": 1, "col_offset": 4},
                 "lineno": 1, "col_offset": 0}
            ]
        }));
        let mut sink = DiagnosticSink::new();
        let ctx = build_root_context(&module, "m.py", locator(), &mut sink);
        match ctx.get("f") {
            Some(Symbol::Func { interface, .. }) => assert_eq!(interface.args, vec!["x"]),
            other => panic!("expected Func, got {other:?}"),
        }
    }

    #[test]
    fn module_level_namedtuple_assignment_registers_class() {
        let module = module_from(serde_json::json!({
            "body": [
                {"kind": "Assign",
                 "targets": [{"kind": "Name", "id": "Point", "lineno": 1, "col_offset": 0}],
                 "value": {"kind": "Call",
                           "func": {"kind": "Name", "id": "namedtuple", "lineno": 1, "col_offset": 8},
                           "args": [
                               {"kind": "Constant", "value": "Point", "lineno": 1, "col_offset": 19},
                               {"kind": "List",
                                "elts": [
                                    {"kind": "Constant", "value": "x", "lineno": 1, "col_offset": 28},
                                    {"kind": "Constant", "value": "y", "lineno": 1, "col_offset": 33}
                                ],
                                "lineno": 1, "col_offset": 27}
                           ],
                           "keywords": [],
                           "lineno": 1, "col_offset": 8},
                 "lineno": 1, "col_offset": 0}
            ]
        }));
        let mut sink = DiagnosticSink::new();
        let ctx = build_root_context(&module, "m.py", locator(), &mut sink);
        match ctx.get("Point") {
            Some(Symbol::Class { interface: Some(iface), .. }) => {
                assert_eq!(iface.args, vec!["self", "x", "y"]);
            }
            other => panic!("expected namedtuple Class, got {other:?}"),
        }
    }
}
