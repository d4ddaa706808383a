//! Per-function IR analyser: the visitor that walks one function body and
//! records its gets/sets/dels/calls (spec.md §4.5).
//!
//! Grounded on `analyser/function.py`'s `FunctionAnalyser`: dispatch over a
//! node-kind tag instead of Python's open `NodeVisitor` method dispatch,
//! and the "nameable base" check (`not isinstance(node.value, AstNodeWithName)`
//! in `visit_compound_name`) reconstructed as [`is_nameable`]. Diagnostics
//! that would unwind the call stack in the original (`error.fatal`) instead
//! push a `Fatal` diagnostic and let every recursive entry point check
//! `sink.has_fatal()` before doing further work, matching the crate's
//! error-as-data convention (`diagnostics.rs`).

use crate::ast::{Arguments, Comprehension, Expr, Keyword, Stmt};
use crate::context::Context;
use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::ir::FunctionIr;
use crate::location::Location;
use crate::names::{self, LITERAL_VALUE_PREFIX};
use crate::plugins::PluginRegistry;
use crate::symbol::{CallArguments, CallInterface, CallTarget, Symbol, PYTHON_ATTR_ACCESS_BUILTINS};

/// Whether an expression is being read, written, or removed -- stands in
/// for Python's `ast.Load`/`ast.Store`/`ast.Del`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprCtx {
    Load,
    Store,
    Del,
}

/// Analyse one function body against a fresh child scope of `parent_ctx`.
pub fn analyse_function(
    args: &Arguments,
    body: &[Stmt],
    parent_ctx: &Context,
    plugins: &PluginRegistry,
    sink: &mut DiagnosticSink,
) -> FunctionIr {
    let ctx = parent_ctx.child();
    bind_arguments(&ctx, args);
    let mut ir = FunctionIr::new();
    visit_body(body, &ctx, &mut ir, plugins, sink);
    ir
}

fn bind_arguments(ctx: &Context, args: &Arguments) {
    for a in args.posonlyargs.iter().chain(&args.args) {
        ctx.add_argument(Symbol::as_name(a.arg.clone()));
    }
    if let Some(v) = &args.vararg {
        ctx.add_argument(Symbol::as_name(v.arg.clone()));
    }
    for a in &args.kwonlyargs {
        ctx.add_argument(Symbol::as_name(a.arg.clone()));
    }
    if let Some(k) = &args.kwarg {
        ctx.add_argument(Symbol::as_name(k.arg.clone()));
    }
}

fn push(
    sink: &mut DiagnosticSink,
    ctx: &Context,
    severity: Severity,
    message: impl Into<String>,
    location: Option<Location>,
) -> bool {
    sink.push(Diagnostic {
        severity,
        message: message.into(),
        file: ctx.file().to_path_buf(),
        location,
    })
}

fn name_symbol(name: String, location: &Option<Location>) -> Symbol {
    match location {
        Some(loc) => Symbol::as_name_with_location(name, loc.clone()),
        None => Symbol::as_name(name),
    }
}

fn is_nameable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Name { .. }
            | Expr::Attribute { .. }
            | Expr::Subscript { .. }
            | Expr::Call { .. }
            | Expr::Starred { .. }
    )
}

fn visit_body(stmts: &[Stmt], ctx: &Context, ir: &mut FunctionIr, plugins: &PluginRegistry, sink: &mut DiagnosticSink) {
    for stmt in stmts {
        if sink.has_fatal() {
            return;
        }
        visit_stmt(stmt, ctx, ir, plugins, sink);
    }
}

fn visit_stmt(stmt: &Stmt, ctx: &Context, ir: &mut FunctionIr, plugins: &PluginRegistry, sink: &mut DiagnosticSink) {
    match stmt {
        Stmt::Assign { targets, value, pos } => {
            let location = Some(pos.to_location(ctx.file()));
            visit_any_assign(targets, value, location, ctx, ir, plugins, sink);
        }

        Stmt::AnnAssign { target, value, pos } => {
            let location = Some(pos.to_location(ctx.file()));
            match value {
                Some(v) => {
                    visit_any_assign(std::slice::from_ref(target), v, location, ctx, ir, plugins, sink)
                }
                None => {
                    register_identifiers(target, ctx, &location);
                    visit_expr(target, ExprCtx::Store, ctx, ir, plugins, sink);
                }
            }
        }

        Stmt::AugAssign { target, value, pos } => {
            let location = Some(pos.to_location(ctx.file()));
            visit_any_assign(std::slice::from_ref(target), value, location, ctx, ir, plugins, sink);
        }

        Stmt::Delete { targets, .. } => visit_delete(targets, ctx, ir, plugins, sink),

        Stmt::FunctionDef {
            name,
            args,
            body,
            is_async,
            pos,
            ..
        } => visit_nested_function_def(
            name,
            args,
            body,
            *is_async,
            Some(pos.to_location(ctx.file())),
            ctx,
            ir,
            plugins,
            sink,
        ),

        Stmt::ClassDef { pos, .. } => {
            push(sink, ctx, Severity::Error, "nested classes unsupported", Some(pos.to_location(ctx.file())));
        }

        Stmt::Return { value, .. } => visit_return(value, ctx, ir, plugins, sink),

        Stmt::If { test, body, orelse, .. } => {
            visit_expr(test, ExprCtx::Load, ctx, ir, plugins, sink);
            if sink.has_fatal() {
                return;
            }
            visit_body(body, ctx, ir, plugins, sink);
            visit_body(orelse, ctx, ir, plugins, sink);
        }

        Stmt::For {
            target, iter, body, orelse, pos, ..
        } => {
            let location = Some(pos.to_location(ctx.file()));
            register_identifiers(target, ctx, &location);
            visit_expr(target, ExprCtx::Store, ctx, ir, plugins, sink);
            if sink.has_fatal() {
                return;
            }
            visit_expr(iter, ExprCtx::Load, ctx, ir, plugins, sink);
            if sink.has_fatal() {
                return;
            }
            visit_body(body, ctx, ir, plugins, sink);
            visit_body(orelse, ctx, ir, plugins, sink);
        }

        Stmt::While { test, body, orelse, .. } => {
            visit_expr(test, ExprCtx::Load, ctx, ir, plugins, sink);
            if sink.has_fatal() {
                return;
            }
            visit_body(body, ctx, ir, plugins, sink);
            visit_body(orelse, ctx, ir, plugins, sink);
        }

        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        } => {
            visit_body(body, ctx, ir, plugins, sink);
            for handler in handlers {
                if let Some(name) = &handler.name {
                    ctx.add(Symbol::as_name(name.clone()));
                }
                visit_body(&handler.body, ctx, ir, plugins, sink);
            }
            visit_body(orelse, ctx, ir, plugins, sink);
            visit_body(finalbody, ctx, ir, plugins, sink);
        }

        Stmt::With { items, body, pos, .. } => {
            let location = Some(pos.to_location(ctx.file()));
            for item in items {
                if let Some(v) = &item.optional_vars {
                    register_identifiers(v, ctx, &location);
                }
            }
            for item in items {
                visit_expr(&item.context_expr, ExprCtx::Load, ctx, ir, plugins, sink);
                if sink.has_fatal() {
                    return;
                }
                if let Some(v) = &item.optional_vars {
                    visit_expr(v, ExprCtx::Store, ctx, ir, plugins, sink);
                    if sink.has_fatal() {
                        return;
                    }
                }
            }
            visit_body(body, ctx, ir, plugins, sink);
        }

        Stmt::Expr { value, .. } => visit_expr(value, ExprCtx::Load, ctx, ir, plugins, sink),

        Stmt::Global { pos, .. } => {
            push(sink, ctx, Severity::Fatal, "do not use global keyword", Some(pos.to_location(ctx.file())));
        }
        Stmt::Nonlocal { pos, .. } => {
            push(sink, ctx, Severity::Fatal, "do not use nonlocal keyword", Some(pos.to_location(ctx.file())));
        }
        Stmt::Import { pos, .. } | Stmt::ImportFrom { pos, .. } => {
            push(sink, ctx, Severity::Fatal, "imports must be at the top level", Some(pos.to_location(ctx.file())));
        }

        Stmt::Pass { .. } => {}
    }
}

// ------------------------------------------------------------------- //
// Name resolution and result recording
// ------------------------------------------------------------------- //

fn get_and_verify_name(
    expr: &Expr,
    ectx: ExprCtx,
    ctx: &Context,
    sink: &mut DiagnosticSink,
) -> (String, String) {
    let (base, full) = names::basename_fullname_pair(expr, true).expect("safe mode never errors");
    let is_literal = base.starts_with(LITERAL_VALUE_PREFIX);
    if !ctx.contains(&base) && ectx != ExprCtx::Store && !is_literal {
        push(
            sink,
            ctx,
            Severity::Warning,
            format!("'{base}' potentially undefined"),
            Some(expr.pos().to_location(ctx.file())),
        );
    }
    (base, full)
}

fn update_results(ir: &mut FunctionIr, symbol: Symbol, ectx: ExprCtx) {
    match ectx {
        ExprCtx::Store => {
            ir.sets.insert(symbol);
        }
        ExprCtx::Load => {
            ir.gets.insert(symbol);
        }
        ExprCtx::Del => {
            ir.dels.insert(symbol);
        }
    }
}

fn register_identifiers(target: &Expr, ctx: &Context, location: &Option<Location>) {
    if let Ok(names) = names::unravel_names(target, true) {
        for name in names {
            ctx.add(name_symbol(name, location));
        }
    }
}

// ------------------------------------------------------------------- //
// Expressions
// ------------------------------------------------------------------- //

fn visit_expr(expr: &Expr, ectx: ExprCtx, ctx: &Context, ir: &mut FunctionIr, plugins: &PluginRegistry, sink: &mut DiagnosticSink) {
    if sink.has_fatal() {
        return;
    }
    match expr {
        Expr::Name { .. } => {
            let (_, fullname) = get_and_verify_name(expr, ectx, ctx, sink);
            let symbol = name_symbol(fullname, &Some(expr.pos().to_location(ctx.file())));
            update_results(ir, symbol, ectx);
        }

        Expr::Attribute { value, .. } | Expr::Subscript { value, .. } | Expr::Starred { value, .. } => {
            let (_, fullname) = get_and_verify_name(expr, ectx, ctx, sink);
            if !is_nameable(value) {
                visit_expr(value, ExprCtx::Load, ctx, ir, plugins, sink);
            }
            let symbol = name_symbol(fullname, &Some(expr.pos().to_location(ctx.file())));
            update_results(ir, symbol, ectx);
        }

        Expr::Call { .. } => visit_call(expr, ctx, ir, plugins, sink),

        Expr::Lambda { args, body, .. } => visit_nested_lambda(args, body, ctx, ir, plugins, sink),

        Expr::Tuple { elts, .. } | Expr::List { elts, .. } => {
            for elt in elts {
                visit_expr(elt, ectx, ctx, ir, plugins, sink);
                if sink.has_fatal() {
                    return;
                }
            }
        }

        Expr::NamedExpr { target, value, pos } => {
            visit_named_expr(target, value, Some(pos.to_location(ctx.file())), ctx, ir, plugins, sink)
        }

        Expr::ListComp { elt, generators, .. } | Expr::GeneratorExp { elt, generators, .. } => {
            visit_comprehension(generators, &[elt.as_ref()], ctx, ir, plugins, sink)
        }
        Expr::SetComp { elt, generators, .. } => {
            visit_comprehension(generators, &[elt.as_ref()], ctx, ir, plugins, sink)
        }
        Expr::DictComp {
            key, value, generators, ..
        } => visit_comprehension(generators, &[key.as_ref(), value.as_ref()], ctx, ir, plugins, sink),

        // These node kinds carry no child-expression fields in this crate's
        // syntax model (see `ast.rs`); there is nothing further to recurse
        // into.
        Expr::Constant { .. }
        | Expr::BinOp { .. }
        | Expr::UnaryOp { .. }
        | Expr::BoolOp { .. }
        | Expr::Compare { .. }
        | Expr::Dict { .. }
        | Expr::Set { .. }
        | Expr::IfExp { .. } => {}
    }
}

fn visit_comprehension(
    generators: &[Comprehension],
    yielded: &[&Expr],
    ctx: &Context,
    ir: &mut FunctionIr,
    plugins: &PluginRegistry,
    sink: &mut DiagnosticSink,
) {
    let child = ctx.child();
    for gen in generators {
        register_identifiers(&gen.target, &child, &None);
        visit_expr(&gen.target, ExprCtx::Store, &child, ir, plugins, sink);
        if sink.has_fatal() {
            return;
        }
        visit_expr(&gen.iter, ExprCtx::Load, &child, ir, plugins, sink);
        if sink.has_fatal() {
            return;
        }
        for if_expr in &gen.ifs {
            visit_expr(if_expr, ExprCtx::Load, &child, ir, plugins, sink);
            if sink.has_fatal() {
                return;
            }
        }
    }
    for expr in yielded {
        visit_expr(expr, ExprCtx::Load, &child, ir, plugins, sink);
        if sink.has_fatal() {
            return;
        }
    }
}

fn build_call_arguments(
    args: &[Expr],
    keywords: &[Keyword],
    ctx: &Context,
    location: Option<Location>,
    sink: &mut DiagnosticSink,
) -> CallArguments {
    let mut call_args = CallArguments::default();
    for a in args {
        if let Ok(name) = names::fullname(a, true) {
            call_args.args.push(name);
        }
    }
    for kw in keywords {
        match &kw.arg {
            Some(arg_name) => {
                if let Ok(name) = names::fullname(&kw.value, true) {
                    call_args.kwargs.insert(arg_name.clone(), name);
                }
            }
            None => {
                push(sink, ctx, Severity::Fatal, "dictionary unpacking in a call", location.clone());
            }
        }
    }
    call_args
}

fn visit_call(expr: &Expr, ctx: &Context, ir: &mut FunctionIr, plugins: &PluginRegistry, sink: &mut DiagnosticSink) {
    let Expr::Call { func, args, keywords, pos } = expr else {
        unreachable!("visit_call only dispatched for Expr::Call")
    };
    let location = Some(pos.to_location(ctx.file()));

    let fullname = names::fullname(expr, true).expect("safe mode never errors");
    let target = ctx.get_call_target(&fullname, location.clone(), sink);

    if let Some(plugin) = target.as_ref().and_then(|t| plugins.find(t.name())) {
        // The call itself is still recorded as an ordinary call site (spec.md
        // §4.5 item 1 "merge that analyser's per-call IR ... and stop"); the
        // plugin only takes over which *arguments* get visited for effects,
        // since e.g. `setattr(o, "f", 1)`'s literal arguments should not be
        // walked the way an ordinary call's arguments are.
        let call_args = build_call_arguments(args, keywords, ctx, location.clone(), sink);
        ir.calls.insert(Symbol::Call {
            name: fullname,
            args: call_args,
            target: Some(Box::new(target.expect("plugin found via a resolved target"))),
        });

        let analyse = |e: &Expr, c: &Context, i: &mut FunctionIr, s: &mut DiagnosticSink| {
            visit_expr(e, ExprCtx::Load, c, i, plugins, s);
        };
        plugin.on_call(func, args, keywords, location, ctx, ir, sink, &analyse);
        return;
    }

    let self_name = if let Some(CallTarget::Class { name, .. }) = &target {
        push(sink, ctx, Severity::Warning, format!("'{name}' initialised but not stored"), location.clone());
        Some(format!("{LITERAL_VALUE_PREFIX}{name}"))
    } else {
        None
    };

    // On a chained call `a.b.c.m()`, record the intermediate attribute
    // accesses `a.b`, `a.b.c` as gets under basename `a`.
    let without_parens = fullname.strip_suffix("()").unwrap_or(&fullname);
    let segments: Vec<&str> = without_parens.split('.').collect();
    if segments.len() >= 3 {
        let parts = &segments[..segments.len() - 1];
        let mut acc = parts[0].to_string();
        for part in &parts[1..] {
            acc.push('.');
            acc.push_str(part);
            ir.gets.insert(name_symbol(acc.clone(), &location));
        }
    }

    let mut call_args = build_call_arguments(args, keywords, ctx, location.clone(), sink);
    if let Some(self_name) = self_name {
        call_args = call_args.with_implicit_self(self_name);
    }
    ir.calls.insert(Symbol::Call {
        name: fullname,
        args: call_args,
        target: target.map(Box::new),
    });

    for a in args {
        visit_expr(a, ExprCtx::Load, ctx, ir, plugins, sink);
        if sink.has_fatal() {
            return;
        }
    }
    for kw in keywords {
        visit_expr(&kw.value, ExprCtx::Load, ctx, ir, plugins, sink);
        if sink.has_fatal() {
            return;
        }
    }
}

fn visit_nested_lambda(
    args: &Arguments,
    body: &Expr,
    ctx: &Context,
    ir: &mut FunctionIr,
    plugins: &PluginRegistry,
    sink: &mut DiagnosticSink,
) {
    push(
        sink,
        ctx,
        Severity::Error,
        "unable to unbind anonymous lambdas",
        Some(body.pos().to_location(ctx.file())),
    );
    let child = ctx.child();
    bind_arguments(&child, args);
    visit_expr(body, ExprCtx::Load, &child, ir, plugins, sink);
}

fn visit_nested_function_def(
    name: &str,
    args: &Arguments,
    body: &[Stmt],
    is_async: bool,
    location: Option<Location>,
    ctx: &Context,
    ir: &mut FunctionIr,
    plugins: &PluginRegistry,
    sink: &mut DiagnosticSink,
) {
    push(sink, ctx, Severity::Error, "unable to unbind nested functions", location.clone());
    ctx.add(Symbol::Func {
        name: name.to_string(),
        interface: CallInterface::from_arguments(args),
        is_async,
        location: location.clone(),
    });
    let child = ctx.child();
    bind_arguments(&child, args);
    visit_body(body, &child, ir, plugins, sink);
}

fn visit_return(value: &Option<Expr>, ctx: &Context, ir: &mut FunctionIr, plugins: &PluginRegistry, sink: &mut DiagnosticSink) {
    let Some(expr) = value else { return };
    if !visit_return_value(expr, ctx, ir, plugins, sink) {
        visit_expr(expr, ExprCtx::Load, ctx, ir, plugins, sink);
    }
}

/// Returns `true` if `expr` was fully handled (a literal container or a
/// class-initialising call), `false` if the caller should fall back to an
/// ordinary `Load` visit.
fn visit_return_value(expr: &Expr, ctx: &Context, ir: &mut FunctionIr, plugins: &PluginRegistry, sink: &mut DiagnosticSink) -> bool {
    match expr {
        Expr::Tuple { elts, .. } | Expr::List { elts, .. } => {
            for elt in elts {
                if !visit_return_value(elt, ctx, ir, plugins, sink) {
                    visit_expr(elt, ExprCtx::Load, ctx, ir, plugins, sink);
                }
                if sink.has_fatal() {
                    return true;
                }
            }
            true
        }

        Expr::Call { func, args, keywords, pos } => {
            if is_attr_access_builtin_call(func) {
                return false;
            }
            let fullname = names::fullname(expr, true).expect("safe mode never errors");
            let mut scratch = DiagnosticSink::new();
            let probe = ctx.get_call_target(&fullname, None, &mut scratch);
            if !matches!(probe, Some(CallTarget::Class { .. })) {
                return false;
            }

            let location = Some(pos.to_location(ctx.file()));
            let target = ctx.get_call_target(&fullname, location.clone(), sink);
            let mut call_args = build_call_arguments(args, keywords, ctx, location.clone(), sink);
            call_args = call_args.with_implicit_self(format!("{LITERAL_VALUE_PREFIX}ReturnValue"));
            ir.calls.insert(Symbol::Call {
                name: fullname,
                args: call_args,
                target: target.map(Box::new),
            });

            for a in args {
                visit_expr(a, ExprCtx::Load, ctx, ir, plugins, sink);
                if sink.has_fatal() {
                    return true;
                }
            }
            for kw in keywords {
                visit_expr(&kw.value, ExprCtx::Load, ctx, ir, plugins, sink);
                if sink.has_fatal() {
                    return true;
                }
            }
            true
        }

        _ => false,
    }
}

fn is_attr_access_builtin_call(func: &Expr) -> bool {
    matches!(func, Expr::Name { id, .. } if PYTHON_ATTR_ACCESS_BUILTINS.contains(&id.as_str()))
}

fn visit_named_expr(
    target: &Expr,
    value: &Expr,
    location: Option<Location>,
    ctx: &Context,
    ir: &mut FunctionIr,
    plugins: &PluginRegistry,
    sink: &mut DiagnosticSink,
) {
    if let Ok(name) = names::fullname(target, true) {
        ir.sets.insert(name_symbol(name, &location));
    }
    if lambda_in_rhs(value) {
        visit_expr(value, ExprCtx::Load, ctx, ir, plugins, sink);
        if sink.has_fatal() {
            return;
        }
    }
    visit_any_assign(std::slice::from_ref(target), value, location, ctx, ir, plugins, sink);
}

fn visit_delete(targets: &[Expr], ctx: &Context, ir: &mut FunctionIr, plugins: &PluginRegistry, sink: &mut DiagnosticSink) {
    for target in targets {
        if let Ok(names) = names::unravel_names(target, true) {
            for name in names {
                ctx.remove(name.trim_start_matches('*'));
            }
        }
    }
    for target in targets {
        visit_expr(target, ExprCtx::Del, ctx, ir, plugins, sink);
        if sink.has_fatal() {
            return;
        }
    }
}

// ------------------------------------------------------------------- //
// Assignment dispatch (spec.md §4.5's four cases)
// ------------------------------------------------------------------- //

pub(crate) fn lambda_in_rhs(value: &Expr) -> bool {
    match value {
        Expr::Lambda { .. } => true,
        Expr::Tuple { elts, .. } | Expr::List { elts, .. } => elts.iter().any(lambda_in_rhs),
        _ => false,
    }
}

pub(crate) fn find_namedtuple_call(value: &Expr) -> Option<&Expr> {
    match value {
        Expr::Call { func, .. } => {
            let name = names::fullname(func, true).ok()?;
            if name == "namedtuple" || name.ends_with(".namedtuple") {
                Some(value)
            } else {
                None
            }
        }
        Expr::Tuple { elts, .. } | Expr::List { elts, .. } => elts.iter().find_map(find_namedtuple_call),
        _ => None,
    }
}

fn class_call_in_rhs(value: &Expr, ctx: &Context) -> bool {
    match value {
        Expr::Call { .. } => {
            let Ok(name) = names::fullname(value, true) else {
                return false;
            };
            let mut scratch = DiagnosticSink::new();
            matches!(ctx.get_call_target(&name, None, &mut scratch), Some(CallTarget::Class { .. }))
        }
        Expr::Tuple { elts, .. } | Expr::List { elts, .. } => elts.iter().any(|e| class_call_in_rhs(e, ctx)),
        _ => false,
    }
}

pub(crate) fn assignment_is_one_to_one(targets: &[Expr], value: &Expr) -> bool {
    if targets.len() > 1 {
        return false;
    }
    if targets.iter().any(|t| matches!(t, Expr::Tuple { .. } | Expr::List { .. })) {
        return false;
    }
    !matches!(value, Expr::Tuple { .. } | Expr::List { .. })
}

fn visit_any_assign(
    targets: &[Expr],
    value: &Expr,
    location: Option<Location>,
    ctx: &Context,
    ir: &mut FunctionIr,
    plugins: &PluginRegistry,
    sink: &mut DiagnosticSink,
) {
    if lambda_in_rhs(value) {
        visit_lambda_assign(targets, value, location, ctx, sink);
        return;
    }
    if let Some(call_expr) = find_namedtuple_call(value) {
        visit_namedtuple_assign(targets, value, call_expr, location, ctx, sink);
        return;
    }
    if class_call_in_rhs(value, ctx) {
        visit_class_assign(targets, value, location, ctx, ir, plugins, sink);
        return;
    }
    for target in targets {
        register_identifiers(target, ctx, &location);
        visit_expr(target, ExprCtx::Store, ctx, ir, plugins, sink);
        if sink.has_fatal() {
            return;
        }
    }
    visit_expr(value, ExprCtx::Load, ctx, ir, plugins, sink);
}

fn visit_lambda_assign(targets: &[Expr], value: &Expr, location: Option<Location>, ctx: &Context, sink: &mut DiagnosticSink) {
    if !assignment_is_one_to_one(targets, value) {
        push(sink, ctx, Severity::Fatal, "lambda assignment must be one-to-one", location);
        return;
    }
    push(sink, ctx, Severity::Error, "unable to unbind lambdas defined in functions", location.clone());
    let Expr::Lambda { args, .. } = value else {
        push(sink, ctx, Severity::Fatal, "unable to find lambda in rhs", location);
        return;
    };
    let Ok(name) = names::fullname(&targets[0], true) else {
        return;
    };
    ctx.add(Symbol::Func {
        name,
        interface: CallInterface::from_arguments(args),
        is_async: false,
        location,
    });
}

pub(crate) fn get_namedtuple_attrs(call_expr: &Expr) -> Result<Vec<String>, &'static str> {
    const BAD_SIGNATURE: &str = "namedtuple expects exactly two positional arguments (i.e. name, attrs)";
    const BAD_ATTRS: &str = "namedtuple expects the second positional argument to be a list of valid identifiers as either a list of string-literals or a space-delimited string-literal";

    let Expr::Call { args, .. } = call_expr else {
        return Err(BAD_SIGNATURE);
    };
    if args.len() != 2 {
        return Err(BAD_SIGNATURE);
    }
    match &args[1] {
        Expr::List { elts, .. } => {
            let mut attrs = Vec::with_capacity(elts.len());
            for elt in elts {
                match elt {
                    Expr::Constant {
                        value: Some(serde_json::Value::String(s)),
                        ..
                    } => attrs.push(s.clone()),
                    _ => return Err(BAD_ATTRS),
                }
            }
            Ok(attrs)
        }
        Expr::Constant {
            value: Some(serde_json::Value::String(s)),
            ..
        } => Ok(s.split(' ').filter(|s| !s.is_empty()).map(|s| s.to_string()).collect()),
        _ => Err(BAD_ATTRS),
    }
}

fn visit_namedtuple_assign(
    targets: &[Expr],
    value: &Expr,
    call_expr: &Expr,
    location: Option<Location>,
    ctx: &Context,
    sink: &mut DiagnosticSink,
) {
    if !assignment_is_one_to_one(targets, value) {
        push(sink, ctx, Severity::Fatal, "namedtuple assignment must be one-to-one", location);
        return;
    }
    let Ok(name) = names::fullname(&targets[0], true) else {
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
                location,
            });
        }
        Err(message) => {
            push(sink, ctx, Severity::Error, message, location);
        }
    }
}

fn visit_class_assign(
    targets: &[Expr],
    value: &Expr,
    location: Option<Location>,
    ctx: &Context,
    ir: &mut FunctionIr,
    plugins: &PluginRegistry,
    sink: &mut DiagnosticSink,
) {
    if !assignment_is_one_to_one(targets, value) {
        push(sink, ctx, Severity::Fatal, "class assignment must be one-to-one", location);
        return;
    }
    let Expr::Call { args, keywords, .. } = value else {
        push(sink, ctx, Severity::Fatal, "class assignment call is missing", location);
        return;
    };
    let Ok(lhs_name) = names::fullname(&targets[0], true) else {
        return;
    };
    let Ok(class_name) = names::fullname(value, true) else {
        return;
    };
    let init_target = ctx.get_call_target(&class_name, location.clone(), sink);

    let mut call_args = build_call_arguments(args, keywords, ctx, location.clone(), sink);
    call_args = call_args.with_implicit_self(lhs_name.clone());
    ir.calls.insert(Symbol::Call {
        name: class_name,
        args: call_args,
        target: init_target.map(Box::new),
    });
    ir.sets.insert(name_symbol(lhs_name, &location));

    for target in targets {
        register_identifiers(target, ctx, &location);
    }

    for a in args {
        visit_expr(a, ExprCtx::Load, ctx, ir, plugins, sink);
        if sink.has_fatal() {
            return;
        }
    }
    for kw in keywords {
        visit_expr(&kw.value, ExprCtx::Load, ctx, ir, plugins, sink);
        if sink.has_fatal() {
            return;
        }
    }
}
