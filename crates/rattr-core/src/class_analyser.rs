//! The class analyser: class-body attribute registration, initialiser
//! analysis, and the enum/namedtuple default-initialiser heuristics
//! (spec.md §4.6).
//!
//! Grounded on the original's `analyser/cls.py`: non-method statements are
//! visited as ordinary assignments but qualified `{ClassName}.{name}` and
//! registered into the *parent* context rather than a fresh child scope --
//! `cls.py`'s own comment is explicit that static methods and initialisers
//! need to land in the parent context "just with transformed names". The
//! decorator handling below (`has_annotation`/`parse_rattr_results`) mirrors
//! `analyser/util.py`, adapted to this crate's AST: `Expr::Set`/`Expr::Dict`
//! carry no element data here, so a `@rattr_results(...)` literal must use
//! list/tuple syntax for its `gets`/`sets`/`dels`/`calls` arguments rather
//! than set/dict syntax, and a call tuple's second element is a plain list
//! of argument identifiers rather than a `(args, kwargs)` pair -- see
//! `DESIGN.md`.

use crate::analyser::{self, analyse_function};
use crate::ast::{Arguments, Expr, Keyword, Stmt};
use crate::context::Context;
use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::ir::FunctionIr;
use crate::location::Location;
use crate::names;
use crate::plugins::PluginRegistry;
use crate::symbol::{CallArguments, CallInterface, Symbol};

/// The symbol an `@annotation`/`@annotation(...)` decorator refers to: its
/// bare name, or the attribute name of `module.annotation`/`obj.annotation`.
fn decorator_suffix(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Name { id, .. } => Some(id),
        Expr::Attribute { attr, .. } => Some(attr),
        Expr::Call { func, .. } => decorator_suffix(func),
        _ => None,
    }
}

fn has_annotation(name: &str, decorator_list: &[Expr]) -> bool {
    decorator_list
        .iter()
        .any(|d| decorator_suffix(d) == Some(name))
}

fn find_annotation<'a>(name: &str, decorator_list: &'a [Expr]) -> Option<&'a Expr> {
    decorator_list
        .iter()
        .find(|d| decorator_suffix(d) == Some(name))
}

/// Fatal if `name` (`"rattr_ignore"` or `"rattr_results"`) annotates the same
/// declaration more than once -- spec.md §7's "Duplicate @rattr_results /
/// @rattr_ignore on the same declaration", grounded on the original's
/// `get_annotation` (`analyser/util.py`), which raises the equivalent of a
/// fatal error as soon as it finds a second matching decorator.
fn check_duplicate_annotation(
    name: &str,
    class_name: &str,
    decorator_list: &[Expr],
    ctx: &Context,
    location: Option<Location>,
    sink: &mut DiagnosticSink,
) -> bool {
    let count = decorator_list
        .iter()
        .filter(|d| decorator_suffix(d) == Some(name))
        .count();
    if count > 1 {
        fatal(sink, ctx, format!("duplicated annotation '{name}' on '{class_name}'"), location);
        true
    } else {
        false
    }
}

fn fatal(sink: &mut DiagnosticSink, ctx: &Context, message: impl Into<String>, location: Option<Location>) {
    sink.push(Diagnostic {
        severity: Severity::Fatal,
        message: message.into(),
        file: ctx.file().to_path_buf(),
        location,
    });
}

fn error(sink: &mut DiagnosticSink, ctx: &Context, message: impl Into<String>, location: Option<Location>) {
    sink.push(Diagnostic {
        severity: Severity::Error,
        message: message.into(),
        file: ctx.file().to_path_buf(),
        location,
    });
}

/// A `["a", "b"]` or `("a", "b")` literal of string constants, as used for
/// the `gets`/`sets`/`dels` keyword arguments to `@rattr_results`.
fn string_list(expr: &Expr) -> Option<Vec<String>> {
    let elts = match expr {
        Expr::List { elts, .. } | Expr::Tuple { elts, .. } => elts,
        _ => return None,
    };
    elts.iter()
        .map(|e| match e {
            Expr::Constant {
                value: Some(serde_json::Value::String(s)),
                ..
            } => Some(s.clone()),
            _ => None,
        })
        .collect()
}

/// A `[("name", ["arg"]), ...]` literal, as used for `@rattr_results`'
/// `calls` keyword argument: each element is a two-item tuple of a callee
/// name and a list of argument identifiers.
fn call_tuples(expr: &Expr) -> Option<Vec<(String, Vec<String>)>> {
    let elts = match expr {
        Expr::List { elts, .. } | Expr::Tuple { elts, .. } => elts,
        _ => return None,
    };
    elts.iter()
        .map(|e| {
            let Expr::Tuple { elts: pair, .. } = e else {
                return None;
            };
            let [name_expr, args_expr] = pair.as_slice() else {
                return None;
            };
            let name = match name_expr {
                Expr::Constant {
                    value: Some(serde_json::Value::String(s)),
                    ..
                } => s.clone(),
                _ => return None,
            };
            let args = string_list(args_expr)?;
            Some((name, args))
        })
        .collect()
}

/// Build a `FunctionIr` literally from a `@rattr_results(gets=..., sets=...,
/// dels=..., calls=...)` decorator, rather than by analysing a body.
fn parse_rattr_results(
    decorator: &Expr,
    ctx: &Context,
    location: Option<Location>,
    sink: &mut DiagnosticSink,
) -> FunctionIr {
    let Expr::Call { args, keywords, .. } = decorator else {
        fatal(sink, ctx, "rattr_results must be used as a call", location);
        return FunctionIr::new();
    };
    if !args.is_empty() {
        fatal(
            sink,
            ctx,
            "rattr_results takes only keyword arguments",
            location,
        );
        return FunctionIr::new();
    }

    let mut ir = FunctionIr::new();
    for Keyword { arg, value } in keywords {
        let Some(key) = arg else {
            fatal(sink, ctx, "rattr_results does not support **kwargs", location);
            return FunctionIr::new();
        };
        match key.as_str() {
            "gets" | "sets" | "dels" => {
                let Some(names) = string_list(value) else {
                    fatal(
                        sink,
                        ctx,
                        format!("rattr_results '{key}' must be a list/tuple of string literals"),
                        location,
                    );
                    return FunctionIr::new();
                };
                let set = match key.as_str() {
                    "gets" => &mut ir.gets,
                    "sets" => &mut ir.sets,
                    _ => &mut ir.dels,
                };
                for name in names {
                    set.insert(match &location {
                        Some(loc) => Symbol::as_name_with_location(name, loc.clone()),
                        None => Symbol::as_name(name),
                    });
                }
            }
            "calls" => {
                let Some(calls) = call_tuples(value) else {
                    fatal(
                        sink,
                        ctx,
                        "rattr_results 'calls' must be a list/tuple of (name, args) pairs",
                        location,
                    );
                    return FunctionIr::new();
                };
                for (name, call_args) in calls {
                    let target = ctx.get_call_target(&name, location.clone(), sink);
                    ir.calls.insert(Symbol::Call {
                        name,
                        args: CallArguments {
                            args: call_args,
                            kwargs: Default::default(),
                        },
                        target: target.map(Box::new),
                    });
                }
            }
            other => {
                fatal(
                    sink,
                    ctx,
                    format!("rattr_results got an unexpected keyword argument '{other}'"),
                    location,
                );
                return FunctionIr::new();
            }
        }
    }
    ir
}

/// One method found in a class body, split from the non-method statements
/// the first pass over `body` registers as attributes.
struct Method<'a> {
    name: &'a str,
    args: &'a Arguments,
    body: &'a [Stmt],
    decorator_list: &'a [Expr],
    is_async: bool,
    location: Option<Location>,
}

/// What `analyse_class` produced: the refined class symbol and its IR (if
/// an initialiser -- explicit or heuristic -- was found), plus one entry
/// per `@staticmethod`.
#[derive(Default)]
pub struct ClassAnalysis {
    pub class: Option<(Symbol, FunctionIr)>,
    pub static_methods: Vec<(Symbol, FunctionIr)>,
}

/// Analyse a `ClassDef`'s body against `parent_ctx` -- the class's own
/// attributes, initialiser, and static methods are all registered into
/// `parent_ctx` directly, qualified by the class's name, rather than into a
/// scope of their own.
pub fn analyse_class(
    name: &str,
    bases: &[Expr],
    body: &[Stmt],
    decorator_list: &[Expr],
    class_location: Option<Location>,
    parent_ctx: &Context,
    plugins: &PluginRegistry,
    sink: &mut DiagnosticSink,
) -> ClassAnalysis {
    let mut methods = Vec::new();
    let mut init: Option<Method> = None;

    for stmt in body {
        match stmt {
            Stmt::FunctionDef {
                name: method_name,
                args,
                body: method_body,
                decorator_list: method_decorators,
                is_async,
                pos,
            } => {
                let location = Some(pos.to_location(parent_ctx.file().to_path_buf()));
                if method_name == "__init__" {
                    if init.is_some() {
                        error(sink, parent_ctx, "found multiple __init__ methods for class", location);
                        continue;
                    }
                    if *is_async {
                        fatal(sink, parent_ctx, "found async __init__ method for class", location);
                    }
                    init = Some(Method {
                        name: method_name,
                        args,
                        body: method_body,
                        decorator_list: method_decorators,
                        is_async: *is_async,
                        location,
                    });
                } else {
                    methods.push(Method {
                        name: method_name,
                        args,
                        body: method_body,
                        decorator_list: method_decorators,
                        is_async: *is_async,
                        location,
                    });
                }
            }
            Stmt::ClassDef { name: inner, pos, .. } => {
                let location = Some(pos.to_location(parent_ctx.file().to_path_buf()));
                parent_ctx.rebind(Symbol::Class {
                    name: format!("{name}.{inner}"),
                    interface: None,
                    location,
                });
            }
            Stmt::Assign { targets, value, pos } => {
                let location = Some(pos.to_location(parent_ctx.file().to_path_buf()));
                register_class_attr_assign(name, targets, value, parent_ctx, &location, sink);
            }
            Stmt::AnnAssign { target, value: Some(value), pos } => {
                let location = Some(pos.to_location(parent_ctx.file().to_path_buf()));
                register_class_attr_assign(name, std::slice::from_ref(target), value, parent_ctx, &location, sink);
            }
            Stmt::AnnAssign { target, value: None, pos } => {
                let location = Some(pos.to_location(parent_ctx.file().to_path_buf()));
                register_class_attr_target(name, target, parent_ctx, &location);
            }
            Stmt::AugAssign { target, value, pos } => {
                let location = Some(pos.to_location(parent_ctx.file().to_path_buf()));
                register_class_attr_assign(name, std::slice::from_ref(target), value, parent_ctx, &location, sink);
            }
            _ => {}
        }
    }

    let class = if let Some(init) = init {
        visit_initialiser(name, &init, decorator_list, class_location, parent_ctx, plugins, sink)
    } else {
        let mut result = None;
        if is_enum_by_heuristic(bases) {
            result = Some(synthesize_enum_initialiser(name, class_location.clone(), parent_ctx));
        }
        if is_namedtuple_by_heuristic(bases) {
            result = Some(synthesize_namedtuple_initialiser(name, class_location.clone(), parent_ctx));
        }
        result
    };

    let mut static_methods = Vec::new();
    for method in &methods {
        let qualified_name = format!("{name}.{}", method.name);
        let func = Symbol::Func {
            name: qualified_name,
            interface: CallInterface::from_arguments(method.args),
            is_async: method.is_async,
            location: method.location.clone(),
        };
        parent_ctx.rebind(func.clone());

        if has_annotation("staticmethod", method.decorator_list) {
            let ir = analyse_function(method.args, method.body, parent_ctx, plugins, sink);
            static_methods.push((func, ir));
        }
    }

    ClassAnalysis { class, static_methods }
}

fn visit_initialiser(
    class_name: &str,
    init: &Method,
    class_decorator_list: &[Expr],
    class_location: Option<Location>,
    parent_ctx: &Context,
    plugins: &PluginRegistry,
    sink: &mut DiagnosticSink,
) -> Option<(Symbol, FunctionIr)> {
    if check_duplicate_annotation("rattr_ignore", class_name, class_decorator_list, parent_ctx, class_location.clone(), sink)
        || check_duplicate_annotation("rattr_results", class_name, class_decorator_list, parent_ctx, class_location.clone(), sink)
    {
        return None;
    }

    if has_annotation("rattr_ignore", class_decorator_list) {
        return None;
    }

    let interface = CallInterface::from_arguments(init.args);
    let class_symbol = Symbol::Class {
        name: class_name.to_string(),
        interface: Some(interface),
        location: class_location,
    };
    parent_ctx.rebind(class_symbol.clone());

    let ir = if let Some(decorator) = find_annotation("rattr_results", class_decorator_list) {
        parse_rattr_results(decorator, parent_ctx, init.location.clone(), sink)
    } else {
        analyse_function(init.args, init.body, parent_ctx, plugins, sink)
    };

    Some((class_symbol, ir))
}

fn is_enum_by_heuristic(bases: &[Expr]) -> bool {
    bases
        .iter()
        .filter_map(|b| names::fullname(b, true).ok())
        .any(|b| b == "Enum" || b.ends_with(".Enum"))
}

fn is_namedtuple_by_heuristic(bases: &[Expr]) -> bool {
    bases
        .iter()
        .filter_map(|b| names::fullname(b, true).ok())
        .any(|b| b == "NamedTuple" || b.ends_with(".NamedTuple"))
}

fn synthesize_enum_initialiser(
    name: &str,
    location: Option<Location>,
    ctx: &Context,
) -> (Symbol, FunctionIr) {
    let prefix = format!("{name}.");
    let mut ir = FunctionIr::new();
    for symbol in ctx.local_symbols() {
        if let Symbol::Name { name: member, .. } = &symbol {
            if member.starts_with(&prefix) {
                ir.gets.insert(symbol);
            }
        }
    }

    let class_symbol = Symbol::Class {
        name: name.to_string(),
        interface: Some(CallInterface {
            posonlyargs: vec![],
            args: vec!["self".to_string(), "_id".to_string()],
            vararg: None,
            kwonlyargs: vec![],
            kwarg: None,
        }),
        location,
    };
    ctx.rebind(class_symbol.clone());
    (class_symbol, ir)
}

fn synthesize_namedtuple_initialiser(
    name: &str,
    location: Option<Location>,
    ctx: &Context,
) -> (Symbol, FunctionIr) {
    let class_symbol = Symbol::Class {
        name: name.to_string(),
        interface: Some(CallInterface {
            posonlyargs: vec![],
            args: vec!["self".to_string()],
            vararg: Some("attrs".to_string()),
            kwonlyargs: vec![],
            kwarg: None,
        }),
        location,
    };
    ctx.rebind(class_symbol.clone());
    (class_symbol, FunctionIr::new())
}

/// Mirrors `root_context.rs`'s `register_any_assign`, but every registered
/// name is qualified `{class_name}.{name}` and landed in `ctx` directly
/// (the parent scope) rather than the module root.
fn register_class_attr_assign(
    class_name: &str,
    targets: &[Expr],
    value: &Expr,
    ctx: &Context,
    location: &Option<Location>,
    sink: &mut DiagnosticSink,
) {
    use analyser::{assignment_is_one_to_one, find_namedtuple_call, get_namedtuple_attrs, lambda_in_rhs};

    if lambda_in_rhs(value) {
        if !assignment_is_one_to_one(targets, value) {
            error(sink, ctx, "lambda assignment must be one-to-one", location.clone());
            return;
        }
        let Expr::Lambda { args, .. } = value else {
            error(sink, ctx, "unable to find lambda in rhs", location.clone());
            return;
        };
        let Ok(base) = names::fullname(&targets[0], true) else {
            return;
        };
        ctx.rebind(Symbol::Func {
            name: format!("{class_name}.{base}"),
            interface: CallInterface::from_arguments(args),
            is_async: false,
            location: location.clone(),
        });
        return;
    }

    if let Some(call_expr) = find_namedtuple_call(value) {
        if !assignment_is_one_to_one(targets, value) {
            error(sink, ctx, "namedtuple assignment must be one-to-one", location.clone());
            return;
        }
        let Ok(base) = names::fullname(&targets[0], true) else {
            return;
        };
        match get_namedtuple_attrs(call_expr) {
            Ok(attrs) => {
                let mut args = vec!["self".to_string()];
                args.extend(attrs);
                ctx.rebind(Symbol::Class {
                    name: format!("{class_name}.{base}"),
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
            Err(message) => error(sink, ctx, message, location.clone()),
        }
        return;
    }

    for target in targets {
        register_class_attr_target(class_name, target, ctx, location);
    }
}

fn register_class_attr_target(
    class_name: &str,
    target: &Expr,
    ctx: &Context,
    location: &Option<Location>,
) {
    let Ok(names) = names::unravel_names(target, true) else {
        return;
    };
    for base in names {
        let qualified = format!("{class_name}.{base}");
        let symbol = match location {
            Some(loc) => Symbol::as_name_with_location(qualified, loc.clone()),
            None => Symbol::as_name(qualified),
        };
        ctx.add(symbol);
    }
}
