//! Call-graph construction, parameter-swap substitution, and the
//! destructive IR simplification pass that inlines a callable's transitive
//! effects into itself (spec.md §4.7, §4.8).
//!
//! Grounded on `results/_simplify_utils.py` (`construct_call_swaps`,
//! `unbind_name`, `unbind_ir_with_call_swaps`) and `results/_find_call_target.py`
//! (target resolution across the file IR and followed imports). The
//! original builds an explicit call tree and then post-orders it; here the
//! post-order walk and the recursion-removal "seen" set are folded into one
//! recursive function, since nothing downstream needs the tree shape itself
//! -- only the simplified `FunctionIr` each root ends up with.

use std::collections::{BTreeMap, HashSet};

use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::ir::{CallableKey, FileIr, FunctionIr, ImportsIr};
use crate::module_locator::{is_blacklisted_module, is_pip_module, is_stdlib_module, ModuleLocator};
use crate::names;
use crate::symbol::{CallArguments, CallInterface, CallTarget, Symbol};

/// Sentinel identifiers a vararg/kwarg collector is bound to, since the
/// actual call-site values passed through `*args`/`**kwargs` have no single
/// caller-side name (spec.md §4.8).
pub fn vararg_sentinel() -> String {
    format!("{}Tuple", names::LITERAL_VALUE_PREFIX)
}

pub fn kwargs_sentinel() -> String {
    format!("{}Dict", names::LITERAL_VALUE_PREFIX)
}

/// True if `name` matches one of the configured `--exclude-name` patterns
/// (spec.md §6), per the original's `is_excluded_name`. With no process-wide
/// configuration installed -- library and test callers that drive this
/// module directly, with no CLI run behind them -- nothing is excluded.
fn is_excluded_name(name: &str) -> bool {
    let Some(config) = crate::config::Config::try_get() else {
        return false;
    };
    match config.arguments().re_excluded_names() {
        Ok(patterns) => patterns.iter().any(|p| p.is_match(name)),
        Err(_) => false,
    }
}

fn push(sink: &mut DiagnosticSink, severity: Severity, message: impl Into<String>) {
    sink.push(Diagnostic {
        severity,
        message: message.into(),
        file: crate::config::Config::current_file(),
        location: None,
    });
}

/// Build the map from a callee's parameter names to the identifiers bound
/// to them at one call site (spec.md §4.8).
pub fn construct_call_swaps(
    callee_name: &str,
    interface: &CallInterface,
    call_args: &CallArguments,
    sink: &mut DiagnosticSink,
) -> BTreeMap<String, String> {
    let mut swaps = BTreeMap::new();
    let mut consumable = interface.as_consumable();
    let mut positional: Vec<String> = call_args.args.clone();

    while !consumable.posonlyargs.is_empty() {
        if positional.is_empty() {
            push(
                sink,
                Severity::Error,
                format!(
                    "call to '{callee_name}' expected {} posonlyargs but only received {} positional arguments",
                    interface.posonlyargs.len(),
                    call_args.args.len()
                ),
            );
            return BTreeMap::new();
        }
        let target = consumable.posonlyargs.remove(0);
        let replacement = positional.remove(0);
        swaps.insert(target, replacement);
    }

    while !consumable.args.is_empty() && !positional.is_empty() {
        let target = consumable.args.remove(0);
        let replacement = positional.remove(0);
        swaps.insert(target, replacement);
    }

    if let Some(vararg) = consumable.vararg.take() {
        swaps.insert(vararg, vararg_sentinel());
        positional.clear();
    }

    if !positional.is_empty() {
        push(
            sink,
            Severity::Error,
            format!("call to '{callee_name}' received too many positional arguments"),
        );
    }

    let mut unexpected_keyword_arguments = Vec::new();
    let mut given_by_position_and_name = Vec::new();

    for (target, replacement) in &call_args.kwargs {
        if swaps.contains_key(target) {
            given_by_position_and_name.push(target.clone());
        }

        if let Some(pos) = consumable.args.iter().position(|a| a == target) {
            consumable.args.remove(pos);
            swaps.insert(target.clone(), replacement.clone());
        } else if let Some(pos) = consumable.kwonlyargs.iter().position(|a| a == target) {
            consumable.kwonlyargs.remove(pos);
            swaps.insert(target.clone(), replacement.clone());
        } else if let Some(kwarg) = &consumable.kwarg {
            swaps.insert(kwarg.clone(), kwargs_sentinel());
        } else if !interface.all().iter().any(|a| a == target) {
            unexpected_keyword_arguments.push(target.clone());
        }
    }

    if !unexpected_keyword_arguments.is_empty() {
        push(
            sink,
            Severity::Error,
            format!(
                "call to '{callee_name}' received unexpected keyword arguments: {unexpected_keyword_arguments:?}"
            ),
        );
    }
    if !given_by_position_and_name.is_empty() {
        push(
            sink,
            Severity::Error,
            format!(
                "call to '{callee_name}' received the arguments {given_by_position_and_name:?} by position and name"
            ),
        );
    }

    swaps
}

/// Rebind a `Name` symbol's basename through `swaps`, preserving its
/// attribute tail and any leading `*`/trailing `[]`. Non-`Name` symbols
/// (the `calls` set) pass through untouched.
pub fn unbind_name(symbol: &Symbol, swaps: &BTreeMap<String, String>) -> Symbol {
    let Symbol::Name { name, basename, location } = symbol else {
        return symbol.clone();
    };
    let Some(new_basename) = swaps.get(basename) else {
        return symbol.clone();
    };
    if basename == new_basename {
        return symbol.clone();
    }

    let (old, new) = if name.starts_with('*') {
        (format!("*{basename}"), format!("*{new_basename}"))
    } else {
        (basename.clone(), new_basename.clone())
    };

    let new_name = match name.find(&old) {
        Some(0) => format!("{new}{}", &name[old.len()..]),
        _ => name.clone(),
    };

    Symbol::Name {
        name: new_name,
        basename: new_basename.clone(),
        location: location.clone(),
    }
}

/// Rebind every `gets`/`sets`/`dels` entry of `ir` through `swaps`; `calls`
/// is left as-is, since it is the callee's own view of the calls it makes,
/// not something the caller renames (spec.md §4.8).
pub fn unbind_ir_with_call_swaps(ir: &FunctionIr, swaps: &BTreeMap<String, String>) -> FunctionIr {
    FunctionIr {
        gets: ir.gets.iter().map(|s| unbind_name(s, swaps)).collect(),
        sets: ir.sets.iter().map(|s| unbind_name(s, swaps)).collect(),
        dels: ir.dels.iter().map(|s| unbind_name(s, swaps)).collect(),
        calls: ir.calls.clone(),
    }
}

/// The file IR and the IRs of the modules it has followed imports into, the
/// environment a call target is resolved against (spec.md §4.7 step 2).
pub struct Environment<'a> {
    pub file_ir: &'a FileIr,
    pub imports: &'a ImportsIr,
    pub locator: &'a dyn ModuleLocator,
}

/// Resolve one call's target to the `(Symbol, FunctionIr)` it should be
/// expanded with, or `None` if it is a builtin, an unresolved import, or
/// otherwise cannot be followed.
fn resolve_target(target: &CallTarget, env: &Environment, sink: &mut DiagnosticSink) -> Option<(Symbol, FunctionIr)> {
    match target {
        CallTarget::Builtin { .. } => None,
        CallTarget::Func { name, .. } | CallTarget::Class { name, .. } => env
            .file_ir
            .functions
            .get(&CallableKey(name.clone()))
            .cloned(),
        CallTarget::Import {
            qualified_name,
            module_name,
            ..
        } => {
            let module_name = module_name.as_ref()?;
            let follow = crate::config::Config::get().arguments().follow_imports;
            if !follow.local {
                push(sink, Severity::Info, format!("not following local import {module_name:?}"));
                return None;
            }
            if is_stdlib_module(module_name) && !follow.stdlib {
                push(sink, Severity::Info, format!("not following stdlib import {module_name:?}"));
                return None;
            }
            if !is_stdlib_module(module_name) {
                if let Some(origin) = env.locator.locate(module_name) {
                    if is_pip_module(&origin) && !follow.pip {
                        push(sink, Severity::Info, format!("not following pip import {module_name:?}"));
                        return None;
                    }
                }
            }
            let excluded_imports = crate::config::Config::try_get()
                .map(|c| c.arguments().re_excluded_imports().unwrap_or_default())
                .unwrap_or_default();
            if is_blacklisted_module(module_name, &excluded_imports) {
                push(sink, Severity::Info, format!("import {module_name:?} matches an excluded-import pattern"));
                return None;
            }

            let module_ir = env.imports.get(module_name)?;
            let local_name = qualified_name
                .strip_prefix(&format!("{module_name}."))
                .unwrap_or(qualified_name)
                .trim_end_matches("()");
            module_ir.functions.get(&CallableKey(local_name.to_string())).cloned()
        }
    }
}

/// Recursively simplify `ir`, inlining every resolvable call's effects
/// (spec.md §4.7's post-order union). `visiting` breaks cycles: a callee
/// already on the current expansion path is not expanded again, so mutual
/// and self recursion terminate with a finite, sound (if incomplete) IR.
fn simplify_callable(
    name: &str,
    ir: &FunctionIr,
    env: &Environment,
    sink: &mut DiagnosticSink,
    visiting: &mut HashSet<String>,
) -> FunctionIr {
    let mut result = ir.clone();

    if !visiting.insert(name.to_string()) {
        return result;
    }

    for call_symbol in &ir.calls {
        let Symbol::Call { name: callee_name, args, target: Some(target) } = call_symbol else {
            continue;
        };
        let Some((target_symbol, target_ir)) = resolve_target(target, env, sink) else {
            continue;
        };
        if is_excluded_name(target_symbol.name()) {
            push(sink, Severity::Info, format!("not expanding excluded call target {:?}", target_symbol.name()));
            continue;
        }

        let interface = match &target_symbol {
            Symbol::Func { interface, .. } => interface.clone(),
            Symbol::Class { interface: Some(i), .. } => i.clone(),
            _ => CallInterface::any(),
        };

        let swaps = construct_call_swaps(callee_name, &interface, args, sink);
        let child = simplify_callable(target_symbol.name(), &target_ir, env, sink, visiting);
        let unbound = unbind_ir_with_call_swaps(&child, &swaps);

        result.gets.extend(unbound.gets);
        result.sets.extend(unbound.sets);
        result.dels.extend(unbound.dels);
    }

    visiting.remove(name);
    result
}

/// Simplify every callable in `file_ir` against `env`, returning a fresh
/// `FileIr` -- the input is never mutated (spec.md §4.7's "operating on a
/// deep copy").
pub fn simplify_file_ir(file_ir: &FileIr, env: &Environment, sink: &mut DiagnosticSink) -> FileIr {
    let mut out = FileIr::new();
    for (symbol, ir) in file_ir.iter() {
        let mut visiting = HashSet::new();
        let simplified = simplify_callable(symbol.name(), ir, env, sink, &mut visiting);
        out.insert(symbol.clone(), simplified);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;

    fn interface(args: &[&str]) -> CallInterface {
        CallInterface {
            posonlyargs: vec![],
            args: args.iter().map(|s| s.to_string()).collect(),
            vararg: None,
            kwonlyargs: vec![],
            kwarg: None,
        }
    }

    fn call_args(positional: &[&str]) -> CallArguments {
        CallArguments {
            args: positional.iter().map(|s| s.to_string()).collect(),
            kwargs: Default::default(),
        }
    }

    #[test]
    fn construct_call_swaps_binds_positional_parameters_by_position() {
        let mut sink = DiagnosticSink::new();
        let swaps = construct_call_swaps("f", &interface(&["a", "b"]), &call_args(&["x", "y"]), &mut sink);
        assert_eq!(swaps.get("a"), Some(&"x".to_string()));
        assert_eq!(swaps.get("b"), Some(&"y".to_string()));
    }

    #[test]
    fn construct_call_swaps_binds_vararg_to_sentinel_and_drops_rest() {
        let mut sink = DiagnosticSink::new();
        let iface = CallInterface {
            posonlyargs: vec![],
            args: vec!["a".into()],
            vararg: Some("rest".into()),
            kwonlyargs: vec![],
            kwarg: None,
        };
        let swaps = construct_call_swaps("f", &iface, &call_args(&["x", "y", "z"]), &mut sink);
        assert_eq!(swaps.get("a"), Some(&"x".to_string()));
        assert_eq!(swaps.get("rest"), Some(&vararg_sentinel()));
    }

    #[test]
    fn construct_call_swaps_flags_unexpected_keyword_argument() {
        let mut sink = DiagnosticSink::new();
        let mut args = call_args(&[]);
        args.kwargs.insert("bogus".into(), "x".into());
        let swaps = construct_call_swaps("f", &interface(&["a"]), &args, &mut sink);
        assert!(swaps.is_empty());
        assert!(sink.diagnostics().iter().any(|d| d.message.contains("unexpected keyword")));
    }

    #[test]
    fn unbind_name_replaces_only_the_leading_basename() {
        let symbol = Symbol::Name {
            name: "a.b".into(),
            basename: "a".into(),
            location: None,
        };
        let mut swaps = BTreeMap::new();
        swaps.insert("a".to_string(), "x".to_string());
        let renamed = unbind_name(&symbol, &swaps);
        assert_eq!(renamed.name(), "x.b");
    }

    #[test]
    fn unbind_name_preserves_leading_star() {
        let symbol = Symbol::Name {
            name: "*a".into(),
            basename: "a".into(),
            location: Some(Location::new(1, 0, "m.py")),
        };
        let mut swaps = BTreeMap::new();
        swaps.insert("a".to_string(), "x".to_string());
        let renamed = unbind_name(&symbol, &swaps);
        assert_eq!(renamed.name(), "*x");
    }

    #[test]
    fn unbind_ir_leaves_calls_untouched() {
        let mut ir = FunctionIr::new();
        ir.calls.insert(Symbol::Call {
            name: "g()".into(),
            args: CallArguments::default(),
            target: None,
        });
        let out = unbind_ir_with_call_swaps(&ir, &BTreeMap::new());
        assert_eq!(out.calls, ir.calls);
    }
}
