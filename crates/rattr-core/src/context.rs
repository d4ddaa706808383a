//! The scoped symbol environment: nested lexical scopes, name lookup, and
//! call-target resolution (spec.md §4.2, §4.3).
//!
//! Scopes are `Rc`-linked rather than borrowed with a self-referential
//! lifetime parameter: spec.md §9 itself asks for "parent-pointing
//! references" for the scope tree, and a recursive-descent analyser that
//! pushes and pops scopes for every nested block, comprehension, and lambda
//! needs to create and discard child scopes freely without fighting one
//! fixed lifetime threaded through the whole file. `Rc<RefCell<..>>` makes
//! `Context` a cheap, `Clone`-able handle, which is what lets the function
//! and class analysers hand scopes down through recursive visits the way
//! this crate's other tree walks do.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::location::Location;
use crate::module_locator::{module_name_and_origin, possible_module_names, ModuleLocator};
use crate::symbol::{CallTarget, Symbol};
use crate::symbol_table::SymbolTable;

struct Inner {
    parent: Option<Context>,
    table: RefCell<SymbolTable>,
    file: PathBuf,
    locator: Rc<dyn ModuleLocator>,
}

/// One lexical scope. Cloning a `Context` clones the `Rc` handle, not the
/// scope itself -- all clones observe the same underlying table.
#[derive(Clone)]
pub struct Context {
    inner: Rc<Inner>,
}

impl Context {
    pub fn new_root(file: impl Into<PathBuf>, locator: Rc<dyn ModuleLocator>) -> Self {
        Context {
            inner: Rc::new(Inner {
                parent: None,
                table: RefCell::new(SymbolTable::new()),
                file: file.into(),
                locator,
            }),
        }
    }

    /// A fresh child scope of `self`: the scoped-acquisition idiom of
    /// spec.md §4.2 -- callers push one of these per nested block and let it
    /// drop (or simply stop using it) when the block ends.
    pub fn child(&self) -> Self {
        Context {
            inner: Rc::new(Inner {
                parent: Some(self.clone()),
                table: RefCell::new(SymbolTable::new()),
                file: self.inner.file.clone(),
                locator: self.inner.locator.clone(),
            }),
        }
    }

    pub fn file(&self) -> &Path {
        &self.inner.file
    }

    /// Insert `symbol` unless it is already visible from this scope
    /// (matching an ancestor's binding is a no-op); arguments always shadow.
    pub fn add(&self, symbol: Symbol) {
        if !self.contains(symbol.id()) {
            self.inner.table.borrow_mut().insert(symbol);
        }
    }

    /// Insert `symbol` into this scope unconditionally, shadowing any
    /// ancestor binding of the same identifier. Used for function/lambda
    /// parameters.
    pub fn add_argument(&self, symbol: Symbol) {
        self.inner.table.borrow_mut().insert(symbol);
    }

    /// Insert `symbol` into this scope unconditionally, overwriting any
    /// binding already present in this exact scope. Mechanically identical
    /// to `add_argument`; named separately because the caller's intent
    /// differs -- this refines a provisional binding (the class analyser
    /// rebinding a `Class` symbol once its initialiser's interface is known,
    /// spec.md §4.6) rather than shadowing with a fresh parameter.
    pub fn rebind(&self, symbol: Symbol) {
        self.add_argument(symbol);
    }

    pub fn add_all(&self, symbols: impl IntoIterator<Item = Symbol>) {
        for symbol in symbols {
            self.add(symbol);
        }
    }

    /// Remove `id` from this scope's own table; succeeds silently if absent
    /// (spec.md §4.5's "Delete" handling operates at module and function
    /// level, where exactly one scope is legally in play).
    pub fn remove(&self, id: &str) -> bool {
        self.inner.table.borrow_mut().remove(id).is_some()
    }

    /// True iff `id` is declared in this scope's table only.
    pub fn declares(&self, id: &str) -> bool {
        self.inner.table.borrow().contains(id)
    }

    /// True iff `id` is declared in this scope or any ancestor.
    pub fn contains(&self, id: &str) -> bool {
        self.declares(id)
            || self
                .inner
                .parent
                .as_ref()
                .map(|p| p.contains(id))
                .unwrap_or(false)
    }

    /// The nearest binding for `id`, searching this scope then ancestors.
    pub fn get(&self, id: &str) -> Option<Symbol> {
        if let Some(symbol) = self.inner.table.borrow().get(id) {
            return Some(symbol.clone());
        }
        self.inner.parent.as_ref().and_then(|p| p.get(id))
    }

    pub fn is_import(&self, id: &str) -> bool {
        matches!(self.get(id), Some(Symbol::Import { .. }))
    }

    /// Every symbol declared directly in this scope (not ancestors), in
    /// insertion order. Used by the class analyser to recover the
    /// `ClassName.attr` names it registered into the *parent* scope while
    /// visiting class-body assignments (spec.md §4.6).
    pub fn local_symbols(&self) -> Vec<Symbol> {
        self.inner
            .table
            .borrow()
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn root(&self) -> Context {
        match &self.inner.parent {
            Some(p) => p.root(),
            None => self.clone(),
        }
    }

    pub fn locator(&self) -> &dyn ModuleLocator {
        self.inner.locator.as_ref()
    }

    /// Resolve a call-site callee identifier (ending in `()`) to its
    /// target symbol, following spec.md §4.3's eleven steps.
    pub fn get_call_target(
        &self,
        callee: &str,
        culprit_location: Option<Location>,
        sink: &mut DiagnosticSink,
    ) -> Option<CallTarget> {
        let stripped_parens = callee.strip_suffix("()").unwrap_or(callee);
        let name = stripped_parens.trim_start_matches('*');
        let lhs_name = name.split('.').next().unwrap_or(name);

        // Step 2: literal target.
        if name.starts_with(crate::names::LITERAL_VALUE_PREFIX) {
            self.info(sink, "target lhs is a literal", culprit_location);
            return None;
        }

        // Step 3: subscripted target.
        if name.contains("[]") {
            if name.contains('.') {
                self.info(sink, "target lhs is runtime-dependent", culprit_location);
            } else {
                self.error(sink, "target is fully runtime-dependent", culprit_location);
            }
            return None;
        }

        let target = self.get(name);
        let call_target = target.as_ref().and_then(CallTarget::from_symbol);
        let lhs_target = self.get(lhs_name);

        // Step 5: method call -- name has an attribute path, no direct
        // binding, and the lhs isn't itself an import (which is handled by
        // step 6/7 instead). `lhs_target` is most commonly a plain `Name`
        // (an ordinary object variable, e.g. `self`/`o`) which can't be
        // represented as a `CallTarget` (spec.md §3 restricts `Call.target`
        // to Func/Class/Builtin/Import) -- that still matches this step and
        // still gets the "target is a method" info, it just resolves to no
        // target rather than falling through to the "undefined" warning.
        if name != lhs_name && call_target.is_none() && !matches!(lhs_target, Some(Symbol::Import { .. })) {
            if !is_method_on_primitive(name) {
                self.info(sink, "target is a method", culprit_location.clone());
            }
            return lhs_target.as_ref().and_then(CallTarget::from_symbol);
        }

        // Steps 6/7: member of a module import.
        if name.contains('.') && call_target.is_none() {
            if let Some(Symbol::Import {
                qualified_name, ..
            }) = &lhs_target
            {
                let tail = &name[lhs_name.len() + 1..];
                let candidate_qualname = format!("{qualified_name}.{tail}");
                if module_name_and_origin(self.locator(), &candidate_qualname).is_some()
                    || possible_module_names(&candidate_qualname)
                        .iter()
                        .skip(1)
                        .any(|c| module_name_and_origin(self.locator(), c).is_some())
                {
                    return Some(CallTarget::Import {
                        name: tail.to_string(),
                        qualified_name: candidate_qualname,
                        module_name: Some(qualified_name.clone()),
                    });
                }
                // Step 7: method on an imported non-module member.
                return None;
            }
        }

        let call_target = match call_target {
            Some(t) => t,
            None => {
                // Step 8: undefined.
                self.warning(sink, "target is undefined", culprit_location);
                return None;
            }
        };

        // Step 9: call on a call result -- best effort, still return target.
        if callee.ends_with("()()") {
            self.error(sink, "target is a call on a call", culprit_location);
            return Some(call_target);
        }

        // Step 10: resolved but not callable.
        if target.as_ref().map(|s| !s.is_callable()).unwrap_or(false) {
            if name.contains('.') {
                self.error(sink, "target is a method, not callable here", culprit_location);
            } else if self.declares(name) {
                self.error(sink, "target is a procedural parameter", culprit_location);
            } else {
                self.error(sink, "target is not callable", culprit_location);
            }
            return None;
        }

        Some(call_target)
    }

    fn info(&self, sink: &mut DiagnosticSink, message: &str, location: Option<Location>) {
        sink.push(Diagnostic {
            severity: Severity::Info,
            message: message.to_string(),
            file: self.inner.file.clone(),
            location,
        });
    }

    fn warning(&self, sink: &mut DiagnosticSink, message: &str, location: Option<Location>) {
        sink.push(Diagnostic {
            severity: Severity::Warning,
            message: message.to_string(),
            file: self.inner.file.clone(),
            location,
        });
    }

    fn error(&self, sink: &mut DiagnosticSink, message: &str, location: Option<Location>) {
        sink.push(Diagnostic {
            severity: Severity::Error,
            message: message.to_string(),
            file: self.inner.file.clone(),
            location,
        });
    }
}

/// Recognizes calls of the form `@Constant.xxx()`, `@Literal.xxx()`, or
/// `str(...).split()` -- a call chained directly off a builtin known to
/// return a primitive -- so step 5 doesn't spam "target is a method" for
/// the overwhelmingly common case of calling a method on a string/list
/// literal.
pub fn is_method_on_primitive(name: &str) -> bool {
    const PRIMITIVE_RETURNING_BUILTINS: &[&str] = &[
        "str", "int", "float", "bool", "bytes", "list", "dict", "set", "tuple", "frozenset",
    ];
    if name.starts_with(crate::names::LITERAL_VALUE_PREFIX) {
        return true;
    }
    if let Some(lhs) = name.split('.').next() {
        if let Some(callee) = lhs.strip_suffix("()") {
            return PRIMITIVE_RETURNING_BUILTINS.contains(&callee);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_locator::StaticModuleLocator;

    fn locator() -> Rc<dyn ModuleLocator> {
        Rc::new(StaticModuleLocator::new())
    }

    #[test]
    fn child_scope_sees_parent_bindings() {
        let root = Context::new_root("m.py", locator());
        root.add(Symbol::as_name("x"));
        let child = root.child();
        assert!(child.get("x").is_some());
    }

    #[test]
    fn argument_shadows_ancestor_binding() {
        let root = Context::new_root("m.py", locator());
        root.add(Symbol::Func {
            name: "x".into(),
            interface: crate::symbol::CallInterface::any(),
            is_async: false,
            location: None,
        });
        let child = root.child();
        child.add_argument(Symbol::as_name("x"));
        assert!(matches!(child.get("x"), Some(Symbol::Name { .. })));
    }

    #[test]
    fn add_without_argument_flag_is_noop_if_visible_in_ancestor() {
        let root = Context::new_root("m.py", locator());
        root.add(Symbol::Func {
            name: "x".into(),
            interface: crate::symbol::CallInterface::any(),
            is_async: false,
            location: None,
        });
        let child = root.child();
        child.add(Symbol::as_name("x"));
        assert!(matches!(child.get("x"), Some(Symbol::Func { .. })));
    }

    #[test]
    fn declares_is_local_only() {
        let root = Context::new_root("m.py", locator());
        root.add(Symbol::as_name("x"));
        let child = root.child();
        assert!(!child.declares("x"));
        assert!(child.contains("x"));
    }

    #[test]
    fn nested_children_see_all_ancestors() {
        let root = Context::new_root("m.py", locator());
        root.add(Symbol::as_name("x"));
        let mid = root.child();
        mid.add(Symbol::as_name("y"));
        let leaf = mid.child();
        assert!(leaf.contains("x"));
        assert!(leaf.contains("y"));
    }

    #[test]
    fn get_call_target_undefined_emits_warning() {
        let root = Context::new_root("m.py", locator());
        let mut sink = DiagnosticSink::new();
        let target = root.get_call_target("missing()", None, &mut sink);
        assert!(target.is_none());
        assert_eq!(sink.diagnostics().len(), 1);
        assert_eq!(sink.diagnostics()[0].severity, Severity::Warning);
    }

    #[test]
    fn get_call_target_resolves_a_defined_function() {
        let root = Context::new_root("m.py", locator());
        root.add(Symbol::Func {
            name: "f".into(),
            interface: crate::symbol::CallInterface::any(),
            is_async: false,
            location: None,
        });
        let mut sink = DiagnosticSink::new();
        let target = root.get_call_target("f()", None, &mut sink);
        assert!(matches!(target, Some(CallTarget::Func { .. })));
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn get_call_target_on_literal_returns_none_with_info() {
        let root = Context::new_root("m.py", locator());
        let mut sink = DiagnosticSink::new();
        let target = root.get_call_target("@Tuple()", None, &mut sink);
        assert!(target.is_none());
        assert_eq!(sink.diagnostics()[0].severity, Severity::Info);
    }

    #[test]
    fn get_call_target_method_call_returns_lhs_target() {
        let root = Context::new_root("m.py", locator());
        root.add(Symbol::as_name("o"));
        let mut sink = DiagnosticSink::new();
        let target = root.get_call_target("o.method()", None, &mut sink);
        assert!(target.is_none());
    }

    #[test]
    fn rebind_overwrites_the_local_binding() {
        let root = Context::new_root("m.py", locator());
        root.add(Symbol::Class {
            name: "C".into(),
            interface: None,
            location: None,
        });
        root.rebind(Symbol::Class {
            name: "C".into(),
            interface: Some(crate::symbol::CallInterface::any()),
            location: None,
        });
        assert!(matches!(root.get("C"), Some(Symbol::Class { interface: Some(_), .. })));
    }

    #[test]
    fn is_method_on_primitive_recognizes_str_call_chain() {
        assert!(is_method_on_primitive("str().split"));
        assert!(!is_method_on_primitive("requests.get"));
    }
}
