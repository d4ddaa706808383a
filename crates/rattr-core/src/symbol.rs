//! The symbol model: tagged variants for name, builtin, import, function,
//! class, and call, with call interfaces and call arguments.
//!
//! Grounded on the original's second-generation `models/symbol/_symbol.py`
//! and `_symbols.py` (an `attrs`-frozen value model), not the deprecated
//! tuple-field `analyser/context/symbol.py` -- `spec.md`'s own vocabulary
//! (`CallInterface`, `CallArguments`, posonly/kwonly lists) already matches
//! the newer shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast;
use crate::location::Location;

/// Python's callable builtins, less the four literal pseudo-names and the
/// dunder names, mirroring `PYTHON_BUILTINS` in `models/symbol/_symbols.py`.
/// Kept as a fixed list (rather than introspecting a `builtins` module,
/// which the host language has no equivalent of) since the target language
/// is fixed at analysis time.
pub const PYTHON_BUILTINS: &[&str] = &[
    "abs", "aiter", "anext", "all", "any", "ascii", "bin", "bool", "breakpoint",
    "bytearray", "bytes", "callable", "chr", "classmethod", "compile", "complex",
    "delattr", "dict", "dir", "divmod", "enumerate", "eval", "exec", "filter",
    "float", "format", "frozenset", "getattr", "globals", "hasattr", "hash",
    "help", "hex", "id", "input", "int", "isinstance", "issubclass", "iter",
    "len", "list", "locals", "map", "max", "memoryview", "min", "next", "object",
    "oct", "open", "ord", "pow", "print", "property", "range", "repr", "reversed",
    "round", "set", "setattr", "slice", "sorted", "staticmethod", "str", "sum",
    "super", "tuple", "type", "vars", "zip",
];

/// Python's literal pseudo-builtins: not callable, never have an effect.
pub const PYTHON_LITERAL_BUILTINS: &[&str] = &["None", "True", "False", "Ellipsis"];

/// The builtins that access attributes on their first argument by name.
pub const PYTHON_ATTR_ACCESS_BUILTINS: &[&str] = &["delattr", "getattr", "hasattr", "setattr"];

pub fn has_affect(builtin: &str) -> bool {
    PYTHON_ATTR_ACCESS_BUILTINS.contains(&builtin)
}

/// `(posonlyargs, args, vararg?, kwonlyargs, kwarg?)`, the interface a
/// function or class initialiser exposes to its callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallInterface {
    pub posonlyargs: Vec<String>,
    pub args: Vec<String>,
    pub vararg: Option<String>,
    pub kwonlyargs: Vec<String>,
    pub kwarg: Option<String>,
}

impl CallInterface {
    /// Sentinel interface for builtins and unresolved imports: accepts any
    /// call shape without parameter swapping.
    pub fn any() -> Self {
        CallInterface::default()
    }

    pub fn from_arguments(arguments: &ast::Arguments) -> Self {
        CallInterface {
            posonlyargs: arguments.posonlyargs.iter().map(|a| a.arg.clone()).collect(),
            args: arguments.args.iter().map(|a| a.arg.clone()).collect(),
            vararg: arguments.vararg.as_ref().map(|a| a.arg.clone()),
            kwonlyargs: arguments.kwonlyargs.iter().map(|a| a.arg.clone()).collect(),
            kwarg: arguments.kwarg.as_ref().map(|a| a.arg.clone()),
        }
    }

    pub fn all(&self) -> Vec<String> {
        let mut out = Vec::new();
        out.extend(self.posonlyargs.iter().cloned());
        out.extend(self.args.iter().cloned());
        if let Some(v) = &self.vararg {
            out.push(v.clone());
        }
        out.extend(self.kwonlyargs.iter().cloned());
        if let Some(k) = &self.kwarg {
            out.push(k.clone());
        }
        out
    }

    /// A copy of this interface's parameter lists as owned, independently
    /// consumable queues, for `construct_swap` (§4.8) to drain without
    /// touching the original.
    pub fn as_consumable(&self) -> ConsumableCallInterface {
        ConsumableCallInterface {
            posonlyargs: self.posonlyargs.clone(),
            args: self.args.clone(),
            vararg: self.vararg.clone(),
            kwonlyargs: self.kwonlyargs.clone(),
            kwarg: self.kwarg.clone(),
        }
    }
}

/// A draining copy of a [`CallInterface`] used while constructing a
/// parameter swap (the original's `ConsumableCallInterface` named tuple).
#[derive(Debug, Clone, Default)]
pub struct ConsumableCallInterface {
    pub posonlyargs: Vec<String>,
    pub args: Vec<String>,
    pub vararg: Option<String>,
    pub kwonlyargs: Vec<String>,
    pub kwarg: Option<String>,
}

/// The identifiers passed at one call site: positional, in order, and
/// keyword, by name. Each entry is itself a normalized identifier computed
/// from the argument expression (see [`crate::names`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallArguments {
    pub args: Vec<String>,
    pub kwargs: BTreeMap<String, String>,
}

impl CallArguments {
    pub fn with_implicit_self(mut self, self_name: String) -> Self {
        self.args.insert(0, self_name);
        self
    }
}

/// A tagged-variant symbol: a name, a builtin, an import, a function, a
/// class, or a call site. Every symbol carries an optional location; symbol
/// identity for set membership is the `(variant, name)` pair the `id()`
/// method returns -- see spec.md §3's note that starred imports identify by
/// `qualified_name + ".*"` to avoid collisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Symbol {
    Name {
        name: String,
        basename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },
    Builtin {
        name: String,
        has_affect: bool,
    },
    Import {
        name: String,
        qualified_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },
    Func {
        name: String,
        interface: CallInterface,
        is_async: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },
    Class {
        name: String,
        /// `None` until an initialiser (explicit or heuristic) is found.
        interface: Option<CallInterface>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },
    Call {
        name: String,
        args: CallArguments,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Box<CallTarget>>,
    },
}

/// What a [`Symbol::Call`] resolves to, once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CallTarget {
    Func {
        name: String,
        interface: CallInterface,
        is_async: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },
    Class {
        name: String,
        interface: Option<CallInterface>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },
    Builtin {
        name: String,
        has_affect: bool,
    },
    Import {
        name: String,
        qualified_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module_name: Option<String>,
    },
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Name { name, .. }
            | Symbol::Builtin { name, .. }
            | Symbol::Import { name, .. }
            | Symbol::Func { name, .. }
            | Symbol::Class { name, .. }
            | Symbol::Call { name, .. } => name,
        }
    }

    /// The identifier symbols are keyed by in a symbol table / set. Most
    /// symbols identify by `name`; starred imports (`Import` whose name
    /// ends in `.*`) already encode their disambiguating qualifier in
    /// `name` at construction time (see [`crate::context::RootContext`]).
    pub fn id(&self) -> &str {
        self.name()
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Symbol::Func { .. } | Symbol::Class { .. } | Symbol::Builtin { .. }
        )
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Symbol::Name { location, .. }
            | Symbol::Import { location, .. }
            | Symbol::Func { location, .. }
            | Symbol::Class { location, .. } => location.as_ref(),
            Symbol::Builtin { .. } | Symbol::Call { .. } => None,
        }
    }

    pub fn as_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let basename = name.trim_start_matches('*').split('.').next().unwrap_or("").to_string();
        Symbol::Name {
            name,
            basename,
            location: None,
        }
    }

    pub fn as_name_with_location(name: impl Into<String>, location: Location) -> Self {
        match Symbol::as_name(name) {
            Symbol::Name { name, basename, .. } => Symbol::Name {
                name,
                basename,
                location: Some(location),
            },
            _ => unreachable!(),
        }
    }

    pub fn basename(&self) -> Option<&str> {
        match self {
            Symbol::Name { basename, .. } => Some(basename),
            _ => None,
        }
    }
}

impl CallTarget {
    pub fn from_symbol(symbol: &Symbol) -> Option<CallTarget> {
        match symbol {
            Symbol::Func {
                name,
                interface,
                is_async,
                location,
            } => Some(CallTarget::Func {
                name: name.clone(),
                interface: interface.clone(),
                is_async: *is_async,
                location: location.clone(),
            }),
            Symbol::Class {
                name,
                interface,
                location,
            } => Some(CallTarget::Class {
                name: name.clone(),
                interface: interface.clone(),
                location: location.clone(),
            }),
            Symbol::Builtin { name, has_affect } => Some(CallTarget::Builtin {
                name: name.clone(),
                has_affect: *has_affect,
            }),
            Symbol::Import {
                name,
                qualified_name,
                module_name,
                ..
            } => Some(CallTarget::Import {
                name: name.clone(),
                qualified_name: qualified_name.clone(),
                module_name: module_name.clone(),
            }),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CallTarget::Func { name, .. }
            | CallTarget::Class { name, .. }
            | CallTarget::Builtin { name, .. }
            | CallTarget::Import { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_name_splits_basename_from_attribute_path() {
        let s = Symbol::as_name("a.b.c");
        assert_eq!(s.basename(), Some("a"));
        assert_eq!(s.name(), "a.b.c");
    }

    #[test]
    fn as_name_strips_leading_star_for_basename() {
        let s = Symbol::as_name("*args");
        assert_eq!(s.basename(), Some("args"));
        assert_eq!(s.name(), "*args");
    }

    #[test]
    fn call_interface_all_orders_params_correctly() {
        let iface = CallInterface {
            posonlyargs: vec!["a".into()],
            args: vec!["b".into()],
            vararg: Some("args".into()),
            kwonlyargs: vec!["c".into()],
            kwarg: Some("kwargs".into()),
        };
        assert_eq!(iface.all(), vec!["a", "b", "args", "c", "kwargs"]);
    }

    #[test]
    fn has_affect_true_only_for_attr_access_builtins() {
        assert!(has_affect("getattr"));
        assert!(!has_affect("len"));
    }

    #[test]
    fn symbol_serialization_round_trips() {
        let sym = Symbol::Func {
            name: "f".into(),
            interface: CallInterface::any(),
            is_async: false,
            location: None,
        };
        let json = serde_json::to_string(&sym).unwrap();
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(sym, back);
    }
}
