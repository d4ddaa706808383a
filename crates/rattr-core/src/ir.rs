//! The per-function effect summary and the per-file map of summaries
//! (spec.md §3's `FunctionIr`/`FileIr`/`ImportsIr`).

use std::collections::BTreeMap;

use indexmap::IndexSet;

use crate::symbol::Symbol;

/// Four deduplicated sets of symbols: what one callable gets, sets, deletes,
/// and calls. Deduplication is by `Symbol`'s structural equality.
#[derive(Debug, Clone, Default)]
pub struct FunctionIr {
    pub gets: IndexSet<Symbol>,
    pub sets: IndexSet<Symbol>,
    pub dels: IndexSet<Symbol>,
    pub calls: IndexSet<Symbol>,
}

impl FunctionIr {
    pub fn new() -> Self {
        FunctionIr::default()
    }

    pub fn union(&mut self, other: &FunctionIr) {
        self.gets.extend(other.gets.iter().cloned());
        self.sets.extend(other.sets.iter().cloned());
        self.dels.extend(other.dels.iter().cloned());
        self.calls.extend(other.calls.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.gets.is_empty() && self.sets.is_empty() && self.dels.is_empty() && self.calls.is_empty()
    }
}

/// The callable symbols a `FunctionIr` can be keyed by: user-defined
/// functions and classes (the original's `UserDefinedCallableSymbol`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CallableKey(pub String);

impl CallableKey {
    pub fn for_symbol(symbol: &Symbol) -> Option<CallableKey> {
        match symbol {
            Symbol::Func { name, .. } | Symbol::Class { name, .. } => {
                Some(CallableKey(name.clone()))
            }
            _ => None,
        }
    }
}

/// An ordered map from user-defined callable to its `FunctionIr`, plus the
/// root context the file was analysed against (kept so callers can resolve
/// call targets without re-threading context through every caller).
#[derive(Debug, Default)]
pub struct FileIr {
    pub functions: BTreeMap<CallableKey, (Symbol, FunctionIr)>,
}

impl FileIr {
    pub fn new() -> Self {
        FileIr::default()
    }

    pub fn insert(&mut self, symbol: Symbol, ir: FunctionIr) {
        if let Some(key) = CallableKey::for_symbol(&symbol) {
            self.functions.insert(key, (symbol, ir));
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&FunctionIr> {
        CallableKey::for_symbol(symbol).and_then(|key| self.functions.get(&key).map(|(_, ir)| ir))
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        CallableKey::for_symbol(symbol)
            .map(|key| self.functions.contains_key(&key))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &FunctionIr)> {
        self.functions.values().map(|(sym, ir)| (sym, ir))
    }
}

/// Map from module name to the `FileIr` produced for that module, built by
/// recursively analysing followed imports.
pub type ImportsIr = BTreeMap<String, FileIr>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_deduplicates_by_symbol_equality() {
        let mut a = FunctionIr::new();
        a.gets.insert(Symbol::as_name("x"));
        let mut b = FunctionIr::new();
        b.gets.insert(Symbol::as_name("x"));
        b.gets.insert(Symbol::as_name("y"));
        a.union(&b);
        assert_eq!(a.gets.len(), 2);
    }

    #[test]
    fn file_ir_roundtrips_lookup_by_symbol() {
        let mut file_ir = FileIr::new();
        let f = Symbol::Func {
            name: "f".into(),
            interface: crate::symbol::CallInterface::any(),
            is_async: false,
            location: None,
        };
        file_ir.insert(f.clone(), FunctionIr::new());
        assert!(file_ir.contains(&f));
        assert!(file_ir.get(&f).is_some());
    }
}
