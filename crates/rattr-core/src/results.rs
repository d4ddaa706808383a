//! Results generation: flatten a simplified file IR into plain string sets,
//! the final artifact the CLI prints or caches (spec.md §4.10).
//!
//! Grounded on `results/util.py`'s `generate_results_from_ir`: the crate's
//! own `simplify::simplify_file_ir` already does the call-tree construction
//! and destructive simplification that function orchestrates, so this
//! module is left with only the last step -- projecting each simplified
//! `FunctionIr` down to four sorted sets of identifier strings.

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::DiagnosticSink;
use crate::ir::FileIr;
use crate::module_locator::ModuleLocator;
use crate::simplify::{simplify_file_ir, Environment};
use crate::symbol::Symbol;

/// One callable's effect summary, each set sorted for determinism
/// (spec.md §4.10).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CallableResults {
    pub gets: BTreeSet<String>,
    pub sets: BTreeSet<String>,
    pub dels: BTreeSet<String>,
    pub calls: BTreeSet<String>,
}

/// The results for every user-defined callable in one file, keyed by the
/// callable's identifier.
pub type FileResults = BTreeMap<String, CallableResults>;

/// Call-name for a `Symbol::Call`, used in the `calls` results set -- the
/// identifier the call was actually written as, not its resolved target.
fn call_id(symbol: &Symbol) -> Option<String> {
    match symbol {
        Symbol::Call { name, .. } => Some(name.clone()),
        _ => None,
    }
}

/// Simplify `target_ir` and project every callable's IR down to its
/// results record.
pub fn generate_results_from_ir(
    target_ir: &FileIr,
    imports: &crate::ir::ImportsIr,
    locator: &dyn ModuleLocator,
    sink: &mut DiagnosticSink,
) -> FileResults {
    let env = Environment {
        file_ir: target_ir,
        imports,
        locator,
    };
    let simplified = simplify_file_ir(target_ir, &env, sink);

    let mut results = FileResults::new();
    for (symbol, ir) in simplified.iter() {
        let record = CallableResults {
            gets: ir.gets.iter().map(|s| s.id().to_string()).collect(),
            sets: ir.sets.iter().map(|s| s.id().to_string()).collect(),
            dels: ir.dels.iter().map(|s| s.id().to_string()).collect(),
            calls: ir.calls.iter().filter_map(call_id).collect(),
        };
        results.insert(symbol.id().to_string(), record);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FunctionIr;
    use crate::module_locator::StaticModuleLocator;
    use crate::symbol::CallArguments;

    #[test]
    fn projects_a_simple_function_ir_into_sorted_string_sets() {
        let mut ir = FunctionIr::new();
        ir.gets.insert(Symbol::as_name("b"));
        ir.gets.insert(Symbol::as_name("a"));
        ir.calls.insert(Symbol::Call {
            name: "helper()".into(),
            args: CallArguments::default(),
            target: None,
        });

        let mut file_ir = FileIr::new();
        let f = Symbol::Func {
            name: "f".into(),
            interface: crate::symbol::CallInterface::any(),
            is_async: false,
            location: None,
        };
        file_ir.insert(f, ir);

        let locator = StaticModuleLocator::new();
        let imports = crate::ir::ImportsIr::new();
        let mut sink = DiagnosticSink::new();
        let _guard = crate::config::enter_file("m.py");
        let results = generate_results_from_ir(&file_ir, &imports, &locator, &mut sink);

        let record = results.get("f").expect("f should have a results record");
        assert_eq!(record.gets.iter().cloned().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.calls.iter().cloned().collect::<Vec<_>>(), vec!["helper()"]);
    }
}
