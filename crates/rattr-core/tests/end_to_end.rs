//! Full-pipeline tests for the six literal scenarios: read a module, run
//! `file_analyser::analyse_module`, then `results::generate_results_from_ir`,
//! and check the resulting effect summary. Unlike the per-module unit tests,
//! these exercise the whole path a CLI run takes a file through.

use std::collections::BTreeSet;
use std::rc::Rc;

use rattr_core::diagnostics::DiagnosticSink;
use rattr_core::file_analyser::analyse_module;
use rattr_core::ir::ImportsIr;
use rattr_core::module_locator::{ModuleLocator, StaticModuleLocator};
use rattr_core::plugins::PluginRegistry;
use rattr_core::results::generate_results_from_ir;

fn locator() -> Rc<dyn ModuleLocator> {
    Rc::new(StaticModuleLocator::new())
}

fn module_from(json: serde_json::Value) -> rattr_core::ast::Module {
    serde_json::from_value(json).expect("fixture should deserialize")
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn run(module_json: serde_json::Value) -> rattr_core::results::FileResults {
    let module = module_from(module_json);
    let mut sink = DiagnosticSink::new();
    let plugins = PluginRegistry::with_builtins();
    let locator = locator();
    let (_ctx, file_ir) = analyse_module(&module, "m.py", locator.clone(), &plugins, &mut sink);
    let imports = ImportsIr::new();
    assert!(!sink.has_fatal(), "unexpected fatal diagnostic: {:?}", sink.diagnostics());
    generate_results_from_ir(&file_ir, &imports, locator.as_ref(), &mut sink)
}

// def f(x): return x.attr
#[test]
fn attribute_return_records_base_and_attribute_gets() {
    let results = run(serde_json::json!({
        "body": [{
            "kind": "FunctionDef", "name": "f",
            "args": {"args": [{"arg": "x"}]},
            "body": [{
                "kind": "Return",
                "value": {"kind": "Attribute",
                          "value": {"kind": "Name", "id": "x", "lineno": 1, "col_offset": 11},
                          "attr": "attr", "lineno": 1, "col_offset": 11},
                "lineno": 1, "col_offset": 4
            }],
            "lineno": 1, "col_offset": 0
        }]
    }));

    let f = results.get("f").expect("f should have a results record");
    assert_eq!(f.gets, set(&["x", "x.attr"]));
    assert!(f.sets.is_empty());
    assert!(f.dels.is_empty());
    assert!(f.calls.is_empty());
}

// def g(a): return sorted(a, key=lambda e: e.k)
#[test]
fn sorted_with_lambda_key_records_iterable_and_lambda_effects() {
    let results = run(serde_json::json!({
        "body": [{
            "kind": "FunctionDef", "name": "g",
            "args": {"args": [{"arg": "a"}]},
            "body": [{
                "kind": "Return",
                "value": {
                    "kind": "Call",
                    "func": {"kind": "Name", "id": "sorted", "lineno": 1, "col_offset": 11},
                    "args": [{"kind": "Name", "id": "a", "lineno": 1, "col_offset": 18}],
                    "keywords": [{
                        "arg": "key",
                        "value": {
                            "kind": "Lambda",
                            "args": {"args": [{"arg": "e"}]},
                            "body": {"kind": "Attribute",
                                     "value": {"kind": "Name", "id": "e", "lineno": 1, "col_offset": 30},
                                     "attr": "k", "lineno": 1, "col_offset": 30},
                            "lineno": 1, "col_offset": 21
                        }
                    }],
                    "lineno": 1, "col_offset": 11
                },
                "lineno": 1, "col_offset": 4
            }],
            "lineno": 1, "col_offset": 0
        }]
    }));

    let g = results.get("g").expect("g should have a results record");
    assert_eq!(g.gets, set(&["a", "a.k"]));
    assert_eq!(g.sets, set(&["e"]));
    assert_eq!(g.calls, set(&["sorted()"]));
}

// def h(o): setattr(o, "f", 1)
#[test]
fn setattr_call_records_get_of_target_and_set_of_attribute() {
    let results = run(serde_json::json!({
        "body": [{
            "kind": "FunctionDef", "name": "h",
            "args": {"args": [{"arg": "o"}]},
            "body": [{
                "kind": "Expr",
                "value": {
                    "kind": "Call",
                    "func": {"kind": "Name", "id": "setattr", "lineno": 1, "col_offset": 9},
                    "args": [
                        {"kind": "Name", "id": "o", "lineno": 1, "col_offset": 17},
                        {"kind": "Constant", "value": "f", "lineno": 1, "col_offset": 20},
                        {"kind": "Constant", "value": 1, "lineno": 1, "col_offset": 25}
                    ],
                    "lineno": 1, "col_offset": 9
                },
                "lineno": 1, "col_offset": 9
            }],
            "lineno": 1, "col_offset": 0
        }]
    }));

    let h = results.get("h").expect("h should have a results record");
    assert_eq!(h.gets, set(&["o"]));
    assert_eq!(h.sets, set(&["o.f"]));
    assert_eq!(h.calls, set(&["setattr()"]));
}

// def f(a): b = g(a); return b.x   /   def g(v): return v.y
#[test]
fn simplification_inlines_callees_effects_through_the_call_swap() {
    let results = run(serde_json::json!({
        "body": [
            {
                "kind": "FunctionDef", "name": "g",
                "args": {"args": [{"arg": "v"}]},
                "body": [{
                    "kind": "Return",
                    "value": {"kind": "Attribute",
                              "value": {"kind": "Name", "id": "v", "lineno": 1, "col_offset": 11},
                              "attr": "y", "lineno": 1, "col_offset": 11},
                    "lineno": 1, "col_offset": 4
                }],
                "lineno": 1, "col_offset": 0
            },
            {
                "kind": "FunctionDef", "name": "f",
                "args": {"args": [{"arg": "a"}]},
                "body": [
                    {
                        "kind": "Assign",
                        "targets": [{"kind": "Name", "id": "b", "lineno": 2, "col_offset": 0}],
                        "value": {
                            "kind": "Call",
                            "func": {"kind": "Name", "id": "g", "lineno": 2, "col_offset": 4},
                            "args": [{"kind": "Name", "id": "a", "lineno": 2, "col_offset": 6}],
                            "lineno": 2, "col_offset": 4
                        },
                        "lineno": 2, "col_offset": 0
                    },
                    {
                        "kind": "Return",
                        "value": {"kind": "Attribute",
                                  "value": {"kind": "Name", "id": "b", "lineno": 3, "col_offset": 11},
                                  "attr": "x", "lineno": 3, "col_offset": 11},
                        "lineno": 3, "col_offset": 4
                    }
                ],
                "lineno": 2, "col_offset": 0
            }
        ]
    }));

    let f = results.get("f").expect("f should have a results record");
    assert_eq!(f.gets, set(&["a", "a.y", "b.x"]));
    assert_eq!(f.sets, set(&["b"]));
    assert_eq!(f.calls, set(&["g()"]));
}

// def caller(t): return sum(x.attr for x in t)
#[test]
fn generator_expression_inside_a_call_records_comprehension_effects() {
    let results = run(serde_json::json!({
        "body": [{
            "kind": "FunctionDef", "name": "caller",
            "args": {"args": [{"arg": "t"}]},
            "body": [{
                "kind": "Return",
                "value": {
                    "kind": "Call",
                    "func": {"kind": "Name", "id": "sum", "lineno": 1, "col_offset": 11},
                    "args": [{
                        "kind": "GeneratorExp",
                        "elt": {"kind": "Attribute",
                                "value": {"kind": "Name", "id": "x", "lineno": 1, "col_offset": 15},
                                "attr": "attr", "lineno": 1, "col_offset": 15},
                        "generators": [{
                            "target": {"kind": "Name", "id": "x", "lineno": 1, "col_offset": 27},
                            "iter": {"kind": "Name", "id": "t", "lineno": 1, "col_offset": 32},
                            "ifs": [], "is_async": false
                        }],
                        "lineno": 1, "col_offset": 15
                    }],
                    "lineno": 1, "col_offset": 11
                },
                "lineno": 1, "col_offset": 4
            }],
            "lineno": 1, "col_offset": 0
        }]
    }));

    let caller = results.get("caller").expect("caller should have a results record");
    assert_eq!(caller.gets, set(&["t", "x.attr"]));
    assert_eq!(caller.sets, set(&["x"]));
    assert_eq!(caller.calls, set(&["sum()"]));
}

// class P(Enum): A = 1; B = 2
#[test]
fn enum_class_synthesizes_an_initialiser_that_gets_every_member() {
    let results = run(serde_json::json!({
        "body": [{
            "kind": "ClassDef", "name": "P",
            "bases": [{"kind": "Name", "id": "Enum", "lineno": 1, "col_offset": 0}],
            "body": [
                {
                    "kind": "Assign",
                    "targets": [{"kind": "Name", "id": "A", "lineno": 2, "col_offset": 0}],
                    "value": {"kind": "Constant", "value": 1, "lineno": 2, "col_offset": 4},
                    "lineno": 2, "col_offset": 0
                },
                {
                    "kind": "Assign",
                    "targets": [{"kind": "Name", "id": "B", "lineno": 3, "col_offset": 0}],
                    "value": {"kind": "Constant", "value": 2, "lineno": 3, "col_offset": 4},
                    "lineno": 3, "col_offset": 0
                }
            ],
            "lineno": 1, "col_offset": 0
        }]
    }));

    let p = results.get("P").expect("P should have a results record");
    assert_eq!(p.gets, set(&["P.A", "P.B"]));
}
