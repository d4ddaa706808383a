//! Data model for a pre-parsed syntax tree.
//!
//! The surface parser is out of scope (see `SPEC_FULL.md` §3): a run is
//! handed a syntax tree already, serialized as JSON in the shape this module
//! deserializes. The shape below tracks the subset of Python's `ast` module
//! grammar that the analyser actually dispatches on; node kinds with no
//! bearing on attribute/variable/call effects (formatted-string pieces,
//! `match` patterns, type-alias statements) are intentionally absent rather
//! than stubbed, since `Stmt`/`Expr` are open tagged enums and `serde` will
//! simply reject a tree that uses them -- a clear error beats a silent
//! no-op.

use serde::{Deserialize, Serialize};

use crate::location::Location;

pub type NodeId = u32;

/// Common position fields every node carries, matching CPython's
/// `lineno`/`col_offset`/`end_lineno`/`end_col_offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos {
    pub lineno: u32,
    pub col_offset: u32,
    #[serde(default)]
    pub end_lineno: Option<u32>,
    #[serde(default)]
    pub end_col_offset: Option<u32>,
}

impl Pos {
    pub fn to_location(&self, file: impl Into<std::path::PathBuf>) -> Location {
        let file = file.into();
        match (self.end_lineno, self.end_col_offset) {
            (Some(el), Some(ec)) => {
                Location::with_span(self.lineno, self.col_offset, el, ec, file)
            }
            _ => Location::new(self.lineno, self.col_offset, file),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arg {
    pub arg: String,
}

/// Mirrors `ast.arguments`: the five parameter classes a `CallInterface`
/// is built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub posonlyargs: Vec<Arg>,
    #[serde(default)]
    pub args: Vec<Arg>,
    #[serde(default)]
    pub vararg: Option<Arg>,
    #[serde(default)]
    pub kwonlyargs: Vec<Arg>,
    #[serde(default)]
    pub kwarg: Option<Arg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    /// `None` denotes `**expr` unpacking.
    #[serde(default)]
    pub arg: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    #[serde(default)]
    pub asname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comprehension {
    pub target: Expr,
    pub iter: Expr,
    #[serde(default)]
    pub ifs: Vec<Expr>,
    #[serde(default)]
    pub is_async: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptHandler {
    #[serde(default)]
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithItem {
    pub context_expr: Expr,
    #[serde(default)]
    pub optional_vars: Option<Expr>,
}

/// A top-level or nested statement.
///
/// Tagged by `kind`, one variant per `ast.stmt` subclass the analyser cares
/// about. `#[serde(flatten)]`-ed `Pos` carries the span every node has.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Stmt {
    Import {
        names: Vec<Alias>,
        #[serde(flatten)]
        pos: Pos,
    },
    ImportFrom {
        #[serde(default)]
        module: Option<String>,
        names: Vec<Alias>,
        #[serde(default)]
        level: u32,
        #[serde(flatten)]
        pos: Pos,
    },
    Assign {
        targets: Vec<Expr>,
        value: Expr,
        #[serde(flatten)]
        pos: Pos,
    },
    AnnAssign {
        target: Expr,
        #[serde(default)]
        value: Option<Expr>,
        #[serde(flatten)]
        pos: Pos,
    },
    AugAssign {
        target: Expr,
        value: Expr,
        #[serde(flatten)]
        pos: Pos,
    },
    Delete {
        targets: Vec<Expr>,
        #[serde(flatten)]
        pos: Pos,
    },
    FunctionDef {
        name: String,
        args: Arguments,
        body: Vec<Stmt>,
        #[serde(default)]
        decorator_list: Vec<Expr>,
        #[serde(default)]
        is_async: bool,
        #[serde(flatten)]
        pos: Pos,
    },
    ClassDef {
        name: String,
        #[serde(default)]
        bases: Vec<Expr>,
        body: Vec<Stmt>,
        #[serde(default)]
        decorator_list: Vec<Expr>,
        #[serde(flatten)]
        pos: Pos,
    },
    Return {
        #[serde(default)]
        value: Option<Expr>,
        #[serde(flatten)]
        pos: Pos,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        orelse: Vec<Stmt>,
        #[serde(flatten)]
        pos: Pos,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        orelse: Vec<Stmt>,
        #[serde(default)]
        is_async: bool,
        #[serde(flatten)]
        pos: Pos,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        orelse: Vec<Stmt>,
        #[serde(flatten)]
        pos: Pos,
    },
    Try {
        body: Vec<Stmt>,
        #[serde(default)]
        handlers: Vec<ExceptHandler>,
        #[serde(default)]
        orelse: Vec<Stmt>,
        #[serde(default)]
        finalbody: Vec<Stmt>,
        #[serde(flatten)]
        pos: Pos,
    },
    With {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
        #[serde(default)]
        is_async: bool,
        #[serde(flatten)]
        pos: Pos,
    },
    Expr {
        value: Expr,
        #[serde(flatten)]
        pos: Pos,
    },
    Global {
        names: Vec<String>,
        #[serde(flatten)]
        pos: Pos,
    },
    Nonlocal {
        names: Vec<String>,
        #[serde(flatten)]
        pos: Pos,
    },
    Pass {
        #[serde(flatten)]
        pos: Pos,
    },
}

impl Stmt {
    pub fn pos(&self) -> &Pos {
        match self {
            Stmt::Import { pos, .. }
            | Stmt::ImportFrom { pos, .. }
            | Stmt::Assign { pos, .. }
            | Stmt::AnnAssign { pos, .. }
            | Stmt::AugAssign { pos, .. }
            | Stmt::Delete { pos, .. }
            | Stmt::FunctionDef { pos, .. }
            | Stmt::ClassDef { pos, .. }
            | Stmt::Return { pos, .. }
            | Stmt::If { pos, .. }
            | Stmt::For { pos, .. }
            | Stmt::While { pos, .. }
            | Stmt::Try { pos, .. }
            | Stmt::With { pos, .. }
            | Stmt::Expr { pos, .. }
            | Stmt::Global { pos, .. }
            | Stmt::Nonlocal { pos, .. }
            | Stmt::Pass { pos, .. } => pos,
        }
    }
}

/// An expression node.
///
/// `NamedExpr` is the walrus operator; `Starred` is `*x` in an assignment
/// target or call argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Expr {
    Name {
        id: String,
        #[serde(flatten)]
        pos: Pos,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
        #[serde(flatten)]
        pos: Pos,
    },
    Subscript {
        value: Box<Expr>,
        #[serde(flatten)]
        pos: Pos,
    },
    Call {
        func: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        keywords: Vec<Keyword>,
        #[serde(flatten)]
        pos: Pos,
    },
    Starred {
        value: Box<Expr>,
        #[serde(flatten)]
        pos: Pos,
    },
    Lambda {
        args: Arguments,
        body: Box<Expr>,
        #[serde(flatten)]
        pos: Pos,
    },
    Tuple {
        elts: Vec<Expr>,
        #[serde(flatten)]
        pos: Pos,
    },
    List {
        elts: Vec<Expr>,
        #[serde(flatten)]
        pos: Pos,
    },
    NamedExpr {
        target: Box<Expr>,
        value: Box<Expr>,
        #[serde(flatten)]
        pos: Pos,
    },
    ListComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
        #[serde(flatten)]
        pos: Pos,
    },
    SetComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
        #[serde(flatten)]
        pos: Pos,
    },
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        generators: Vec<Comprehension>,
        #[serde(flatten)]
        pos: Pos,
    },
    GeneratorExp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
        #[serde(flatten)]
        pos: Pos,
    },
    Constant {
        #[serde(default)]
        value: Option<serde_json::Value>,
        #[serde(flatten)]
        pos: Pos,
    },
    BinOp {
        #[serde(flatten)]
        pos: Pos,
    },
    UnaryOp {
        #[serde(flatten)]
        pos: Pos,
    },
    BoolOp {
        #[serde(flatten)]
        pos: Pos,
    },
    Compare {
        #[serde(flatten)]
        pos: Pos,
    },
    Dict {
        #[serde(flatten)]
        pos: Pos,
    },
    Set {
        #[serde(flatten)]
        pos: Pos,
    },
    IfExp {
        #[serde(flatten)]
        pos: Pos,
    },
}

impl Expr {
    pub fn pos(&self) -> &Pos {
        match self {
            Expr::Name { pos, .. }
            | Expr::Attribute { pos, .. }
            | Expr::Subscript { pos, .. }
            | Expr::Call { pos, .. }
            | Expr::Starred { pos, .. }
            | Expr::Lambda { pos, .. }
            | Expr::Tuple { pos, .. }
            | Expr::List { pos, .. }
            | Expr::NamedExpr { pos, .. }
            | Expr::ListComp { pos, .. }
            | Expr::SetComp { pos, .. }
            | Expr::DictComp { pos, .. }
            | Expr::GeneratorExp { pos, .. }
            | Expr::Constant { pos, .. }
            | Expr::BinOp { pos, .. }
            | Expr::UnaryOp { pos, .. }
            | Expr::BoolOp { pos, .. }
            | Expr::Compare { pos, .. }
            | Expr::Dict { pos, .. }
            | Expr::Set { pos, .. }
            | Expr::IfExp { pos, .. } => pos,
        }
    }

    /// The syntactic node-class name, used to synthesize `@ClassName`
    /// sentinel identifiers for un-nameable expressions (spec.md §4.1).
    pub fn class_name(&self) -> &'static str {
        match self {
            Expr::Name { .. } => "Name",
            Expr::Attribute { .. } => "Attribute",
            Expr::Subscript { .. } => "Subscript",
            Expr::Call { .. } => "Call",
            Expr::Starred { .. } => "Starred",
            Expr::Lambda { .. } => "Lambda",
            Expr::Tuple { .. } => "Tuple",
            Expr::List { .. } => "List",
            Expr::NamedExpr { .. } => "NamedExpr",
            Expr::ListComp { .. } => "ListComp",
            Expr::SetComp { .. } => "SetComp",
            Expr::DictComp { .. } => "DictComp",
            Expr::GeneratorExp { .. } => "GeneratorExp",
            Expr::Constant { .. } => "Constant",
            Expr::BinOp { .. } => "BinOp",
            Expr::UnaryOp { .. } => "UnaryOp",
            Expr::BoolOp { .. } => "BoolOp",
            Expr::Compare { .. } => "Compare",
            Expr::Dict { .. } => "Dict",
            Expr::Set { .. } => "Set",
            Expr::IfExp { .. } => "IfExp",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_minimal_function_def() {
        let json = r#"{
            "kind": "FunctionDef",
            "name": "f",
            "args": {"args": [{"arg": "x"}]},
            "body": [
                {"kind": "Return", "value": {"kind": "Name", "id": "x", "lineno": 1, "col_offset": 11},
                 "lineno": 1, "col_offset": 4}
            ],
            "lineno": 1,
            "col_offset": 0
        }"#;
        let stmt: Stmt = serde_json::from_str(json).unwrap();
        match stmt {
            Stmt::FunctionDef { name, args, body, .. } => {
                assert_eq!(name, "f");
                assert_eq!(args.args.len(), 1);
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected FunctionDef, got {other:?}"),
        }
    }

    #[test]
    fn expr_class_name_matches_node_kind() {
        let e = Expr::Attribute {
            value: Box::new(Expr::Name {
                id: "x".into(),
                pos: Pos {
                    lineno: 1,
                    col_offset: 0,
                    end_lineno: None,
                    end_col_offset: None,
                },
            }),
            attr: "y".into(),
            pos: Pos {
                lineno: 1,
                col_offset: 0,
                end_lineno: None,
                end_col_offset: None,
            },
        };
        assert_eq!(e.class_name(), "Attribute");
    }
}
