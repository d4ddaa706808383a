//! Identifier normalization: the sole bridge between syntax and the
//! downstream set-based model (spec.md §4.1).
//!
//! Grounded on the original's newer `rattr/ast/util.py` normalization layer
//! rather than the deprecated free-function `get_basename_fullname_pair` in
//! `analyser/util.py`: same algorithm, expressed as a function over the
//! crate's own [`crate::ast::Expr`] instead of a dispatch keyed on Python's
//! `ast` node classes.

use crate::ast::Expr;

/// Sentinel prefix for synthesized identifiers standing in for syntactically
/// un-nameable expressions (literals, binary ops, comprehensions, ...).
pub const LITERAL_VALUE_PREFIX: &str = "@";

/// `(basename, fullname)` computed from an expression, per spec.md §4.1.
///
/// `safe`: if true, an un-nameable expression is given a synthesized
/// `@ClassName` pair instead of raising. Safe mode is used whenever the
/// analyser cannot guarantee the expression is in nameable position (e.g.
/// deep inside an argument list); strict mode is used for assignment
/// targets and other positions spec.md treats as hard errors.
pub fn basename_fullname_pair(expr: &Expr, safe: bool) -> Result<(String, String), NamingError> {
    match expr {
        Expr::Name { id, .. } => Ok((id.clone(), id.clone())),

        Expr::Attribute { value, attr, .. } => {
            let (basename, sub) = basename_fullname_pair(value, safe)?;
            Ok((basename, format!("{sub}.{attr}")))
        }

        Expr::Subscript { value, .. } => {
            let (basename, sub) = basename_fullname_pair(value, safe)?;
            Ok((basename, format!("{sub}[]")))
        }

        Expr::Starred { value, .. } => {
            let (basename, sub) = basename_fullname_pair(value, safe)?;
            Ok((basename, format!("*{sub}")))
        }

        // `unravel` deliberately stays false here even for a call to
        // `getattr`/`setattr`/`hasattr`/`delattr`: this path computes the
        // call's *own* identifier for call-target resolution, which must
        // keep its trailing `()`. The attribute-access builtins' own
        // object/attribute pair is unraveled separately, on demand, by
        // `xattr_object_fullname` -- see its callers in `plugins`.
        Expr::Call { func, .. } => {
            let (basename, sub) = basename_fullname_pair(func, safe)?;
            Ok((basename, format!("{sub}()")))
        }

        other => {
            if safe {
                let tag = other.class_name();
                Ok((
                    format!("{LITERAL_VALUE_PREFIX}{tag}"),
                    format!("{LITERAL_VALUE_PREFIX}{tag}"),
                ))
            } else {
                Err(NamingError::Unnameable {
                    class_name: other.class_name(),
                })
            }
        }
    }
}

/// Resolve the object/attribute fullname pair for a call to one of
/// `getattr`/`setattr`/`hasattr`/`delattr`, e.g. `getattr(o, "f")` →
/// `"o.f"`. Returns `None` if there are fewer than two arguments (the
/// caller falls back to treating the call as an ordinary call expression).
pub fn xattr_object_fullname(args: &[Expr], safe: bool) -> Result<Option<String>, NamingError> {
    if args.len() < 2 {
        return Ok(None);
    }
    let (_, obj_fullname) = basename_fullname_pair(&args[0], safe)?;
    let attr = match &args[1] {
        Expr::Constant {
            value: Some(serde_json::Value::String(s)),
            ..
        } => s.clone(),
        _ => return Ok(None),
    };
    Ok(Some(format!("{obj_fullname}.{attr}")))
}

pub fn basename(expr: &Expr) -> Result<String, NamingError> {
    Ok(basename_fullname_pair(expr, true)?.0)
}

pub fn fullname(expr: &Expr, safe: bool) -> Result<String, NamingError> {
    Ok(basename_fullname_pair(expr, safe)?.1)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    #[error("{class_name} is not nameable")]
    Unnameable { class_name: &'static str },
}

/// Flatten a (possibly nested Tuple/List) assignment target into its leaf
/// identifiers, per the original's `unravel_names`.
pub fn unravel_names(expr: &Expr, safe: bool) -> Result<Vec<String>, NamingError> {
    match expr {
        Expr::Tuple { elts, .. } | Expr::List { elts, .. } => {
            let mut out = Vec::new();
            for elt in elts {
                out.extend(unravel_names(elt, safe)?);
            }
            Ok(out)
        }
        other => Ok(vec![fullname(other, safe)?]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(lineno: u32, col_offset: u32) -> crate::ast::Pos {
        crate::ast::Pos {
            lineno,
            col_offset,
            end_lineno: None,
            end_col_offset: None,
        }
    }

    fn name_expr(id: &str) -> Expr {
        Expr::Name {
            id: id.to_string(),
            pos: pos(1, 0),
        }
    }

    #[test]
    fn bare_name_is_its_own_basename_and_fullname() {
        let e = name_expr("x");
        assert_eq!(basename_fullname_pair(&e, false).unwrap(), ("x".into(), "x".into()));
    }

    #[test]
    fn attribute_chain_accumulates_dotted_path() {
        let e = Expr::Attribute {
            value: Box::new(Expr::Attribute {
                value: Box::new(name_expr("a")),
                attr: "b".into(),
                pos: pos(1, 0),
            }),
            attr: "c".into(),
            pos: pos(1, 0),
        };
        let (base, full) = basename_fullname_pair(&e, false).unwrap();
        assert_eq!(base, "a");
        assert_eq!(full, "a.b.c");
    }

    #[test]
    fn subscript_elides_the_index() {
        let e = Expr::Subscript {
            value: Box::new(name_expr("a")),
            pos: pos(1, 0),
        };
        assert_eq!(basename_fullname_pair(&e, false).unwrap(), ("a".into(), "a[]".into()));
    }

    #[test]
    fn starred_prefixes_fullname_but_not_basename() {
        let e = Expr::Starred {
            value: Box::new(name_expr("args")),
            pos: pos(1, 0),
        };
        assert_eq!(
            basename_fullname_pair(&e, false).unwrap(),
            ("args".into(), "*args".into())
        );
    }

    #[test]
    fn plain_call_appends_call_parens() {
        let e = Expr::Call {
            func: Box::new(name_expr("f")),
            args: vec![],
            keywords: vec![],
            pos: pos(1, 0),
        };
        assert_eq!(basename_fullname_pair(&e, false).unwrap(), ("f".into(), "f()".into()));
    }

    #[test]
    fn getattr_call_fullname_keeps_call_parens() {
        // The call's own identifier always ends in `()`, even for
        // `getattr`/`setattr`/`hasattr`/`delattr` -- call-target resolution
        // depends on it. The unraveled `o.f` form is a separate, on-demand
        // computation the attribute-access plugins make for themselves.
        let e = Expr::Call {
            func: Box::new(name_expr("getattr")),
            args: vec![
                name_expr("o"),
                Expr::Constant {
                    value: Some(serde_json::Value::String("f".into())),
                    pos: pos(1, 0),
                },
            ],
            keywords: vec![],
            pos: pos(1, 0),
        };
        let (base, full) = basename_fullname_pair(&e, false).unwrap();
        assert_eq!(base, "getattr");
        assert_eq!(full, "getattr()");
    }

    #[test]
    fn xattr_object_fullname_unravels_getattr_arguments() {
        let args = vec![
            name_expr("o"),
            Expr::Constant {
                value: Some(serde_json::Value::String("f".into())),
                pos: pos(1, 0),
            },
        ];
        assert_eq!(
            xattr_object_fullname(&args, false).unwrap().as_deref(),
            Some("o.f")
        );
    }

    #[test]
    fn unnameable_expr_in_safe_mode_synthesizes_sentinel() {
        let e = Expr::BinOp { pos: pos(1, 0) };
        assert_eq!(
            basename_fullname_pair(&e, true).unwrap(),
            ("@BinOp".into(), "@BinOp".into())
        );
    }

    #[test]
    fn unnameable_expr_in_strict_mode_errors() {
        let e = Expr::BinOp { pos: pos(1, 0) };
        assert!(basename_fullname_pair(&e, false).is_err());
    }

    #[test]
    fn unravel_names_flattens_tuple_targets() {
        let e = Expr::Tuple {
            elts: vec![name_expr("a"), name_expr("b")],
            pos: pos(1, 0),
        };
        assert_eq!(unravel_names(&e, false).unwrap(), vec!["a", "b"]);
    }
}
