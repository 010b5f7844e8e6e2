//! Argument type inference for call-signature disambiguation (spec §2
//! component 4, §4.4). Bottom-up, best-effort, string-typed — grounded in
//! `original_source/src/comex/codeviews/CFG/CFG_c.py::get_argument_type`,
//! generalized with the C++-only literal/cast rules spec §4.4 adds.

use tree_sitter::Node;

use crate::classify::Lang;
use crate::model::{AstKey, NodeId};
use crate::symbols::{DeclarationMap, Index, SymbolTable};

pub const UNKNOWN: &str = "unknown";

/// Infers the best-effort type string of `node`, consulting `index` +
/// `declaration_map` + `symbol_table` for identifiers and recursing into
/// sub-expressions otherwise.
pub fn infer(
    node: Node,
    lang: Lang,
    code: &[u8],
    index: &dyn Index,
    declarations: &dyn DeclarationMap,
    symbols: &dyn SymbolTable,
) -> String {
    let text = |n: Node| -> &str { std::str::from_utf8(&code[n.start_byte()..n.end_byte()]).unwrap_or("") };

    match node.kind() {
        "identifier" | "field_identifier" => {
            let Some(use_id) = index.get(&AstKey::of(node)) else {
                return UNKNOWN.to_owned();
            };
            let Some(decl_id) = declarations.declaration_of(use_id) else {
                return UNKNOWN.to_owned();
            };
            symbols
                .data_type_of(decl_id)
                .map(str::to_owned)
                .unwrap_or_else(|| UNKNOWN.to_owned())
        }

        "number_literal" => {
            let raw = text(node).to_ascii_lowercase();
            if raw.contains('.') || (raw.contains('e') && !raw.starts_with("0x")) {
                if raw.ends_with('f') {
                    "float".to_owned()
                } else {
                    "double".to_owned()
                }
            } else if raw.ends_with("ll") {
                "long long".to_owned()
            } else if raw.ends_with('u') {
                "unsigned int".to_owned()
            } else if raw.ends_with('l') {
                "long".to_owned()
            } else {
                "int".to_owned()
            }
        }

        "string_literal" | "raw_string_literal" | "concatenated_string" => "char*".to_owned(),
        "char_literal" => "char".to_owned(),
        "true" | "false" => {
            if lang == Lang::Cpp {
                "bool".to_owned()
            } else {
                "int".to_owned()
            }
        }
        "null" => "void*".to_owned(),
        "nullptr" => "nullptr_t".to_owned(),

        "cast_expression" => node
            .child_by_field_name("type")
            .map(|t| text(t).to_owned())
            .unwrap_or_else(|| UNKNOWN.to_owned()),

        "parenthesized_expression" => node
            .named_child(0)
            .map(|c| infer(c, lang, code, index, declarations, symbols))
            .unwrap_or_else(|| UNKNOWN.to_owned()),

        "conditional_expression" => node
            .child_by_field_name("consequence")
            .map(|c| infer(c, lang, code, index, declarations, symbols))
            .unwrap_or_else(|| UNKNOWN.to_owned()),

        "comma_expression" => node
            .child_by_field_name("right")
            .or_else(|| node.named_child(node.named_child_count().saturating_sub(1)))
            .map(|c| infer(c, lang, code, index, declarations, symbols))
            .unwrap_or_else(|| UNKNOWN.to_owned()),

        "sizeof_expression" => "size_t".to_owned(),

        "update_expression" => node
            .named_child(0)
            .map(|c| infer(c, lang, code, index, declarations, symbols))
            .unwrap_or_else(|| UNKNOWN.to_owned()),

        "pointer_expression" => {
            let operator = node.child_by_field_name("operator").map(text);
            let operand = node.child_by_field_name("argument");
            match (operator, operand) {
                (Some("&"), Some(operand)) => {
                    let t = infer(operand, lang, code, index, declarations, symbols);
                    if t == UNKNOWN { t } else { format!("{t}*") }
                }
                (Some("*"), Some(operand)) => {
                    let t = infer(operand, lang, code, index, declarations, symbols);
                    t.strip_suffix('*').map(|s| s.trim_end().to_owned()).unwrap_or(t)
                }
                _ => UNKNOWN.to_owned(),
            }
        }

        "unary_expression" => {
            let operator = node.child_by_field_name("operator").map(text);
            let operand = node.child_by_field_name("argument");
            match (operator, operand) {
                (Some("&"), Some(operand)) => {
                    let t = infer(operand, lang, code, index, declarations, symbols);
                    if t == UNKNOWN { t } else { format!("{t}*") }
                }
                (Some("*"), Some(operand)) => {
                    let t = infer(operand, lang, code, index, declarations, symbols);
                    t.strip_suffix('*').map(|s| s.trim_end().to_owned()).unwrap_or(t)
                }
                (_, Some(operand)) => infer(operand, lang, code, index, declarations, symbols),
                _ => UNKNOWN.to_owned(),
            }
        }

        "binary_expression" => {
            let left = node.child_by_field_name("left");
            let right = node.child_by_field_name("right");
            match (left, right) {
                (Some(l), Some(r)) => {
                    let lt = infer(l, lang, code, index, declarations, symbols);
                    let rt = infer(r, lang, code, index, declarations, symbols);
                    promote(&lt, &rt)
                }
                _ => "int".to_owned(),
            }
        }

        "subscript_expression" => {
            let array = node.child_by_field_name("argument");
            match array {
                Some(a) => {
                    let t = infer(a, lang, code, index, declarations, symbols);
                    if let Some(stripped) = t.strip_suffix("[]") {
                        stripped.to_owned()
                    } else if let Some(stripped) = t.strip_suffix('*') {
                        stripped.trim_end().to_owned()
                    } else {
                        UNKNOWN.to_owned()
                    }
                }
                None => UNKNOWN.to_owned(),
            }
        }

        "field_expression" => UNKNOWN.to_owned(),

        "call_expression" => UNKNOWN.to_owned(),

        _ => UNKNOWN.to_owned(),
    }
}

/// Usual arithmetic promotion, simplified to the rule set spec §4.4 names:
/// any `double` wins, else any `float`, else any `long`, else whichever
/// operand resolved, else `int`.
fn promote(left: &str, right: &str) -> String {
    if left.contains("double") || right.contains("double") {
        "double".to_owned()
    } else if left.contains("float") || right.contains("float") {
        "float".to_owned()
    } else if left.contains("long") || right.contains("long") {
        "long".to_owned()
    } else if left != UNKNOWN {
        left.to_owned()
    } else if right != UNKNOWN {
        right.to_owned()
    } else {
        "int".to_owned()
    }
}

/// Constructor overload compatibility per spec §4.3: exact match, else
/// `(const T&)`/`(T&&)` specialization, else element-wise match stripping
/// qualifiers, with a `const char*`-to-any-`string` carve-out.
pub fn signatures_compatible(declared: &[String], supplied: &[String]) -> bool {
    if declared == supplied {
        return true;
    }
    if declared.len() != supplied.len() {
        return false;
    }
    declared
        .iter()
        .zip(supplied.iter())
        .all(|(d, s)| type_compatible(d, s))
}

fn strip_qualifiers(t: &str) -> String {
    t.replace("const", "")
        .replace('&', "")
        .replace('*', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn type_compatible(declared: &str, supplied: &str) -> bool {
    if declared == supplied {
        return true;
    }
    let d = strip_qualifiers(declared);
    let s = strip_qualifiers(supplied);
    if d == s {
        return true;
    }
    if d.contains("char") && s.contains("string") {
        return true;
    }
    if d.contains("string") && supplied.contains("char") && supplied.contains('*') {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_prefers_double_over_int() {
        assert_eq!(promote("double", "int"), "double");
        assert_eq!(promote("int", "int"), "int");
        assert_eq!(promote(UNKNOWN, "long"), "long");
    }

    #[test]
    fn signatures_compatible_allows_const_ref_and_move() {
        let declared = vec!["const T&".to_owned()];
        let supplied = vec!["T".to_owned()];
        assert!(signatures_compatible(&declared, &supplied));

        let declared = vec!["T&&".to_owned()];
        let supplied = vec!["T".to_owned()];
        assert!(signatures_compatible(&declared, &supplied));
    }

    #[test]
    fn signatures_compatible_treats_const_char_ptr_as_string_like() {
        let declared = vec!["std::string".to_owned()];
        let supplied = vec!["const char*".to_owned()];
        assert!(signatures_compatible(&declared, &supplied));
    }

    #[test]
    fn signatures_incompatible_on_arity_mismatch() {
        let declared = vec!["int".to_owned()];
        let supplied = vec!["int".to_owned(), "int".to_owned()];
        assert!(!signatures_compatible(&declared, &supplied));
    }
}
