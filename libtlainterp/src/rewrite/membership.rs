use tree_sitter::Node;

use crate::{get_str, rewrite::fresh::FreshNames, rewrite::TextEdit};

/// Collects rewrites desugaring `e \in S` into `(\E k \in S : e = k)` and
/// `e \notin S` into its negation.
///
/// Quantifier bound clauses (`v \in S` inside a `quantifier_bound` node) are
/// a distinct grammar production and are left untouched.
pub(crate) fn collect(node: Node<'_>, input: &str, fresh: &FreshNames, edits: &mut Vec<TextEdit>) {
    if node.kind() == "bound_infix_op" {
        if let Some(edit) = rewrite_one(node, input, fresh) {
            edits.push(edit);
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect(child, input, fresh, edits);
    }
}

fn rewrite_one(node: Node<'_>, input: &str, fresh: &FreshNames) -> Option<TextEdit> {
    let mut cursor = node.walk();
    let named: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    if named.len() != 3 {
        return None;
    }
    let (lhs, symbol, rhs) = (named[0], named[1], named[2]);

    let negate = match symbol.kind() {
        "in" | "set_in" => false,
        "notin" => true,
        _ => return None,
    };

    let k = fresh.next();
    let lhs_text = get_str(&lhs, input);
    let rhs_text = get_str(&rhs, input);
    let body = format!("(\\E {k} \\in {rhs_text} : {lhs_text} = {k})");
    let replacement = if negate { format!("(~{body})") } else { body };

    Some(TextEdit {
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        replacement,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rewrite::{apply_edits, parse_str};

    #[test]
    fn desugars_membership() {
        let src = "---- MODULE M ----\nX == 1 \\in S\n====";
        let tree = parse_str(src).unwrap();
        let fresh = FreshNames::default();
        let mut edits = Vec::new();
        collect(tree.root_node(), src, &fresh, &mut edits);
        assert_eq!(edits.len(), 1);
        let out = apply_edits(src, edits);
        assert!(out.contains("\\E rewrite_k0 \\in S : 1 = rewrite_k0"));
    }

    #[test]
    fn desugars_negated_membership() {
        let src = "---- MODULE M ----\nX == 1 \\notin S\n====";
        let tree = parse_str(src).unwrap();
        let fresh = FreshNames::default();
        let mut edits = Vec::new();
        collect(tree.root_node(), src, &fresh, &mut edits);
        let out = apply_edits(src, edits);
        assert!(out.contains("(~(\\E rewrite_k0 \\in S : 1 = rewrite_k0))"));
    }
}
