use tree_sitter::Node;

use crate::{get_str, rewrite::fresh::FreshNames, rewrite::TextEdit};

/// Collects two kinds of quantifier-bound normalization, run to a fixpoint
/// together with the rest of the rewrite pipeline:
///
/// - a single bound naming more than one identifier over a shared domain
///   (`v1, v2 \in S`) splits into one bound per identifier, each over its own
///   copy of the domain (`v1 \in S, v2 \in S`) — this is what lets a
///   `quantifier_bound` node always be destructured as exactly one binder
///   plus one domain everywhere it's consulted;
/// - a composite bound list (`\E v1 \in S, v2 \in T : E`) right-nests into a
///   chain of single-binder quantifiers (`\E v1 \in S : \E v2 \in T : E`).
///
/// Splitting a shared domain first and letting a later fixpoint iteration
/// re-discover the resulting multi-bound list as a composite list keeps both
/// rewrites independent and order-insensitive.
pub(crate) fn collect(node: Node<'_>, input: &str, _fresh: &FreshNames, edits: &mut Vec<TextEdit>) {
    if node.kind() == "bounded_quantification" {
        if let Some(edit) = rewrite_one(node, input) {
            edits.push(edit);
        }
    }
    if node.kind() == "quantifier_bound" {
        if let Some(edit) = rewrite_shared_domain(node, input) {
            edits.push(edit);
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect(child, input, _fresh, edits);
    }
}

/// Returns a [`TextEdit`] splitting `node` into one bound per identifier, if
/// it names more than one identifier over a single shared domain
/// (`v1, v2, ... \in S`). Leaves tuple-pattern binders (`<<a, b>> \in S`)
/// alone: those are a single destructuring binder, not multiple identifiers.
fn rewrite_shared_domain(node: Node<'_>, input: &str) -> Option<TextEdit> {
    let mut cursor = node.walk();
    let named: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    let (idents, domain) = named.split_last()?;
    if idents.len() < 2 || !idents.iter().all(|n| n.kind() == "identifier") {
        return None;
    }

    let domain_text = get_str(domain, input);
    let replacement = idents
        .iter()
        .map(|id| format!("{} \\in {domain_text}", get_str(id, input)))
        .collect::<Vec<_>>()
        .join(", ");

    Some(TextEdit {
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        replacement,
    })
}

/// Returns a single [`TextEdit`] replacing `node`'s whole span with a
/// right-nested chain, if `node` binds more than one name.
fn rewrite_one(node: Node<'_>, input: &str) -> Option<TextEdit> {
    let mut cursor = node.walk();
    let mut keyword: Option<&str> = None;
    let mut bounds = Vec::new();
    let mut body: Option<Node<'_>> = None;

    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "exists" => keyword = Some("\\E"),
            "forall" => keyword = Some("\\A"),
            "quantifier_bound" => bounds.push(child),
            _ => body = Some(child),
        }
    }

    if bounds.len() < 2 {
        return None;
    }

    let keyword = keyword?;
    let body = body?;

    let mut rewritten = String::new();
    for b in &bounds {
        rewritten.push_str(keyword);
        rewritten.push(' ');
        rewritten.push_str(get_str(b, input));
        rewritten.push_str(" : ");
    }
    rewritten.push_str(get_str(&body, input));

    Some(TextEdit {
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        replacement: rewritten,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rewrite::{apply_edits, parse_str};

    #[test]
    fn splits_composite_binder_into_chain() {
        let src = "---- MODULE M ----\nX == \\E a \\in S, b \\in T : a = b\n====";
        let tree = parse_str(src).unwrap();
        let fresh = FreshNames::default();
        let mut edits = Vec::new();
        collect(tree.root_node(), src, &fresh, &mut edits);
        assert_eq!(edits.len(), 1);
        let out = apply_edits(src, edits);
        assert!(out.contains("\\E a \\in S : \\E b \\in T : a = b"));
    }

    #[test]
    fn splits_shared_domain_into_separate_bounds() {
        let src = "---- MODULE M ----\nX == \\E a, b \\in S : a = b\n====";
        let tree = parse_str(src).unwrap();
        let fresh = FreshNames::default();
        let mut edits = Vec::new();
        collect(tree.root_node(), src, &fresh, &mut edits);
        assert_eq!(edits.len(), 1);
        let out = apply_edits(src, edits);
        assert!(out.contains("\\E a \\in S, b \\in S : a = b"));
    }

    #[test]
    fn leaves_tuple_pattern_binder_untouched() {
        let src = "---- MODULE M ----\nX == \\E <<a, b>> \\in S : a = b\n====";
        let tree = parse_str(src).unwrap();
        let fresh = FreshNames::default();
        let mut edits = Vec::new();
        collect(tree.root_node(), src, &fresh, &mut edits);
        assert!(edits.is_empty());
    }
}
