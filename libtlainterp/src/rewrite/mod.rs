//! Fixpoint textual rewriting of a parsed module, performed before
//! extraction and evaluation so that the rest of the interpreter only ever
//! has to deal with single-binder quantifiers and desugared membership
//! tests.

mod comments;
mod fresh;
mod membership;
mod quantifiers;

use tree_sitter::{Node, Parser, Tree};

use crate::error::{Error, Position};
use fresh::FreshNames;

/// A single textual substitution over a byte range of the source.
#[derive(Debug, Clone)]
pub(crate) struct TextEdit {
    pub(crate) start_byte: usize,
    pub(crate) end_byte: usize,
    pub(crate) replacement: String,
}

/// Parses `src` as a TLA+ module.
///
/// This does not check for `ERROR` nodes; callers that need a clean parse
/// should use [`rewrite`] instead, which does.
pub(crate) fn parse_str(src: &str) -> Result<Tree, Error> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_tlaplus::LANGUAGE.into())
        .expect("tree-sitter-tlaplus grammar is compiled into this binary");
    parser.parse(src, None).ok_or(Error::Parse {
        at: Position::default(),
    })
}

/// Splices non-overlapping `edits` into `src`, applying them in a single
/// pass from the end of the string backwards so earlier byte offsets stay
/// valid as later ones are consumed.
pub(crate) fn apply_edits(src: &str, mut edits: Vec<TextEdit>) -> String {
    edits.sort_by_key(|e| e.start_byte);
    let mut out = String::with_capacity(src.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.start_byte < cursor {
            // Overlapping edits from the same pass; keep the first and
            // drop the rest, they will be reconsidered next iteration.
            continue;
        }
        out.push_str(&src[cursor..edit.start_byte]);
        out.push_str(&edit.replacement);
        cursor = edit.end_byte;
    }
    out.push_str(&src[cursor..]);
    out
}

/// Returns the position of the first `ERROR` node in `tree`, if any.
fn first_error(node: Node<'_>) -> Option<Position> {
    if node.is_error() || node.kind() == "ERROR" {
        return Some(Position::from(&node));
    }
    if node.is_missing() {
        return Some(Position::from(&node));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(p) = first_error(child) {
            return Some(p);
        }
    }
    None
}

/// Runs the rewrite pipeline to a fixpoint: strip comments, parse, check for
/// `ERROR` nodes, collect quantifier-normalization and membership-desugaring
/// edits, splice them in, and repeat until no more edits are produced.
///
/// Returns the final rewritten source together with its parse tree.
pub(crate) fn rewrite(input: &str) -> Result<(String, Tree), Error> {
    let fresh = FreshNames::default();
    let mut src = {
        let tree = parse_str(input)?;
        comments::strip_comments(input, &tree)
    };

    loop {
        let tree = parse_str(&src)?;
        if let Some(at) = first_error(tree.root_node()) {
            return Err(Error::Parse { at });
        }

        let mut edits = Vec::new();
        quantifiers::collect(tree.root_node(), &src, &fresh, &mut edits);
        membership::collect(tree.root_node(), &src, &fresh, &mut edits);

        if edits.is_empty() {
            return Ok((src, tree));
        }

        src = apply_edits(&src, edits);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fixpoint_settles_when_no_rewrites_apply() {
        let src = "---- MODULE M ----\nX == 1 + 1\n====";
        let (out, _tree) = rewrite(src).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn applies_both_passes_together() {
        let src = "---- MODULE M ----\nX == \\E a \\in S, b \\in T : a \\in b\n====";
        let (out, _tree) = rewrite(src).unwrap();
        assert!(out.contains("\\E a \\in S : \\E b \\in T :"));
        assert!(out.contains("\\E rewrite_k0 \\in b : a = rewrite_k0"));
    }

    #[test]
    fn shared_domain_bound_nests_after_splitting() {
        let src = "---- MODULE M ----\nX == \\E a, b \\in S : a = b\n====";
        let (out, _tree) = rewrite(src).unwrap();
        assert!(out.contains("\\E a \\in S : \\E b \\in S : a = b"));
    }

    #[test]
    fn rejects_unparsable_input() {
        let src = "---- MODULE M ----\nX == ]][[\n====";
        assert!(rewrite(src).is_err());
    }
}
