use tree_sitter::{Node, Tree};

/// Erases every `comment` and `block_comment` node in `tree`, replacing the
/// comment's characters with spaces (newlines kept) so that line numbers in
/// the result still line up with `src` on a best-effort, line-granular
/// basis.
pub(crate) fn strip_comments(src: &str, tree: &Tree) -> String {
    let mut spans = Vec::new();
    collect_comment_spans(tree.root_node(), &mut spans);

    if spans.is_empty() {
        return src.to_string();
    }

    let mut out = src.as_bytes().to_vec();
    for (start, end) in spans {
        for b in &mut out[start..end] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    }
    String::from_utf8(out).expect("comment erasure preserves UTF-8 boundaries")
}

fn collect_comment_spans(node: Node<'_>, spans: &mut Vec<(usize, usize)>) {
    if matches!(node.kind(), "comment" | "block_comment") {
        spans.push((node.start_byte(), node.end_byte()));
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_comment_spans(child, spans);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rewrite::parse_str;

    #[test]
    fn strips_line_comment_preserving_length() {
        let src = "---- MODULE M ----\nX == 1 \\* a comment\n====";
        let tree = parse_str(src).unwrap();
        let out = strip_comments(src, &tree);
        assert!(!out.contains("comment"));
        assert_eq!(out.len(), src.len());
    }

    #[test]
    fn strips_multiline_block_comment() {
        let src = "---- MODULE M ----\nX == (* line one\nline two *) 1\n====";
        let tree = parse_str(src).unwrap();
        let out = strip_comments(src, &tree);
        assert!(!out.contains("line one"));
        assert_eq!(out.lines().count(), src.lines().count());
    }
}
