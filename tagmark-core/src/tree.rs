//! Heading tree construction
//!
//! Turns the parser's flat match list into a forest using a single
//! left-to-right pass over an explicit stack: a node at level L nests under
//! the nearest preceding node with level < L, and equal levels are siblings.

use std::collections::HashMap;

use crate::markup::{HeadingMatch, LineRange, MarkupKind};

/// One node of a per-document heading tree. Rebuilt on every document
/// change; `id` is only stable within a single parse pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadingNode {
    /// Derived from `(line, ordinal)`; do not persist across edits
    pub id: String,
    pub label: String,
    pub level: usize,
    pub kind: MarkupKind,
    pub range: LineRange,
    pub children: Vec<HeadingNode>,
}

impl HeadingNode {
    fn from_match(m: &HeadingMatch, ordinal: usize) -> Self {
        Self {
            id: node_id(m.line, ordinal),
            label: m.display_text.clone(),
            level: m.level,
            kind: m.kind,
            range: m.range,
            children: Vec::new(),
        }
    }
}

/// Deterministic node id for `(line, ordinal)` within one parse pass
pub fn node_id(line: usize, ordinal: usize) -> String {
    format!("{line}-{ordinal}")
}

/// Build the heading forest for an ordered match list.
pub fn build_tree(matches: &[HeadingMatch]) -> Vec<HeadingNode> {
    let mut roots: Vec<HeadingNode> = Vec::new();
    let mut stack: Vec<HeadingNode> = Vec::new();

    for (ordinal, m) in matches.iter().enumerate() {
        let node = HeadingNode::from_match(m, ordinal);

        // Pop everything at the same level or deeper; equal levels become
        // siblings, never parent/child
        while let Some(finished) = stack.pop_if(|top| top.level >= node.level) {
            match stack.last_mut() {
                Some(parent) => parent.children.push(finished),
                None => roots.push(finished),
            }
        }

        stack.push(node);
    }

    while let Some(finished) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(finished),
            None => roots.push(finished),
        }
    }

    roots
}

/// Pre-order flattening of a forest; preserves document line order.
pub fn flatten(roots: &[HeadingNode]) -> Vec<&HeadingNode> {
    let mut out = Vec::new();
    fn walk<'a>(nodes: &'a [HeadingNode], out: &mut Vec<&'a HeadingNode>) {
        for node in nodes {
            out.push(node);
            walk(&node.children, out);
        }
    }
    walk(roots, &mut out);
    out
}

/// Map from node id to parent id, built in one traversal. Roots are absent
/// from the map. Used instead of a per-lookup child search on hot paths.
pub fn parent_map(roots: &[HeadingNode]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    fn walk(node: &HeadingNode, map: &mut HashMap<String, String>) {
        for child in &node.children {
            map.insert(child.id.clone(), node.id.clone());
            walk(child, map);
        }
    }
    for root in roots {
        walk(root, &mut map);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn md_tree(text: &str) -> Vec<HeadingNode> {
        build_tree(&parse(text, MarkupKind::Markdown))
    }

    #[test]
    fn test_basic_nesting() {
        let roots = md_tree("# Title\n## Section 1\n### Sub 1.1\n## Section 2\n");
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].label, "Title");
        assert_eq!(roots[0].children.len(), 2);
        assert_eq!(roots[0].children[0].label, "Section 1");
        assert_eq!(roots[0].children[0].children.len(), 1);
        assert_eq!(roots[0].children[0].children[0].label, "Sub 1.1");
        assert_eq!(roots[0].children[1].label, "Section 2");
    }

    #[test]
    fn test_equal_levels_are_siblings() {
        let roots = md_tree("## A\n## B\n## C\n");
        assert_eq!(roots.len(), 3);
        assert!(roots.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn test_shallower_heading_closes_stack() {
        // H3 after H1 nests; the following H2 pops the H3 but stays under H1
        let roots = md_tree("# A\n### Deep\n## Shallow\n");
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children.len(), 2);
        assert_eq!(roots[0].children[0].label, "Deep");
        assert_eq!(roots[0].children[1].label, "Shallow");
    }

    #[test]
    fn test_no_top_level_root() {
        let roots = md_tree("## A\n### A1\n## B\n");
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].children.len(), 1);
        assert_eq!(roots[1].children.len(), 0);
    }

    #[test]
    fn test_flatten_preserves_parse_order() {
        let text = "# A\n### Deep\n## Mid\n# B\n## B1\n";
        let matches = parse(text, MarkupKind::Markdown);
        let roots = build_tree(&matches);
        let flat = flatten(&roots);

        assert_eq!(flat.len(), matches.len());
        for (node, m) in flat.iter().zip(&matches) {
            assert_eq!(node.range.start, m.line);
        }
    }

    #[test]
    fn test_node_ids_deterministic() {
        let matches = parse("# A\n## B\n", MarkupKind::Markdown);
        let roots = build_tree(&matches);
        assert_eq!(roots[0].id, "0-0");
        assert_eq!(roots[0].children[0].id, "1-1");
    }

    #[test]
    fn test_parent_map() {
        let roots = md_tree("# A\n## B\n### C\n## D\n# E\n");
        let flat = flatten(&roots);
        let parents = parent_map(&roots);

        let by_label = |label: &str| flat.iter().find(|n| n.label == label).unwrap().id.clone();

        assert_eq!(parents.get(&by_label("B")), Some(&by_label("A")));
        assert_eq!(parents.get(&by_label("C")), Some(&by_label("B")));
        assert_eq!(parents.get(&by_label("D")), Some(&by_label("A")));
        assert_eq!(parents.get(&by_label("A")), None);
        assert_eq!(parents.get(&by_label("E")), None);
    }

    #[test]
    fn test_typst_deep_levels() {
        let roots = build_tree(&parse("= A\n======= Deep\n== B\n", MarkupKind::Typst));
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children.len(), 2);
        assert_eq!(roots[0].children[0].level, 7);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_tree(&[]).is_empty());
        assert!(flatten(&[]).is_empty());
    }
}
