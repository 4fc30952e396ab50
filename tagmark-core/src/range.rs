//! Subtree range resolution
//!
//! The span of a heading "block" runs from the heading's own line through
//! the line before the next heading of equal-or-shallower level. This is
//! the shared primitive behind deleting, moving, and exporting blocks.
//!
//! Ranges silently go stale when the document changes size: always compute
//! against a freshly flattened snapshot, and refresh it after every edit.

use crate::markup::LineRange;
use crate::tree::HeadingNode;

/// Line span covering `ordered[index]` and all of its nested content.
///
/// `ordered` must be the pre-order flattening of the document's current
/// tree, and `line_count` the document's current number of lines.
pub fn subtree_range(line_count: usize, ordered: &[&HeadingNode], index: usize) -> LineRange {
    let node = ordered[index];
    let end = ordered[index + 1..]
        .iter()
        .find(|next| next.level <= node.level)
        .map(|next| next.range.start)
        .unwrap_or(line_count);
    LineRange::new(node.range.start, end)
}

/// Drop candidates whose block is fully contained in another candidate's
/// block, so that operating on an ancestor covers its selected descendants
/// exactly once. Returns surviving indices into `ordered`, in input order.
pub fn filter_nested(
    line_count: usize,
    ordered: &[&HeadingNode],
    candidates: &[usize],
) -> Vec<usize> {
    let ranges: Vec<LineRange> = candidates
        .iter()
        .map(|&i| subtree_range(line_count, ordered, i))
        .collect();

    candidates
        .iter()
        .enumerate()
        .filter(|&(ci, _)| {
            !ranges
                .iter()
                .enumerate()
                .any(|(oi, other)| oi != ci && other.contains(&ranges[ci]) && *other != ranges[ci])
        })
        .map(|(_, &i)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::MarkupKind;
    use crate::parse::parse;
    use crate::tree::{build_tree, flatten, HeadingNode};

    const DOC: &str = "\
# A
body a
## A1
body a1
body a1
### A1a
body
## A2
# B
body b
";

    fn with_flat<T>(text: &str, f: impl FnOnce(usize, &[&HeadingNode]) -> T) -> T {
        let line_count = text.split('\n').count();
        let roots = build_tree(&parse(text, MarkupKind::Markdown));
        let flat = flatten(&roots);
        f(line_count, &flat)
    }

    #[test]
    fn test_range_to_next_sibling() {
        with_flat(DOC, |lines, flat| {
            // A1 runs until A2
            assert_eq!(subtree_range(lines, flat, 1), LineRange::new(2, 7));
            // A1a runs until A2 (next level <= 3)
            assert_eq!(subtree_range(lines, flat, 2), LineRange::new(5, 7));
            // A2 runs until B
            assert_eq!(subtree_range(lines, flat, 3), LineRange::new(7, 8));
        });
    }

    #[test]
    fn test_range_extends_to_end_of_document() {
        with_flat(DOC, |lines, flat| {
            assert_eq!(subtree_range(lines, flat, 4), LineRange::new(8, lines));
        });
    }

    #[test]
    fn test_root_range_covers_descendants() {
        with_flat(DOC, |lines, flat| {
            let a = subtree_range(lines, flat, 0);
            assert_eq!(a, LineRange::new(0, 8));
            for i in 1..4 {
                assert!(a.contains(&subtree_range(lines, flat, i)));
            }
        });
    }

    #[test]
    fn test_ranges_never_overlap_siblings() {
        with_flat(DOC, |lines, flat| {
            for i in 0..flat.len() {
                let ri = subtree_range(lines, flat, i);
                assert!(ri.start >= flat[i].range.start);
                for j in 0..flat.len() {
                    if i == j {
                        continue;
                    }
                    let rj = subtree_range(lines, flat, j);
                    // Any two block ranges either nest or are disjoint
                    let nested = ri.contains(&rj) || rj.contains(&ri);
                    let disjoint = ri.end <= rj.start || rj.end <= ri.start;
                    assert!(nested || disjoint, "ranges {ri:?} and {rj:?} overlap");
                }
            }
        });
    }

    #[test]
    fn test_filter_nested_drops_contained_candidates() {
        with_flat(DOC, |lines, flat| {
            // A (idx 0) contains A1 (idx 1) and A1a (idx 2); B (idx 4) is
            // independent
            let kept = filter_nested(lines, flat, &[0, 1, 2, 4]);
            assert_eq!(kept, vec![0, 4]);
        });
    }

    #[test]
    fn test_filter_nested_keeps_disjoint_candidates() {
        with_flat(DOC, |lines, flat| {
            let kept = filter_nested(lines, flat, &[1, 3, 4]);
            assert_eq!(kept, vec![1, 3, 4]);
        });
    }

    #[test]
    fn test_single_heading_document() {
        with_flat("# Only\nbody\n", |lines, flat| {
            assert_eq!(subtree_range(lines, flat, 0), LineRange::new(0, lines));
        });
    }
}
