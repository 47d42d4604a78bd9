//! Path and point arithmetic over a [`Document`].
//!
//! Paths address nodes by child index from the root. Comparisons follow the usual rich-text
//! editor convention: a path and any of its ancestors compare as equal, so "is this node inside
//! the range" reduces to two comparisons against the range edges.

use std::cmp::Ordering;

use crate::core::{Document, Editor, ElementNode, Node, Point, Selection, clamp_to_char_boundary};
use crate::ops::Path;
use crate::plugin::{ChildConstraint, PluginRegistry};

/// A node yielded by [`Editor::nodes`] together with its path.
#[derive(Debug, Clone, Copy)]
pub struct NodeEntry<'a> {
    pub path: &'a [usize],
    pub node: &'a Node,
}

/// A block whose children are text leaves.
#[derive(Debug, Clone)]
pub struct TextBlock<'a> {
    pub path: Path,
    pub el: &'a ElementNode,
}

impl TextBlock<'_> {
    pub fn text(&self) -> String {
        self.el
            .children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        total_inline_text_len(&self.el.children)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn compare_paths(a: &[usize], b: &[usize]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

pub fn compare_points(a: &Point, b: &Point) -> Ordering {
    a.path.cmp(&b.path).then(a.offset.cmp(&b.offset))
}

/// Selection edges in document order.
pub fn ordered_selection_points(sel: &Selection) -> (Point, Point) {
    if compare_points(&sel.focus, &sel.anchor) == Ordering::Less {
        (sel.focus.clone(), sel.anchor.clone())
    } else {
        (sel.anchor.clone(), sel.focus.clone())
    }
}

pub fn node_ref<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (&first, rest) = path.split_first()?;
    let mut node = doc.children.get(first)?;
    for &ix in rest {
        node = match node {
            Node::Element(el) => el.children.get(ix)?,
            Node::Text(_) => return None,
        };
    }
    Some(node)
}

pub fn first_text_point(doc: &Document) -> Option<Point> {
    fn walk(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            let found = match node {
                Node::Text(_) => Some(Point::new(path.clone(), 0)),
                Node::Element(el) => walk(&el.children, path),
            };
            path.pop();
            if found.is_some() {
                return found;
            }
        }
        None
    }

    walk(&doc.children, &mut Vec::new())
}

/// End of the last text leaf at or below `path`.
pub fn last_text_point(doc: &Document, path: &[usize]) -> Option<Point> {
    fn walk(node: &Node, path: &mut Vec<usize>) -> Option<Point> {
        match node {
            Node::Text(t) => Some(Point::new(path.clone(), t.text.len())),
            Node::Element(el) => {
                for (ix, child) in el.children.iter().enumerate().rev() {
                    path.push(ix);
                    let found = walk(child, path);
                    path.pop();
                    if found.is_some() {
                        return found;
                    }
                }
                None
            }
        }
    }

    let node = node_ref(doc, path)?;
    walk(node, &mut path.to_vec())
}

pub fn element_is_text_block(el: &ElementNode, registry: &PluginRegistry) -> bool {
    match registry.node_specs().get(&el.kind).map(|s| s.children.clone()) {
        Some(ChildConstraint::InlineOnly) => true,
        Some(_) => false,
        None => !el.children.iter().any(|n| matches!(n, Node::Element(_))),
    }
}

pub fn text_blocks_in_order<'a>(doc: &'a Document, registry: &PluginRegistry) -> Vec<TextBlock<'a>> {
    fn walk<'a>(
        nodes: &'a [Node],
        path: &mut Vec<usize>,
        registry: &PluginRegistry,
        out: &mut Vec<TextBlock<'a>>,
    ) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };

            path.push(ix);

            if element_is_text_block(el, registry) {
                out.push(TextBlock {
                    path: path.clone(),
                    el,
                });
            } else {
                walk(&el.children, path, registry, out);
            }

            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), registry, &mut out);
    out
}

pub fn total_inline_text_len(children: &[Node]) -> usize {
    children
        .iter()
        .map(|n| match n {
            Node::Text(t) => t.text.len(),
            Node::Element(_) => 0,
        })
        .sum()
}

pub fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    let mut global = 0usize;
    for (ix, node) in children.iter().enumerate() {
        let Node::Text(t) = node else {
            continue;
        };
        if ix < child_ix {
            global += t.text.len();
            continue;
        }
        if ix == child_ix {
            global += clamp_to_char_boundary(&t.text, offset);
        }
        break;
    }
    global
}

/// Point for a block-global byte offset. At a leaf boundary the start of the following leaf wins.
pub fn point_for_global_offset(block_path: &[usize], children: &[Node], global_offset: usize) -> Point {
    let mut remaining = global_offset;
    for (child_ix, node) in children.iter().enumerate() {
        let Node::Text(t) = node else {
            continue;
        };
        if remaining < t.text.len() {
            let mut path = block_path.to_vec();
            path.push(child_ix);
            return Point::new(path, clamp_to_char_boundary(&t.text, remaining));
        }
        if remaining == t.text.len() {
            let mut path = block_path.to_vec();
            if matches!(children.get(child_ix + 1), Some(Node::Text(_))) {
                path.push(child_ix + 1);
                return Point::new(path, 0);
            }
            path.push(child_ix);
            return Point::new(path, t.text.len());
        }
        remaining -= t.text.len();
    }

    // Fallback to end of last text node.
    for (child_ix, node) in children.iter().enumerate().rev() {
        if let Node::Text(t) = node {
            let mut path = block_path.to_vec();
            path.push(child_ix);
            return Point::new(path, t.text.len());
        }
    }

    let mut path = block_path.to_vec();
    path.push(0);
    Point::new(path, 0)
}

pub fn is_point_in_block(point: &Point, block_path: &[usize]) -> bool {
    point.path.len() == block_path.len() + 1 && point.path.starts_with(block_path)
}

/// Where a point sits in the flat sequence of text blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOffset {
    pub block: usize,
    pub offset: usize,
}

impl Editor {
    /// Every node intersecting `at` in document order, filtered by `predicate`.
    ///
    /// The document root is never yielded.
    pub fn nodes<'a>(
        &'a self,
        at: &Selection,
        mut predicate: impl FnMut(&NodeEntry<'_>) -> bool,
    ) -> Vec<(Path, &'a Node)> {
        fn walk<'a>(
            children: &'a [Node],
            path: &mut Vec<usize>,
            start: &[usize],
            end: &[usize],
            predicate: &mut dyn FnMut(&NodeEntry<'_>) -> bool,
            out: &mut Vec<(Path, &'a Node)>,
        ) -> bool {
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                if compare_paths(path, end) == Ordering::Greater {
                    path.pop();
                    return false;
                }
                if compare_paths(path, start) != Ordering::Less {
                    let entry = NodeEntry {
                        path: path.as_slice(),
                        node,
                    };
                    if predicate(&entry) {
                        out.push((path.clone(), node));
                    }
                    if let Node::Element(el) = node
                        && !walk(&el.children, path, start, end, predicate, out)
                    {
                        path.pop();
                        return false;
                    }
                }
                path.pop();
            }
            true
        }

        let (start, end) = ordered_selection_points(at);
        let mut out = Vec::new();
        walk(
            &self.doc().children,
            &mut Vec::new(),
            &start.path,
            &end.path,
            &mut predicate,
            &mut out,
        );
        out
    }

    pub fn text_blocks(&self) -> Vec<TextBlock<'_>> {
        text_blocks_in_order(self.doc(), self.registry())
    }

    /// Resolve a point to its text block index and block-global byte offset.
    pub fn block_offset(&self, point: &Point) -> Option<BlockOffset> {
        let (child_ix, block_path) = point.path.split_last()?;
        let blocks = self.text_blocks();
        let block = blocks.iter().position(|b| b.path == block_path)?;
        let offset = point_global_offset(&blocks[block].el.children, *child_ix, point.offset);
        Some(BlockOffset { block, offset })
    }

    /// Inverse of [`Editor::block_offset`]; the offset is clamped to the block length.
    pub fn point_at(&self, at: BlockOffset) -> Option<Point> {
        let blocks = self.text_blocks();
        let block = blocks.get(at.block)?;
        let offset = at.offset.min(block.len());
        Some(point_for_global_offset(
            &block.path,
            &block.el.children,
            offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_compare_equal() {
        assert_eq!(compare_paths(&[0], &[0, 3]), Ordering::Equal);
        assert_eq!(compare_paths(&[0, 1], &[0, 3]), Ordering::Less);
        assert_eq!(compare_paths(&[2], &[1, 9]), Ordering::Greater);
    }

    #[test]
    fn ordered_points_swap_backward_selection() {
        let sel = Selection::new(Point::new(vec![1, 0], 2), Point::new(vec![0, 0], 4));
        let (start, end) = ordered_selection_points(&sel);
        assert_eq!(start.path, vec![0, 0]);
        assert_eq!(end.path, vec![1, 0]);
    }

    #[test]
    fn global_offsets_prefer_start_of_next_leaf() {
        let children = vec![
            Node::text("ab", Default::default()),
            Node::text("cd", Default::default()),
        ];
        assert_eq!(point_for_global_offset(&[0], &children, 2), Point::new(vec![0, 1], 0));
        assert_eq!(point_for_global_offset(&[0], &children, 4), Point::new(vec![0, 1], 2));
        assert_eq!(point_global_offset(&children, 1, 1), 3);
    }
}
