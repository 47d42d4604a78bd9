//! Block types, marks and the toggles the toolbar drives.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::core::{
    ApplyError, Editor, Marks, Node, Point, Selection, TextNode, clamp_to_char_boundary,
};
use crate::location::{
    compare_points, is_point_in_block, node_ref, ordered_selection_points, point_for_global_offset,
    point_global_offset, text_blocks_in_order, total_inline_text_len,
};
use crate::ops::{Op, Path, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Paragraph,
    H1,
    H2,
    H3,
    H4,
}

impl BlockType {
    pub const ALL: [BlockType; 5] = [
        BlockType::Paragraph,
        BlockType::H1,
        BlockType::H2,
        BlockType::H3,
        BlockType::H4,
    ];

    /// The element kind stored in the document.
    pub fn kind(self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::H1 => "h1",
            BlockType::H2 => "h2",
            BlockType::H3 => "h3",
            BlockType::H4 => "h4",
        }
    }

    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|block| block.kind() == kind)
    }

    pub fn label(self) -> &'static str {
        self.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Code,
}

impl Mark {
    pub const ALL: [Mark; 4] = [Mark::Bold, Mark::Italic, Mark::Underline, Mark::Code];

    pub fn name(self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Underline => "underline",
            Mark::Code => "code",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mark| mark.name() == name)
    }

    pub fn label(self) -> &'static str {
        self.name()
    }
}

impl Marks {
    pub fn get(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Underline => self.underline,
            Mark::Code => self.code,
        }
    }

    pub fn set(&mut self, mark: Mark, value: bool) {
        match mark {
            Mark::Bold => self.bold = value,
            Mark::Italic => self.italic = value,
            Mark::Underline => self.underline = value,
            Mark::Code => self.code = value,
        }
    }

    pub fn with(mut self, mark: Mark) -> Self {
        self.set(mark, true);
        self
    }

    pub fn is_empty(&self) -> bool {
        Mark::ALL.into_iter().all(|mark| !self.get(mark))
    }
}

impl Editor {
    /// True when any block touched by the selection has the given type.
    pub fn is_block_active(&self, block: BlockType) -> bool {
        let Some(selection) = self.selection() else {
            return false;
        };
        !self
            .nodes(selection, |entry| {
                matches!(entry.node, Node::Element(el) if el.kind == block.kind())
            })
            .is_empty()
    }

    /// Known block types touched by the selection, in toolbar order.
    pub fn active_block_types(&self) -> Vec<BlockType> {
        BlockType::ALL
            .into_iter()
            .filter(|block| self.is_block_active(*block))
            .collect()
    }

    /// Switch the selected blocks to `block`, or back to paragraph when it is already active.
    pub fn toggle_block(&mut self, block: BlockType) -> Result<(), ApplyError> {
        let target = if self.is_block_active(block) {
            BlockType::Paragraph
        } else {
            block
        };
        tracing::debug!(block = block.kind(), target = target.kind(), "toggle block");
        self.set_block_kind(target.kind())
    }

    /// Set the kind of every lowest block touched by the selection.
    pub fn set_block_kind(&mut self, kind: &str) -> Result<(), ApplyError> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(());
        };

        let ops: Vec<Op> = self
            .nodes(&selection, |entry| match entry.node {
                Node::Element(el) => !el.children.iter().any(|n| matches!(n, Node::Element(_))),
                Node::Text(_) => false,
            })
            .into_iter()
            .filter(|(_, node)| matches!(node, Node::Element(el) if el.kind != kind))
            .map(|(path, _)| Op::SetNodeKind {
                path,
                kind: kind.to_string(),
            })
            .collect();

        if ops.is_empty() {
            return Ok(());
        }

        self.apply(Transaction::new(ops).source("command:block.set"))
    }

    /// Marks that the next typed character would receive.
    ///
    /// Queued marks win. An expanded selection reports the first leaf it covers; a caret at the
    /// start of a leaf reports the leaf before it in the same block.
    pub fn marks(&self) -> Option<Marks> {
        let selection = self.selection()?;
        if let Some(marks) = self.pending_marks() {
            return Some(*marks);
        }

        let doc = self.doc();

        if !self.selects_nothing(selection) {
            let (mut start, end) = ordered_selection_points(selection);
            if let Some(Node::Text(leaf)) = node_ref(doc, &start.path)
                && start.offset >= leaf.text.len()
                && let Some(next) = self.next_leaf_start(&start.path)
                && compare_points(&next, &end) == Ordering::Less
            {
                start = next;
            }
            let range = Selection::new(start, end);
            let first = self
                .nodes(&range, |entry| matches!(entry.node, Node::Text(_)))
                .into_iter()
                .next();
            return Some(match first {
                Some((_, Node::Text(leaf))) => leaf.marks,
                _ => Marks::default(),
            });
        }

        let point = &selection.focus;
        let Some(Node::Text(leaf)) = node_ref(doc, &point.path) else {
            return Some(Marks::default());
        };
        if point.offset == 0
            && let Some((&child_ix, block_path)) = point.path.split_last()
            && child_ix > 0
        {
            let mut prev_path = block_path.to_vec();
            prev_path.push(child_ix - 1);
            if let Some(Node::Text(prev)) = node_ref(doc, &prev_path) {
                return Some(prev.marks);
            }
        }
        Some(leaf.marks)
    }

    pub fn is_mark_active(&self, mark: Mark) -> bool {
        self.marks().is_some_and(|marks| marks.get(mark))
    }

    pub fn toggle_mark(&mut self, mark: Mark) -> Result<(), ApplyError> {
        let active = self.is_mark_active(mark);
        tracing::debug!(mark = mark.name(), active, "toggle mark");
        self.set_mark(mark, !active, "command:marks.toggle")
    }

    pub fn add_mark(&mut self, mark: Mark) -> Result<(), ApplyError> {
        self.set_mark(mark, true, "command:marks.add")
    }

    pub fn remove_mark(&mut self, mark: Mark) -> Result<(), ApplyError> {
        self.set_mark(mark, false, "command:marks.remove")
    }

    fn set_mark(&mut self, mark: Mark, value: bool, source: &str) -> Result<(), ApplyError> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(());
        };

        if self.selects_nothing(&selection) {
            let mut marks = self.marks().unwrap_or_default();
            marks.set(mark, value);
            self.set_pending_marks(Some(marks));
            return Ok(());
        }

        let (ops, selection_after) = apply_mark_range(self, &selection, &|mut marks: Marks| {
            marks.set(mark, value);
            marks
        })?;
        if ops.is_empty() {
            return Ok(());
        }

        self.apply(
            Transaction::new(ops)
                .selection_after(selection_after)
                .source(source),
        )
    }

    /// True for a caret, and for a range whose ends sit at the same block offset (the end of one
    /// leaf and the start of the next).
    fn selects_nothing(&self, selection: &Selection) -> bool {
        selection.is_collapsed()
            || matches!(
                (self.block_offset(&selection.anchor), self.block_offset(&selection.focus)),
                (Some(anchor), Some(focus)) if anchor == focus
            )
    }

    /// Start of the text leaf following `path` in document order.
    fn next_leaf_start(&self, path: &[usize]) -> Option<Point> {
        let (&child_ix, block_path) = path.split_last()?;
        let blocks = self.text_blocks();
        let block_ix = blocks.iter().position(|b| b.path == block_path)?;

        if let Some(Node::Text(_)) = blocks[block_ix].el.children.get(child_ix + 1) {
            let mut next = block_path.to_vec();
            next.push(child_ix + 1);
            return Some(Point::new(next, 0));
        }

        let next_block = blocks.get(block_ix + 1)?;
        let ix = next_block
            .el
            .children
            .iter()
            .position(|n| matches!(n, Node::Text(_)))?;
        let mut next = next_block.path.clone();
        next.push(ix);
        Some(Point::new(next, 0))
    }
}

fn apply_marks_in_block(
    children: &[Node],
    start_global: usize,
    end_global: usize,
    apply: &dyn Fn(Marks) -> Marks,
) -> Vec<Node> {
    if start_global >= end_global {
        return children.to_vec();
    }

    let mut out: Vec<Node> = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let Node::Text(t) = node else {
            out.push(node.clone());
            continue;
        };
        let node_start = cursor;
        let node_end = cursor + t.text.len();
        cursor = node_end;

        if end_global <= node_start || start_global >= node_end {
            out.push(node.clone());
            continue;
        }

        let sel_start = clamp_to_char_boundary(&t.text, start_global.saturating_sub(node_start));
        let sel_end = clamp_to_char_boundary(&t.text, end_global.saturating_sub(node_start));

        if sel_start == 0 && sel_end == t.text.len() {
            out.push(Node::text(t.text.clone(), apply(t.marks)));
            continue;
        }

        let pieces = [
            (&t.text[..sel_start], t.marks),
            (&t.text[sel_start..sel_end], apply(t.marks)),
            (&t.text[sel_end..], t.marks),
        ];
        for (text, marks) in pieces {
            if !text.is_empty() {
                out.push(Node::Text(TextNode {
                    text: text.to_string(),
                    marks,
                }));
            }
        }
    }

    out
}

fn apply_mark_range(
    editor: &Editor,
    sel: &Selection,
    apply: &dyn Fn(Marks) -> Marks,
) -> Result<(Vec<Op>, Selection), ApplyError> {
    let (start, end) = ordered_selection_points(sel);
    let not_in_block = || ApplyError::InvalidPath("Selection is not in a text block".into());

    let (&start_inline_ix, start_block_path) = start.path.split_last().ok_or_else(not_in_block)?;
    let (&end_inline_ix, end_block_path) = end.path.split_last().ok_or_else(not_in_block)?;

    let blocks = text_blocks_in_order(editor.doc(), editor.registry());
    let start_index = blocks
        .iter()
        .position(|b| b.path == start_block_path)
        .ok_or_else(not_in_block)?;
    let end_index = blocks
        .iter()
        .position(|b| b.path == end_block_path)
        .ok_or_else(not_in_block)?;

    let mut ops: Vec<Op> = Vec::new();
    let mut new_anchor = sel.anchor.clone();
    let mut new_focus = sel.focus.clone();

    for (block_index, block) in blocks
        .iter()
        .enumerate()
        .take(end_index + 1)
        .skip(start_index)
    {
        let children = block.el.children.as_slice();
        let total_len = total_inline_text_len(children);
        if total_len == 0 {
            continue;
        }

        let start_global = if block_index == start_index {
            point_global_offset(children, start_inline_ix, start.offset)
        } else {
            0
        };
        let end_global = if block_index == end_index {
            point_global_offset(children, end_inline_ix, end.offset)
        } else {
            total_len
        };

        if start_global >= end_global {
            continue;
        }

        let new_children = apply_marks_in_block(children, start_global, end_global, apply);
        if new_children == children {
            continue;
        }

        // Only whole leaves changed: restyle them in place and keep every point.
        if new_children.len() == children.len() {
            for (child_ix, (old, new)) in children.iter().zip(&new_children).enumerate() {
                if let (Node::Text(old), Node::Text(new)) = (old, new)
                    && old.marks != new.marks
                {
                    let mut path = block.path.clone();
                    path.push(child_ix);
                    ops.push(Op::SetTextMarks {
                        path,
                        marks: new.marks,
                    });
                }
            }
            continue;
        }

        ops.extend(replace_children_ops(&block.path, children.len(), new_children.clone()));

        for point in [&mut new_anchor, &mut new_focus] {
            if is_point_in_block(point, &block.path) {
                let global = point_global_offset(
                    children,
                    point.path.last().copied().unwrap_or(0),
                    point.offset,
                );
                *point = point_for_global_offset(&block.path, &new_children, global);
            }
        }
    }

    Ok((
        ops,
        Selection {
            anchor: new_anchor,
            focus: new_focus,
        },
    ))
}

/// Ops that swap every child of the block at `block_path` for `new_children`.
pub(crate) fn replace_children_ops(
    block_path: &[usize],
    old_len: usize,
    new_children: Vec<Node>,
) -> Vec<Op> {
    let mut ops = Vec::with_capacity(old_len + new_children.len());
    for child_ix in (0..old_len).rev() {
        let mut remove_path: Path = block_path.to_vec();
        remove_path.push(child_ix);
        ops.push(Op::RemoveNode { path: remove_path });
    }
    for (child_ix, node) in new_children.into_iter().enumerate() {
        let mut insert_path: Path = block_path.to_vec();
        insert_path.push(child_ix);
        ops.push(Op::InsertNode {
            path: insert_path,
            node,
        });
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_split_partially_covered_leaves() {
        let children = vec![Node::text("abcd", Marks::default())];
        let out = apply_marks_in_block(&children, 1, 3, &|m| m.with(Mark::Bold));
        assert_eq!(
            out,
            vec![
                Node::text("a", Marks::default()),
                Node::text("bc", Marks::default().with(Mark::Bold)),
                Node::text("d", Marks::default()),
            ]
        );
    }

    #[test]
    fn block_and_mark_names_parse() {
        for block in BlockType::ALL {
            assert_eq!(BlockType::from_kind(block.kind()), Some(block));
        }
        for mark in Mark::ALL {
            assert_eq!(Mark::from_name(mark.name()), Some(mark));
        }
        assert_eq!(BlockType::from_kind("blockquote"), None);
        assert_eq!(Mark::from_name("strike"), None);
    }
}
