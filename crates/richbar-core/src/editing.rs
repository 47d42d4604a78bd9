//! Text editing on top of the op model: typing, deletion, block splits and caret movement.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::core::{ApplyError, Editor, Marks, Node, Point, Selection, clamp_to_char_boundary};
use crate::format::replace_children_ops;
use crate::location::{BlockOffset, node_ref, ordered_selection_points, point_for_global_offset};
use crate::ops::{Op, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Backward,
    Forward,
}

pub(crate) fn prev_boundary(text: &str, offset: usize) -> usize {
    if offset == 0 {
        return 0;
    }
    let mut ix = (offset - 1).min(text.len());
    while ix > 0 && !text.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

pub(crate) fn next_boundary(text: &str, offset: usize) -> usize {
    if offset >= text.len() {
        return text.len();
    }
    let mut ix = (offset + 1).min(text.len());
    while ix < text.len() && !text.is_char_boundary(ix) {
        ix += 1;
    }
    ix
}

/// Text leaves clipped to a block-global byte range. Empty pieces are dropped.
fn slice_children(children: &[Node], range: Range<usize>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cursor = 0usize;
    for node in children {
        let Node::Text(t) = node else {
            continue;
        };
        let node_start = cursor;
        cursor += t.text.len();

        let start = clamp_to_char_boundary(&t.text, range.start.saturating_sub(node_start));
        let end = clamp_to_char_boundary(&t.text, range.end.saturating_sub(node_start));
        if start < end {
            out.push(Node::text(&t.text[start..end], t.marks));
        }
    }
    out
}

/// Marks of the leaf holding `offset`, used for the empty leaf left behind by a split.
fn leaf_marks_at(children: &[Node], offset: usize) -> Marks {
    let mut cursor = 0usize;
    let mut last = Marks::default();
    for node in children {
        let Node::Text(t) = node else {
            continue;
        };
        last = t.marks;
        cursor += t.text.len();
        if offset < cursor {
            break;
        }
    }
    last
}

/// The leaf holding all of a non-empty block-global range, with the range made leaf-local.
fn leaf_range(children: &[Node], range: Range<usize>) -> Option<(usize, Range<usize>)> {
    let mut cursor = 0usize;
    for (child_ix, node) in children.iter().enumerate() {
        let Node::Text(t) = node else {
            continue;
        };
        let node_start = cursor;
        cursor += t.text.len();
        if range.start >= node_start && range.start < cursor {
            return (range.end <= cursor)
                .then(|| (child_ix, range.start - node_start..range.end - node_start));
        }
    }
    None
}

fn or_empty_leaf(mut children: Vec<Node>, marks: Marks) -> Vec<Node> {
    if children.is_empty() {
        children.push(Node::text("", marks));
    }
    children
}

impl Editor {
    /// Insert `text` at the caret, replacing an expanded selection first.
    ///
    /// The inserted text carries [`Editor::marks`], so queued marks are consumed here.
    pub fn insert_text(&mut self, text: &str) -> Result<(), ApplyError> {
        if text.is_empty() {
            return Ok(());
        }
        let Some(selection) = self.selection().cloned() else {
            return Ok(());
        };

        let pending = self.pending_marks().copied();
        if selection.is_expanded() {
            self.delete_fragment()?;
        }
        let marks = pending.or_else(|| self.marks()).unwrap_or_default();

        let Some(point) = self.selection().map(|sel| sel.focus.clone()) else {
            return Ok(());
        };
        let Some(Node::Text(leaf)) = node_ref(self.doc(), &point.path) else {
            return Err(ApplyError::InvalidPath("Caret is not in a text leaf".into()));
        };
        let offset = clamp_to_char_boundary(&leaf.text, point.offset);

        let tx = if leaf.marks == marks {
            Transaction::new(vec![Op::InsertText {
                path: point.path.clone(),
                offset,
                text: text.to_string(),
            }])
            .selection_after(Selection::collapsed(Point::new(
                point.path.clone(),
                offset + text.len(),
            )))
        } else {
            let Some((&child_ix, block_path)) = point.path.split_last() else {
                return Err(ApplyError::InvalidPath("Caret is not in a block".into()));
            };
            let mut pieces = Vec::new();
            if offset > 0 {
                pieces.push(Node::text(&leaf.text[..offset], leaf.marks));
            }
            let caret_ix = child_ix + pieces.len();
            pieces.push(Node::text(text, marks));
            if offset < leaf.text.len() {
                pieces.push(Node::text(&leaf.text[offset..], leaf.marks));
            }

            let mut ops = vec![Op::RemoveNode {
                path: point.path.clone(),
            }];
            for (i, node) in pieces.into_iter().enumerate() {
                let mut path = block_path.to_vec();
                path.push(child_ix + i);
                ops.push(Op::InsertNode { path, node });
            }
            let mut caret_path = block_path.to_vec();
            caret_path.push(caret_ix);
            Transaction::new(ops)
                .selection_after(Selection::collapsed(Point::new(caret_path, text.len())))
        };

        self.apply(tx.source("command:text.insert"))?;
        self.set_pending_marks(None);
        Ok(())
    }

    /// Insert text that may contain line breaks, splitting the block at each one.
    pub fn insert_lines(&mut self, text: &str) -> Result<(), ApplyError> {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        for (ix, line) in text.split('\n').enumerate() {
            if ix > 0 {
                self.insert_break()?;
            }
            self.insert_text(line)?;
        }
        Ok(())
    }

    /// Remove the content of an expanded selection, joining its first and last blocks.
    pub fn delete_fragment(&mut self) -> Result<(), ApplyError> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(());
        };
        if selection.is_collapsed() {
            return Ok(());
        }

        let (start, end) = ordered_selection_points(&selection);
        let (Some(from), Some(to)) = (self.block_offset(&start), self.block_offset(&end)) else {
            return Err(ApplyError::InvalidPath("Selection is not in a text block".into()));
        };
        if from.block == to.block {
            return self.remove_in_block(
                from.block,
                from.offset..to.offset,
                "command:text.delete_fragment",
            );
        }

        let (ops, caret) = {
            let blocks = self.text_blocks();
            let first = &blocks[from.block];
            let last = &blocks[to.block];

            let mut children = slice_children(&first.el.children, 0..from.offset);
            children.extend(slice_children(&last.el.children, to.offset..last.len()));
            let children =
                or_empty_leaf(children, leaf_marks_at(&first.el.children, from.offset));

            let mut ops = Vec::new();
            for block in blocks[from.block + 1..=to.block].iter().rev() {
                ops.push(Op::RemoveNode {
                    path: block.path.clone(),
                });
            }
            let caret = point_for_global_offset(&first.path, &children, from.offset);
            ops.extend(replace_children_ops(
                &first.path,
                first.el.children.len(),
                children,
            ));
            (ops, caret)
        };

        self.apply(
            Transaction::new(ops)
                .selection_after(Selection::collapsed(caret))
                .source("command:text.delete_fragment"),
        )
    }

    pub fn delete_backward(&mut self) -> Result<(), ApplyError> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(());
        };
        if selection.is_expanded() {
            return self.delete_fragment();
        }
        let Some(at) = self.block_offset(&selection.focus) else {
            return Ok(());
        };

        if at.offset > 0 {
            let start = {
                let blocks = self.text_blocks();
                prev_boundary(&blocks[at.block].text(), at.offset)
            };
            self.remove_in_block(at.block, start..at.offset, "command:text.delete_backward")
        } else if at.block > 0 {
            self.merge_with_next(at.block - 1, "command:text.delete_backward")
        } else {
            Ok(())
        }
    }

    pub fn delete_forward(&mut self) -> Result<(), ApplyError> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(());
        };
        if selection.is_expanded() {
            return self.delete_fragment();
        }
        let Some(at) = self.block_offset(&selection.focus) else {
            return Ok(());
        };

        let (len, end, block_count) = {
            let blocks = self.text_blocks();
            let text = blocks[at.block].text();
            (text.len(), next_boundary(&text, at.offset), blocks.len())
        };

        if at.offset < len {
            self.remove_in_block(at.block, at.offset..end, "command:text.delete_forward")
        } else if at.block + 1 < block_count {
            self.merge_with_next(at.block, "command:text.delete_forward")
        } else {
            Ok(())
        }
    }

    /// Split the current block at the caret. The new block keeps the block type and leaf marks.
    pub fn insert_break(&mut self) -> Result<(), ApplyError> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(());
        };
        if selection.is_expanded() {
            self.delete_fragment()?;
        }
        let Some(at) = self
            .selection()
            .and_then(|sel| self.block_offset(&sel.focus))
        else {
            return Ok(());
        };

        let (ops, caret) = {
            let blocks = self.text_blocks();
            let block = &blocks[at.block];
            let children = &block.el.children;
            let marks = leaf_marks_at(children, at.offset);

            let left = or_empty_leaf(slice_children(children, 0..at.offset), marks);
            let right = or_empty_leaf(slice_children(children, at.offset..block.len()), marks);

            let Some((&block_ix, parent_path)) = block.path.split_last() else {
                return Err(ApplyError::InvalidPath("Block has an empty path".into()));
            };
            let mut new_path = parent_path.to_vec();
            new_path.push(block_ix + 1);

            let mut ops = replace_children_ops(&block.path, children.len(), left);
            ops.push(Op::InsertNode {
                path: new_path.clone(),
                node: Node::block(block.el.kind.clone(), right),
            });
            new_path.push(0);
            (ops, Point::new(new_path, 0))
        };

        self.apply(
            Transaction::new(ops)
                .selection_after(Selection::collapsed(caret))
                .source("command:text.insert_break"),
        )
    }

    /// Move the focus by one character. Without `extend` the selection collapses.
    pub fn move_caret(&mut self, direction: Direction, extend: bool) {
        let Some(selection) = self.selection().cloned() else {
            return;
        };

        if !extend && selection.is_expanded() {
            let (start, end) = ordered_selection_points(&selection);
            let target = match direction {
                Direction::Backward => start,
                Direction::Forward => end,
            };
            self.select(Selection::collapsed(target));
            return;
        }

        let Some(at) = self.block_offset(&selection.focus) else {
            return;
        };
        let Some(next) = self.step(at, direction) else {
            return;
        };
        let Some(focus) = self.point_at(next) else {
            return;
        };

        // Shrinking back onto the anchor leaves a caret, not an empty range.
        let back_on_anchor = self.block_offset(&selection.anchor) == Some(next);
        if extend && !back_on_anchor {
            self.select(Selection::new(selection.anchor, focus));
        } else {
            self.select(Selection::collapsed(focus));
        }
    }

    pub fn select_all(&mut self) {
        let edges = {
            let blocks = self.text_blocks();
            match (blocks.first(), blocks.last()) {
                (Some(first), Some(last)) => Some((
                    point_for_global_offset(&first.path, &first.el.children, 0),
                    point_for_global_offset(&last.path, &last.el.children, last.len()),
                )),
                _ => None,
            }
        };
        if let Some((anchor, focus)) = edges {
            self.select(Selection::new(anchor, focus));
        }
    }

    /// Select between two block offsets.
    pub fn select_offsets(&mut self, anchor: BlockOffset, focus: BlockOffset) {
        let (Some(anchor), Some(focus)) = (self.point_at(anchor), self.point_at(focus)) else {
            return;
        };
        self.select(Selection::new(anchor, focus));
    }

    /// Plain text covered by the selection, one line per block.
    pub fn selected_text(&self) -> String {
        let Some(selection) = self.selection() else {
            return String::new();
        };
        let (start, end) = ordered_selection_points(selection);
        let (Some(from), Some(to)) = (self.block_offset(&start), self.block_offset(&end)) else {
            return String::new();
        };

        let blocks = self.text_blocks();
        let mut lines = Vec::with_capacity(to.block + 1 - from.block);
        for (ix, block) in blocks.iter().enumerate().take(to.block + 1).skip(from.block) {
            let text = block.text();
            let a = if ix == from.block { from.offset.min(text.len()) } else { 0 };
            let b = if ix == to.block { to.offset.min(text.len()) } else { text.len() };
            lines.push(text.get(a..b.max(a)).unwrap_or_default().to_string());
        }
        lines.join("\n")
    }

    fn step(&self, at: BlockOffset, direction: Direction) -> Option<BlockOffset> {
        let blocks = self.text_blocks();
        let text = blocks.get(at.block)?.text();
        match direction {
            Direction::Backward if at.offset > 0 => Some(BlockOffset {
                block: at.block,
                offset: prev_boundary(&text, at.offset),
            }),
            Direction::Backward => {
                let block = at.block.checked_sub(1)?;
                Some(BlockOffset {
                    block,
                    offset: blocks[block].len(),
                })
            }
            Direction::Forward if at.offset < text.len() => Some(BlockOffset {
                block: at.block,
                offset: next_boundary(&text, at.offset),
            }),
            Direction::Forward => {
                blocks.get(at.block + 1)?;
                Some(BlockOffset {
                    block: at.block + 1,
                    offset: 0,
                })
            }
        }
    }

    fn remove_in_block(
        &mut self,
        block: usize,
        range: Range<usize>,
        source: &str,
    ) -> Result<(), ApplyError> {
        let (ops, caret) = {
            let blocks = self.text_blocks();
            let Some(target) = blocks.get(block) else {
                return Ok(());
            };
            let children = &target.el.children;

            if let Some((child_ix, local)) = leaf_range(children, range.clone()) {
                let mut path = target.path.clone();
                path.push(child_ix);
                let caret = Point::new(path.clone(), local.start);
                (vec![Op::RemoveText { path, range: local }], caret)
            } else {
                let mut kept = slice_children(children, 0..range.start);
                kept.extend(slice_children(children, range.end..target.len()));
                let kept = or_empty_leaf(kept, leaf_marks_at(children, range.start));
                let caret = point_for_global_offset(&target.path, &kept, range.start);
                (
                    replace_children_ops(&target.path, children.len(), kept),
                    caret,
                )
            }
        };

        self.apply(
            Transaction::new(ops)
                .selection_after(Selection::collapsed(caret))
                .source(source),
        )
    }

    /// Append the block after `block` to it. The surviving block keeps its type.
    fn merge_with_next(&mut self, block: usize, source: &str) -> Result<(), ApplyError> {
        let (ops, caret) = {
            let blocks = self.text_blocks();
            let (Some(first), Some(second)) = (blocks.get(block), blocks.get(block + 1)) else {
                return Ok(());
            };

            let mut children = slice_children(&first.el.children, 0..first.len());
            children.extend(slice_children(&second.el.children, 0..second.len()));
            let children = or_empty_leaf(children, leaf_marks_at(&first.el.children, 0));
            let caret = point_for_global_offset(&first.path, &children, first.len());

            let mut ops = vec![Op::RemoveNode {
                path: second.path.clone(),
            }];
            ops.extend(replace_children_ops(
                &first.path,
                first.el.children.len(),
                children,
            ));
            (ops, caret)
        };

        self.apply(
            Transaction::new(ops)
                .selection_after(Selection::collapsed(caret))
                .source(source),
        )
    }
}
