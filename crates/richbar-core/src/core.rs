use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::location::last_text_point;
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{CommandError, PluginRegistry, QueryError, TransactionPreview};

pub type ElementKind = String;

/// Text shown by the editor when it is first mounted.
pub const INITIAL_TEXT: &str = "Halo My Name is Naufal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::block("paragraph", vec![Self::text(text, Marks::default())])
    }

    pub fn block(kind: impl Into<ElementKind>, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind: kind.into(),
            children,
        })
    }

    pub fn text(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_expanded(&self) -> bool {
        !self.is_collapsed()
    }
}

/// The document shown by a freshly mounted editor: one `h1` block with italic text.
pub fn initial_document() -> Document {
    Document {
        children: vec![Node::block(
            "h1",
            vec![Node::text(
                INITIAL_TEXT,
                Marks {
                    italic: true,
                    ..Marks::default()
                },
            )],
        )],
    }
}

#[derive(Debug, Default)]
pub struct EditorConfig {
    pub max_normalize_iterations: usize,
}

impl EditorConfig {
    fn with_defaults(mut self) -> Self {
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = 100;
        }
        self
    }
}

pub struct Editor {
    doc: Document,
    selection: Option<Selection>,
    marks: Option<Marks>,
    registry: PluginRegistry,
    config: EditorConfig,
}

impl Editor {
    pub fn new(doc: Document, selection: Option<Selection>, registry: PluginRegistry) -> Self {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Document,
        selection: Option<Selection>,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Self {
        let mut editor = Self {
            doc,
            selection,
            marks: None,
            registry,
            config: config.with_defaults(),
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_richtext_plugins() -> Self {
        let doc = Document {
            children: vec![Node::paragraph("")],
        };
        let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
        Self::new(doc, Some(selection), PluginRegistry::richtext())
    }

    /// Editor over [`initial_document`] with no selection yet.
    pub fn with_initial_value() -> Self {
        Self::new(initial_document(), None, PluginRegistry::richtext())
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        let selection = selection.map(|sel| self.registry.normalize_selection(&self.doc, &sel));
        if selection != self.selection {
            self.marks = None;
        }
        self.selection = selection;
    }

    pub fn select(&mut self, selection: Selection) {
        self.set_selection(Some(selection));
    }

    pub fn deselect(&mut self) {
        self.set_selection(None);
    }

    /// Marks queued on a collapsed caret, applied to the next inserted text.
    pub fn pending_marks(&self) -> Option<&Marks> {
        self.marks.as_ref()
    }

    pub(crate) fn set_pending_marks(&mut self, marks: Option<Marks>) {
        self.marks = marks;
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let preview = match self.preview_transaction(&tx) {
            Ok(preview) => preview,
            Err(err) => {
                tracing::warn!(source = ?tx.meta.source, error = %err, "rejected transaction");
                return Err(err);
            }
        };

        if preview.selection != self.selection {
            self.marks = None;
        }
        self.doc = preview.doc;
        self.selection = preview.selection;

        tracing::debug!(
            source = ?tx.meta.source,
            ops = tx.ops.len(),
            "applied transaction"
        );
        Ok(())
    }

    pub fn preview_transaction(&self, tx: &Transaction) -> Result<TransactionPreview, ApplyError> {
        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();

        for op in tx.ops.iter().cloned() {
            apply_op_to(&mut doc, &mut selection, op)?;
        }

        if let Some(sel) = &tx.selection_after {
            selection = Some(sel.clone());
        }

        let mut converged = false;
        for _ in 0..self.config.max_normalize_iterations {
            let ops = self.registry.normalize(&doc);
            if ops.is_empty() {
                converged = true;
                break;
            }
            for op in ops {
                apply_op_to(&mut doc, &mut selection, op)?;
            }
        }

        if !converged {
            return Err(ApplyError::NormalizeDidNotConverge);
        }

        let selection = selection.map(|sel| self.registry.normalize_selection(&doc, &sel));

        Ok(TransactionPreview { doc, selection })
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        (command.handler)(self, args)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::new(format!("Unknown query: {id}")));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }

    fn normalize_in_place(&mut self) {
        let tx = Transaction::new(Vec::new()).source("editor:init");
        match self.preview_transaction(&tx) {
            Ok(preview) => {
                self.doc = preview.doc;
                self.selection = preview.selection;
            }
            Err(err) => {
                tracing::warn!(error = %err, "initial document could not be normalized");
            }
        }
    }
}

fn apply_op_to(
    doc: &mut Document,
    selection: &mut Option<Selection>,
    op: Op,
) -> Result<(), ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            if let Some(selection) = selection {
                transform_selection_insert_text(selection, &path, offset, text.len());
            }
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start =
                clamp_to_char_boundary(&text_node.text, range.start.min(text_node.text.len()));
            let end = clamp_to_char_boundary(&text_node.text, range.end.min(text_node.text.len()));
            if start < end {
                text_node.text.replace_range(start..end, "");
                if let Some(selection) = selection {
                    transform_selection_remove_text(selection, &path, start..end);
                }
            }
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            if let Some(selection) = selection {
                transform_selection_insert_node(selection, &path);
            }
        }
        Op::RemoveNode { path } => {
            remove_node(doc, &path)?;
            if let Some(selection) = selection {
                transform_selection_remove_node(selection, &path, doc);
            }
        }
        Op::MergeText { path } => {
            let Some((&index, parent_path)) = path.split_last() else {
                return Err(ApplyError::InvalidPath("Empty merge path".into()));
            };
            let Some(left_index) = index.checked_sub(1) else {
                return Err(ApplyError::InvalidPath("No previous sibling to merge into".into()));
            };
            let Node::Text(removed) = remove_node(doc, &path)? else {
                return Err(ApplyError::InvalidPath("Expected Text node".into()));
            };
            let mut left_path = parent_path.to_vec();
            left_path.push(left_index);
            let left = node_text_mut(doc, &left_path)?;
            let prefix_len = left.text.len();
            left.text.push_str(&removed.text);
            if let Some(selection) = selection {
                transform_selection_merge_text(selection, &path, prefix_len);
            }
        }
        Op::SetNodeKind { path, kind } => match node_mut(doc, &path)? {
            Node::Element(el) => el.kind = kind,
            Node::Text(_) => return Err(ApplyError::InvalidPath("Text has no kind".into())),
        },
        Op::SetTextMarks { path, marks } => {
            node_text_mut(doc, &path)?.marks = marks;
        }
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct PathError(pub String);

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn transform_selection_insert_text(
    selection: &mut Selection,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut Selection,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path || point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

fn transform_selection_insert_node(selection: &mut Selection, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(selection: &mut Selection, path: &[usize], doc_after_remove: &Document) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
            continue;
        }
        if ix < index {
            continue;
        }

        // Point was inside the removed subtree: end of the previous sibling, else the same index.
        let left = index.checked_sub(1).and_then(|left_index| {
            let mut left_path = parent_path.to_vec();
            left_path.push(left_index);
            last_text_point(doc_after_remove, &left_path)
        });
        match left {
            Some(left) => *point = left,
            None => {
                point.path.truncate(depth + 1);
                point.offset = 0;
            }
        }
    }
}

fn transform_selection_merge_text(selection: &mut Selection, path: &[usize], prefix_len: usize) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
        } else if ix == index {
            point.path.truncate(depth + 1);
            point.path[depth] = index - 1;
            point.offset += prefix_len;
        }
    }
}

pub(crate) fn node_mut<'a>(
    doc: &'a mut Document,
    path: &[usize],
) -> Result<&'a mut Node, PathError> {
    let Some((&first, rest)) = path.split_first() else {
        return Err(PathError("Empty path".into()));
    };

    let len = doc.children.len();
    let mut node = doc
        .children
        .get_mut(first)
        .ok_or_else(|| PathError(format!("Path out of bounds at depth 0: {first} >= {len}")))?;

    for (depth, &ix) in rest.iter().enumerate() {
        let current = node;
        node = match current {
            Node::Element(el) => {
                let len = el.children.len();
                el.children.get_mut(ix).ok_or_else(|| {
                    PathError(format!(
                        "Path out of bounds at depth {}: {ix} >= {len}",
                        depth + 1
                    ))
                })?
            }
            Node::Text(_) => {
                return Err(PathError(format!("Non-container node at depth {depth}")));
            }
        };
    }

    Ok(node)
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        Node::Element(_) => Err(PathError("Expected Text node".into())),
    }
}

fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Text(_) => Err(PathError("Parent is not a container".into())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(PathError("Empty insert path".into()));
    };

    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(PathError("Empty remove path".into()));
    };

    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_leaf_doc() -> Document {
        Document {
            children: vec![Node::block(
                "paragraph",
                vec![
                    Node::text("ab", Marks::default()),
                    Node::text(
                        "cd",
                        Marks {
                            bold: true,
                            ..Marks::default()
                        },
                    ),
                ],
            )],
        }
    }

    #[test]
    fn node_mut_reports_out_of_bounds_depth() {
        let mut doc = two_leaf_doc();
        let err = node_mut(&mut doc, &[0, 5]).unwrap_err();
        assert_eq!(err.0, "Path out of bounds at depth 1: 5 >= 2");
        assert!(node_mut(&mut doc, &[]).is_err());
        assert!(node_mut(&mut doc, &[0, 0, 0]).is_err());
    }

    #[test]
    fn removing_a_leaf_moves_points_to_end_of_left_sibling() {
        let mut doc = two_leaf_doc();
        let mut selection = Some(Selection::collapsed(Point::new(vec![0, 1], 1)));
        apply_op_to(&mut doc, &mut selection, Op::RemoveNode { path: vec![0, 1] }).unwrap();
        assert_eq!(selection, Some(Selection::collapsed(Point::new(vec![0, 0], 2))));
    }

    #[test]
    fn merging_a_leaf_offsets_points_by_the_left_length() {
        let mut doc = Document {
            children: vec![Node::block(
                "paragraph",
                vec![
                    Node::text("ab", Marks::default()),
                    Node::text("cd", Marks::default()),
                    Node::text("ef", Marks::default()),
                ],
            )],
        };
        let mut selection = Some(Selection::new(
            Point::new(vec![0, 1], 1),
            Point::new(vec![0, 2], 0),
        ));
        apply_op_to(&mut doc, &mut selection, Op::MergeText { path: vec![0, 1] }).unwrap();
        assert_eq!(
            selection,
            Some(Selection::new(
                Point::new(vec![0, 0], 3),
                Point::new(vec![0, 1], 0),
            ))
        );
        let Node::Element(block) = &doc.children[0] else {
            panic!("expected element block");
        };
        assert_eq!(block.children[0], Node::text("abcd", Marks::default()));
        assert!(apply_op_to(&mut doc, &mut selection, Op::MergeText { path: vec![0, 0] }).is_err());
    }

    #[test]
    fn clamp_to_char_boundary_backs_off_inside_multibyte_chars() {
        assert_eq!(clamp_to_char_boundary("é", 1), 0);
        assert_eq!(clamp_to_char_boundary("aé", 9), 3);
    }
}
