use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Document, Editor, Node, Point, Selection};
use crate::format::{BlockType, Mark};
use crate::location::first_text_point;
use crate::ops::Op;

#[derive(Debug, Clone)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone)]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

type CommandHandler = Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;
type QueryHandler = Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    /// Text leaves only: the element is a text block.
    InlineOnly,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub children: ChildConstraint,
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document) -> Vec<Op>;
}

#[derive(Debug, Clone)]
pub struct TransactionPreview {
    pub doc: Document,
    pub selection: Option<Selection>,
}

pub trait EditorPlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    node_specs: HashMap<String, NodeSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn EditorPlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    /// Block types, normalization and text editing, without formatting commands.
    pub fn core() -> Self {
        let plugins: Vec<Box<dyn EditorPlugin>> = vec![
            Box::new(BlockTypesPlugin),
            Box::new(CoreNormalizePlugin),
            Box::new(TextEditingPlugin),
        ];
        Self::new(plugins).expect("core registry must be valid")
    }

    pub fn richtext() -> Self {
        let plugins: Vec<Box<dyn EditorPlugin>> = vec![
            Box::new(BlockTypesPlugin),
            Box::new(CoreNormalizePlugin),
            Box::new(TextEditingPlugin),
            Box::new(MarksPlugin),
        ];
        Self::new(plugins).expect("richtext registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn EditorPlugin>) -> Result<(), String> {
        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(format!("Duplicate node spec kind: {}", spec.kind));
            }
            self.node_specs.insert(spec.kind.clone(), spec);
        }

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(format!("Duplicate command id: {}", cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(format!("Duplicate query id: {}", query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        tracing::trace!(plugin = plugin.id(), "registered plugin");
        Ok(())
    }

    pub fn node_specs(&self) -> &HashMap<String, NodeSpec> {
        &self.node_specs
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    /// Ops of the first pass that still has work to do.
    ///
    /// Passes compute paths against the same snapshot, so only one pass runs per round.
    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        for pass in &self.normalize_passes {
            let ops = pass.run(doc);
            if !ops.is_empty() {
                tracing::trace!(pass = pass.id(), ops = ops.len(), "normalize");
                return ops;
            }
        }
        Vec::new()
    }

    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let fallback = first_text_point(doc).unwrap_or(Point {
            path: vec![0],
            offset: 0,
        });

        let anchor =
            normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
                normalize_point_to_existing_text(doc, &selection.focus)
                    .unwrap_or_else(|| fallback.clone())
            });
        let focus = normalize_point_to_existing_text(doc, &selection.focus)
            .unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }

    pub fn is_known_kind(&self, kind: &str) -> bool {
        self.node_specs.contains_key(kind)
    }
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    let mut resolved_path: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                let offset = crate::core::clamp_to_char_boundary(&t.text, point.offset);
                return Some(Point {
                    path: resolved_path,
                    offset,
                });
            }
            Node::Element(el) => {
                children = &el.children;
            }
        }
    }

    // Path ended on an element: descend to its first text leaf.
    loop {
        let node = children.first()?;
        resolved_path.push(0);
        match node {
            Node::Text(_) => return Some(Point::new(resolved_path, 0)),
            Node::Element(el) => children = &el.children,
        }
    }
}

struct BlockTypesPlugin;

impl EditorPlugin for BlockTypesPlugin {
    fn id(&self) -> &'static str {
        "block.types"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        BlockType::ALL
            .iter()
            .map(|block| NodeSpec {
                kind: block.kind().to_string(),
                children: ChildConstraint::InlineOnly,
            })
            .collect()
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.toggle", |editor, args| {
                let block = block_type_arg(args.as_ref())?;
                editor.toggle_block(block).map_err(|e| {
                    CommandError::new(format!("Failed to toggle {}: {e}", block.kind()))
                })
            }),
            CommandSpec::new("block.set", |editor, args| {
                let block = block_type_arg(args.as_ref())?;
                editor.set_block_kind(block.kind()).map_err(|e| {
                    CommandError::new(format!("Failed to set {}: {e}", block.kind()))
                })
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("block.is_active", |editor, args| {
                let block = block_type_arg(args.as_ref())
                    .map_err(|err| QueryError::new(err.message()))?;
                Ok(Value::Bool(editor.is_block_active(block)))
            }),
            QuerySpec::new("block.active_types", |editor, _args| {
                let kinds: Vec<Value> = editor
                    .active_block_types()
                    .into_iter()
                    .map(|block| Value::String(block.kind().to_string()))
                    .collect();
                Ok(Value::Array(kinds))
            }),
        ]
    }
}

fn block_type_arg(args: Option<&Value>) -> Result<BlockType, CommandError> {
    let kind = args
        .and_then(|v| v.get("type"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| CommandError::new("Missing args.type"))?;
    BlockType::from_kind(kind).ok_or_else(|| CommandError::new(format!("Unknown block type: {kind}")))
}

fn mark_arg(args: Option<&Value>) -> Result<Mark, CommandError> {
    let name = args
        .and_then(|v| v.get("mark"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| CommandError::new("Missing args.mark"))?;
    Mark::from_name(name).ok_or_else(|| CommandError::new(format!("Unknown mark: {name}")))
}

struct MarksPlugin;

impl EditorPlugin for MarksPlugin {
    fn id(&self) -> &'static str {
        "marks"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("marks.toggle", |editor, args| {
                let mark = mark_arg(args.as_ref())?;
                editor.toggle_mark(mark).map_err(|e| {
                    CommandError::new(format!("Failed to toggle {}: {e}", mark.name()))
                })
            }),
            CommandSpec::new("marks.add", |editor, args| {
                let mark = mark_arg(args.as_ref())?;
                editor
                    .add_mark(mark)
                    .map_err(|e| CommandError::new(format!("Failed to add {}: {e}", mark.name())))
            }),
            CommandSpec::new("marks.remove", |editor, args| {
                let mark = mark_arg(args.as_ref())?;
                editor.remove_mark(mark).map_err(|e| {
                    CommandError::new(format!("Failed to remove {}: {e}", mark.name()))
                })
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("marks.get_active", |editor, _args| {
                serde_json::to_value(editor.marks().unwrap_or_default())
                    .map_err(|err| QueryError::new(format!("Failed to encode marks: {err}")))
            }),
            QuerySpec::new("marks.is_active", |editor, args| {
                let mark = mark_arg(args.as_ref()).map_err(|err| QueryError::new(err.message()))?;
                Ok(Value::Bool(editor.is_mark_active(mark)))
            }),
        ]
    }
}

struct TextEditingPlugin;

impl EditorPlugin for TextEditingPlugin {
    fn id(&self) -> &'static str {
        "text.editing"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("text.insert", |editor, args| {
                let text = args
                    .as_ref()
                    .and_then(|v| v.get("text"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| CommandError::new("Missing args.text"))?
                    .to_string();
                editor
                    .insert_text(&text)
                    .map_err(|e| CommandError::new(format!("Failed to insert text: {e}")))
            }),
            CommandSpec::new("text.delete_backward", |editor, _args| {
                editor
                    .delete_backward()
                    .map_err(|e| CommandError::new(format!("Failed to delete: {e}")))
            }),
            CommandSpec::new("text.delete_forward", |editor, _args| {
                editor
                    .delete_forward()
                    .map_err(|e| CommandError::new(format!("Failed to delete: {e}")))
            }),
            CommandSpec::new("text.insert_break", |editor, _args| {
                editor
                    .insert_break()
                    .map_err(|e| CommandError::new(format!("Failed to split block: {e}")))
            }),
        ]
    }
}

struct CoreNormalizePlugin;

impl EditorPlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(EnsureElementHasChild),
            Box::new(MergeAdjacentTextLeaves),
            Box::new(RemoveEmptyTextLeaves),
        ]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

/// Calls `visit` for every element with its path, children before parents, so ops emitted for
/// an element never shift the paths of ops already emitted for its descendants.
fn walk_elements(
    children: &[Node],
    path: &mut Vec<usize>,
    visit: &mut dyn FnMut(&[usize], &crate::core::ElementNode),
) {
    for (ix, node) in children.iter().enumerate() {
        let Node::Element(el) = node else {
            continue;
        };
        path.push(ix);
        walk_elements(&el.children, path, visit);
        visit(path, el);
        path.pop();
    }
}

struct EnsureElementHasChild;

impl NormalizePass for EnsureElementHasChild {
    fn id(&self) -> &'static str {
        "core.ensure_element_has_child"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        walk_elements(&doc.children, &mut Vec::new(), &mut |path, el| {
            if el.children.is_empty() {
                let mut insert_path = path.to_vec();
                insert_path.push(0);
                ops.push(Op::InsertNode {
                    path: insert_path,
                    node: Node::text("", Default::default()),
                });
            }
        });
        ops
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();

        walk_elements(&doc.children, &mut Vec::new(), &mut |path, el| {
            if el.children.len() < 2 {
                return;
            }

            let mut ix = el.children.len();
            while ix > 0 {
                ix -= 1;
                let Node::Text(right) = &el.children[ix] else {
                    continue;
                };

                let mut start = ix;
                while start > 0 {
                    let Some(Node::Text(left)) = el.children.get(start - 1) else {
                        break;
                    };
                    if left.marks != right.marks {
                        break;
                    }
                    start -= 1;
                }

                if start == ix {
                    continue;
                }

                // Each merge shifts the rest of the run left onto `start + 1`.
                for _ in start + 1..=ix {
                    let mut merge_path = path.to_vec();
                    merge_path.push(start + 1);
                    ops.push(Op::MergeText { path: merge_path });
                }

                ix = start;
            }
        });

        ops
    }
}

struct RemoveEmptyTextLeaves;

impl NormalizePass for RemoveEmptyTextLeaves {
    fn id(&self) -> &'static str {
        "core.remove_empty_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        walk_elements(&doc.children, &mut Vec::new(), &mut |path, el| {
            let has_content = el.children.iter().any(|n| match n {
                Node::Text(t) => !t.text.is_empty(),
                Node::Element(_) => true,
            });
            if !has_content {
                // Keep one empty leaf so the caret has somewhere to live.
                for remove_ix in (1..el.children.len()).rev() {
                    let mut remove_path = path.to_vec();
                    remove_path.push(remove_ix);
                    ops.push(Op::RemoveNode { path: remove_path });
                }
                return;
            }
            for (remove_ix, node) in el.children.iter().enumerate().rev() {
                if matches!(node, Node::Text(t) if t.text.is_empty()) {
                    let mut remove_path = path.to_vec();
                    remove_path.push(remove_ix);
                    ops.push(Op::RemoveNode { path: remove_path });
                }
            }
        });
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Editor, Marks, Point, Selection};

    #[test]
    fn normalize_runs_one_pass_per_round() {
        let registry = PluginRegistry::richtext();
        let doc = Document {
            children: vec![Node::block(
                "paragraph",
                vec![
                    Node::text("a", Marks::default()),
                    Node::text("", Marks::default()),
                    Node::text("b", Marks::default()),
                ],
            )],
        };
        let ops = registry.normalize(&doc);
        assert_eq!(
            ops,
            vec![
                Op::MergeText { path: vec![0, 1] },
                Op::MergeText { path: vec![0, 1] },
            ]
        );
    }

    struct SingleBang;

    impl NormalizePass for SingleBang {
        fn id(&self) -> &'static str {
            "bang.single"
        }

        fn run(&self, doc: &Document) -> Vec<Op> {
            let mut ops = Vec::new();
            walk_elements(&doc.children, &mut Vec::new(), &mut |path, el| {
                for (child_ix, node) in el.children.iter().enumerate() {
                    if let Node::Text(t) = node
                        && let Some(ix) = t.text.find("!!")
                    {
                        let mut path = path.to_vec();
                        path.push(child_ix);
                        ops.push(Op::RemoveText {
                            path,
                            range: ix..ix + 1,
                        });
                    }
                }
            });
            ops
        }
    }

    struct BangPlugin;

    impl EditorPlugin for BangPlugin {
        fn id(&self) -> &'static str {
            "bang"
        }

        fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
            vec![Box::new(SingleBang)]
        }

        fn commands(&self) -> Vec<CommandSpec> {
            vec![CommandSpec::new("bang.insert", |editor, _args| {
                editor
                    .insert_text("!")
                    .map_err(|e| CommandError::new(format!("Failed to insert: {e}")))
            })]
        }
    }

    #[test]
    fn registered_plugins_add_commands_and_normalize_passes() {
        let mut registry = PluginRegistry::richtext();
        registry.register_plugin(Box::new(BangPlugin)).unwrap();
        let doc = Document {
            children: vec![Node::paragraph("hi")],
        };
        let caret = Selection::collapsed(Point::new(vec![0, 0], 2));
        let mut editor = Editor::new(doc, Some(caret), registry);

        editor.run_command("bang.insert", None).unwrap();
        editor.run_command("bang.insert", None).unwrap();

        let Some(Node::Element(block)) = editor.doc().children.first() else {
            panic!("expected a block");
        };
        assert_eq!(block.children, vec![Node::text("hi!", Marks::default())]);
        assert_eq!(
            editor.selection(),
            Some(&Selection::collapsed(Point::new(vec![0, 0], 3)))
        );
        assert!(editor.run_command("bang.missing", None).is_err());
    }

    #[test]
    fn duplicate_node_specs_are_rejected() {
        let plugins: Vec<Box<dyn EditorPlugin>> =
            vec![Box::new(BlockTypesPlugin), Box::new(BlockTypesPlugin)];
        let err = PluginRegistry::new(plugins).err().unwrap();
        assert!(err.starts_with("Duplicate node spec kind"));
    }
}
