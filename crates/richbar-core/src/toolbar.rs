use crate::core::{ApplyError, Editor};
use crate::format::{BlockType, Mark};

/// One toolbar button: a block type or a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolbarItem {
    Block(BlockType),
    Mark(Mark),
}

impl ToolbarItem {
    pub fn label(self) -> &'static str {
        match self {
            ToolbarItem::Block(block) => block.label(),
            ToolbarItem::Mark(mark) => mark.label(),
        }
    }

    /// Stable id, unique across the toolbar.
    pub fn id(self) -> &'static str {
        match self {
            ToolbarItem::Block(BlockType::Paragraph) => "block-paragraph",
            ToolbarItem::Block(BlockType::H1) => "block-h1",
            ToolbarItem::Block(BlockType::H2) => "block-h2",
            ToolbarItem::Block(BlockType::H3) => "block-h3",
            ToolbarItem::Block(BlockType::H4) => "block-h4",
            ToolbarItem::Mark(Mark::Bold) => "mark-bold",
            ToolbarItem::Mark(Mark::Italic) => "mark-italic",
            ToolbarItem::Mark(Mark::Underline) => "mark-underline",
            ToolbarItem::Mark(Mark::Code) => "mark-code",
        }
    }

    pub fn is_active(self, editor: &Editor) -> bool {
        match self {
            ToolbarItem::Block(block) => editor.is_block_active(block),
            ToolbarItem::Mark(mark) => editor.is_mark_active(mark),
        }
    }

    pub fn toggle(self, editor: &mut Editor) -> Result<(), ApplyError> {
        match self {
            ToolbarItem::Block(block) => editor.toggle_block(block),
            ToolbarItem::Mark(mark) => editor.toggle_mark(mark),
        }
    }
}

/// Block buttons in [`BlockType::ALL`] order, then mark buttons in [`Mark::ALL`] order.
pub fn toolbar_items() -> impl Iterator<Item = ToolbarItem> {
    BlockType::ALL
        .into_iter()
        .map(ToolbarItem::Block)
        .chain(Mark::ALL.into_iter().map(ToolbarItem::Mark))
}
