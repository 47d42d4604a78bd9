use std::ops::Range;

use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_richbar_core::{
    ApplyError, BlockOffset, Direction, Editor, ToolbarItem, ordered_selection_points,
};

use crate::element::{BlockLineElement, InputHandlerElement, block_text_scale};
use crate::theme::RichbarTheme;

pub(crate) const CONTEXT: &str = "Richbar";

actions!(
    richbar,
    [
        Backspace,
        Delete,
        Enter,
        MoveLeft,
        MoveRight,
        SelectLeft,
        SelectRight,
        SelectAll,
        Copy,
        Cut,
        Paste,
    ]
);

pub(crate) fn init(cx: &mut App) {
    cx.bind_keys([
        KeyBinding::new("backspace", Backspace, Some(CONTEXT)),
        KeyBinding::new("delete", Delete, Some(CONTEXT)),
        KeyBinding::new("enter", Enter, Some(CONTEXT)),
        KeyBinding::new("left", MoveLeft, Some(CONTEXT)),
        KeyBinding::new("right", MoveRight, Some(CONTEXT)),
        KeyBinding::new("shift-left", SelectLeft, Some(CONTEXT)),
        KeyBinding::new("shift-right", SelectRight, Some(CONTEXT)),
        #[cfg(target_os = "macos")]
        KeyBinding::new("cmd-a", SelectAll, Some(CONTEXT)),
        #[cfg(not(target_os = "macos"))]
        KeyBinding::new("ctrl-a", SelectAll, Some(CONTEXT)),
        #[cfg(target_os = "macos")]
        KeyBinding::new("cmd-c", Copy, Some(CONTEXT)),
        #[cfg(not(target_os = "macos"))]
        KeyBinding::new("ctrl-c", Copy, Some(CONTEXT)),
        #[cfg(target_os = "macos")]
        KeyBinding::new("cmd-x", Cut, Some(CONTEXT)),
        #[cfg(not(target_os = "macos"))]
        KeyBinding::new("ctrl-x", Cut, Some(CONTEXT)),
        #[cfg(target_os = "macos")]
        KeyBinding::new("cmd-v", Paste, Some(CONTEXT)),
        #[cfg(not(target_os = "macos"))]
        KeyBinding::new("ctrl-v", Paste, Some(CONTEXT)),
    ]);
}

#[derive(Clone)]
pub(crate) struct LineLayoutCache {
    pub bounds: Bounds<Pixels>,
    pub text_layout: gpui::TextLayout,
    pub text: SharedString,
}

/// Owns the [`Editor`] and everything the view needs between frames.
pub struct EditorState {
    pub(crate) focus_handle: FocusHandle,
    pub(crate) editor: Editor,
    pub(crate) theme: RichbarTheme,
    selecting: bool,
    drag_anchor: Option<BlockOffset>,
    /// Indexed by text block.
    pub(crate) layout_cache: Vec<Option<LineLayoutCache>>,
    /// Byte range of the IME preedit inside the focused block.
    pub(crate) ime_marked_range: Option<Range<usize>>,
    did_auto_focus: bool,
}

impl EditorState {
    pub fn new(_window: &mut Window, cx: &mut Context<Self>) -> Self {
        let focus_handle = cx.focus_handle().tab_stop(true);
        Self {
            focus_handle,
            editor: Editor::with_initial_value(),
            theme: RichbarTheme::default(),
            selecting: false,
            drag_anchor: None,
            layout_cache: Vec::new(),
            ime_marked_range: None,
            did_auto_focus: false,
        }
    }

    pub fn theme(mut self, theme: RichbarTheme) -> Self {
        self.theme = theme;
        self
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn focus_handle(&self) -> FocusHandle {
        self.focus_handle.clone()
    }

    pub fn is_active(&self, item: ToolbarItem) -> bool {
        item.is_active(&self.editor)
    }

    pub fn toggle(&mut self, item: ToolbarItem, cx: &mut Context<Self>) {
        self.edit("toolbar", cx, |editor| item.toggle(editor));
    }

    fn edit(
        &mut self,
        source: &str,
        cx: &mut Context<Self>,
        f: impl FnOnce(&mut Editor) -> Result<(), ApplyError>,
    ) {
        if let Err(err) = f(&mut self.editor) {
            tracing::warn!(source, error = %err, "edit failed");
        }
        self.ime_marked_range = None;
        cx.notify();
    }

    pub(crate) fn focused_block(&self) -> Option<BlockOffset> {
        let selection = self.editor.selection()?;
        self.editor.block_offset(&selection.focus)
    }

    pub(crate) fn block_text(&self, block: usize) -> String {
        self.editor
            .text_blocks()
            .get(block)
            .map(|b| b.text())
            .unwrap_or_default()
    }

    fn focused_text(&self) -> String {
        self.focused_block()
            .map(|at| self.block_text(at.block))
            .unwrap_or_default()
    }

    /// Selected byte range inside the focused block. A selection leaving the block collapses to
    /// the focus.
    fn ordered_focused_range(&self) -> Range<usize> {
        let Some(selection) = self.editor.selection() else {
            return 0..0;
        };
        let (Some(anchor), Some(focus)) = (
            self.editor.block_offset(&selection.anchor),
            self.editor.block_offset(&selection.focus),
        ) else {
            return 0..0;
        };
        if anchor.block != focus.block {
            return focus.offset..focus.offset;
        }
        anchor.offset.min(focus.offset)..anchor.offset.max(focus.offset)
    }

    /// Selection edges as block offsets, in document order.
    pub(crate) fn ordered_block_range(&self) -> Option<(BlockOffset, BlockOffset)> {
        let selection = self.editor.selection()?;
        let (start, end) = ordered_selection_points(selection);
        Some((
            self.editor.block_offset(&start)?,
            self.editor.block_offset(&end)?,
        ))
    }

    fn select_in_focused_block(&mut self, range: Range<usize>) {
        let Some(at) = self.focused_block() else {
            return;
        };
        self.editor.select_offsets(
            BlockOffset {
                block: at.block,
                offset: range.start,
            },
            BlockOffset {
                block: at.block,
                offset: range.end,
            },
        );
    }

    pub(crate) fn offset_for_point(&self, block: usize, point: gpui::Point<Pixels>) -> Option<usize> {
        let cache = self.layout_cache.get(block).and_then(|c| c.as_ref())?;
        let local = match cache.text_layout.index_for_position(point) {
            Ok(ix) | Err(ix) => ix,
        };
        Some(local.min(cache.text.len()))
    }

    pub(crate) fn block_for_point(&self, point: gpui::Point<Pixels>) -> Option<usize> {
        let mut first: Option<usize> = None;
        let mut last: Option<usize> = None;

        for (block, cache) in self.layout_cache.iter().enumerate() {
            let Some(cache) = cache.as_ref() else {
                continue;
            };
            first.get_or_insert(block);
            last = Some(block);
            if point.y >= cache.bounds.top() && point.y <= cache.bounds.bottom() {
                return Some(block);
            }
        }

        // Outside every line: clamp to the nearest one.
        let (first, last) = (first?, last?);
        if let Some(first_cache) = self.layout_cache.get(first).and_then(|c| c.as_ref())
            && point.y < first_cache.bounds.top()
        {
            return Some(first);
        }
        Some(last)
    }

    pub(crate) fn mouse_down(&mut self, position: gpui::Point<Pixels>, shift: bool, cx: &mut Context<Self>) {
        let Some(block) = self.block_for_point(position) else {
            return;
        };
        let offset = self
            .offset_for_point(block, position)
            .unwrap_or_else(|| self.block_text(block).len());
        let focus = BlockOffset { block, offset };

        let anchor = if shift {
            self.editor
                .selection()
                .and_then(|sel| self.editor.block_offset(&sel.anchor))
                .unwrap_or(focus)
        } else {
            focus
        };

        self.editor.select_offsets(anchor, focus);
        self.selecting = true;
        self.drag_anchor = Some(anchor);
        self.ime_marked_range = None;
        cx.notify();
    }

    pub(crate) fn mouse_move(&mut self, position: gpui::Point<Pixels>, cx: &mut Context<Self>) {
        if !self.selecting {
            return;
        }
        let Some(block) = self.block_for_point(position) else {
            return;
        };
        let Some(offset) = self.offset_for_point(block, position) else {
            return;
        };
        let focus = BlockOffset { block, offset };
        let anchor = self.drag_anchor.unwrap_or(focus);
        self.editor.select_offsets(anchor, focus);
        cx.notify();
    }

    pub(crate) fn mouse_up(&mut self, cx: &mut Context<Self>) {
        self.selecting = false;
        self.drag_anchor = None;
        cx.notify();
    }

    fn backspace(&mut self, _: &Backspace, _window: &mut Window, cx: &mut Context<Self>) {
        self.edit("key:backspace", cx, Editor::delete_backward);
    }

    fn delete(&mut self, _: &Delete, _window: &mut Window, cx: &mut Context<Self>) {
        self.edit("key:delete", cx, Editor::delete_forward);
    }

    fn enter(&mut self, _: &Enter, _window: &mut Window, cx: &mut Context<Self>) {
        self.edit("key:enter", cx, Editor::insert_break);
    }

    fn left(&mut self, _: &MoveLeft, _window: &mut Window, cx: &mut Context<Self>) {
        self.editor.move_caret(Direction::Backward, false);
        cx.notify();
    }

    fn right(&mut self, _: &MoveRight, _window: &mut Window, cx: &mut Context<Self>) {
        self.editor.move_caret(Direction::Forward, false);
        cx.notify();
    }

    fn select_left(&mut self, _: &SelectLeft, _window: &mut Window, cx: &mut Context<Self>) {
        self.editor.move_caret(Direction::Backward, true);
        cx.notify();
    }

    fn select_right(&mut self, _: &SelectRight, _window: &mut Window, cx: &mut Context<Self>) {
        self.editor.move_caret(Direction::Forward, true);
        cx.notify();
    }

    fn select_all(&mut self, _: &SelectAll, _window: &mut Window, cx: &mut Context<Self>) {
        self.editor.select_all();
        cx.notify();
    }

    fn has_expanded_selection(&self) -> bool {
        self.editor.selection().is_some_and(|sel| sel.is_expanded())
    }

    fn copy(&mut self, _: &Copy, _window: &mut Window, cx: &mut Context<Self>) {
        if !self.has_expanded_selection() {
            return;
        }
        cx.write_to_clipboard(ClipboardItem::new_string(self.editor.selected_text()));
    }

    fn cut(&mut self, _: &Cut, _window: &mut Window, cx: &mut Context<Self>) {
        if !self.has_expanded_selection() {
            return;
        }
        cx.write_to_clipboard(ClipboardItem::new_string(self.editor.selected_text()));
        self.edit("key:cut", cx, Editor::delete_fragment);
    }

    fn paste(&mut self, _: &Paste, _window: &mut Window, cx: &mut Context<Self>) {
        let Some(text) = cx.read_from_clipboard().and_then(|item| item.text()) else {
            return;
        };
        self.edit("key:paste", cx, |editor| editor.insert_lines(&text));
    }

    /// The byte range the platform asked to replace, or the IME preedit. `None` keeps the
    /// current selection, which may span blocks.
    fn replacement_range(&self, range_utf16: Option<&Range<usize>>) -> Option<Range<usize>> {
        let text = self.focused_text();
        range_utf16
            .map(|r| utf16_to_byte(&text, r.start)..utf16_to_byte(&text, r.end))
            .or_else(|| self.ime_marked_range.clone())
    }
}

impl EntityInputHandler for EditorState {
    fn text_for_range(
        &mut self,
        range_utf16: Range<usize>,
        adjusted_range: &mut Option<Range<usize>>,
        _window: &mut Window,
        _cx: &mut Context<Self>,
    ) -> Option<String> {
        let text = self.focused_text();
        let start = utf16_to_byte(&text, range_utf16.start);
        let end = utf16_to_byte(&text, range_utf16.end);
        adjusted_range.replace(byte_to_utf16_range(&text, start..end));
        Some(text.get(start..end).unwrap_or("").to_string())
    }

    fn selected_text_range(
        &mut self,
        _ignore_disabled_input: bool,
        _window: &mut Window,
        _cx: &mut Context<Self>,
    ) -> Option<UTF16Selection> {
        let selection = self.editor.selection()?;
        let text = self.focused_text();
        let range = self.ordered_focused_range();
        let reversed = ordered_selection_points(selection).0 == selection.focus
            && selection.is_expanded();
        Some(UTF16Selection {
            range: byte_to_utf16_range(&text, range),
            reversed,
        })
    }

    fn replace_text_in_range(
        &mut self,
        range_utf16: Option<Range<usize>>,
        new_text: &str,
        _window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if self.editor.selection().is_none() {
            return;
        }
        if let Some(range) = self.replacement_range(range_utf16.as_ref()) {
            self.select_in_focused_block(range);
        }
        self.edit("ime:replace_text", cx, |editor| {
            if new_text.is_empty() {
                editor.delete_fragment()
            } else {
                editor.insert_lines(new_text)
            }
        });
    }

    fn marked_text_range(
        &self,
        _window: &mut Window,
        _cx: &mut Context<Self>,
    ) -> Option<Range<usize>> {
        let text = self.focused_text();
        self.ime_marked_range
            .as_ref()
            .map(|r| byte_to_utf16_range(&text, r.clone()))
    }

    fn unmark_text(&mut self, _window: &mut Window, _cx: &mut Context<Self>) {
        self.ime_marked_range = None;
    }

    fn replace_and_mark_text_in_range(
        &mut self,
        range_utf16: Option<Range<usize>>,
        new_text: &str,
        new_selected_range_utf16: Option<Range<usize>>,
        _window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if self.editor.selection().is_none() {
            return;
        }
        if let Some(range) = self.replacement_range(range_utf16.as_ref()) {
            self.select_in_focused_block(range);
        }
        let inserted = new_text.replace(['\r', '\n'], " ");
        self.edit("ime:replace_and_mark_text", cx, |editor| {
            if inserted.is_empty() {
                editor.delete_fragment()
            } else {
                editor.insert_text(&inserted)
            }
        });

        // The caret sits right after the inserted preedit.
        let end = self.focused_block().map(|at| at.offset).unwrap_or(0);
        let marked = end.saturating_sub(inserted.len())..end;
        if let Some(sel_utf16) = new_selected_range_utf16
            && !inserted.is_empty()
        {
            let rel_start = utf16_to_byte(&inserted, sel_utf16.start);
            let rel_end = utf16_to_byte(&inserted, sel_utf16.end);
            self.select_in_focused_block(marked.start + rel_start..marked.start + rel_end);
        }
        self.ime_marked_range = (!marked.is_empty()).then_some(marked);
    }

    fn bounds_for_range(
        &mut self,
        range_utf16: Range<usize>,
        _bounds: Bounds<Pixels>,
        _window: &mut Window,
        _cx: &mut Context<Self>,
    ) -> Option<Bounds<Pixels>> {
        let block = self.focused_block()?.block;
        let cache = self.layout_cache.get(block).and_then(|c| c.as_ref())?;
        let start = utf16_to_byte(cache.text.as_str(), range_utf16.start);
        let pos = cache.text_layout.position_for_index(start)?;
        let line_height = cache.text_layout.line_height();
        Some(Bounds::from_corners(
            pos,
            point(pos.x + px(1.0), pos.y + line_height),
        ))
    }

    fn character_index_for_point(
        &mut self,
        point: gpui::Point<Pixels>,
        _window: &mut Window,
        _cx: &mut Context<Self>,
    ) -> Option<usize> {
        let block = self.focused_block()?.block;
        let byte_ix = self.offset_for_point(block, point)?;
        Some(byte_to_utf16(&self.block_text(block), byte_ix))
    }
}

impl Focusable for EditorState {
    fn focus_handle(&self, _cx: &App) -> FocusHandle {
        self.focus_handle.clone()
    }
}

impl Render for EditorState {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let state = cx.entity().clone();
        let base_text_size = window.text_style().font_size.to_pixels(window.rem_size());

        if !self.did_auto_focus && !window.is_inspector_picking(cx) {
            window.focus(&self.focus_handle);
            self.did_auto_focus = true;
        }

        let kinds: Vec<String> = self
            .editor
            .text_blocks()
            .iter()
            .map(|block| block.el.kind.clone())
            .collect();

        self.layout_cache.clear();
        self.layout_cache.resize_with(kinds.len(), || None);

        let lines = kinds.iter().enumerate().map(|(block, kind)| {
            div()
                .text_size(px(f32::from(base_text_size) * block_text_scale(kind)))
                .child(BlockLineElement::new(state.clone(), block))
        });

        div()
            .id(("richbar-editor", cx.entity_id()))
            .key_context(CONTEXT)
            .track_focus(&self.focus_handle)
            .tab_index(0)
            .w_full()
            .relative()
            .text_color(self.theme.foreground)
            .when(!window.is_inspector_picking(cx), |this| {
                this.on_action(window.listener_for(&state, Self::backspace))
                    .on_action(window.listener_for(&state, Self::delete))
                    .on_action(window.listener_for(&state, Self::enter))
                    .on_action(window.listener_for(&state, Self::left))
                    .on_action(window.listener_for(&state, Self::right))
                    .on_action(window.listener_for(&state, Self::select_left))
                    .on_action(window.listener_for(&state, Self::select_right))
                    .on_action(window.listener_for(&state, Self::select_all))
                    .on_action(window.listener_for(&state, Self::copy))
                    .on_action(window.listener_for(&state, Self::cut))
                    .on_action(window.listener_for(&state, Self::paste))
            })
            .child(div().flex().flex_col().gap(px(6.)).children(lines))
            .child(
                div()
                    .absolute()
                    .top_0()
                    .left_0()
                    .right_0()
                    .bottom_0()
                    .child(InputHandlerElement::new(state.clone())),
            )
    }
}

pub(crate) fn utf16_to_byte(s: &str, utf16_ix: usize) -> usize {
    if utf16_ix == 0 {
        return 0;
    }
    let mut utf16_count = 0usize;
    for (byte_ix, ch) in s.char_indices() {
        if utf16_count >= utf16_ix {
            return byte_ix;
        }
        utf16_count += ch.len_utf16();
    }
    s.len()
}

fn byte_to_utf16(s: &str, byte_ix: usize) -> usize {
    let byte_ix = byte_ix.min(s.len());
    s.char_indices()
        .take_while(|(ix, _)| *ix < byte_ix)
        .map(|(_, ch)| ch.len_utf16())
        .sum()
}

fn byte_to_utf16_range(s: &str, range: Range<usize>) -> Range<usize> {
    byte_to_utf16(s, range.start)..byte_to_utf16(s, range.end)
}
