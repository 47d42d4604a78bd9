use std::ops::Range;

use gpui::{
    App, Bounds, CursorStyle, Element, ElementId, ElementInputHandler, Entity, FontStyle,
    FontWeight, GlobalElementId, Hitbox, HitboxBehavior, InspectorElementId, IntoElement,
    LayoutId, MouseButton, MouseDownEvent, MouseMoveEvent, MouseUpEvent, Pixels, SharedString,
    StyledText, TextRun, TextStyle, UnderlineStyle, Window, point, px, rgb,
};
use gpui_richbar_core::{BlockType, Mark, Node, StyledRun, render_node};

use crate::state::{EditorState, LineLayoutCache};

fn monospace_font_family() -> SharedString {
    #[cfg(target_os = "macos")]
    {
        "Menlo".into()
    }
    #[cfg(target_os = "windows")]
    {
        "Consolas".into()
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        "monospace".into()
    }
}

/// Font size of a block relative to the base text size.
pub(crate) fn block_text_scale(kind: &str) -> f32 {
    match BlockType::from_kind(kind) {
        Some(BlockType::H1) => 2.0,
        Some(BlockType::H2) => 1.5,
        Some(BlockType::H3) => 1.17,
        Some(BlockType::H4) | Some(BlockType::Paragraph) | None => 1.0,
    }
}

fn run_style(base: &TextStyle, run: &StyledRun) -> TextStyle {
    let mut style = base.clone();
    if let Some(weight) = run.font_weight() {
        style.font_weight = FontWeight(weight as f32);
    }
    if run.has_mark(Mark::Italic) {
        style.font_style = FontStyle::Italic;
    }
    if run.has_mark(Mark::Underline) {
        style.underline = Some(UnderlineStyle {
            thickness: px(1.),
            color: Some(base.color),
            wavy: false,
        });
    }
    if run.has_mark(Mark::Code) {
        style.font_family = monospace_font_family();
    }
    if let Some(bg) = run.background() {
        style.background_color = Some(rgb(bg).into());
    }
    style
}

/// Split `style` over `seg`, underlining the part covered by `marked`.
fn push_runs(
    runs: &mut Vec<TextRun>,
    style: &TextStyle,
    seg: Range<usize>,
    marked: Option<&Range<usize>>,
) {
    let Some(marked) = marked.filter(|m| seg.start < m.end && m.start < seg.end) else {
        runs.push(style.clone().to_run(seg.len()));
        return;
    };

    let before_len = marked.start.saturating_sub(seg.start);
    let mark_len = seg.end.min(marked.end) - marked.start.max(seg.start);
    let after_len = seg.end.saturating_sub(marked.end.max(seg.start));

    if before_len > 0 {
        runs.push(style.clone().to_run(before_len));
    }
    if mark_len > 0 {
        let mut marked_style = style.clone();
        marked_style.underline = Some(UnderlineStyle {
            thickness: px(1.),
            color: Some(style.color),
            wavy: false,
        });
        runs.push(marked_style.to_run(mark_len));
    }
    if after_len > 0 {
        runs.push(style.clone().to_run(after_len));
    }
}

/// One text block, styled from its rendered wrappers.
pub struct BlockLineElement {
    state: Entity<EditorState>,
    block: usize,
    styled_text: StyledText,
    text: SharedString,
}

impl BlockLineElement {
    pub fn new(state: Entity<EditorState>, block: usize) -> Self {
        Self {
            state,
            block,
            styled_text: StyledText::new(SharedString::default()),
            text: SharedString::default(),
        }
    }
}

impl IntoElement for BlockLineElement {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

impl Element for BlockLineElement {
    type RequestLayoutState = ();
    type PrepaintState = Hitbox;

    fn id(&self) -> Option<ElementId> {
        None
    }

    fn source_location(&self) -> Option<&'static std::panic::Location<'static>> {
        None
    }

    fn request_layout(
        &mut self,
        global_element_id: Option<&GlobalElementId>,
        inspector_id: Option<&InspectorElementId>,
        window: &mut Window,
        cx: &mut App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        let (styled_runs, marked) = {
            let state = self.state.read(cx);
            let Some(runs) = state
                .editor
                .text_blocks()
                .get(self.block)
                .map(|block| render_node(&Node::Element(block.el.clone())).runs())
            else {
                self.text = SharedString::default();
                return (window.request_layout(gpui::Style::default(), [], cx), ());
            };
            let marked = state
                .focused_block()
                .filter(|at| at.block == self.block)
                .and_then(|_| state.ime_marked_range.clone());
            (runs, marked)
        };

        let text: String = styled_runs.iter().map(|run| run.text.as_str()).collect();
        self.text = SharedString::from(text.clone());
        let base = window.text_style();

        let mut runs = Vec::new();
        let render_text: SharedString = if text.is_empty() {
            runs.push(base.clone().to_run(1));
            " ".into()
        } else {
            let marked = marked
                .map(|r| r.start.min(text.len())..r.end.min(text.len()))
                .filter(|r| r.start < r.end);
            let mut cursor = 0usize;
            for run in styled_runs.iter().filter(|run| !run.text.is_empty()) {
                let seg = cursor..cursor + run.text.len();
                cursor = seg.end;
                push_runs(&mut runs, &run_style(&base, run), seg, marked.as_ref());
            }
            text.into()
        };

        self.styled_text = StyledText::new(render_text).with_runs(runs);
        let (layout_id, _) =
            self.styled_text
                .request_layout(global_element_id, inspector_id, window, cx);
        (layout_id, ())
    }

    fn prepaint(
        &mut self,
        id: Option<&GlobalElementId>,
        inspector_id: Option<&InspectorElementId>,
        bounds: Bounds<Pixels>,
        _: &mut Self::RequestLayoutState,
        window: &mut Window,
        cx: &mut App,
    ) -> Self::PrepaintState {
        self.styled_text
            .prepaint(id, inspector_id, bounds, &mut (), window, cx);

        let text_layout = self.styled_text.layout().clone();
        let block = self.block;
        let text = self.text.clone();
        self.state.update(cx, |state, _| {
            if state.layout_cache.len() <= block {
                state.layout_cache.resize_with(block + 1, || None);
            }
            state.layout_cache[block] = Some(LineLayoutCache {
                bounds,
                text_layout,
                text,
            });
        });

        window.insert_hitbox(bounds, HitboxBehavior::Normal)
    }

    fn paint(
        &mut self,
        global_id: Option<&GlobalElementId>,
        _: Option<&InspectorElementId>,
        bounds: Bounds<Pixels>,
        _: &mut Self::RequestLayoutState,
        prepaint: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut App,
    ) {
        window.set_cursor_style(CursorStyle::IBeam, prepaint);

        self.styled_text
            .paint(global_id, None, bounds, &mut (), &mut (), window, cx);

        let (range, is_focused, selection_color) = {
            let state = self.state.read(cx);
            (
                state.ordered_block_range(),
                state.focus_handle.is_focused(window),
                state.theme.selection,
            )
        };
        let Some((start, end)) = range else {
            return;
        };
        if self.block < start.block || self.block > end.block {
            return;
        }

        let len = self.text.len();
        let a = if self.block == start.block { start.offset.min(len) } else { 0 };
        let b = if self.block == end.block { end.offset.min(len) } else { len };

        let layout = self.styled_text.layout().clone();
        let line_height = layout.line_height();
        let collapsed = start == end;

        if !collapsed {
            // Empty blocks inside the range still show a sliver.
            let (Some(from), Some(to)) = (
                layout.position_for_index(a),
                layout
                    .position_for_index(b)
                    .or_else(|| layout.position_for_index(layout.len())),
            ) else {
                return;
            };
            let to_x = if a == b { from.x + px(4.) } else { to.x };
            window.paint_quad(gpui::quad(
                Bounds::from_corners(from, point(to_x, to.y + line_height)),
                px(0.),
                selection_color,
                gpui::Edges::default(),
                gpui::transparent_black(),
                gpui::BorderStyle::default(),
            ));
        } else if is_focused {
            if let Some(pos) = layout
                .position_for_index(a)
                .or_else(|| layout.position_for_index(layout.len()))
            {
                window.paint_quad(gpui::quad(
                    Bounds::from_corners(pos, point(pos.x + px(1.5), pos.y + line_height)),
                    px(0.),
                    window.text_style().color,
                    gpui::Edges::default(),
                    gpui::transparent_black(),
                    gpui::BorderStyle::default(),
                ));
            }
        }
    }
}

/// Transparent overlay that owns IME input and mouse selection for the whole editor.
pub(crate) struct InputHandlerElement {
    state: Entity<EditorState>,
}

impl InputHandlerElement {
    pub(crate) fn new(state: Entity<EditorState>) -> Self {
        Self { state }
    }
}

impl IntoElement for InputHandlerElement {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

impl Element for InputHandlerElement {
    type RequestLayoutState = ();
    type PrepaintState = Hitbox;

    fn id(&self) -> Option<ElementId> {
        None
    }

    fn source_location(&self) -> Option<&'static std::panic::Location<'static>> {
        None
    }

    fn request_layout(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        window: &mut Window,
        cx: &mut App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        let mut style = gpui::Style::default();
        style.size.width = gpui::relative(1.).into();
        style.size.height = gpui::relative(1.).into();
        (window.request_layout(style, [], cx), ())
    }

    fn prepaint(
        &mut self,
        _id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        bounds: Bounds<Pixels>,
        _state: &mut Self::RequestLayoutState,
        window: &mut Window,
        _cx: &mut App,
    ) -> Self::PrepaintState {
        window.insert_hitbox(bounds, HitboxBehavior::BlockMouseExceptScroll)
    }

    fn paint(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        bounds: Bounds<Pixels>,
        _request: &mut Self::RequestLayoutState,
        prepaint: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut App,
    ) {
        let focus_handle = self.state.read(cx).focus_handle.clone();
        window.handle_input(
            &focus_handle,
            ElementInputHandler::new(bounds, self.state.clone()),
            cx,
        );

        window.set_cursor_style(CursorStyle::IBeam, prepaint);

        window.on_mouse_event({
            let state = self.state.clone();
            let hitbox = prepaint.clone();
            move |event: &MouseDownEvent, phase, window, cx| {
                if !phase.bubble() || event.button != MouseButton::Left {
                    return;
                }
                if !hitbox.is_hovered(window) {
                    return;
                }

                let focus_handle = state.read(cx).focus_handle.clone();
                window.focus(&focus_handle);

                state.update(cx, |this, cx| {
                    this.mouse_down(event.position, event.modifiers.shift, cx);
                });
            }
        });

        window.on_mouse_event({
            let state = self.state.clone();
            move |event: &MouseMoveEvent, _phase, _window, cx| {
                if event.pressed_button != Some(MouseButton::Left) {
                    return;
                }
                state.update(cx, |this, cx| this.mouse_move(event.position, cx));
            }
        });

        window.on_mouse_event({
            let state = self.state.clone();
            move |event: &MouseUpEvent, _phase, _window, cx| {
                if event.button != MouseButton::Left {
                    return;
                }
                state.update(cx, |this, cx| this.mouse_up(cx));
            }
        });
    }
}
