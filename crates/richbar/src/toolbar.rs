use std::rc::Rc;

use gpui::InteractiveElement as _;
use gpui::StatefulInteractiveElement as _;
use gpui::prelude::FluentBuilder as _;
use gpui::{
    App, ElementId, Entity, IntoElement, MouseButton, MouseDownEvent, ParentElement,
    RenderOnce, SharedString, StyleRefinement, Styled, Window, div, px,
};
use gpui_component::Selectable;
use gpui_component::StyledExt as _;
use gpui_component::tooltip::Tooltip;
use gpui_richbar_core::{BlockType, Mark, ToolbarItem, toolbar_items};

use crate::state::EditorState;
use crate::theme::RichbarTheme;

#[derive(IntoElement)]
pub struct ToolbarButton {
    id: ElementId,
    style: StyleRefinement,
    theme: RichbarTheme,
    tooltip: Option<SharedString>,
    selected: bool,
    children: Vec<gpui::AnyElement>,
    on_press: Option<Rc<dyn Fn(&MouseDownEvent, &mut Window, &mut App)>>,
}

impl ToolbarButton {
    pub fn new(id: impl Into<ElementId>) -> Self {
        Self {
            id: id.into(),
            style: StyleRefinement::default(),
            theme: RichbarTheme::default(),
            tooltip: None,
            selected: false,
            children: Vec::new(),
            on_press: None,
        }
    }

    pub fn theme(mut self, theme: RichbarTheme) -> Self {
        self.theme = theme;
        self
    }

    pub fn tooltip(mut self, tooltip: impl Into<SharedString>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Runs on left mouse down, before focus could leave the editor.
    pub fn on_press(
        mut self,
        on_press: impl Fn(&MouseDownEvent, &mut Window, &mut App) + 'static,
    ) -> Self {
        self.on_press = Some(Rc::new(on_press));
        self
    }
}

impl ParentElement for ToolbarButton {
    fn extend(&mut self, elements: impl IntoIterator<Item = gpui::AnyElement>) {
        self.children.extend(elements);
    }
}

impl Styled for ToolbarButton {
    fn style(&mut self) -> &mut StyleRefinement {
        &mut self.style
    }
}

impl Selectable for ToolbarButton {
    fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    fn is_selected(&self) -> bool {
        self.selected
    }
}

impl RenderOnce for ToolbarButton {
    fn render(self, _window: &mut Window, _cx: &mut App) -> impl IntoElement {
        let theme = self.theme;

        div()
            .id(self.id)
            .flex()
            .items_center()
            .justify_center()
            .min_w(theme.button_min_size)
            .min_h(theme.button_min_size)
            .px(px(8.))
            .rounded(theme.button_radius)
            .bg(theme.button_background)
            .cursor_pointer()
            .text_color(if self.selected {
                theme.button_text_active
            } else {
                theme.button_text
            })
            .refine_style(&self.style)
            .on_mouse_down(MouseButton::Left, {
                let on_press = self.on_press;
                move |event, window, cx| {
                    // Keep focus and the selection in the editor.
                    window.prevent_default();
                    if let Some(on_press) = on_press.as_ref() {
                        on_press(event, window, cx);
                    }
                }
            })
            .children(self.children)
            .when_some(self.tooltip, |this, tooltip| {
                this.tooltip(move |window, cx| Tooltip::new(tooltip.clone()).build(window, cx))
            })
    }
}

/// Button for one [`ToolbarItem`], wired to the editor's query and toggle.
fn item_button(state: &Entity<EditorState>, item: ToolbarItem, cx: &App) -> ToolbarButton {
    let (active, theme) = {
        let state = state.read(cx);
        (state.is_active(item), state.theme)
    };
    let state = state.clone();

    ToolbarButton::new(item.id())
        .theme(theme)
        .tooltip(item.label())
        .selected(active)
        .child(item.label())
        .on_press(move |_, window, cx| {
            state.update(cx, |this, cx| this.toggle(item, cx));
            let focus_handle = state.read(cx).focus_handle();
            window.focus(&focus_handle);
        })
}

#[derive(IntoElement)]
pub struct BlockButton {
    state: Entity<EditorState>,
    block: BlockType,
}

impl BlockButton {
    pub fn new(state: Entity<EditorState>, block: BlockType) -> Self {
        Self { state, block }
    }
}

impl RenderOnce for BlockButton {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        item_button(&self.state, ToolbarItem::Block(self.block), cx)
    }
}

#[derive(IntoElement)]
pub struct MarkButton {
    state: Entity<EditorState>,
    mark: Mark,
}

impl MarkButton {
    pub fn new(state: Entity<EditorState>, mark: Mark) -> Self {
        Self { state, mark }
    }
}

impl RenderOnce for MarkButton {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        item_button(&self.state, ToolbarItem::Mark(self.mark), cx)
    }
}

/// The row of block and mark buttons.
#[derive(IntoElement)]
pub struct Toolbar {
    state: Entity<EditorState>,
}

impl Toolbar {
    pub fn new(state: Entity<EditorState>) -> Self {
        Self { state }
    }
}

impl RenderOnce for Toolbar {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        let theme = self.state.read(cx).theme;

        div()
            .flex()
            .flex_wrap()
            .items_center()
            .justify_center()
            .gap(theme.toolbar_gap)
            .p(theme.toolbar_gap)
            .children(toolbar_items().map(|item| match item {
                ToolbarItem::Block(block) => {
                    BlockButton::new(self.state.clone(), block).into_any_element()
                }
                ToolbarItem::Mark(mark) => {
                    MarkButton::new(self.state.clone(), mark).into_any_element()
                }
            }))
    }
}
