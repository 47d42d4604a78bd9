use gpui::*;

use crate::state::EditorState;
use crate::theme::RichbarTheme;
use crate::toolbar::Toolbar;

/// Toolbar above the editing surface, mounted as one view.
pub struct RichbarEditor {
    state: Entity<EditorState>,
}

impl RichbarEditor {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        Self::with_theme(RichbarTheme::default(), window, cx)
    }

    pub fn with_theme(theme: RichbarTheme, window: &mut Window, cx: &mut Context<Self>) -> Self {
        let state = cx.new(|cx| EditorState::new(window, cx).theme(theme));
        cx.observe(&state, |_, _, cx| cx.notify()).detach();
        Self { state }
    }

    pub fn view(window: &mut Window, cx: &mut App) -> Entity<Self> {
        cx.new(|cx| Self::new(window, cx))
    }

    pub fn state(&self) -> Entity<EditorState> {
        self.state.clone()
    }
}

impl Focusable for RichbarEditor {
    fn focus_handle(&self, cx: &App) -> FocusHandle {
        self.state.read(cx).focus_handle()
    }
}

impl Render for RichbarEditor {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = self.state.read(cx).theme;
        let min_height = theme.card_min_height(window.viewport_size().height);

        div()
            .size_full()
            .flex()
            .flex_col()
            .child(Toolbar::new(self.state.clone()))
            .child(
                div()
                    .max_w(relative(0.9))
                    .w_full()
                    .min_h(min_height)
                    .mx_auto()
                    .my(theme.card_padding)
                    .p(theme.card_padding)
                    .rounded(theme.card_radius)
                    .shadow_md()
                    .bg(theme.card_background)
                    .child(self.state.clone()),
            )
    }
}
