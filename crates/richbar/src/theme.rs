use gpui::{Hsla, Pixels, hsla, px, rgb};

#[derive(Clone, Copy, Debug)]
pub struct RichbarTheme {
    pub button_background: Hsla,
    pub button_text: Hsla,
    pub button_text_active: Hsla,
    pub button_radius: Pixels,
    pub button_min_size: Pixels,
    pub toolbar_gap: Pixels,
    pub card_background: Hsla,
    pub card_radius: Pixels,
    pub card_padding: Pixels,
    /// Viewport height the card leaves free for the toolbar and margins.
    pub card_viewport_inset: Pixels,
    pub foreground: Hsla,
    pub selection: Hsla,
    pub code_background: Hsla,
}

impl Default for RichbarTheme {
    fn default() -> Self {
        Self {
            button_background: rgb(0x1dd3e0).into(),
            button_text: hsla(0., 0., 1., 1.),
            button_text_active: hsla(0., 0., 0., 1.),
            button_radius: px(5.),
            button_min_size: px(30.),
            toolbar_gap: px(10.),
            card_background: hsla(0., 0., 1., 1.),
            card_radius: px(10.),
            card_padding: px(20.),
            card_viewport_inset: px(150.),
            foreground: hsla(0., 0., 0.12, 1.),
            selection: hsla(0.58, 1.0, 0.5, 0.25),
            code_background: rgb(gpui_richbar_core::CODE_BACKGROUND).into(),
        }
    }
}

impl RichbarTheme {
    /// Minimum card height for a viewport of `viewport_height`.
    pub fn card_min_height(&self, viewport_height: Pixels) -> Pixels {
        if viewport_height > self.card_viewport_inset {
            viewport_height - self.card_viewport_inset
        } else {
            px(0.)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_fills_the_viewport_below_the_toolbar() {
        let theme = RichbarTheme::default();
        assert_eq!(theme.card_min_height(px(800.)), px(650.));
        assert_eq!(theme.card_min_height(px(100.)), px(0.));
    }
}
