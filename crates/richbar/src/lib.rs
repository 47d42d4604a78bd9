mod editor;
mod element;
mod state;
mod theme;
mod toolbar;

use gpui::App;

pub use editor::RichbarEditor;
pub use element::BlockLineElement;
pub use state::*;
pub use theme::RichbarTheme;
pub use toolbar::*;

pub fn init(cx: &mut App) {
    state::init(cx);
}
