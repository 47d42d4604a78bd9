mod core;
mod editing;
mod format;
mod location;
mod ops;
mod plugin;
mod render;
mod toolbar;

pub use crate::core::*;
pub use crate::editing::*;
pub use crate::format::*;
pub use crate::location::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::render::*;
pub use crate::toolbar::*;
