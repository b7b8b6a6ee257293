pub mod components;
mod layout;
pub mod screens;
mod theme;

pub use layout::{Layout, ViewerAreas};
pub use theme::Theme;
