mod action;
mod state;
mod streams;

pub use action::Action;
pub use state::{AppState, FilterCache, PAGE_SIZE, UiState};
pub use streams::{ActiveStream, StreamView, Streams, ViewRow};
