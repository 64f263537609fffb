pub mod catalog;
pub mod cell;
pub mod clipboard;
pub mod context_menu;
pub mod dragdrop;
pub mod editor;
pub mod error;
pub mod events;
pub mod history;
pub mod phases;
pub mod preset;
pub mod state;
pub mod store;
pub mod timeline;

pub use pipegrid_core::CellIndex;
