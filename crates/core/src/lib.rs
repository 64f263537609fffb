//! `pipegrid-core`: framework-agnostic types shared by the engine and hosts.

pub mod geometry;
pub mod selection;

pub use geometry::{place_menu, MenuPlacement, Point, Size};
pub use selection::{CellIndex, ClickModifiers, Selection, Span};
