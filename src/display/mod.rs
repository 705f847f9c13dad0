//! Popout display engine, independent of any windowing toolkit

pub mod export;
pub mod fog;
pub mod geometry;
pub mod grid;
pub mod html;
pub mod session;
pub mod state;

pub use geometry::{Rotation, Size};
pub use session::{Content, DisplaySession, HtmlLayout};
pub use state::Placement;
