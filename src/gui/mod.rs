//! Popout window front end (egui/eframe)

mod constants;
mod loader;
mod popout;

pub use popout::{PopoutChannels, run_popout};
