//! CLI command implementations.

mod app;
mod display;

pub mod growth;
pub mod import;
pub mod path;
pub mod reach;
pub mod slice;
pub mod stats;

pub use app::GlobalOpts;
