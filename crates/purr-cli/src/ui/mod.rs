//! Terminal output.
//!
//! - [`theme`] - colors and icons
//! - [`output`] - the [`Output`] handle commands print through; it also
//!   implements [`purr_core::Reporter`] for install progress
//! - [`table`] - `comfy-table` renderers for listings and statistics

pub mod output;
pub mod table;
pub mod theme;

pub use output::Output;
pub use theme::Theme;
