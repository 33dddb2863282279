//! Terminal output for selfup commands.

pub mod output;
pub mod progress;
pub mod theme;

pub use output::Output;
pub use selfup_core::Reporter;
