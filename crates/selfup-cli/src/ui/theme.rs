//! UI Theme - colors and icons shared by all output

use crossterm::style::Color;

/// Visual constants for status lines
#[derive(Debug, Clone, Default)]
pub struct Theme {
    /// Colors for different line kinds
    pub colors: ColorScheme,
    /// Status icons
    pub icons: Icons,
}

/// Color scheme for status lines
#[derive(Debug, Clone)]
pub struct ColorScheme {
    /// Application names
    pub name: Color,
    /// Sizes, paths and other secondary detail
    pub secondary: Color,
    /// Section headers
    pub header: Color,
    /// Success states
    pub success: Color,
    /// Warning states
    pub warning: Color,
    /// Error states
    pub error: Color,
    /// In-progress stages
    pub active: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            name: Color::Cyan,
            secondary: Color::DarkGrey,
            header: Color::DarkGrey,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            active: Color::Blue,
        }
    }
}

/// Status icons
#[derive(Debug, Clone)]
pub struct Icons {
    /// In-progress stage (●)
    pub active: &'static str,
    /// Completed (✓)
    pub success: &'static str,
    /// Failed (✗)
    pub error: &'static str,
    /// Warning (⚠)
    pub warning: &'static str,
    /// Information (ℹ)
    pub info: &'static str,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            active: "●",
            success: "✓",
            error: "✗",
            warning: "⚠",
            info: "ℹ",
        }
    }
}
