//! Terminal palette.

use owo_colors::Style;

/// Styles applied by [`OutputContext`](super::OutputContext) and the
/// renderers. The default is plain text.
#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    /// Labels and secondary text.
    pub dim: Style,
    /// Step lines and section titles.
    pub header: Style,
    /// Docker API, admin portal and SSH URLs.
    pub endpoint: Style,
}

impl Styles {
    /// Palette for a color-capable terminal.
    #[must_use]
    pub fn colored() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red(),
            info: Style::new().blue(),
            dim: Style::new().dimmed(),
            header: Style::new().bold().cyan(),
            endpoint: Style::new().underline(),
        }
    }
}
