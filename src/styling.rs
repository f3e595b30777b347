//! Terminal styling.
//!
//! Messages are built with `color_print::cformat!` using HTML-like tags and
//! printed through the anstream macros, which drop the escapes when output
//! isn't a terminal or `NO_COLOR` is set:
//!
//! ```
//! use color_print::cformat;
//! use pr_checkout::styling::SUCCESS_EMOJI;
//!
//! let branch = "pr/me/100";
//! let msg = cformat!("{SUCCESS_EMOJI} <green>Checked out <bold>{branch}</></>");
//! ```
//!
//! Semantic mapping: errors `<red>`, warnings `<yellow>`, hints `<dim>`,
//! success `<green>`.

use anstyle::{AnsiColor, Color, Style};

/// Auto-detecting println that respects NO_COLOR, CLICOLOR_FORCE, and terminal capabilities
pub use anstream::println;

/// Auto-detecting eprintln that respects NO_COLOR, CLICOLOR_FORCE, and terminal capabilities
pub use anstream::eprintln;

/// Success emoji: `cformat!("{SUCCESS_EMOJI} <green>message</>")`
pub const SUCCESS_EMOJI: &str = "✅";

/// Error emoji: `cformat!("{ERROR_EMOJI} <red>message</>")`
pub const ERROR_EMOJI: &str = "❌";

/// Warning emoji: `cformat!("{WARNING_EMOJI} <yellow>message</>")`
pub const WARNING_EMOJI: &str = "🟡";

/// Hint emoji: `cformat!("{HINT_EMOJI} <dim>message</>")`
pub const HINT_EMOJI: &str = "💡";

/// Info emoji for neutral status lines
pub const INFO_EMOJI: &str = "⚪";

/// Branch names in tables (bold)
pub const BRANCH: Style = Style::new().bold();

/// Malformed entries in tables (red)
pub const INVALID: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));

/// Remove ANSI escapes, for tests and width calculations.
pub fn strip_ansi(s: &str) -> String {
    anstream::adapter::strip_str(s).to_string()
}
