//! Renderers
//!
//! Turn session events into terminal output. `text` streams a line per
//! source as it resolves, `json` prints the final summary, `events` writes
//! the raw protocol events as JSON lines.

mod json;
mod text;

pub use json::{EventLogRenderer, JsonRenderer};
pub use text::TextRenderer;

use std::io::Write;

/// Write one line, logging (not failing) on a broken pipe
fn write_line<W: Write>(out: &mut W, line: &str) {
    if let Err(e) = writeln!(out, "{}", line) {
        tracing::debug!("Failed to write output: {}", e);
    }
}
