//! Console progress bar.
//!
//! The bar is redrawn in place with carriage returns and only when its
//! fill width changes, so it does not flood the console. Diagnostics are
//! buffered elsewhere and printed after the run, never between redraws.

use std::io::{self, Write};

/// Fixed-width textual progress bar.
#[derive(Debug)]
pub struct ProgressBar {
    width: usize,
    filled: Option<usize>,
}

impl ProgressBar {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            filled: None,
        }
    }

    /// Draws the bar for a 0-100 percentage.
    ///
    /// No-op while the fill width is unchanged.
    pub fn update<W: Write>(&mut self, w: &mut W, percent: u8) -> io::Result<()> {
        let percent = percent.min(100) as usize;
        let filled = percent * self.width / 100;
        if self.filled == Some(filled) {
            return Ok(());
        }
        self.filled = Some(filled);
        write!(
            w,
            "\r[{}{}]",
            "#".repeat(filled),
            " ".repeat(self.width - filled)
        )?;
        w.flush()
    }

    /// Overwrites the bar with a final message and a newline.
    pub fn finish<W: Write>(&mut self, w: &mut W, message: &str) -> io::Result<()> {
        let pad = (self.width + 2).saturating_sub(message.len());
        writeln!(w, "\r{}{}", message, " ".repeat(pad))?;
        w.flush()
    }
}
