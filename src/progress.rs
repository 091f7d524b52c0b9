use std::io::Write;

use owo_colors::{OwoColorize, Stream};

use crate::types::RunOutcome;

/// Character-at-a-time progress line: `Run 2/10 ..x. ✓`.
///
/// Write errors are ignored; losing progress output must not abort a suite.
pub struct Progress<W: Write> {
    out: W,
    colored: bool,
}

impl<W: Write> Progress<W> {
    /// Glyphs are colored when stdout supports it.
    pub fn new(out: W) -> Self {
        Self { out, colored: true }
    }

    pub fn plain(out: W) -> Self {
        Self {
            out,
            colored: false,
        }
    }

    pub fn round_started(&mut self, round: usize, total: usize) {
        let _ = write!(self.out, "Run {}/{} ", round, total);
        let _ = self.out.flush();
    }

    pub fn run_finished(&mut self, outcome: &RunOutcome) {
        let glyph = match (outcome.is_success(), self.colored) {
            (true, true) => "."
                .if_supports_color(Stream::Stdout, |s| s.green())
                .to_string(),
            (false, true) => "x"
                .if_supports_color(Stream::Stdout, |s| s.red())
                .to_string(),
            (true, false) => ".".to_string(),
            (false, false) => "x".to_string(),
        };
        let _ = write!(self.out, "{}", glyph);
        let _ = self.out.flush();
    }

    pub fn round_finished(&mut self) {
        let _ = writeln!(self.out, " \u{2713}");
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
