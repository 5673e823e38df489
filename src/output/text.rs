//! Human-readable report.
//!
//! One section per root, then one line per pair, least similar first:
//!
//! ```text
//! /data/backups: 12 directories, 3 archives, 240 files, 1.2 GiB
//!    SHARED  CONTENT  PATHS  PAIR
//!   1.0 KiB    50.0%   0.67  photos  photos-old
//!   1.2 GiB   100.0%   1.00  2019  2019.zip  identical
//! ```

use std::fmt::Display;
use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::{Paint, Style};

use super::{RootReport, ScanReport};
use crate::duplicates::PairSim;

/// Text renderer for a [`ScanReport`].
pub struct TextOutput<'a> {
    report: &'a ScanReport,
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a renderer without colors.
    #[must_use]
    pub fn new(report: &'a ScanReport) -> Self {
        Self {
            report,
            color: false,
        }
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns the writer's I/O error.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (n, root) in self.report.roots.iter().enumerate() {
            if n > 0 {
                writeln!(writer)?;
            }
            self.write_root(writer, root)?;
        }

        let skipped = self.report.skipped_subtrees();
        if skipped > 0 {
            writeln!(writer)?;
            writeln!(
                writer,
                "{}",
                self.paint(
                    format!("{} unreadable subtree(s) skipped, see log for details", skipped),
                    Style::new().yellow()
                )
            )?;
        }
        Ok(())
    }

    fn write_root<W: Write>(&self, writer: &mut W, root: &RootReport) -> io::Result<()> {
        writeln!(
            writer,
            "{}: {} directories, {} archives, {} files, {}",
            self.paint(root.root.display(), Style::new().bold()),
            root.directories,
            root.archives,
            root.files,
            ByteSize(root.total_bytes)
        )?;

        if root.pairs.is_empty() {
            return writeln!(writer, "  No redundant directories found");
        }

        writeln!(
            writer,
            "{}",
            self.paint(
                format!("  {:>10}  {:>7}  {:>5}  PAIR", "SHARED", "CONTENT", "PATHS"),
                Style::new().dim()
            )
        )?;
        for pair in &root.pairs {
            self.write_pair(writer, pair)?;
        }
        Ok(())
    }

    fn write_pair<W: Write>(&self, writer: &mut W, pair: &PairSim) -> io::Result<()> {
        let sim = &pair.similarity;
        let identical = sim.is_identical_with(self.report.identical_threshold);

        let ratio = format!("{:>6.1}%", sim.content_ratio() * 100.0);
        let ratio = if identical {
            self.paint(ratio, Style::new().green().bold())
        } else if sim.content_ratio() >= 0.5 {
            self.paint(ratio, Style::new().yellow())
        } else {
            ratio
        };

        write!(
            writer,
            "  {:>10}  {}  {:>5.2}  {}  {}",
            ByteSize(sim.bytes_same).to_string(),
            ratio,
            sim.path_similarity,
            pair.path_a,
            pair.path_b
        )?;
        if identical {
            write!(writer, "  {}", self.paint("identical", Style::new().green()))?;
        }
        writeln!(writer)
    }

    fn paint(&self, text: impl Display, style: Style) -> String {
        if self.color {
            text.paint(style).to_string()
        } else {
            text.to_string()
        }
    }
}
