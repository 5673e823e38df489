//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements [`ProgressCallback`]
//! to display progress in the terminal while a scan runs. Two phases are
//! reported:
//!
//! - `fingerprint`: a spinner counting files and bytes while the walker runs
//! - `compare`: a bar over the candidate directory pairs

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Phase name reported by the walker.
pub const PHASE_FINGERPRINT: &str = "fingerprint";

/// Phase name reported by the redundancy detector.
pub const PHASE_COMPARE: &str = "compare";

/// Progress callback for the scan phases.
///
/// Implement this trait to receive progress updates from the walker and the
/// redundancy detector.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ([`PHASE_FINGERPRINT`] or [`PHASE_COMPARE`])
    /// * `total` - Total number of items to process, 0 when unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Canonical path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    fingerprint: Mutex<Option<ProgressBar>>,
    compare: Mutex<Option<ProgressBar>>,
    bytes: Mutex<u64>,
    prefix: Mutex<String>,
    quiet: bool,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupetree::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// assert!(progress.is_quiet());
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self {
            multi,
            fingerprint: Mutex::new(None),
            compare: Mutex::new(None),
            bytes: Mutex::new(0),
            prefix: Mutex::new(String::new()),
            quiet,
        }
    }

    /// Whether progress output is suppressed.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn fingerprint_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.green} {msg} [{elapsed_precise}] {pos} files, {prefix}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn compare_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn active_bar(&self) -> Option<ProgressBar> {
        locked(&self.compare)
            .clone()
            .or_else(|| locked(&self.fingerprint).clone())
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        match phase {
            PHASE_FINGERPRINT => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::fingerprint_style());
                pb.set_message("Fingerprinting");
                pb.set_prefix(bytesize::ByteSize(0).to_string());
                pb.enable_steady_tick(Duration::from_millis(100));
                *locked(&self.bytes) = 0;
                *locked(&self.fingerprint) = Some(pb);
            }
            PHASE_COMPARE => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::compare_style());
                pb.set_message("Comparing");
                *locked(&self.compare) = Some(pb);
            }
            other => {
                log::debug!("Progress: no bar for phase {}", other);
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        let display_msg = {
            let prefix = locked(&self.prefix);
            if prefix.is_empty() {
                truncate_path(path, 30)
            } else {
                format!("{}: {}", *prefix, truncate_path(path, 30))
            }
        };

        if let Some(pb) = self.active_bar() {
            pb.set_position(current as u64);
            pb.set_message(display_msg);
        }
    }

    fn on_item_completed(&self, bytes: u64) {
        if self.quiet {
            return;
        }

        let total = {
            let mut seen = locked(&self.bytes);
            *seen += bytes;
            *seen
        };
        if let Some(ref pb) = *locked(&self.fingerprint) {
            pb.set_prefix(bytesize::ByteSize(total).to_string());
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        match phase {
            PHASE_FINGERPRINT => {
                if let Some(pb) = locked(&self.fingerprint).take() {
                    pb.finish_with_message("Fingerprinting complete");
                }
            }
            PHASE_COMPARE => {
                if let Some(pb) = locked(&self.compare).take() {
                    pb.finish_with_message("Comparison complete");
                }
            }
            _ => {}
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        *locked(&self.prefix) = message.to_string();
        if let Some(pb) = self.active_bar() {
            pb.set_message(message.to_string());
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = path.rsplit('/').next().unwrap_or(path);
    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
