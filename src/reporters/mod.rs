//! Progress and output reporting for verification runs
//!
//! The verifier and orchestrator report through [`VerificationReporter`] so
//! that console output is a choice of the caller, not a global toggle.

mod console;
mod silent;

pub use console::{render_progress_bar, ConsoleVerificationReporter};
pub use silent::SilentVerificationReporter;

use crate::domain::PieceIndex;
use crate::verify::{VerificationReport, VerifyMode};
use std::path::Path;

/// Trait for reporting verification progress and results
pub trait VerificationReporter: Send + Sync {
    /// Report the verification policy selected for the run
    fn report_mode(&self, mode: VerifyMode);

    /// Report a declared file that is absent and will be skipped
    fn report_file_skipped(&self, path: &Path);

    /// Report that `done` of `total` pieces have been checked
    fn report_piece_progress(&self, done: usize, total: usize);

    /// Report a piece that could not be read
    fn report_piece_error(&self, index: PieceIndex, error: &str);

    /// Report final verification results summary
    fn report_results(&self, report: &VerificationReport);
}
