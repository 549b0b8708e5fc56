//! Silent reporter for verification runs
//!
//! Provides a no-output implementation for tests and quiet operation.

use super::VerificationReporter;
use crate::domain::PieceIndex;
use crate::verify::{VerificationReport, VerifyMode};
use std::path::Path;

#[derive(Default)]
pub struct SilentVerificationReporter;

impl SilentVerificationReporter {
    pub fn new() -> Self {
        Self
    }
}

impl VerificationReporter for SilentVerificationReporter {
    fn report_mode(&self, _mode: VerifyMode) {}
    fn report_file_skipped(&self, _path: &Path) {}
    fn report_piece_progress(&self, _done: usize, _total: usize) {}
    fn report_piece_error(&self, _index: PieceIndex, _error: &str) {}
    fn report_results(&self, _report: &VerificationReport) {}
}
