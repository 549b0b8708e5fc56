//! Console reporter for verification runs

use super::VerificationReporter;
use crate::domain::PieceIndex;
use crate::verify::{VerificationReport, VerifyMode};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Constants for output formatting
const PROGRESS_BAR_WIDTH: usize = 20;
const MIN_PIECES_FOR_SUMMARY: usize = 20; // Show the full list if <= this many pieces
const PIECE_SUMMARY_HEAD_TAIL: usize = 10; // Show first/last N pieces for long lists

/// Console implementation for verification runs
pub struct ConsoleVerificationReporter {
    /// Last rendered progress in hundredths of a percent
    last_fraction: AtomicU64,
}

impl Default for ConsoleVerificationReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleVerificationReporter {
    pub fn new() -> Self {
        Self {
            last_fraction: AtomicU64::new(u64::MAX),
        }
    }
}

impl VerificationReporter for ConsoleVerificationReporter {
    fn report_mode(&self, mode: VerifyMode) {
        println!("Verifying content ({} mode)...", mode);
    }

    fn report_file_skipped(&self, path: &Path) {
        println!("Skip file: {}", path.display());
    }

    fn report_piece_progress(&self, done: usize, total: usize) {
        let fraction = if total == 0 {
            10000
        } else {
            (10000 * done.min(total) as u64) / total as u64
        };
        if self.last_fraction.swap(fraction, Ordering::Relaxed) == fraction {
            return;
        }

        print!("\r{}", render_progress_bar(done, total));
        if done >= total {
            println!();
        }
        std::io::stdout().flush().ok();
    }

    fn report_piece_error(&self, index: PieceIndex, error: &str) {
        eprintln!("\nPiece {}: {}", index, error);
    }

    fn report_results(&self, report: &VerificationReport) {
        print!("{}", report);

        if !report.tally.bad_pieces.is_empty() {
            println!("\nDamaged pieces:");
            print_piece_list(&report.tally.bad_pieces);
        }
    }
}

/// Render `done` of `total` as a fixed-width bar, e.g. `[=========>          ] 47.50%`
pub fn render_progress_bar(done: usize, total: usize) -> String {
    let (done, total) = if total == 0 { (1, 1) } else { (done.min(total), total) };

    let filled = done * PROGRESS_BAR_WIDTH / total;
    let percent = done as f64 / total as f64 * 100.0;
    let remainder = (done * PROGRESS_BAR_WIDTH) as f64 / total as f64 - filled as f64;

    let mut bar = String::with_capacity(PROGRESS_BAR_WIDTH + 10);
    bar.push('[');
    bar.push_str(&"=".repeat(filled));
    let mut width = filled;
    if remainder > 0.5 {
        bar.push('>');
        width += 1;
    }
    bar.push_str(&" ".repeat(PROGRESS_BAR_WIDTH - width));
    bar.push(']');
    bar.push_str(&format!(" {:.2}%", percent));
    bar
}

/// Print a list of piece numbers, with summary for large lists
fn print_piece_list(pieces: &[PieceIndex]) {
    if pieces.len() <= MIN_PIECES_FOR_SUMMARY {
        for piece in pieces {
            println!("  Piece {}: damaged", piece);
        }
    } else {
        for piece in &pieces[..PIECE_SUMMARY_HEAD_TAIL] {
            println!("  Piece {}: damaged", piece);
        }
        println!(
            "  ... {} more damaged pieces ...",
            pieces.len() - (2 * PIECE_SUMMARY_HEAD_TAIL)
        );
        for piece in &pieces[pieces.len() - PIECE_SUMMARY_HEAD_TAIL..] {
            println!("  Piece {}: damaged", piece);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_empty_and_full() {
        assert_eq!(render_progress_bar(0, 10), "[                    ] 0.00%");
        assert_eq!(render_progress_bar(10, 10), "[====================] 100.00%");
    }

    #[test]
    fn test_progress_bar_partial_with_arrow() {
        // 7/16 -> 8.75 cells: 8 filled, remainder 0.75 draws the arrow
        assert_eq!(render_progress_bar(7, 16), "[========>           ] 43.75%");
        // 1/4 -> exactly 5 cells, no arrow
        assert_eq!(render_progress_bar(1, 4), "[=====               ] 25.00%");
    }

    #[test]
    fn test_progress_bar_clamps_overflow_and_zero_total() {
        assert_eq!(render_progress_bar(12, 10), render_progress_bar(10, 10));
        assert_eq!(render_progress_bar(0, 0), "[====================] 100.00%");
    }
}
