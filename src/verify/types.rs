//! Type definitions for verification runs

use crate::bitfield::BitField;
use crate::domain::PieceIndex;
use std::fmt;

/// Verification policy, chosen once per run from on-disk file presence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Single-file manifest
    Single,
    /// Multi-file manifest, every declared file present
    Full,
    /// Multi-file manifest, some declared files absent
    Partial,
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyMode::Single => write!(f, "single-file"),
            VerifyMode::Full => write!(f, "full multi-file"),
            VerifyMode::Partial => write!(f, "partial multi-file"),
        }
    }
}

/// Classification of one piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceOutcome {
    /// Digest matches the reference
    Good,
    /// Digest computed but differs from the reference
    Bad,
    /// Piece lies (partly) in an absent file and could not be read
    Missing,
}

impl PieceOutcome {
    /// Missing pieces are accepted provisionally; only `Bad` fails a run.
    pub fn is_acceptable(&self) -> bool {
        !matches!(self, PieceOutcome::Bad)
    }
}

impl fmt::Display for PieceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PieceOutcome::Good => write!(f, "good"),
            PieceOutcome::Bad => write!(f, "bad"),
            PieceOutcome::Missing => write!(f, "missing"),
        }
    }
}

/// Running per-piece tally of a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceTally {
    pub good: usize,
    pub bad: usize,
    pub missing: usize,
    /// Pieces whose read failed for a reason other than an absent file
    pub failed: usize,
    /// Set exactly for the pieces confirmed good
    pub pieces: BitField,
    pub bad_pieces: Vec<PieceIndex>,
}

impl PieceTally {
    pub fn new(num_pieces: usize) -> Self {
        Self {
            good: 0,
            bad: 0,
            missing: 0,
            failed: 0,
            pieces: BitField::new(num_pieces),
            bad_pieces: Vec::new(),
        }
    }

    pub fn record(&mut self, index: PieceIndex, outcome: PieceOutcome) {
        match outcome {
            PieceOutcome::Good => {
                self.good += 1;
                self.pieces.set(index);
            }
            PieceOutcome::Bad => {
                self.bad += 1;
                self.bad_pieces.push(index);
            }
            PieceOutcome::Missing => self.missing += 1,
        }
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn total_pieces(&self) -> usize {
        self.pieces.len()
    }

    pub fn into_report(self, mode: VerifyMode) -> VerificationReport {
        VerificationReport { mode, tally: self }
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub mode: VerifyMode,
    pub tally: PieceTally,
}

impl VerificationReport {
    /// True when no piece is bad and no piece failed to read.
    /// Missing pieces do not count against the run.
    pub fn is_all_good(&self) -> bool {
        self.tally.bad == 0 && self.tally.failed == 0
    }

    pub fn good(&self) -> usize {
        self.tally.good
    }

    pub fn bad(&self) -> usize {
        self.tally.bad
    }

    pub fn missing(&self) -> usize {
        self.tally.missing
    }

    pub fn failed(&self) -> usize {
        self.tally.failed
    }

    pub fn pieces(&self) -> &BitField {
        &self.tally.pieces
    }

    pub fn total_pieces(&self) -> usize {
        self.tally.total_pieces()
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Verification Results ({} mode):", self.mode)?;
        writeln!(
            f,
            "Good pieces: {} Bad pieces: {} of {}",
            self.tally.good,
            self.tally.bad,
            self.total_pieces()
        )?;

        [
            (self.tally.missing, "piece(s) lie in missing files and were not checked."),
            (self.tally.failed, "piece(s) could not be read."),
        ]
        .iter()
        .filter(|(count, _)| *count > 0)
        .try_for_each(|(count, message)| writeln!(f, "{} {}", count, message))?;

        if self.is_all_good() {
            writeln!(f, "All available pieces are correct.")
        } else {
            writeln!(f, "Content is damaged.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_records_each_outcome() {
        let mut tally = PieceTally::new(4);
        tally.record(PieceIndex::new(0), PieceOutcome::Good);
        tally.record(PieceIndex::new(1), PieceOutcome::Bad);
        tally.record(PieceIndex::new(2), PieceOutcome::Missing);
        tally.record_failure();

        assert_eq!((tally.good, tally.bad, tally.missing, tally.failed), (1, 1, 1, 1));
        assert!(tally.pieces.get(PieceIndex::new(0)));
        assert!(!tally.pieces.get(PieceIndex::new(2)));
        assert_eq!(tally.bad_pieces, vec![PieceIndex::new(1)]);
    }

    #[test]
    fn test_missing_does_not_fail_report() {
        let mut tally = PieceTally::new(2);
        tally.record(PieceIndex::new(0), PieceOutcome::Good);
        tally.record(PieceIndex::new(1), PieceOutcome::Missing);
        let report = tally.into_report(VerifyMode::Partial);

        assert!(report.is_all_good());
        let text = report.to_string();
        assert!(text.contains("partial multi-file"));
        assert!(text.contains("1 piece(s) lie in missing files"));
    }

    #[test]
    fn test_outcome_acceptability() {
        assert!(PieceOutcome::Good.is_acceptable());
        assert!(PieceOutcome::Missing.is_acceptable());
        assert!(!PieceOutcome::Bad.is_acceptable());
    }
}
