//! Transfer attempt phases
//!
//! Tracked per attempt for logging only; nothing here is persisted and no
//! intermediate phase is visible outside the attempt.

use std::fmt;

/// ```text
/// STARTED → LOCKS_ACQUIRED → ROWS_WRITTEN → COMMITTED
///    └──────────┴────────────────┴──────→ ABORTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferPhase {
    /// Scope opened, no rows touched
    Started,
    /// Both account rows locked and validated
    LocksAcquired,
    /// Transfer, entries and balances written inside the scope
    RowsWritten,
    /// Terminal: scope committed
    Committed,
    /// Terminal: scope rolled back
    Aborted,
}

impl TransferPhase {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferPhase::Committed | TransferPhase::Aborted)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_advance_to(&self, next: TransferPhase) -> bool {
        use TransferPhase::*;
        match (self, next) {
            (Started, LocksAcquired) | (LocksAcquired, RowsWritten) | (RowsWritten, Committed) => {
                true
            }
            (Started | LocksAcquired | RowsWritten, Aborted) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferPhase::Started => "STARTED",
            TransferPhase::LocksAcquired => "LOCKS_ACQUIRED",
            TransferPhase::RowsWritten => "ROWS_WRITTEN",
            TransferPhase::Committed => "COMMITTED",
            TransferPhase::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(TransferPhase::Committed.is_terminal());
        assert!(TransferPhase::Aborted.is_terminal());
        assert!(!TransferPhase::Started.is_terminal());
        assert!(!TransferPhase::LocksAcquired.is_terminal());
        assert!(!TransferPhase::RowsWritten.is_terminal());
    }

    #[test]
    fn test_forward_path() {
        assert!(TransferPhase::Started.can_advance_to(TransferPhase::LocksAcquired));
        assert!(TransferPhase::LocksAcquired.can_advance_to(TransferPhase::RowsWritten));
        assert!(TransferPhase::RowsWritten.can_advance_to(TransferPhase::Committed));

        assert!(!TransferPhase::Started.can_advance_to(TransferPhase::Committed));
        assert!(!TransferPhase::LocksAcquired.can_advance_to(TransferPhase::Started));
    }

    #[test]
    fn test_abort_from_any_live_phase() {
        for phase in [
            TransferPhase::Started,
            TransferPhase::LocksAcquired,
            TransferPhase::RowsWritten,
        ] {
            assert!(phase.can_advance_to(TransferPhase::Aborted));
        }
        assert!(!TransferPhase::Committed.can_advance_to(TransferPhase::Aborted));
        assert!(!TransferPhase::Aborted.can_advance_to(TransferPhase::Aborted));
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferPhase::LocksAcquired.to_string(), "LOCKS_ACQUIRED");
    }
}
