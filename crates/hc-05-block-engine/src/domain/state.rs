//! Block lifecycle.
//!
//! ```text
//! Unmarshalled ──check──> Checked ──play_safe──> Playing ──commit──> Committed
//!       │                    │                      │
//!       └────────────────────┴──────────────────────┴──> Rejected(kind)
//! ```

use shared_types::RejectKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Unmarshalled,
    Checked,
    Playing,
    Committed,
    Rejected(RejectKind),
}

impl BlockState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Rejected(_))
    }
}
