//! The state store as a [`DbProbe`].

use crate::ports::DbProbe;
use hc_02_state_store::Database;

impl DbProbe for Database {
    fn is_available(&self) -> bool {
        self.ping().is_ok()
    }
}
