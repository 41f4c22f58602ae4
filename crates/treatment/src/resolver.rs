//! Canonical name to treatment resolution

use std::sync::Arc;

use tracing::debug;

use crate::severity::Severity;
use crate::table::{TreatmentInfo, TreatmentTable};

/// Single instruction returned for diseases the table does not know
pub const FALLBACK_INSTRUCTION: &str = "Consult a local agricultural expert.";

/// Resolves treatments from a table loaded once at startup
#[derive(Debug, Clone)]
pub struct TreatmentResolver {
    table: Arc<TreatmentTable>,
}

impl TreatmentResolver {
    pub fn new(table: TreatmentTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Look up by exact canonical name. A miss yields `UNKNOWN` severity with
    /// the single fallback instruction.
    pub fn resolve(&self, canonical_name: &str) -> TreatmentInfo {
        match self.table.get(canonical_name) {
            Some(info) => info.clone(),
            None => {
                debug!("No treatment for {:?}, using default advice", canonical_name);
                Self::unknown()
            }
        }
    }

    /// The default outcome for unknown diseases
    pub fn unknown() -> TreatmentInfo {
        TreatmentInfo::new(Severity::Unknown, [FALLBACK_INSTRUCTION])
    }

    pub fn table(&self) -> &TreatmentTable {
        &self.table
    }
}

impl Default for TreatmentResolver {
    fn default() -> Self {
        Self::new(TreatmentTable::seeded())
    }
}
