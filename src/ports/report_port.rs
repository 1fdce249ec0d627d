//! Report output port trait.

use crate::domain::batch::JobOutcome;
use crate::domain::error::TastratError;
use crate::domain::returns::ReturnPeriod;

/// Writes the per-run results of a batch.
pub trait ReportPort {
    fn write(&self, outcomes: &[JobOutcome], period: ReturnPeriod) -> Result<(), TastratError>;
}
