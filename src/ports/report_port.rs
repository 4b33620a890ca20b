//! Report generation port trait.

use std::path::Path;

use crate::domain::error::BtcsimError;
use crate::domain::simulation::SimulationRun;

/// Port for writing simulation reports.
pub trait ReportPort {
    fn write(&self, run: &SimulationRun, output_dir: &Path) -> Result<(), BtcsimError>;
}
