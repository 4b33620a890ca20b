//! File report adapter: trade log and equity curve as CSV, summary as JSON.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::domain::error::BtcsimError;
use crate::domain::metrics::SimulationResult;
use crate::domain::simulation::{SimulationRun, SimulationState, SkippedSignal};
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

#[derive(Serialize)]
struct Summary<'a> {
    state: SimulationState,
    initial_capital: f64,
    result: Option<&'a SimulationResult>,
    failure: Option<String>,
    skipped_signals: &'a [SkippedSignal],
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, run: &SimulationRun, output_dir: &Path) -> Result<(), BtcsimError> {
        fs::create_dir_all(output_dir)?;

        let mut writer = csv::Writer::from_path(output_dir.join("trades.csv"))
            .map_err(csv_error)?;
        for trade in &run.portfolio.trades {
            writer.serialize(trade).map_err(csv_error)?;
        }
        writer.flush()?;

        let mut writer = csv::Writer::from_path(output_dir.join("equity.csv"))
            .map_err(csv_error)?;
        for point in &run.portfolio.equity_curve {
            writer.serialize(point).map_err(csv_error)?;
        }
        writer.flush()?;

        let summary = Summary {
            state: run.state,
            initial_capital: run.portfolio.initial_capital,
            result: run.result.as_ref(),
            failure: run.failure.as_ref().map(|e| e.to_string()),
            skipped_signals: &run.skipped,
        };
        let json = serde_json::to_string_pretty(&summary).map_err(|e| BtcsimError::Data {
            reason: format!("failed to serialize summary: {}", e),
        })?;
        fs::write(output_dir.join("summary.json"), json)?;

        Ok(())
    }
}

fn csv_error(err: csv::Error) -> BtcsimError {
    BtcsimError::Data {
        reason: format!("CSV write error: {}", err),
    }
}
