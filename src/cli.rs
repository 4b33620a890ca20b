//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    DEFAULT_ALTERNATING_INTERVAL, DEFAULT_LONG_PERIOD, DEFAULT_SHORT_PERIOD,
    parse_config_timestamp, validate_simulation_config,
};
use crate::domain::error::BtcsimError;
use crate::domain::metrics::DEFAULT_PERIODS_PER_YEAR;
use crate::domain::ohlcv::{PriceBar, PriceSeries};
use crate::domain::signal::{
    AlternatingSignal, ModelPredictionSignal, SignalSource, TechnicalIndicatorSignal,
};
use crate::domain::simulation::{SimulationConfig, SimulationState, run_simulation};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "btcsim", about = "Bitcoin trading simulation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a simulation configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the date range of the configured price data
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Simulate {
            config,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_simulate(&config, output.as_ref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = BtcsimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn build_simulation_config(adapter: &dyn ConfigPort) -> Result<SimulationConfig, BtcsimError> {
    let start = parse_config_timestamp(
        adapter.get_string("simulation", "start").as_deref(),
        "start",
    )?;
    let end = parse_config_timestamp(adapter.get_string("simulation", "end").as_deref(), "end")?;

    let mut config = SimulationConfig::new(
        adapter.get_double("simulation", "initial_capital", 10_000.0),
        adapter.get_double("simulation", "fee_rate", 0.001),
        start,
        end,
    );
    config.slippage_rate = adapter.get_double("simulation", "slippage_rate", 0.0);
    if adapter.get_string("simulation", "sizing_fraction").is_some() {
        config.sizing_fraction = Some(adapter.get_double("simulation", "sizing_fraction", 1.0));
    }
    config.periods_per_year = adapter.get_double(
        "simulation",
        "periods_per_year",
        DEFAULT_PERIODS_PER_YEAR,
    );
    Ok(config)
}

pub fn build_data_port(adapter: &dyn ConfigPort) -> Result<CsvAdapter, BtcsimError> {
    let prices = adapter
        .get_string("data", "prices")
        .ok_or_else(|| BtcsimError::ConfigMissing {
            section: "data".into(),
            key: "prices".into(),
        })?;
    let predictions = adapter.get_string("data", "predictions").map(PathBuf::from);
    Ok(CsvAdapter::new(PathBuf::from(prices), predictions))
}

/// Build the configured signal source over the simulation window bars.
pub fn build_signal_source(
    adapter: &dyn ConfigPort,
    data_port: &dyn DataPort,
    window_bars: &[PriceBar],
    sim_config: &SimulationConfig,
) -> Result<Box<dyn SignalSource>, BtcsimError> {
    let source = adapter
        .get_string("signal", "source")
        .ok_or_else(|| BtcsimError::ConfigMissing {
            section: "signal".into(),
            key: "source".into(),
        })?;

    match source.trim() {
        "model" => {
            let predictions =
                data_port.fetch_predictions(sim_config.start, sim_config.end)?;
            let kind = adapter
                .get_string("signal", "prediction_kind")
                .unwrap_or_else(|| "direction".to_string());
            match kind.trim() {
                "direction" => Ok(Box::new(ModelPredictionSignal::from_directions(
                    window_bars,
                    &predictions,
                ))),
                "price" => Ok(Box::new(ModelPredictionSignal::from_predicted_prices(
                    window_bars,
                    &predictions,
                ))),
                other => Err(BtcsimError::ConfigInvalid {
                    section: "signal".into(),
                    key: "prediction_kind".into(),
                    reason: format!("unknown prediction kind '{}', expected direction or price", other),
                }),
            }
        }
        "ma_crossover" => {
            let short = adapter.get_int("signal", "short_period", DEFAULT_SHORT_PERIOD);
            let long = adapter.get_int("signal", "long_period", DEFAULT_LONG_PERIOD);
            Ok(Box::new(TechnicalIndicatorSignal::new(
                window_bars,
                short as usize,
                long as usize,
            )?))
        }
        "alternating" => {
            let interval =
                adapter.get_int("signal", "interval", DEFAULT_ALTERNATING_INTERVAL);
            Ok(Box::new(AlternatingSignal::new(interval as usize)?))
        }
        other => Err(BtcsimError::ConfigInvalid {
            section: "signal".into(),
            key: "source".into(),
            reason: format!(
                "unknown signal source '{}', expected model, ma_crossover or alternating",
                other
            ),
        }),
    }
}

fn run_simulate(config_path: &PathBuf, output_path: Option<&PathBuf>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate
    if let Err(e) = validate_simulation_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 3: Build SimulationConfig
    let sim_config = match build_simulation_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 4: Load price data
    let data_port = match build_data_port(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let bars = match data_port.fetch_ohlcv(sim_config.start, sim_config.end) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if bars.is_empty() {
        let e = BtcsimError::NoData {
            start: sim_config.start,
            end: sim_config.end,
        };
        eprintln!("error: {e}");
        return (&e).into();
    }
    let series = match PriceSeries::new(bars) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 5: Build signal source over the window
    let window_bars = series.window(sim_config.start, sim_config.end).to_vec();
    let source = match build_signal_source(&adapter, &data_port, &window_bars, &sim_config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 6: Run
    eprintln!(
        "Running simulation: {} bars, {} to {}",
        window_bars.len(),
        sim_config.start,
        sim_config.end,
    );
    let run = match run_simulation(&series, source.as_ref(), &sim_config, None) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 7: Console summary to stderr
    if let Some(result) = &run.result {
        eprintln!("\n=== Results ===");
        eprintln!("Final Balance:    {:.2}", result.final_balance);
        eprintln!("Profit/Loss:      {:+.2}", result.profit_loss);
        eprintln!("ROI:              {:.2}%", result.roi * 100.0);
        eprintln!("Annualized:       {:.2}%", result.annualized_return * 100.0);
        eprintln!("Sharpe Ratio:     {:.2}", result.sharpe_ratio);
        eprintln!("Max Drawdown:     -{:.1}%", result.max_drawdown * 100.0);
        eprintln!("Total Trades:     {}", result.total_trades);
        eprintln!("Win Rate:         {:.1}%", result.win_rate * 100.0);
        eprintln!("Buy & Hold:       {:.2}%", result.buy_hold_return * 100.0);
        eprintln!("Excess Return:    {:.2}%", result.excess_return * 100.0);
        if !run.skipped.is_empty() {
            eprintln!("Skipped Signals:  {}", run.skipped.len());
        }
    }

    // Stage 8: Write report, including partial history on failure
    let output = output_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("report"));
    if let Err(e) = CsvReportAdapter.write(&run, &output) {
        eprintln!("error: failed to write report: {e}");
        return (&e).into();
    }
    eprintln!("\nReport written to: {}", output.display());

    match run.state {
        SimulationState::Failed => {
            if let Some(failure) = &run.failure {
                eprintln!("error: simulation failed: {failure}");
                failure.into()
            } else {
                ExitCode::FAILURE
            }
        }
        _ => ExitCode::SUCCESS,
    }
}

pub fn run_dry_run(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_simulation_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let sim_config = match build_simulation_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Config validated successfully");
    eprintln!("\nSimulation window:");
    eprintln!("  start: {}", sim_config.start);
    eprintln!("  end:   {}", sim_config.end);
    eprintln!("\nCapital:");
    eprintln!("  initial_capital: {:.2}", sim_config.initial_capital);
    eprintln!("  fee_rate:        {}", sim_config.fee_rate);
    eprintln!("  slippage_rate:   {}", sim_config.slippage_rate);
    match sim_config.sizing_fraction {
        Some(fraction) => eprintln!("  sizing:          {:.0}% of cash per buy", fraction * 100.0),
        None => eprintln!("  sizing:          all-in"),
    }
    let source = adapter.get_string("signal", "source").unwrap_or_default();
    eprintln!("\nSignal source: {}", source);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_simulation_config(&adapter) {
        Ok(()) => {
            eprintln!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_info(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let data_port = match build_data_port(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match data_port.data_range() {
        Ok(Some((min, max, count))) => {
            println!("{} bars, {} to {}", count, min, max);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("no price data found");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
