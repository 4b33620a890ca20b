//! Configuration validation.
//!
//! Validates all config fields before a simulation runs.

use crate::domain::ohlcv::parse_timestamp;
use crate::domain::error::BtcsimError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDateTime;

pub const DEFAULT_SHORT_PERIOD: i64 = 7;
pub const DEFAULT_LONG_PERIOD: i64 = 25;
pub const DEFAULT_ALTERNATING_INTERVAL: i64 = 15;

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), BtcsimError> {
    validate_initial_capital(config)?;
    validate_fee_rate(config)?;
    validate_slippage_rate(config)?;
    validate_dates(config)?;
    validate_sizing_fraction(config)?;
    validate_periods_per_year(config)?;
    validate_prices_path(config)?;
    validate_signal(config)?;
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BtcsimError> {
    let value = config.get_double("simulation", "initial_capital", 0.0);
    if value <= 0.0 {
        return Err(BtcsimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_fee_rate(config: &dyn ConfigPort) -> Result<(), BtcsimError> {
    let value = config.get_double("simulation", "fee_rate", 0.0);
    if value < 0.0 || value >= 1.0 {
        return Err(BtcsimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "fee_rate".to_string(),
            reason: "fee_rate must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_slippage_rate(config: &dyn ConfigPort) -> Result<(), BtcsimError> {
    if config.get_string("simulation", "slippage_rate").is_none() {
        return Ok(());
    }
    let value = config.get_double("simulation", "slippage_rate", 0.0);
    if value < 0.0 || value >= 1.0 {
        return Err(BtcsimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "slippage_rate".to_string(),
            reason: "slippage_rate must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BtcsimError> {
    let start_str = config.get_string("simulation", "start");
    let end_str = config.get_string("simulation", "end");

    let start = parse_config_timestamp(start_str.as_deref(), "start")?;
    let end = parse_config_timestamp(end_str.as_deref(), "end")?;

    if start >= end {
        return Err(BtcsimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "start".to_string(),
            reason: "start must be before end".to_string(),
        });
    }
    Ok(())
}

pub fn parse_config_timestamp(
    value: Option<&str>,
    field: &str,
) -> Result<NaiveDateTime, BtcsimError> {
    match value {
        None => Err(BtcsimError::ConfigMissing {
            section: "simulation".to_string(),
            key: field.to_string(),
        }),
        Some(s) => parse_timestamp(s).ok_or_else(|| BtcsimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: field.to_string(),
            reason: format!("invalid {} format, expected YYYY-MM-DD [HH:MM:SS]", field),
        }),
    }
}

fn validate_sizing_fraction(config: &dyn ConfigPort) -> Result<(), BtcsimError> {
    if config.get_string("simulation", "sizing_fraction").is_none() {
        return Ok(());
    }
    let value = config.get_double("simulation", "sizing_fraction", 0.0);
    if value <= 0.0 || value > 1.0 {
        return Err(BtcsimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "sizing_fraction".to_string(),
            reason: "sizing_fraction must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), BtcsimError> {
    if config.get_string("simulation", "periods_per_year").is_none() {
        return Ok(());
    }
    let value = config.get_double("simulation", "periods_per_year", 0.0);
    if value <= 0.0 {
        return Err(BtcsimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "periods_per_year".to_string(),
            reason: "periods_per_year must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_prices_path(config: &dyn ConfigPort) -> Result<(), BtcsimError> {
    match config.get_string("data", "prices") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(BtcsimError::ConfigMissing {
            section: "data".to_string(),
            key: "prices".to_string(),
        }),
    }
}

fn validate_signal(config: &dyn ConfigPort) -> Result<(), BtcsimError> {
    let source = match config.get_string("signal", "source") {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            return Err(BtcsimError::ConfigMissing {
                section: "signal".to_string(),
                key: "source".to_string(),
            });
        }
    };

    match source.trim() {
        "model" => {
            match config.get_string("data", "predictions") {
                Some(s) if !s.trim().is_empty() => Ok(()),
                _ => Err(BtcsimError::ConfigMissing {
                    section: "data".to_string(),
                    key: "predictions".to_string(),
                }),
            }
        }
        "ma_crossover" => {
            let short = config.get_int("signal", "short_period", DEFAULT_SHORT_PERIOD);
            let long = config.get_int("signal", "long_period", DEFAULT_LONG_PERIOD);
            if short < 1 || short >= long {
                return Err(BtcsimError::ConfigInvalid {
                    section: "signal".to_string(),
                    key: "short_period".to_string(),
                    reason: "short_period must be at least 1 and below long_period".to_string(),
                });
            }
            Ok(())
        }
        "alternating" => {
            let interval = config.get_int("signal", "interval", DEFAULT_ALTERNATING_INTERVAL);
            if interval < 1 {
                return Err(BtcsimError::ConfigInvalid {
                    section: "signal".to_string(),
                    key: "interval".to_string(),
                    reason: "interval must be at least 1".to_string(),
                });
            }
            Ok(())
        }
        other => Err(BtcsimError::ConfigInvalid {
            section: "signal".to_string(),
            key: "source".to_string(),
            reason: format!(
                "unknown signal source '{}', expected model, ma_crossover or alternating",
                other
            ),
        }),
    }
}
