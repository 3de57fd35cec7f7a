// =============================================================================
// Typed configuration — strategy, risk, and instrument constants
// =============================================================================
//
// Mirrors the teacher's `runtime_config.rs` shape: every field carries a
// `#[serde(default = "...")]` so old or partial JSON documents still load,
// and `AppConfig::save` writes atomically (tmp file + rename).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

fn default_ema_period() -> usize {
    14
}
fn default_atr_period() -> usize {
    14
}
fn default_volume_avg_period() -> usize {
    20
}
fn default_continuation_volume_period() -> usize {
    10
}
fn default_fib_min() -> f64 {
    0.382
}
fn default_fib_max() -> f64 {
    0.618
}
fn default_correction_max_bars() -> u32 {
    10
}
fn default_stop_atr_mult() -> f64 {
    1.5
}
fn default_target_atr_mult() -> f64 {
    2.5
}
fn default_trade_timeout_bars() -> u32 {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_ema_period")]
    pub ema_period: usize,
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    #[serde(default = "default_volume_avg_period")]
    pub volume_avg_period: usize,
    #[serde(default = "default_continuation_volume_period")]
    pub continuation_volume_period: usize,
    #[serde(default = "default_fib_min")]
    pub fib_min: f64,
    #[serde(default = "default_fib_max")]
    pub fib_max: f64,
    #[serde(default = "default_correction_max_bars")]
    pub correction_max_bars: u32,
    #[serde(default = "default_stop_atr_mult")]
    pub stop_atr_mult: f64,
    #[serde(default = "default_target_atr_mult")]
    pub target_atr_mult: f64,
    #[serde(default = "default_trade_timeout_bars")]
    pub trade_timeout_bars: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            ema_period: default_ema_period(),
            atr_period: default_atr_period(),
            volume_avg_period: default_volume_avg_period(),
            continuation_volume_period: default_continuation_volume_period(),
            fib_min: default_fib_min(),
            fib_max: default_fib_max(),
            correction_max_bars: default_correction_max_bars(),
            stop_atr_mult: default_stop_atr_mult(),
            target_atr_mult: default_target_atr_mult(),
            trade_timeout_bars: default_trade_timeout_bars(),
        }
    }
}

fn default_account_size() -> f64 {
    500.0
}
fn default_daily_loss_kill_pct() -> f64 {
    0.20
}
fn default_daily_loss_prekill_pct() -> f64 {
    0.18
}
fn default_max_trades_per_session() -> u32 {
    2
}
fn default_max_open_positions() -> u32 {
    1
}
fn default_cooldown_seconds() -> i64 {
    300
}
fn default_max_consecutive_losses() -> u32 {
    2
}
fn default_commission_per_side() -> f64 {
    2.50
}
fn default_slippage_ticks() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_account_size")]
    pub account_size: f64,
    #[serde(default = "default_daily_loss_kill_pct")]
    pub daily_loss_kill_pct: f64,
    #[serde(default = "default_daily_loss_prekill_pct")]
    pub daily_loss_prekill_pct: f64,
    #[serde(default = "default_max_trades_per_session")]
    pub max_trades_per_session: u32,
    #[serde(default = "default_max_open_positions")]
    pub max_open_positions: u32,
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: i64,
    #[serde(default = "default_max_consecutive_losses")]
    pub max_consecutive_losses: u32,
    #[serde(default = "default_commission_per_side")]
    pub commission_per_side: f64,
    #[serde(default = "default_slippage_ticks")]
    pub slippage_ticks: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            account_size: default_account_size(),
            daily_loss_kill_pct: default_daily_loss_kill_pct(),
            daily_loss_prekill_pct: default_daily_loss_prekill_pct(),
            max_trades_per_session: default_max_trades_per_session(),
            max_open_positions: default_max_open_positions(),
            cooldown_seconds: default_cooldown_seconds(),
            max_consecutive_losses: default_max_consecutive_losses(),
            commission_per_side: default_commission_per_side(),
            slippage_ticks: default_slippage_ticks(),
        }
    }
}

fn default_tick_size() -> f64 {
    0.25
}
fn default_point_value() -> f64 {
    5.0
}
fn default_symbol() -> String {
    "MES".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    #[serde(default = "default_tick_size")]
    pub tick_size: f64,
    #[serde(default = "default_point_value")]
    pub point_value: f64,
    #[serde(default = "default_symbol")]
    pub symbol: String,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            tick_size: default_tick_size(),
            point_value: default_point_value(),
            symbol: default_symbol(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub instrument: InstrumentConfig,
}

impl AppConfig {
    /// Load from `path`, falling back to defaults (with a warning) if the
    /// file is missing or unreadable.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, path = %path.display(), "failed to parse config, using defaults");
                Self::default()
            }),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
        }
    }

    /// Atomically persist to `path` via a tmp-file-then-rename.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("serializing config")?;
        fs::write(&tmp_path, json).context("writing tmp config file")?;
        fs::rename(&tmp_path, path).context("renaming tmp config file")?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.strategy.ema_period, 14);
        assert_eq!(cfg.risk.account_size, 500.0);
        assert_eq!(cfg.instrument.tick_size, 0.25);
        assert_eq!(cfg.instrument.point_value, 5.0);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let raw = r#"{"strategy": {"ema_period": 5}}"#;
        let cfg: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.strategy.ema_period, 5);
        assert_eq!(cfg.strategy.atr_period, 14);
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = AppConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let cfg = AppConfig::load("/nonexistent/path/does-not-exist.json");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = std::env::temp_dir().join(format!("icc-cfg-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        let mut cfg = AppConfig::default();
        cfg.strategy.ema_period = 21;
        cfg.save(&path).unwrap();
        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.strategy.ema_period, 21);
        let _ = fs::remove_dir_all(&dir);
    }
}
