use crate::stepper::TieBreak;
use crate::types::{
    DEFAULT_GRID_SIZE, DEFAULT_QUADRANTS, DEFAULT_STEP_MS, DEFAULT_SYNC_MS, DEFAULT_WIPE_PERIOD_SECS,
};
use std::str::FromStr;
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// World side length, fixed at world creation
    pub grid_size: usize,
    /// Number of quadrants (perfect square)
    pub quadrants: usize,
    /// Local generation period
    pub step_interval: Duration,
    /// Authoritative snapshot period
    pub sync_interval: Duration,
    /// Bound on one fetch round trip
    pub fetch_timeout: Duration,
    /// Bound on one placement commit
    pub commit_timeout: Duration,
    /// Time between quadrant wipes
    pub wipe_period_secs: u64,
    /// Newborn owner tie-break; must match the authority
    pub tie_break: TieBreak,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            quadrants: DEFAULT_QUADRANTS,
            step_interval: Duration::from_millis(DEFAULT_STEP_MS),
            sync_interval: Duration::from_millis(DEFAULT_SYNC_MS),
            fetch_timeout: Duration::from_millis(3_000),
            commit_timeout: Duration::from_millis(10_000),
            wipe_period_secs: DEFAULT_WIPE_PERIOD_SECS,
            tie_break: TieBreak::CellPosition,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    match env_parse::<u64>(key)? {
        0 => {
            tracing::warn!("{} must be > 0, using default", key);
            None
        }
        ms => Some(Duration::from_millis(ms)),
    }
}

impl ClientConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(size) = env_parse::<usize>("LIFE_GRID_SIZE") {
            if (8..=4096).contains(&size) {
                config.grid_size = size;
            } else {
                tracing::warn!("LIFE_GRID_SIZE must be 8-4096, using default");
            }
        }

        if let Some(quadrants) = env_parse::<usize>("LIFE_QUADRANTS") {
            config.quadrants = quadrants;
        }

        if let Some(d) = env_millis("LIFE_STEP_MS") {
            config.step_interval = d;
        }
        if let Some(d) = env_millis("LIFE_SYNC_MS") {
            config.sync_interval = d;
        }
        if let Some(d) = env_millis("LIFE_FETCH_TIMEOUT_MS") {
            config.fetch_timeout = d;
        }
        if let Some(d) = env_millis("LIFE_COMMIT_TIMEOUT_MS") {
            config.commit_timeout = d;
        }

        if let Some(secs) = env_parse::<u64>("LIFE_WIPE_PERIOD_SECS") {
            if secs > 0 {
                config.wipe_period_secs = secs;
            } else {
                tracing::warn!("LIFE_WIPE_PERIOD_SECS must be > 0, using default");
            }
        }

        if let Ok(raw) = std::env::var("LIFE_TIE_BREAK") {
            match raw.parse::<TieBreak>() {
                Ok(tb) => config.tie_break = tb,
                Err(e) => tracing::warn!("{}, using default", e),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_size == 0 || self.grid_size > u16::MAX as usize {
            return Err("grid_size must be 1-65535".to_string());
        }
        crate::quadrant::QuadrantLayout::new(self.grid_size, self.quadrants)?;
        if self.wipe_period_secs == 0 {
            return Err("wipe_period_secs must be at least 1".to_string());
        }
        if self.step_interval.is_zero() || self.sync_interval.is_zero() {
            return Err("step and sync intervals must be non-zero".to_string());
        }
        if self.sync_interval <= self.step_interval {
            return Err("sync_interval must be longer than step_interval".to_string());
        }
        if self.fetch_timeout.is_zero() || self.commit_timeout.is_zero() {
            return Err("fetch and commit timeouts must be non-zero".to_string());
        }
        Ok(())
    }
}
