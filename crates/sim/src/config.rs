use std::time::Duration;
use thiserror::Error;

use bdisim_agent::{MatchMode, RuntimeConfig, ScheduleMode, SchedulerConfig, Tuning};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BDISIM_SEED is not a number: {0}")]
    InvalidSeed(String),

    #[error("{name} must be within 0.0..=1.0, got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },
}

pub struct SimConfig {
    /// Base seed. Each agent derives its own stream from it.
    pub seed: u64,
    pub scheduler: SchedulerConfig,
    pub runtime: RuntimeConfig,
}

impl SimConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seed: Option<u64>,
        ticks: u64,
        tick_ms: u64,
        mode: ScheduleMode,
        match_mode: MatchMode,
        receive_timeout_ms: u64,
        virality_probability: Option<f64>,
        feedback_probability: Option<f64>,
    ) -> Result<Self, ConfigError> {
        let seed = match seed {
            Some(seed) => seed,
            None => match std::env::var("BDISIM_SEED") {
                Ok(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidSeed(raw))?,
                Err(_) => rand::random(),
            },
        };

        let defaults = Tuning::default();
        let tuning = Tuning {
            virality_probability: probability(
                "virality probability",
                virality_probability.unwrap_or(defaults.virality_probability),
            )?,
            feedback_arrival_probability: probability(
                "feedback probability",
                feedback_probability.unwrap_or(defaults.feedback_arrival_probability),
            )?,
            ..defaults
        };

        Ok(Self {
            seed,
            scheduler: SchedulerConfig {
                tick_interval: Duration::from_millis(tick_ms),
                // 0 runs until Ctrl+C
                max_ticks: (ticks > 0).then_some(ticks),
                mode,
            },
            runtime: RuntimeConfig {
                receive_timeout: Duration::from_millis(receive_timeout_ms),
                match_mode,
                tuning,
                ..RuntimeConfig::default()
            },
        })
    }

    /// Seed for the agent at `index` in the roster.
    pub fn agent_seed(&self, index: usize) -> u64 {
        self.seed.wrapping_add(index as u64)
    }
}

fn probability(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::ProbabilityOutOfRange { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ticks: u64, virality: Option<f64>) -> Result<SimConfig, ConfigError> {
        SimConfig::new(
            Some(7),
            ticks,
            50,
            ScheduleMode::Cooperative,
            MatchMode::Structured,
            5,
            virality,
            None,
        )
    }

    #[test]
    fn test_zero_ticks_runs_forever() {
        let config = config(0, None).unwrap();
        assert_eq!(config.scheduler.max_ticks, None);
        assert_eq!(config.seed, 7);
        assert_eq!(config.agent_seed(2), 9);
    }

    #[test]
    fn test_probability_validated() {
        assert!(matches!(
            config(5, Some(1.5)),
            Err(ConfigError::ProbabilityOutOfRange { .. })
        ));
        let config = config(5, Some(1.0)).unwrap();
        assert_eq!(config.runtime.tuning.virality_probability, 1.0);
        assert_eq!(config.runtime.tuning.feedback_threshold, 2);
    }
}
