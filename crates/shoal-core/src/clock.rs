//! Step clock for the Shoal simulation.
//!
//! The step counter is the single source of truth for simulated time. The
//! year and the position within the year are derived from it and the
//! configured number of steps per year, never stored.

use crate::config::RunConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Step counter would overflow.
    #[error("step counter overflow: cannot advance beyond u64::MAX")]
    StepOverflow,

    /// Zero steps per year.
    #[error("invalid time configuration: steps_per_year must be at least 1")]
    ZeroStepsPerYear,
}

/// Simulation clock counting steps from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepClock {
    step: u64,
    steps_per_year: u32,
}

impl StepClock {
    /// Create a clock at step 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::ZeroStepsPerYear`] if `steps_per_year` is 0.
    pub const fn new(steps_per_year: u32) -> Result<Self, ClockError> {
        Self::from_parts(0, steps_per_year)
    }

    /// Create a clock from the run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::ZeroStepsPerYear`] if the configured
    /// `steps_per_year` is 0.
    pub const fn from_config(config: &RunConfig) -> Result<Self, ClockError> {
        Self::new(config.steps_per_year)
    }

    /// Create a clock at an explicit step (useful for tests and restarts).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::ZeroStepsPerYear`] if `steps_per_year` is 0.
    pub const fn from_parts(step: u64, steps_per_year: u32) -> Result<Self, ClockError> {
        if steps_per_year == 0 {
            return Err(ClockError::ZeroStepsPerYear);
        }
        Ok(Self {
            step,
            steps_per_year,
        })
    }

    /// Advance by one step. Returns the new step number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::StepOverflow`] if the counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.step = self.step.checked_add(1).ok_or(ClockError::StepOverflow)?;
        Ok(self.step)
    }

    /// Current step number.
    pub const fn step(&self) -> u64 {
        self.step
    }

    /// Configured steps per year.
    pub const fn steps_per_year(&self) -> u32 {
        self.steps_per_year
    }

    /// Year containing the current step (0-based).
    pub fn year(&self) -> u64 {
        self.step
            .checked_div(u64::from(self.steps_per_year))
            .unwrap_or(0)
    }

    /// Position of the current step within its year (0-based).
    pub fn step_in_year(&self) -> u32 {
        self.step
            .checked_rem(u64::from(self.steps_per_year))
            .and_then(|s| u32::try_from(s).ok())
            .unwrap_or(0)
    }

    /// Whether the current step opens a new year.
    pub fn is_year_start(&self) -> bool {
        self.step_in_year() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_step_zero() {
        let clock = StepClock::new(24);
        assert!(clock.is_ok());
        if let Ok(clock) = clock {
            assert_eq!(clock.step(), 0);
            assert_eq!(clock.year(), 0);
            assert!(clock.is_year_start());
        }
    }

    #[test]
    fn zero_steps_per_year_is_rejected() {
        assert!(matches!(StepClock::new(0), Err(ClockError::ZeroStepsPerYear)));
    }

    #[test]
    fn clock_advances_through_years() {
        let clock = StepClock::new(12);
        assert!(clock.is_ok());
        let Ok(mut clock) = clock else { return };

        for _ in 0..25 {
            assert!(clock.advance().is_ok());
        }
        assert_eq!(clock.step(), 25);
        assert_eq!(clock.year(), 2);
        assert_eq!(clock.step_in_year(), 1);
        assert!(!clock.is_year_start());
    }

    #[test]
    fn advance_overflow_is_an_error() {
        let clock = StepClock::from_parts(u64::MAX, 1);
        assert!(clock.is_ok());
        if let Ok(mut clock) = clock {
            assert!(matches!(clock.advance(), Err(ClockError::StepOverflow)));
            assert_eq!(clock.step(), u64::MAX);
        }
    }

    #[test]
    fn from_config_uses_steps_per_year() {
        let clock = StepClock::from_config(&RunConfig::default());
        assert!(clock.is_ok_and(|c| c.steps_per_year() == 24));
    }
}
