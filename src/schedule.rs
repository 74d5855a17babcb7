//! Next-commit date computation.

use chrono::{DateTime, FixedOffset, SubsecRound, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::TimingConfig;
use crate::error::{Error, Result};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Source of uniformly distributed offsets.
pub trait Jitter {
    /// Draw a value from the closed range `[low, high]`.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

/// [`Jitter`] backed by a `rand` generator.
pub struct RandomJitter<R: Rng>(R);

impl RandomJitter<StdRng> {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Jitter for RandomJitter<R> {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.0.gen_range(low..=high)
    }
}

/// Compute the date for the next commit.
///
/// Without a previous commit the schedule starts `initial_backdate_days`
/// before `now`; otherwise it advances `interval_days` from `last_commit`.
/// Either way a uniform offset of up to `randomness_days` is applied and the
/// result is clamped so it never lands after `now`. The returned date has
/// whole-second precision.
///
/// # Errors
/// Returns [`Error::InvalidConfig`] for unusable timing values and
/// [`Error::TimestampOutOfRange`] if the arithmetic leaves chrono's range.
pub fn next_timestamp(
    last_commit: Option<DateTime<FixedOffset>>,
    timing: &TimingConfig,
    now: DateTime<FixedOffset>,
    jitter: &mut dyn Jitter,
) -> Result<DateTime<FixedOffset>> {
    timing.validate()?;

    let base = match last_commit {
        Some(last) => last.checked_add_signed(days(timing.interval_days)?),
        None => now.checked_sub_signed(days(timing.initial_backdate_days)?),
    }
    .ok_or(Error::TimestampOutOfRange)?;

    let spread = timing.randomness_days;
    let offset = if spread > 0.0 {
        jitter.uniform(-spread, spread)
    } else {
        0.0
    };

    let candidate = base
        .checked_add_signed(days(offset)?)
        .ok_or(Error::TimestampOutOfRange)?;

    // Hard clamp, no resampling.
    let scheduled = if candidate > now { now } else { candidate };
    Ok(scheduled.trunc_subsecs(0))
}

fn days(value: f64) -> Result<TimeDelta> {
    let millis = (value * MILLIS_PER_DAY).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(Error::TimestampOutOfRange);
    }
    TimeDelta::try_milliseconds(millis as i64).ok_or(Error::TimestampOutOfRange)
}
