//! Amount ranges, transfer sizing and think-time distributions

use crate::error::{WorkloadError, WorkloadResult};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

/// Closed interval sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmountRange {
    min: f64,
    max: f64,
}

impl AmountRange {
    pub fn new(min: f64, max: f64) -> WorkloadResult<Self> {
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return Err(WorkloadError::InvalidRange(format!(
                "amount range [{}, {}] must be finite, non-negative and ordered",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// A degenerate range that always yields `amount`
    pub fn fixed(amount: f64) -> WorkloadResult<Self> {
        Self::new(amount, amount)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.min == self.max {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }
}

/// Sizing rule shared by every journey that transfers
///
/// The amount is drawn from `[minimum, min(cap, balance * balance_fraction)]`;
/// when that upper bound does not exceed `minimum` no transfer is made.
/// Below `top_up_below` the user first deposits `top_up_amount`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransferPolicy {
    pub minimum: f64,
    pub cap: f64,
    pub balance_fraction: f64,
    pub top_up_below: f64,
    pub top_up_amount: f64,
}

impl TransferPolicy {
    pub fn upper_bound(&self, balance: f64) -> f64 {
        self.cap.min(balance * self.balance_fraction)
    }

    /// Range a transfer would be drawn from, or `None` when it must be skipped
    pub fn range(&self, balance: f64) -> Option<(f64, f64)> {
        let upper = self.upper_bound(balance);
        (upper > self.minimum).then_some((self.minimum, upper))
    }

    pub fn draw<R: Rng + ?Sized>(&self, balance: f64, rng: &mut R) -> Option<f64> {
        self.range(balance)
            .map(|(low, high)| rng.random_range(low..=high))
    }

    pub fn needs_top_up(&self, balance: f64) -> bool {
        balance < self.top_up_below
    }
}

/// Uniform pause between a virtual user's actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThinkTime {
    min: Duration,
    max: Duration,
}

impl ThinkTime {
    pub fn new(min: Duration, max: Duration) -> WorkloadResult<Self> {
        if min > max {
            return Err(WorkloadError::InvalidRange(format!(
                "think time {:?} exceeds its maximum {:?}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// `between(1, 3)` in seconds
    pub fn between_secs(min: f64, max: f64) -> WorkloadResult<Self> {
        let to_duration = |secs: f64| {
            Duration::try_from_secs_f64(secs).map_err(|e| {
                WorkloadError::InvalidRange(format!("invalid think time {}: {}", secs, e))
            })
        };
        Self::new(to_duration(min)?, to_duration(max)?)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn existing_user_policy() -> TransferPolicy {
        TransferPolicy {
            minimum: 5.0,
            cap: 50.0,
            balance_fraction: 0.1,
            top_up_below: 10.0,
            top_up_amount: 100.0,
        }
    }

    #[test]
    fn test_low_balance_skips_transfer() {
        let policy = existing_user_policy();
        let mut rng = StdRng::seed_from_u64(1);

        // min(50, 40 * 0.1) = 4, not above the 5 floor
        assert_eq!(policy.upper_bound(40.0), 4.0);
        assert_eq!(policy.range(40.0), None);
        assert_eq!(policy.draw(40.0, &mut rng), None);

        // Equal bounds are skipped too
        assert_eq!(policy.range(50.0), None);
    }

    #[test]
    fn test_large_balance_is_capped() {
        let policy = existing_user_policy();
        let mut rng = StdRng::seed_from_u64(2);

        assert_eq!(policy.upper_bound(1000.0), 50.0);
        assert_eq!(policy.range(1000.0), Some((5.0, 50.0)));
        for _ in 0..1_000 {
            let amount = policy.draw(1000.0, &mut rng).unwrap();
            assert!((5.0..=50.0).contains(&amount));
        }
    }

    #[test]
    fn test_top_up_threshold() {
        let policy = existing_user_policy();
        assert!(policy.needs_top_up(9.99));
        assert!(!policy.needs_top_up(10.0));
    }

    #[test]
    fn test_amount_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let range = AmountRange::new(50.0, 500.0).unwrap();
        for _ in 0..100 {
            assert!((50.0..=500.0).contains(&range.sample(&mut rng)));
        }
        assert_eq!(AmountRange::fixed(100.0).unwrap().sample(&mut rng), 100.0);
        assert!(AmountRange::new(10.0, 1.0).is_err());
        assert!(AmountRange::new(-1.0, 1.0).is_err());
    }

    #[test]
    fn test_think_time_bounds() {
        let mut rng = StdRng::seed_from_u64(4);
        let think = ThinkTime::between_secs(0.1, 0.5).unwrap();
        for _ in 0..100 {
            let pause = think.sample(&mut rng);
            assert!(pause >= Duration::from_millis(100) && pause <= Duration::from_millis(500));
        }
        assert!(ThinkTime::between_secs(3.0, 1.0).is_err());
        assert!(ThinkTime::between_secs(-1.0, 1.0).is_err());
    }
}
