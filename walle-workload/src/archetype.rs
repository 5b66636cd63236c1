//! Archetypes: a journey with a population weight and a think-time range

use crate::amount::ThinkTime;
use crate::error::{WorkloadError, WorkloadResult};
use crate::journey::{Journey, JourneyStep};
use crate::user::UserSession;
use async_trait::async_trait;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;

/// What a virtual user does when the runtime schedules it
#[async_trait]
pub trait Behavior: Send + Sync {
    /// Register, log in and run any setup step
    async fn on_start(&self, session: &mut UserSession);

    fn select_step<'a>(&'a self, rng: &mut StdRng) -> &'a JourneyStep;

    async fn run_step(&self, step: &JourneyStep, session: &mut UserSession);

    /// Pause before the next step
    fn think(&self, rng: &mut StdRng) -> Duration;
}

#[derive(Debug, Clone)]
pub struct Archetype {
    name: &'static str,
    journey: Arc<Journey>,
    weight: f64,
    think_time: ThinkTime,
}

impl Archetype {
    pub fn new(
        name: &'static str,
        journey: Journey,
        weight: f64,
        think_time: ThinkTime,
    ) -> WorkloadResult<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(WorkloadError::InvalidWeights(format!(
                "archetype '{}' has invalid weight {}",
                name, weight
            )));
        }
        Ok(Self {
            name,
            journey: Arc::new(journey),
            weight,
            think_time,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn journey(&self) -> &Journey {
        &self.journey
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn think_time(&self) -> ThinkTime {
        self.think_time
    }
}

#[async_trait]
impl Behavior for Archetype {
    async fn on_start(&self, session: &mut UserSession) {
        session.start().await;
        self.journey.run_setup(session).await;
    }

    fn select_step<'a>(&'a self, rng: &mut StdRng) -> &'a JourneyStep {
        self.journey.select_step(rng)
    }

    async fn run_step(&self, step: &JourneyStep, session: &mut UserSession) {
        self.journey.run_step(step, session).await;
    }

    fn think(&self, rng: &mut StdRng) -> Duration {
        self.think_time.sample(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journeys;
    use rand::SeedableRng;

    #[test]
    fn test_negative_weight_rejected() {
        let think = ThinkTime::between_secs(1.0, 3.0).unwrap();
        assert!(Archetype::new("bad", journeys::new_user().unwrap(), -1.0, think).is_err());
        assert!(Archetype::new("idle", journeys::new_user().unwrap(), 0.0, think).is_ok());
    }

    #[test]
    fn test_think_time_within_range() {
        let think = ThinkTime::between_secs(2.0, 5.0).unwrap();
        let archetype = Archetype::new("new", journeys::new_user().unwrap(), 4.0, think).unwrap();
        let mut rng = StdRng::seed_from_u64(8);

        for _ in 0..100 {
            let pause = archetype.think(&mut rng);
            assert!(pause >= Duration::from_secs(2) && pause <= Duration::from_secs(5));
        }
    }
}
