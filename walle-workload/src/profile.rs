//! Workload profiles: population, ramp, duration and thresholds

use crate::amount::ThinkTime;
use crate::archetype::Archetype;
use crate::error::{WorkloadError, WorkloadResult};
use crate::evaluator::{evaluate, EvaluationResult, StressAnalysis, ThresholdSet};
use crate::journeys;
use crate::stats::RunStatistics;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    /// Default archetype mix
    Mixed,
    /// Normal usage, gated on the load thresholds
    Load,
    /// Breaking-point search; violations are reported, not gated
    Stress,
    ExternalBank,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 4] = [
        ProfileKind::Mixed,
        ProfileKind::Load,
        ProfileKind::Stress,
        ProfileKind::ExternalBank,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProfileKind::Mixed => "mixed",
            ProfileKind::Load => "load",
            ProfileKind::Stress => "stress",
            ProfileKind::ExternalBank => "external-bank",
        }
    }

    pub fn build(&self) -> WorkloadResult<WorkloadProfile> {
        match self {
            ProfileKind::Mixed => WorkloadProfile::mixed(),
            ProfileKind::Load => WorkloadProfile::load(),
            ProfileKind::Stress => WorkloadProfile::stress(),
            ProfileKind::ExternalBank => WorkloadProfile::external_bank(),
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProfileKind {
    type Err = WorkloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WorkloadError::UnknownProfile(s.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct WorkloadProfile {
    pub kind: ProfileKind,
    pub users: usize,
    /// Users started per second
    pub spawn_rate: f64,
    pub run_time: Duration,
    /// Overrides the configured API host
    pub host: Option<String>,
    pub archetypes: Vec<Archetype>,
    pub thresholds: ThresholdSet,
}

fn archetype(
    name: &'static str,
    journey: WorkloadResult<crate::journey::Journey>,
    weight: f64,
    think: (f64, f64),
) -> WorkloadResult<Archetype> {
    Archetype::new(
        name,
        journey?,
        weight,
        ThinkTime::between_secs(think.0, think.1)?,
    )
}

impl WorkloadProfile {
    pub fn mixed() -> WorkloadResult<Self> {
        Ok(Self {
            kind: ProfileKind::Mixed,
            users: 50,
            spawn_rate: 5.0,
            run_time: Duration::from_secs(5 * 60),
            host: None,
            archetypes: vec![
                archetype("new_user", journeys::new_user(), 3.0, (1.0, 3.0))?,
                archetype("existing_user", journeys::existing_user(), 5.0, (1.0, 3.0))?,
                archetype("frequent_user", journeys::frequent_user(), 2.0, (1.0, 3.0))?,
                archetype("debin_user", journeys::debin_massive(), 1.0, (1.0, 3.0))?,
            ],
            thresholds: ThresholdSet::load(),
        })
    }

    pub fn load() -> WorkloadResult<Self> {
        Ok(Self {
            kind: ProfileKind::Load,
            users: 100,
            spawn_rate: 10.0,
            run_time: Duration::from_secs(10 * 60),
            host: None,
            archetypes: vec![
                archetype("load_new_user", journeys::new_user(), 4.0, (2.0, 5.0))?,
                archetype("load_existing_user", journeys::existing_user(), 5.0, (1.0, 4.0))?,
                archetype("load_frequent_user", journeys::frequent_user(), 1.0, (1.0, 3.0))?,
            ],
            thresholds: ThresholdSet::load(),
        })
    }

    pub fn stress() -> WorkloadResult<Self> {
        Ok(Self {
            kind: ProfileKind::Stress,
            users: 1000,
            spawn_rate: 50.0,
            run_time: Duration::from_secs(15 * 60),
            host: None,
            archetypes: vec![
                archetype("stress_user", journeys::aggressive(), 8.0, (0.1, 0.5))?,
                archetype("stress_debin_user", journeys::debin_massive(), 2.0, (0.1, 0.3))?,
                archetype("database_stress_user", journeys::database_stress(), 1.0, (0.1, 0.2))?,
            ],
            thresholds: ThresholdSet::breaking_point(),
        })
    }

    pub fn external_bank() -> WorkloadResult<Self> {
        Ok(Self {
            kind: ProfileKind::ExternalBank,
            users: 20,
            spawn_rate: 2.0,
            run_time: Duration::from_secs(5 * 60),
            host: None,
            archetypes: vec![archetype(
                "bank_transfer_user",
                journeys::external_bank_transfer(),
                1.0,
                (1.0, 3.0),
            )?],
            thresholds: ThresholdSet::load(),
        })
    }

    pub fn by_name(name: &str) -> WorkloadResult<Self> {
        name.parse::<ProfileKind>()?.build()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn with_users(mut self, users: usize) -> Self {
        self.users = users;
        self
    }

    pub fn with_spawn_rate(mut self, spawn_rate: f64) -> Self {
        self.spawn_rate = spawn_rate;
        self
    }

    pub fn with_run_time(mut self, run_time: Duration) -> Self {
        self.run_time = run_time;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn validate(&self) -> WorkloadResult<()> {
        let invalid = |message: String| WorkloadError::InvalidProfile {
            profile: self.name().to_string(),
            message,
        };

        if self.users == 0 {
            return Err(invalid("users must be at least 1".to_string()));
        }
        if !self.spawn_rate.is_finite() || self.spawn_rate <= 0.0 {
            return Err(invalid(format!(
                "spawn rate must be positive, got {}",
                self.spawn_rate
            )));
        }
        self.spawn_interval()?;
        if self.run_time.is_zero() {
            return Err(invalid("run time must be positive".to_string()));
        }
        if !self.archetypes.iter().any(|a| a.weight() > 0.0) {
            return Err(invalid(
                "at least one archetype needs a positive weight".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay between two user spawns
    pub fn spawn_interval(&self) -> WorkloadResult<Duration> {
        Duration::try_from_secs_f64(1.0 / self.spawn_rate).map_err(|_| {
            WorkloadError::InvalidProfile {
                profile: self.name().to_string(),
                message: format!("spawn rate {} is out of range", self.spawn_rate),
            }
        })
    }

    /// Whether any archetype needs the shared bank recipient provisioned
    pub fn needs_bank_recipient(&self) -> bool {
        self.archetypes
            .iter()
            .any(|a| a.weight() > 0.0 && a.journey().needs_bank_recipient())
    }

    /// Whether threshold violations fail the run
    pub fn gates_on_thresholds(&self) -> bool {
        self.kind != ProfileKind::Stress
    }

    pub fn evaluate(&self, stats: &RunStatistics) -> EvaluationResult {
        evaluate(stats, &self.thresholds)
    }

    pub fn analyze(&self, stats: &RunStatistics) -> StressAnalysis {
        StressAnalysis::from_stats(stats, &self.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_profiles_build_and_validate() {
        for kind in ProfileKind::ALL {
            let profile = kind.build().unwrap();
            assert_eq!(profile.kind, kind);
            profile.validate().unwrap();
        }
    }

    #[test]
    fn test_profile_parameters() {
        let load = WorkloadProfile::load().unwrap();
        assert_eq!(load.users, 100);
        assert_eq!(load.spawn_rate, 10.0);
        assert_eq!(load.run_time, Duration::from_secs(600));
        assert_eq!(load.thresholds, ThresholdSet::load());
        let weights: Vec<_> = load.archetypes.iter().map(|a| a.weight()).collect();
        assert_eq!(weights, vec![4.0, 5.0, 1.0]);

        let stress = WorkloadProfile::stress().unwrap();
        assert_eq!(stress.users, 1000);
        assert_eq!(stress.thresholds, ThresholdSet::breaking_point());
        assert!(!stress.gates_on_thresholds());
        assert_eq!(
            stress.archetypes[0].think_time().min(),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_profile_names() {
        assert_eq!("external-bank".parse::<ProfileKind>().unwrap(), ProfileKind::ExternalBank);
        assert_eq!(" Stress ".parse::<ProfileKind>().unwrap(), ProfileKind::Stress);
        assert!(matches!(
            WorkloadProfile::by_name("soak"),
            Err(WorkloadError::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_overrides_and_validation() {
        let profile = WorkloadProfile::mixed()
            .unwrap()
            .with_users(3)
            .with_spawn_rate(1.5)
            .with_run_time(Duration::from_secs(30))
            .with_host("http://staging:3000");
        assert_eq!(profile.users, 3);
        assert_eq!(profile.host.as_deref(), Some("http://staging:3000"));
        profile.validate().unwrap();

        assert!(profile.clone().with_users(0).validate().is_err());
        assert!(profile.clone().with_spawn_rate(0.0).validate().is_err());
        assert!(profile.clone().with_spawn_rate(f64::NAN).validate().is_err());
        assert!(profile.with_run_time(Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_spawn_interval_bounds() {
        let profile = WorkloadProfile::load().unwrap().with_users(2);
        assert_eq!(
            profile.clone().with_spawn_rate(4.0).spawn_interval().unwrap(),
            Duration::from_millis(250)
        );

        let tiny = profile.with_spawn_rate(1e-20);
        assert!(matches!(
            tiny.spawn_interval(),
            Err(WorkloadError::InvalidProfile { .. })
        ));
        assert!(tiny.validate().is_err());
    }

    #[test]
    fn test_bank_recipient_only_for_bank_profile() {
        assert!(WorkloadProfile::external_bank().unwrap().needs_bank_recipient());
        assert!(!WorkloadProfile::mixed().unwrap().needs_bank_recipient());
    }
}
