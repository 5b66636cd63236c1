//! Collision-resistant synthetic identities

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Email local-part prefix; the cleanup utility matches on it
pub const IDENTITY_PREFIX: &str = "loadtest";

/// Identity of one synthetic account
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub email: String,
    /// `{timestamp}.{sequence}` part shared by the email
    pub unique_id: String,
}

/// Produces identities for every virtual user of a run
///
/// Uniqueness within a run comes from the shared sequence counter, across
/// runs from the generator's creation timestamp. A random suffix keeps
/// concurrent harness processes apart.
#[derive(Debug)]
pub struct IdentityGenerator {
    domain: String,
    timestamp: i64,
    sequence: AtomicU64,
}

impl IdentityGenerator {
    pub fn new(domain: impl Into<String>) -> Self {
        Self::with_timestamp(domain, chrono::Utc::now().timestamp_millis())
    }

    pub fn with_timestamp(domain: impl Into<String>, timestamp: i64) -> Self {
        Self {
            domain: domain.into(),
            timestamp,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Number of identities handed out so far
    pub fn issued(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    pub fn next_identity<R: Rng + ?Sized>(&self, rng: &mut R) -> Identity {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let unique_id = format!("{}.{}", self.timestamp, sequence);
        let suffix: u32 = rng.random();

        Identity {
            email: format!(
                "{}.{}.{:08x}@{}",
                IDENTITY_PREFIX, unique_id, suffix, self.domain
            ),
            unique_id,
        }
    }

    /// External funding source, `BANK_` followed by eight digits
    pub fn source_identifier<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        format!("BANK_{:08}", rng.random_range(0..100_000_000u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_identity_shape() {
        let generator = IdentityGenerator::with_timestamp("example.com", 1_700_000_000_000);
        let mut rng = StdRng::seed_from_u64(7);

        let identity = generator.next_identity(&mut rng);
        assert!(identity.email.starts_with("loadtest.1700000000000.0."));
        assert!(identity.email.ends_with("@example.com"));
        assert_eq!(identity.unique_id, "1700000000000.0");
        assert_eq!(generator.issued(), 1);

        let source = generator.source_identifier(&mut rng);
        assert!(source.starts_with("BANK_"));
        assert_eq!(source.len(), 13);
        assert!(source[5..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_same_seed_still_yields_distinct_identities() {
        let generator = IdentityGenerator::with_timestamp("example.com", 1);
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(1);
        assert_ne!(generator.next_identity(&mut a), generator.next_identity(&mut b));
    }

    #[test]
    fn test_ten_thousand_concurrent_identities_are_unique() {
        let generator = Arc::new(IdentityGenerator::new("example.com"));

        let handles: Vec<_> = (0..10u64)
            .map(|worker| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    // Identical seeds on purpose: uniqueness must not depend on the rng
                    let mut rng = StdRng::seed_from_u64(worker % 2);
                    (0..1_000)
                        .map(|_| generator.next_identity(&mut rng).email)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for email in handle.join().unwrap() {
                assert!(seen.insert(email), "duplicate identity generated");
            }
        }
        assert_eq!(seen.len(), 10_000);
    }
}
