use std::time::Duration;

use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub const PROFILE_ENV: &str = "BENCH_BRIDGE_PROFILE";
pub const SEED_ENV: &str = "BENCH_BRIDGE_SEED";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => Some(Profile::Quick),
            "full" => Some(Profile::Full),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BenchConfig {
    pub profile: Profile,
    pub seed: u64,
}

impl BenchConfig {
    /// Reads the profile and seed from the environment, falling back to quick/0.
    ///
    /// Test binaries cannot take CLI flags, so this is how a test run picks
    /// the full profile.
    pub fn from_env() -> Self {
        let profile = match std::env::var(PROFILE_ENV) {
            Ok(v) => Profile::parse(&v).unwrap_or_else(|| {
                tracing::warn!(value = %v, var = PROFILE_ENV, "unknown profile, using quick");
                Profile::Quick
            }),
            Err(_) => Profile::Quick,
        };
        let seed = std::env::var(SEED_ENV)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        Self { profile, seed }
    }

    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }

    pub fn warmup_invocations(&self) -> u64 {
        1
    }

    /// Runs per benchmark when the definition does not pin a count.
    pub fn iteration_runs(&self) -> u32 {
        match self.profile {
            Profile::Quick => 3,
            Profile::Full => 10,
        }
    }

    /// Measurement window for throughput benchmarks without an explicit run time.
    pub fn throughput_window(&self) -> Duration {
        match self.profile {
            Profile::Quick => Duration::from_millis(100),
            Profile::Full => Duration::from_millis(1_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("Full"), Some(Profile::Full));
        assert_eq!(Profile::parse(" quick "), Some(Profile::Quick));
        assert_eq!(Profile::parse("slow"), None);
    }

    #[test]
    fn test_profile_defaults() {
        let quick = BenchConfig::default();
        let full = BenchConfig {
            profile: Profile::Full,
            seed: 0,
        };
        assert!(quick.iteration_runs() < full.iteration_runs());
        assert!(quick.throughput_window() < full.throughput_window());
    }

    #[test]
    fn test_rng_is_seeded() {
        let cfg = BenchConfig {
            profile: Profile::Quick,
            seed: 7,
        };
        assert_eq!(cfg.rng().next_u64(), cfg.rng().next_u64());
    }
}
