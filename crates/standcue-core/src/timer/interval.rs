use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Gap between an acknowledged prompt and the next one, in seconds.
///
/// Serialized untagged so a plain number means a fixed interval and a
/// `{ min, max }` table means a random draw:
///
/// ```toml
/// interval = 45
/// interval = { min = 10, max = 30 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalSpec {
    Fixed(u64),
    Range { min: u64, max: u64 },
}

impl IntervalSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            IntervalSpec::Fixed(0) => Err(ConfigError::invalid("interval", "must be > 0 seconds")),
            IntervalSpec::Fixed(_) => Ok(()),
            IntervalSpec::Range { min, max } => {
                if min == 0 {
                    Err(ConfigError::invalid("interval.min", "must be > 0 seconds"))
                } else if min > max {
                    Err(ConfigError::invalid(
                        "interval",
                        format!("min ({min}) must not exceed max ({max})"),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Choose the next interval: the fixed value, or a uniform draw from the
    /// inclusive range.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match *self {
            IntervalSpec::Fixed(secs) => secs,
            IntervalSpec::Range { min, max } if min >= max => min,
            IntervalSpec::Range { min, max } => rng.gen_range(min..=max),
        }
    }

    /// Inclusive `(min, max)` bounds; a fixed interval has equal bounds.
    pub fn bounds(&self) -> (u64, u64) {
        match *self {
            IntervalSpec::Fixed(secs) => (secs, secs),
            IntervalSpec::Range { min, max } => (min, max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn fixed_interval_is_returned_directly() {
        let mut rng = Pcg64::seed_from_u64(1);
        assert_eq!(IntervalSpec::Fixed(45).pick(&mut rng), 45);
    }

    #[test]
    fn degenerate_range_never_errors() {
        let spec = IntervalSpec::Range { min: 5, max: 5 };
        assert!(spec.validate().is_ok());
        let mut rng = Pcg64::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(spec.pick(&mut rng), 5);
        }
    }

    #[test]
    fn zero_and_inverted_intervals_are_rejected() {
        assert!(IntervalSpec::Fixed(0).validate().is_err());
        assert!(IntervalSpec::Range { min: 0, max: 10 }.validate().is_err());
        assert!(IntervalSpec::Range { min: 11, max: 10 }.validate().is_err());
    }

    #[test]
    fn toml_accepts_number_or_table() {
        #[derive(Deserialize)]
        struct Wrap {
            interval: IntervalSpec,
        }
        let fixed: Wrap = toml::from_str("interval = 30").unwrap();
        assert_eq!(fixed.interval, IntervalSpec::Fixed(30));
        let range: Wrap = toml::from_str("interval = { min = 10, max = 20 }").unwrap();
        assert_eq!(range.interval, IntervalSpec::Range { min: 10, max: 20 });
    }

    proptest! {
        #[test]
        fn range_draw_stays_inclusive(min in 1u64..500, span in 0u64..500, seed in any::<u64>()) {
            let spec = IntervalSpec::Range { min, max: min + span };
            let mut rng = Pcg64::seed_from_u64(seed);
            let got = spec.pick(&mut rng);
            prop_assert!(got >= min && got <= min + span);
        }

        #[test]
        fn equal_bounds_yield_that_value(n in 1u64..10_000, seed in any::<u64>()) {
            let mut rng = Pcg64::seed_from_u64(seed);
            prop_assert_eq!(IntervalSpec::Range { min: n, max: n }.pick(&mut rng), n);
        }
    }
}
