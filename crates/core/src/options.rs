//! Batcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`BatcherOptions::frequency`] (milliseconds).
pub const ENV_FREQUENCY_MS: &str = "MICROBATCH_FREQUENCY_MS";
/// Environment variable overriding [`BatcherOptions::batch_size`].
pub const ENV_BATCH_SIZE: &str = "MICROBATCH_BATCH_SIZE";
/// Environment variable overriding [`BatcherOptions::max_queue_size`].
pub const ENV_MAX_QUEUE_SIZE: &str = "MICROBATCH_MAX_QUEUE_SIZE";

/// Flush cadence and size limits.
///
/// Values are taken as given: replacing the options while the batcher runs
/// overwrites every field, and nothing is validated (last write wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatcherOptions {
    /// Debounce window between the first queued job and cutting a batch.
    #[serde(with = "duration_ms")]
    pub frequency: Duration,
    /// Maximum number of jobs handed to the processor at once.
    pub batch_size: usize,
    /// Admission cap on queued jobs; `None` means unbounded.
    pub max_queue_size: Option<usize>,
}

impl Default for BatcherOptions {
    fn default() -> Self {
        Self {
            frequency: Duration::from_millis(2000),
            batch_size: 5,
            max_queue_size: None,
        }
    }
}

impl BatcherOptions {
    pub fn new(frequency: Duration, batch_size: usize, max_queue_size: Option<usize>) -> Self {
        Self {
            frequency,
            batch_size,
            max_queue_size,
        }
    }

    pub fn with_frequency(mut self, frequency: Duration) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_queue_size(mut self, max_queue_size: Option<usize>) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Defaults overlaid with `MICROBATCH_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup. Unparsable values are skipped.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_FREQUENCY_MS) {
            self.frequency = Duration::from_millis(ms);
        }
        if let Some(size) = parse_var::<usize>(&lookup, ENV_BATCH_SIZE) {
            self.batch_size = size;
        }
        if let Some(raw) = lookup(ENV_MAX_QUEUE_SIZE) {
            let raw = raw.trim();
            if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
                self.max_queue_size = None;
            } else {
                match raw.parse::<usize>() {
                    Ok(max) => self.max_queue_size = Some(max),
                    Err(e) => tracing::warn!(
                        key = ENV_MAX_QUEUE_SIZE,
                        value = raw,
                        error = %e,
                        "ignoring invalid option"
                    ),
                }
            }
        }
        self
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring invalid option");
            None
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis())
            .map_err(|_| S::Error::custom("frequency does not fit in u64 milliseconds"))?;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
