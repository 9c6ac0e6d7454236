//! Age range catalog
//!
//! Parses the externally configured age range spec into an ordered,
//! gapless partition of age buckets and resolves buckets by age or label.
//! The spec is a comma-separated string: every segment except the last is
//! a closed `min-max` bucket with an optional `:label` suffix, and the
//! last segment is always the open-ended tail bucket whose label is the
//! raw trailing text. That positional asymmetry is a contract of the
//! format, not an omission.

use parking_lot::RwLock;
use patientgrid_model::{SettingRegistry, SETTING_AGE_RANGES};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A named, bounded range of ages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    /// Lower bound, inclusive
    pub min_age: u32,
    /// Upper bound, inclusive; `None` for the open-ended tail bucket
    pub max_age: Option<u32>,
    /// Display label
    pub label: String,
}

impl AgeRange {
    /// Create a labeled range
    pub fn new(min_age: u32, max_age: Option<u32>, label: impl Into<String>) -> Self {
        Self {
            min_age,
            max_age,
            label: label.into(),
        }
    }

    /// Create a range labeled by its own bounds
    pub fn unlabeled(min_age: u32, max_age: Option<u32>) -> Self {
        let label = match max_age {
            Some(max) => format!("{}-{}", min_age, max),
            None => format!("{}+", min_age),
        };
        Self {
            min_age,
            max_age,
            label,
        }
    }

    /// Check whether `age` falls within this bucket
    pub fn contains(&self, age: i64) -> bool {
        age >= i64::from(self.min_age)
            && self.max_age.is_none_or(|max| age <= i64::from(max))
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Errors raised while loading or parsing the age range spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgeRangeError {
    /// The backing setting is absent or blank
    #[error("no age ranges defined, please set the value for the setting named: {}", SETTING_AGE_RANGES)]
    NotConfigured,

    /// The supplied spec string is blank
    #[error("age range spec is blank")]
    EmptySpec,

    /// A non-final segment does not match the `min-max[:label]` grammar
    #[error("invalid age range segment `{segment}`")]
    InvalidSegment {
        /// The offending segment
        segment: String,
    },

    /// A bound is not a non-negative integer
    #[error("invalid age bound `{bound}` in segment `{segment}`")]
    InvalidBound {
        /// The offending segment
        segment: String,
        /// The bound text that failed to parse
        bound: String,
    },

    /// Buckets do not form a gapless ascending partition
    #[error("age ranges must form a gapless ascending partition, offending segment `{segment}`")]
    InvalidPartition {
        /// The offending segment
        segment: String,
    },
}

/// Parse the spec string into an ordered list of age buckets.
pub fn parse_age_ranges(spec: &str) -> Result<Vec<AgeRange>, AgeRangeError> {
    if spec.trim().is_empty() {
        return Err(AgeRangeError::EmptySpec);
    }

    let segments: Vec<&str> = spec.split(',').collect();
    let mut ranges: Vec<AgeRange> = Vec::with_capacity(segments.len());
    for (index, raw) in segments.iter().enumerate() {
        let segment = raw.trim();
        if index + 1 == segments.len() {
            // The tail bucket is open-ended and labeled by the raw text.
            let min_age = match ranges.last() {
                Some(previous) => previous.max_age.unwrap_or(0) + 1,
                None => 0,
            };
            ranges.push(AgeRange::new(min_age, None, segment));
            continue;
        }

        let (range_text, label) = match segment.split_once(':') {
            Some((range, label)) => (range.trim(), label.trim().to_string()),
            None => (segment, segment.to_string()),
        };
        let (min_text, max_text) =
            range_text
                .split_once('-')
                .ok_or_else(|| AgeRangeError::InvalidSegment {
                    segment: segment.to_string(),
                })?;
        let min_age = parse_bound(segment, min_text.trim())?;
        let max_age = parse_bound(segment, max_text.trim())?;
        if min_age > max_age {
            return Err(AgeRangeError::InvalidPartition {
                segment: segment.to_string(),
            });
        }
        if let Some(previous) = ranges.last() {
            // Non-final buckets always have an upper bound.
            let expected = previous.max_age.unwrap_or(0) + 1;
            if min_age != expected {
                return Err(AgeRangeError::InvalidPartition {
                    segment: segment.to_string(),
                });
            }
        }
        ranges.push(AgeRange::new(min_age, Some(max_age), label));
    }

    Ok(ranges)
}

fn parse_bound(segment: &str, bound: &str) -> Result<u32, AgeRangeError> {
    bound.parse().map_err(|_| AgeRangeError::InvalidBound {
        segment: segment.to_string(),
        bound: bound.to_string(),
    })
}

/// The bucket whose label matches exactly; first match wins.
pub fn range_with_label<'a>(ranges: &'a [AgeRange], label: &str) -> Option<&'a AgeRange> {
    ranges.iter().find(|range| range.label == label)
}

/// The bucket containing `age`, if the partition covers it.
pub fn range_for_age(ranges: &[AgeRange], age: i64) -> Option<&AgeRange> {
    ranges.iter().find(|range| range.contains(age))
}

/// Lazily memoized catalog over the configured spec string.
///
/// The built list is a pure function of external configuration, so the
/// initialization is idempotent and safe to race: the first writer wins.
/// The catalog serves the cached value until `reload` or `invalidate` is
/// called; a changed backing setting is not picked up on its own.
#[derive(Default)]
pub struct AgeRangeCatalog {
    cached: RwLock<Option<Arc<Vec<AgeRange>>>>,
}

impl AgeRangeCatalog {
    /// Create an unloaded catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached buckets, building them from `settings` on first use
    pub fn get(
        &self,
        settings: &dyn SettingRegistry,
    ) -> Result<Arc<Vec<AgeRange>>, AgeRangeError> {
        if let Some(cached) = self.cached.read().as_ref() {
            return Ok(cached.clone());
        }
        let built = Arc::new(load(settings)?);
        let mut slot = self.cached.write();
        Ok(slot.get_or_insert(built).clone())
    }

    /// Rebuild from `settings`, replacing any cached value
    pub fn reload(
        &self,
        settings: &dyn SettingRegistry,
    ) -> Result<Arc<Vec<AgeRange>>, AgeRangeError> {
        let built = Arc::new(load(settings)?);
        *self.cached.write() = Some(built.clone());
        Ok(built)
    }

    /// Drop the cached value; the next `get` rebuilds
    pub fn invalidate(&self) {
        *self.cached.write() = None;
    }
}

fn load(settings: &dyn SettingRegistry) -> Result<Vec<AgeRange>, AgeRangeError> {
    let spec = settings
        .setting(SETTING_AGE_RANGES)
        .unwrap_or_default();
    if spec.trim().is_empty() {
        return Err(AgeRangeError::NotConfigured);
    }
    parse_age_ranges(&spec)
}
