//! Shared filter context extraction
//!
//! Derives the location-scope and period filters once per grid
//! compilation. The compiler passes the extracted snapshot by reference
//! to every column strategy, so all columns of one compiled grid see
//! identical filters even though server-zone resolution depends on the
//! wall clock.

use crate::error::CompileError;
use chrono::{FixedOffset, Local, NaiveDateTime, Offset, TimeZone};
use log::warn;
use patientgrid_types::{LocationFilter, PatientGrid};
use serde::{Deserialize, Serialize};

/// A resolved period constraint, bounds expressed in the server timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    /// Lower bound, inclusive
    pub from: Option<NaiveDateTime>,
    /// Upper bound, inclusive
    pub to: Option<NaiveDateTime>,
}

/// Merge the grid's declared location filters into one match set.
///
/// Returns `None` when the grid declares no location constraint. Member
/// locations are unioned with duplicates collapsed; the country flag is
/// sticky across the merged filters.
pub fn extract_location_filter(grid: &PatientGrid) -> Option<LocationFilter> {
    if grid.location_filters.is_empty() {
        return None;
    }
    let mut merged = LocationFilter {
        locations: Vec::new(),
        country: false,
    };
    for filter in &grid.location_filters {
        for location in &filter.locations {
            if !merged.locations.iter().any(|l| l.uuid == location.uuid) {
                merged.locations.push(location.clone());
            }
        }
        merged.country |= filter.country;
    }
    Some(merged)
}

/// Convert the grid's declared period bounds from the caller's timezone
/// into the server timezone.
///
/// Returns `None` when the grid declares no period constraint and rejects
/// inverted bounds.
pub fn extract_period_range(
    grid: &PatientGrid,
    caller_timezone: Option<&str>,
) -> Result<Option<PeriodRange>, CompileError> {
    let Some(period) = &grid.period_filter else {
        return Ok(None);
    };
    if let (Some(from), Some(to)) = (period.from_date, period.to_date) {
        if from > to {
            return Err(CompileError::InvalidPeriod { from, to });
        }
    }
    let caller = resolve_caller_timezone(caller_timezone);
    let server = server_offset();
    Ok(Some(PeriodRange {
        from: period.from_date.map(|bound| shift_between(bound, caller, server)),
        to: period.to_date.map(|bound| shift_between(bound, caller, server)),
    }))
}

/// Resolve the caller's timezone offset, falling back to the server's.
///
/// The fallback silently changes query semantics, so it is always logged.
pub fn resolve_caller_timezone(timezone: Option<&str>) -> FixedOffset {
    match timezone {
        Some(raw) => match raw.parse::<FixedOffset>() {
            Ok(offset) => offset,
            Err(_) => {
                let server = server_offset();
                warn!("unparseable caller timezone {raw:?}, using server timezone {server}");
                server
            }
        },
        None => {
            let server = server_offset();
            warn!("no caller timezone supplied, using server timezone {server}");
            server
        }
    }
}

/// Re-express a naive wall-clock datetime read in the `from` offset as a
/// naive wall-clock datetime in the `to` offset.
pub fn shift_between(
    datetime: NaiveDateTime,
    from: FixedOffset,
    to: FixedOffset,
) -> NaiveDateTime {
    match from.from_local_datetime(&datetime).single() {
        Some(zoned) => zoned.with_timezone(&to).naive_local(),
        // Fixed offsets never yield ambiguous local times.
        None => datetime,
    }
}

fn server_offset() -> FixedOffset {
    Local::now().offset().fix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use patientgrid_model::Location;
    use patientgrid_types::PeriodFilter;

    fn offset(secs: i32) -> FixedOffset {
        FixedOffset::east_opt(secs).unwrap()
    }

    fn datetime(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_shift_between_offsets() {
        let caller = offset(2 * 3600);
        let server = offset(-5 * 3600);
        let shifted = shift_between(datetime("2023-06-15 10:00:00"), caller, server);
        assert_eq!(shifted, datetime("2023-06-15 03:00:00"));
    }

    #[test]
    fn test_no_location_filters_extract_to_none() {
        let grid = PatientGrid::new("g1", "empty");
        assert!(extract_location_filter(&grid).is_none());
    }

    #[test]
    fn test_location_filters_merge_with_sticky_country_flag() {
        let clinic = Location::new("clinic", "Clinic");
        let district = Location::new("district", "District");
        let grid = PatientGrid::new("g1", "scoped")
            .with_location_filter(LocationFilter {
                locations: vec![clinic.clone()],
                country: false,
            })
            .with_location_filter(LocationFilter {
                locations: vec![district.clone(), clinic.clone()],
                country: true,
            });

        let merged = extract_location_filter(&grid).unwrap();
        assert!(merged.country);
        let uuids: Vec<_> = merged.locations.iter().map(|l| l.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["clinic", "district"]);
    }

    #[test]
    fn test_inverted_period_bounds_fail() {
        let grid = PatientGrid::new("g1", "period").with_period_filter(PeriodFilter {
            from_date: Some(datetime("2023-06-15 00:00:00")),
            to_date: Some(datetime("2023-01-01 00:00:00")),
        });
        let result = extract_period_range(&grid, Some("+02:00"));
        assert!(matches!(result, Err(CompileError::InvalidPeriod { .. })));
    }

    #[test]
    fn test_open_ended_period_bounds_are_kept() {
        let grid = PatientGrid::new("g1", "period").with_period_filter(PeriodFilter {
            from_date: Some(datetime("2023-01-01 00:00:00")),
            to_date: None,
        });
        let range = extract_period_range(&grid, Some("+00:00")).unwrap().unwrap();
        assert!(range.from.is_some());
        assert!(range.to.is_none());
    }
}
