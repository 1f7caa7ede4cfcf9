//! Era consolidation engine.
//!
//! Events of one `(subject, concept)` pair are merged into eras with a
//! sweep over boundary markers:
//!
//! 1. every event yields an *open* marker at its start date and a *close*
//!    marker at its end date padded forward by the gap tolerance;
//! 2. markers are sorted by `(day, kind)` with opens before closes, so
//!    events that touch within the tolerance end up in the same era;
//! 3. an era starts when the open counter goes from 0 to 1 and ends when it
//!    drops back to 0, at the closing event's unpadded end date.
//!
//! Era ids are assigned densely in `(subject, concept, start)` order, so the
//! output is fully determined by the event multiset and the gap.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, TimeDelta};
use tracing::warn;

use omop_model::{Era, EraDomain, EraKey, EraOptions, Event, RawEvent};

use crate::error::{EtlError, Result};

/// Validate a batch of raw events and resolve their end dates.
///
/// End date policy: explicit end date, else `start + days_supply`, else
/// `start + min_duration_days`. End dates before the start are clamped to
/// the start. The first structurally invalid row fails the whole batch.
pub fn normalize_events(
    domain: EraDomain,
    raw_events: &[RawEvent],
    options: &EraOptions,
) -> Result<Vec<Event>> {
    raw_events
        .iter()
        .enumerate()
        .map(|(row, raw)| normalize_event(domain, row, raw, options))
        .collect()
}

fn normalize_event(
    domain: EraDomain,
    row: usize,
    raw: &RawEvent,
    options: &EraOptions,
) -> Result<Event> {
    let malformed = |field: &'static str, reason: String| EtlError::MalformedEvent {
        domain,
        row,
        field,
        reason,
    };

    let subject_id = raw
        .subject_id
        .ok_or_else(|| malformed("subject_id", "is missing".to_string()))?;
    let concept_id = raw
        .concept_id
        .ok_or_else(|| malformed("concept_id", "is missing".to_string()))?;
    let start_text = raw
        .start_date
        .as_deref()
        .ok_or_else(|| malformed("start_date", "is missing".to_string()))?;
    let start_date = parse_date(start_text)
        .ok_or_else(|| malformed("start_date", format!("'{start_text}' is not a valid date")))?;

    let end_date = match (raw.end_date.as_deref(), raw.days_supply) {
        (Some(end_text), _) => parse_date(end_text)
            .ok_or_else(|| malformed("end_date", format!("'{end_text}' is not a valid date")))?,
        (None, Some(days)) => add_days(start_date, days)
            .ok_or_else(|| malformed("days_supply", format!("{days} days is out of range")))?,
        (None, None) => add_days(start_date, i64::from(options.min_duration_days)).ok_or_else(
            || malformed("start_date", "minimum duration is out of range".to_string()),
        )?,
    };

    let end_date = if end_date < start_date {
        warn!(
            domain = %domain,
            row,
            start_date = %start_date,
            end_date = %end_date,
            "end date before start date, clamping to start"
        );
        start_date
    } else {
        end_date
    };

    Ok(Event {
        subject_id,
        concept_id,
        start_date,
        end_date,
    })
}

/// Parse an ISO-8601 date, ignoring any time component.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let date_part = text.trim().split(['T', ' ']).next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    TimeDelta::try_days(days).and_then(|delta| date.checked_add_signed(delta))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MarkerKind {
    // Declaration order is the tie-break: opens sort before closes.
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Marker {
    /// Sort position in days; padded by the gap for close markers.
    day: i64,
    kind: MarkerKind,
    /// Unpadded event date the marker was derived from.
    date: NaiveDate,
}

impl Marker {
    fn open(event: &Event) -> Self {
        Self {
            day: day_number(event.start_date),
            kind: MarkerKind::Open,
            date: event.start_date,
        }
    }

    fn close(event: &Event, gap_days: u32) -> Self {
        let end_date = event.end_date.max(event.start_date);
        Self {
            day: day_number(end_date) + i64::from(gap_days),
            kind: MarkerKind::Close,
            date: end_date,
        }
    }
}

fn day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

/// Merge events into the minimal set of eras under `gap_days` tolerance.
pub fn build_eras(events: &[Event], gap_days: u32) -> Vec<Era> {
    let mut groups: BTreeMap<EraKey, Vec<Marker>> = BTreeMap::new();
    for event in events {
        let markers = groups.entry(event.key()).or_default();
        markers.push(Marker::open(event));
        markers.push(Marker::close(event, gap_days));
    }

    let mut eras = Vec::new();
    for (key, mut markers) in groups {
        markers.sort_unstable();
        sweep_group(key, &markers, gap_days, &mut eras);
    }
    for (era_id, era) in (1_i64..).zip(eras.iter_mut()) {
        era.era_id = era_id;
    }
    eras
}

fn sweep_group(key: EraKey, markers: &[Marker], gap_days: u32, eras: &mut Vec<Era>) {
    let mut open = 0_usize;
    let mut occurrences = 0_u32;
    let mut era_start = None;

    for marker in markers {
        match marker.kind {
            MarkerKind::Open => {
                if open == 0 {
                    era_start = Some(marker.date);
                    occurrences = 0;
                }
                open += 1;
                occurrences += 1;
            }
            MarkerKind::Close => {
                // Every close sorts after its own open, so this never underflows.
                open -= 1;
                if open == 0
                    && let Some(start) = era_start.take()
                {
                    eras.push(Era {
                        era_id: 0,
                        subject_id: key.subject_id,
                        concept_id: key.concept_id,
                        era_start_date: start,
                        era_end_date: marker.date,
                        occurrence_count: occurrences,
                        gap_days,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn event(subject_id: i64, concept_id: i64, start: &str, end: &str) -> Event {
        Event {
            subject_id,
            concept_id,
            start_date: date(start),
            end_date: date(end),
        }
    }

    #[test]
    fn merges_events_within_tolerance() {
        let eras = build_eras(
            &[
                event(1, 10, "2020-01-01", "2020-01-10"),
                event(1, 10, "2020-01-20", "2020-01-25"),
            ],
            30,
        );

        assert_eq!(eras.len(), 1);
        assert_eq!(eras[0].era_start_date, date("2020-01-01"));
        assert_eq!(eras[0].era_end_date, date("2020-01-25"));
        assert_eq!(eras[0].occurrence_count, 2);
        assert_eq!(eras[0].gap_days, 30);
    }

    #[test]
    fn splits_events_beyond_tolerance() {
        let eras = build_eras(
            &[
                event(1, 10, "2020-01-01", "2020-01-10"),
                event(1, 10, "2020-03-01", "2020-03-05"),
            ],
            30,
        );

        assert_eq!(eras.len(), 2);
        assert_eq!(eras[0].era_end_date, date("2020-01-10"));
        assert_eq!(eras[1].era_start_date, date("2020-03-01"));
        assert!(eras.iter().all(|era| era.occurrence_count == 1));
    }

    #[test]
    fn gap_equal_to_tolerance_still_merges() {
        // 2020-01-10 + 30 days = 2020-02-09: open and close tie, open wins.
        let eras = build_eras(
            &[
                event(1, 10, "2020-01-01", "2020-01-10"),
                event(1, 10, "2020-02-09", "2020-02-10"),
            ],
            30,
        );
        assert_eq!(eras.len(), 1);

        let eras = build_eras(
            &[
                event(1, 10, "2020-01-01", "2020-01-10"),
                event(1, 10, "2020-02-10", "2020-02-11"),
            ],
            30,
        );
        assert_eq!(eras.len(), 2);
    }

    #[test]
    fn counts_every_occurrence_including_duplicates() {
        let events = vec![
            event(4, 40, "2020-05-01", "2020-05-02"),
            event(4, 40, "2020-05-01", "2020-05-02"),
            event(4, 40, "2020-05-10", "2020-05-11"),
            event(4, 40, "2020-05-20", "2020-06-01"),
            event(4, 40, "2020-06-15", "2020-06-15"),
        ];
        let eras = build_eras(&events, 30);

        assert_eq!(eras.len(), 1);
        assert_eq!(eras[0].occurrence_count, 5);
        assert_eq!(eras[0].era_start_date, date("2020-05-01"));
        assert_eq!(eras[0].era_end_date, date("2020-06-15"));
    }

    #[test]
    fn contained_event_does_not_shorten_era() {
        let eras = build_eras(
            &[
                event(1, 10, "2020-01-01", "2020-12-31"),
                event(1, 10, "2020-02-01", "2020-02-02"),
            ],
            0,
        );
        assert_eq!(eras.len(), 1);
        assert_eq!(eras[0].era_end_date, date("2020-12-31"));
    }

    #[test]
    fn groups_are_independent_and_ids_dense() {
        let eras = build_eras(
            &[
                event(2, 10, "2020-01-01", "2020-01-02"),
                event(1, 11, "2020-01-01", "2020-01-02"),
                event(1, 10, "2020-01-01", "2020-01-02"),
                event(1, 10, "2021-01-01", "2021-01-02"),
            ],
            30,
        );

        let keys: Vec<(i64, i64, i64)> = eras
            .iter()
            .map(|era| (era.era_id, era.subject_id, era.concept_id))
            .collect();
        assert_eq!(keys, vec![(1, 1, 10), (2, 1, 10), (3, 1, 11), (4, 2, 10)]);
    }

    #[test]
    fn no_events_no_eras() {
        assert!(build_eras(&[], 30).is_empty());
    }

    #[test]
    fn zero_length_event_forms_single_day_era() {
        let eras = build_eras(&[event(1, 10, "2020-01-01", "2020-01-01")], 30);
        assert_eq!(eras.len(), 1);
        assert_eq!(eras[0].duration_days(), 0);
    }

    #[test]
    fn missing_end_defaults_to_minimum_duration() {
        let events = normalize_events(
            EraDomain::Condition,
            &[RawEvent::new(1, 10, "2021-06-01")],
            &EraOptions::default(),
        )
        .unwrap();

        assert_eq!(events[0].end_date, date("2021-06-02"));
        let eras = build_eras(&events, 30);
        assert_eq!(eras[0].era_end_date, date("2021-06-02"));
    }

    #[test]
    fn days_supply_sets_end_when_end_missing() {
        let options = EraOptions::default();
        let events = normalize_events(
            EraDomain::Drug,
            &[
                RawEvent::new(1, 10, "2021-06-01").with_days_supply(14),
                RawEvent::new(1, 10, "2021-06-01")
                    .with_end_date("2021-06-03")
                    .with_days_supply(14),
            ],
            &options,
        )
        .unwrap();

        assert_eq!(events[0].end_date, date("2021-06-15"));
        assert_eq!(events[1].end_date, date("2021-06-03"));
    }

    #[test]
    fn end_before_start_is_clamped() {
        let events = normalize_events(
            EraDomain::Condition,
            &[RawEvent::new(1, 10, "2021-06-10").with_end_date("2021-06-01")],
            &EraOptions::default(),
        )
        .unwrap();
        assert_eq!(events[0].end_date, date("2021-06-10"));
    }

    #[test]
    fn accepts_datetime_text() {
        let events = normalize_events(
            EraDomain::Condition,
            &[RawEvent::new(1, 10, "2021-06-10 00:00:00").with_end_date("2021-06-12T08:30:00")],
            &EraOptions::default(),
        )
        .unwrap();
        assert_eq!(events[0].start_date, date("2021-06-10"));
        assert_eq!(events[0].end_date, date("2021-06-12"));
    }

    #[test]
    fn minimum_duration_is_configurable() {
        let raw = [RawEvent::new(1, 10, "2021-06-01")];

        let same_day = EraOptions::default().with_min_duration_days(0);
        let events = normalize_events(EraDomain::Condition, &raw, &same_day).unwrap();
        assert_eq!(events[0].end_date, date("2021-06-01"));

        let week = EraOptions::default().with_min_duration_days(7);
        let events = normalize_events(EraDomain::Condition, &raw, &week).unwrap();
        assert_eq!(events[0].end_date, date("2021-06-08"));
    }

    #[test]
    fn negative_days_supply_is_clamped_to_start() {
        let events = normalize_events(
            EraDomain::Drug,
            &[RawEvent::new(1, 10, "2021-06-10").with_days_supply(-5)],
            &EraOptions::default(),
        )
        .unwrap();
        assert_eq!(events[0].end_date, date("2021-06-10"));
    }

    #[test]
    fn rejects_unresolvable_end_dates() {
        let options = EraOptions::default();

        let error = normalize_events(
            EraDomain::Drug,
            &[
                RawEvent::new(1, 10, "2021-06-01"),
                RawEvent::new(1, 10, "2021-06-01").with_end_date("garbage"),
            ],
            &options,
        )
        .unwrap_err();
        assert!(matches!(
            error,
            EtlError::MalformedEvent {
                row: 1,
                field: "end_date",
                ..
            }
        ));
        assert!(error.to_string().contains("garbage"));

        let error = normalize_events(
            EraDomain::Drug,
            &[RawEvent::new(1, 10, "2021-06-01").with_days_supply(i64::MAX)],
            &options,
        )
        .unwrap_err();
        assert!(matches!(
            error,
            EtlError::MalformedEvent {
                field: "days_supply",
                ..
            }
        ));

        let error = normalize_events(
            EraDomain::Condition,
            &[RawEvent::new(1, 10, "2021-06-01")],
            &EraOptions::default().with_min_duration_days(u32::MAX),
        )
        .unwrap_err();
        assert!(matches!(
            error,
            EtlError::MalformedEvent {
                field: "start_date",
                ..
            }
        ));
    }

    #[test]
    fn rejects_structurally_invalid_rows() {
        let options = EraOptions::default();
        let missing_subject = RawEvent {
            subject_id: None,
            ..RawEvent::new(1, 10, "2021-06-01")
        };
        let bad_start = RawEvent::new(1, 10, "06/01/2021");
        let missing_concept = RawEvent {
            concept_id: None,
            ..RawEvent::new(1, 10, "2021-06-01")
        };

        let error = normalize_events(
            EraDomain::Drug,
            &[RawEvent::new(1, 10, "2021-06-01"), missing_subject],
            &options,
        )
        .unwrap_err();
        assert!(matches!(
            error,
            EtlError::MalformedEvent {
                row: 1,
                field: "subject_id",
                ..
            }
        ));

        let error = normalize_events(EraDomain::Drug, &[bad_start], &options).unwrap_err();
        assert!(matches!(
            error,
            EtlError::MalformedEvent {
                field: "start_date",
                ..
            }
        ));
        assert!(error.to_string().contains("06/01/2021"));

        let error = normalize_events(EraDomain::Condition, &[missing_concept], &options).unwrap_err();
        assert!(matches!(
            error,
            EtlError::MalformedEvent {
                field: "concept_id",
                ..
            }
        ));
    }
}
