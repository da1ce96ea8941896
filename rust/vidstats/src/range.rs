//! Translates optional day bounds and time-of-day bounds into predicates.

use crate::{
    query::sql::{Predicate, QueryShape},
    request::{DateRange, TimeOfDay},
    schema::Column,
};

/// Appends the day-level predicate for `range` on `column`, if any bound is set.
pub fn push_date_range(shape: &mut QueryShape, column: Column, range: &DateRange) {
    let predicate = match (range.start, range.end) {
        (Some(start), Some(end)) => Predicate::DateBetween { column, start, end },
        (Some(start), None) => Predicate::DateOnOrAfter { column, start },
        (None, Some(end)) => Predicate::DateOnOrBefore { column, end },
        (None, None) => return,
    };
    shape.push(predicate);
}

/// Appends a timestamp interval built from the day bounds plus time-of-day
/// bounds (`00:00:00` / `23:59:59` when omitted).
///
/// Both day bounds are required. With an open side nothing is appended and
/// the time-of-day bounds are dropped.
pub fn push_time_window(
    shape: &mut QueryShape,
    column: Column,
    range: &DateRange,
    time_from: Option<TimeOfDay>,
    time_to: Option<TimeOfDay>,
) {
    let (Some(start_day), Some(end_day)) = (range.start, range.end) else {
        return;
    };

    let from = time_from.unwrap_or_else(TimeOfDay::midnight);
    let to = time_to.unwrap_or_else(TimeOfDay::end_of_day);
    shape.push(Predicate::TimestampBetween {
        column,
        start: start_day.and_time(from.as_naive()),
        end: end_day.and_time(to.as_naive()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query::sql::{BindParam, Projection},
        schema::Source,
    };
    use chrono::NaiveDate;

    fn day(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    fn shape() -> QueryShape {
        QueryShape::new(Projection::Count, Source::Snapshots)
    }

    #[test]
    fn closed_range_uses_between() {
        let mut shape = shape();
        push_date_range(
            &mut shape,
            Column::SnapshotCreatedAt,
            &DateRange::new(Some(day("2025-11-01")), Some(day("2025-11-30"))),
        );
        let query = shape.render().unwrap();
        assert!(query
            .sql
            .ends_with("WHERE s.created_at::date BETWEEN :start_date AND :end_date"));
        assert_eq!(query.params.len(), 2);
        assert_eq!(
            query.params.get("start_date"),
            Some(&BindParam::Date(day("2025-11-01")))
        );
        assert_eq!(
            query.params.get("end_date"),
            Some(&BindParam::Date(day("2025-11-30")))
        );
    }

    #[test]
    fn start_only_is_on_or_after() {
        let mut shape = shape();
        push_date_range(
            &mut shape,
            Column::SnapshotCreatedAt,
            &DateRange::new(Some(day("2025-11-01")), None),
        );
        let query = shape.render().unwrap();
        assert!(query.sql.ends_with("WHERE s.created_at::date >= :start_date"));
        assert_eq!(query.params.keys().copied().collect::<Vec<_>>(), ["start_date"]);
    }

    #[test]
    fn end_only_is_on_or_before() {
        let mut shape = shape();
        push_date_range(
            &mut shape,
            Column::SnapshotCreatedAt,
            &DateRange::new(None, Some(day("2025-11-30"))),
        );
        let query = shape.render().unwrap();
        assert!(query.sql.ends_with("WHERE s.created_at::date <= :end_date"));
        assert_eq!(query.params.keys().copied().collect::<Vec<_>>(), ["end_date"]);
    }

    #[test]
    fn open_range_adds_nothing() {
        let mut shape = shape();
        push_date_range(&mut shape, Column::SnapshotCreatedAt, &DateRange::default());
        assert!(shape.predicates.is_empty());
    }

    #[test]
    fn reversed_range_is_still_rendered() {
        let mut shape = shape();
        push_date_range(
            &mut shape,
            Column::SnapshotCreatedAt,
            &DateRange::new(Some(day("2025-12-01")), Some(day("2025-11-01"))),
        );
        assert_eq!(shape.predicates.len(), 1);
    }

    #[test]
    fn time_window_defaults_to_whole_days() {
        let mut shape = shape();
        push_time_window(
            &mut shape,
            Column::SnapshotCreatedAt,
            &DateRange::new(Some(day("2025-11-27")), Some(day("2025-11-28"))),
            None,
            None,
        );
        let query = shape.render().unwrap();
        assert!(query
            .sql
            .ends_with("WHERE s.created_at BETWEEN :start_ts AND :end_ts"));
        assert_eq!(
            serde_json::to_value(&query.params).unwrap(),
            serde_json::json!({
                "start_ts": "2025-11-27 00:00:00",
                "end_ts": "2025-11-28 23:59:59",
            })
        );
    }

    #[test]
    fn time_window_combines_day_and_time() {
        let mut shape = shape();
        push_time_window(
            &mut shape,
            Column::SnapshotCreatedAt,
            &DateRange::day(day("2025-11-28")),
            TimeOfDay::parse("10:00"),
            TimeOfDay::parse("15:00"),
        );
        let query = shape.render().unwrap();
        assert_eq!(
            query.params.get("start_ts"),
            Some(&BindParam::Timestamp(
                day("2025-11-28").and_hms_opt(10, 0, 0).unwrap()
            ))
        );
        assert_eq!(
            query.params.get("end_ts"),
            Some(&BindParam::Timestamp(
                day("2025-11-28").and_hms_opt(15, 0, 0).unwrap()
            ))
        );
    }

    #[test]
    fn time_window_needs_both_days() {
        let mut shape = shape();
        push_time_window(
            &mut shape,
            Column::SnapshotCreatedAt,
            &DateRange::new(Some(day("2025-11-28")), None),
            TimeOfDay::parse("10:00"),
            None,
        );
        assert!(shape.predicates.is_empty());
    }
}
