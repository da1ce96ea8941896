//! Structured analytics requests as produced by the request-understanding service.

use crate::error::{Result, ServiceError};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    VideosCount,
    SumViewsDelta,
    SumViewsTotal,
    SumLikesTotal,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::VideosCount => "videos_count",
            Metric::SumViewsDelta => "sum_views_delta",
            Metric::SumViewsTotal => "sum_views_total",
            Metric::SumLikesTotal => "sum_likes_total",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary source of a request: final per-video statistics or hourly snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Video,
    Snapshot,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Video => "video",
            Entity::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named aggregation shortcuts that replace the generic metric/entity logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialMode {
    DistinctVideosWithPositiveDelta,
    SnapshotsWithNegativeDeltaViews,
    DistinctCreatorsWithMinViews,
}

impl SpecialMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialMode::DistinctVideosWithPositiveDelta => "distinct_videos_with_positive_delta",
            SpecialMode::SnapshotsWithNegativeDeltaViews => "snapshots_with_negative_delta_views",
            SpecialMode::DistinctCreatorsWithMinViews => "distinct_creators_with_min_views",
        }
    }

    /// Entity the mode is bound to. Delta-based modes only exist on snapshots.
    pub fn required_entity(&self) -> Option<Entity> {
        match self {
            SpecialMode::DistinctVideosWithPositiveDelta
            | SpecialMode::SnapshotsWithNegativeDeltaViews => Some(Entity::Snapshot),
            SpecialMode::DistinctCreatorsWithMinViews => None,
        }
    }
}

impl fmt::Display for SpecialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive calendar-day bounds; `None` leaves that side open.
///
/// `start > end` is accepted and simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Range covering exactly one calendar day.
    pub fn day(day: NaiveDate) -> Self {
        Self::new(Some(day), Some(day))
    }
}

fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                serde::de::Error::custom(format!("invalid date '{value}', expected YYYY-MM-DD"))
            }),
    }
}

/// Time of day accepted as `HH:MM` or `HH:MM:SS`; always rendered as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn midnight() -> Self {
        Self(NaiveTime::default())
    }

    pub fn end_of_day() -> Self {
        Self(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim();
        NaiveTime::parse_from_str(value, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
            .ok()
            .map(Self)
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn deserialize_optional_time<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<TimeOfDay>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => TimeOfDay::parse(value).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid time '{value}', expected HH:MM or HH:MM:SS"))
        }),
    }
}

/// One classified analytics request. Built once, consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub metric: Metric,
    pub entity: Entity,
    #[serde(default)]
    pub creator_id: Option<String>,
    #[serde(default)]
    pub min_views: Option<u64>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    pub time_from: Option<TimeOfDay>,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    pub time_to: Option<TimeOfDay>,
    #[serde(default)]
    pub special: Option<SpecialMode>,
}

impl ParsedQuery {
    pub fn new(metric: Metric, entity: Entity) -> Self {
        Self {
            metric,
            entity,
            creator_id: None,
            min_views: None,
            date_range: None,
            time_from: None,
            time_to: None,
            special: None,
        }
    }

    /// Decodes and validates a JSON payload. Decode errors are prefixed with
    /// the path of the offending field, e.g. `date_range.start: ...`.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let parsed: ParsedQuery = serde_path_to_error::deserialize(value).map_err(|err| {
            let path = err.path().to_string();
            let inner = err.into_inner();
            if path == "." {
                ServiceError::InvalidRequest(inner.to_string())
            } else {
                ServiceError::InvalidRequest(format!("{path}: {inner}"))
            }
        })?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn has_time_of_day(&self) -> bool {
        self.time_from.is_some() || self.time_to.is_some()
    }

    /// `min_views` as the signed value bound to the database.
    pub fn min_views_bind(&self) -> Result<Option<i64>> {
        self.min_views
            .map(|value| {
                i64::try_from(value).map_err(|_| ServiceError::Validation {
                    field: "min_views",
                    value: value.to_string(),
                    reason: "exceeds the largest supported view count",
                })
            })
            .transpose()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(special) = self.special {
            if let Some(required) = special.required_entity() {
                if required != self.entity {
                    return Err(ServiceError::EntityMismatch {
                        special,
                        required,
                        actual: self.entity,
                    });
                }
            }
        }

        self.min_views_bind()?;
        Ok(())
    }
}
