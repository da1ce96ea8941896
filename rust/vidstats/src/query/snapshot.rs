use super::sql::{BindParam, ParamKey, Predicate, Projection, QueryShape};
use crate::{
    error::{Result, ServiceError},
    range,
    request::{Entity, Metric, ParsedQuery},
    schema::{Column, Source},
};

/// Generic path over hourly snapshots. A creator filter pulls in the parent
/// video through a join since snapshots carry no creator column.
pub(super) fn shape(parsed: &ParsedQuery) -> Result<QueryShape> {
    let projection = match parsed.metric {
        Metric::SumViewsDelta => Projection::ZeroFilledSum(Column::SnapshotDeltaViews),
        Metric::VideosCount => Projection::Count,
        Metric::SumViewsTotal | Metric::SumLikesTotal => {
            return Err(ServiceError::UnsupportedMetric {
                metric: parsed.metric,
                entity: Entity::Snapshot,
            })
        }
    };

    let source = if parsed.creator_id.is_some() {
        Source::SnapshotsWithVideos
    } else {
        Source::Snapshots
    };
    let mut shape = QueryShape::new(projection, source);

    if let Some(date_range) = &parsed.date_range {
        if parsed.has_time_of_day() {
            range::push_time_window(
                &mut shape,
                Column::SnapshotCreatedAt,
                date_range,
                parsed.time_from,
                parsed.time_to,
            );
        } else {
            range::push_date_range(&mut shape, Column::SnapshotCreatedAt, date_range);
        }
    }

    if let Some(creator_id) = &parsed.creator_id {
        shape.push(Predicate::Eq {
            column: Column::VideoCreatorId,
            key: ParamKey::CreatorId,
            value: BindParam::Text(creator_id.clone()),
        });
    }

    Ok(shape)
}
