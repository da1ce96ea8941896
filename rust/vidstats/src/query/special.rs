use super::sql::{BindParam, ParamKey, Predicate, Projection, QueryShape};
use crate::{
    error::{Result, ServiceError},
    range,
    request::{ParsedQuery, SpecialMode},
    schema::{Column, Source},
};

/// Fixed query shapes for named special modes. Request fields a mode does not
/// consume are ignored.
pub(super) fn shape(special: SpecialMode, parsed: &ParsedQuery) -> Result<QueryShape> {
    if let Some(required) = special.required_entity() {
        if parsed.entity != required {
            return Err(ServiceError::EntityMismatch {
                special,
                required,
                actual: parsed.entity,
            });
        }
    }

    match special {
        SpecialMode::DistinctVideosWithPositiveDelta => Ok(snapshot_delta(
            parsed,
            Projection::CountDistinct(Column::SnapshotVideoId),
            Predicate::Positive(Column::SnapshotDeltaViews),
        )),
        SpecialMode::SnapshotsWithNegativeDeltaViews => Ok(snapshot_delta(
            parsed,
            Projection::Count,
            Predicate::Negative(Column::SnapshotDeltaViews),
        )),
        SpecialMode::DistinctCreatorsWithMinViews => distinct_creators(parsed),
    }
}

fn snapshot_delta(parsed: &ParsedQuery, projection: Projection, sign: Predicate) -> QueryShape {
    let mut shape = QueryShape::new(projection, Source::Snapshots);
    shape.push(sign);
    if let Some(date_range) = &parsed.date_range {
        range::push_date_range(&mut shape, Column::SnapshotCreatedAt, date_range);
    }
    shape
}

fn distinct_creators(parsed: &ParsedQuery) -> Result<QueryShape> {
    let mut shape = QueryShape::new(
        Projection::CountDistinct(Column::VideoCreatorId),
        Source::Videos,
    );
    if let Some(min_views) = parsed.min_views_bind()? {
        shape.push(Predicate::GreaterThan {
            column: Column::VideoViews,
            key: ParamKey::MinViews,
            value: BindParam::Int(min_views),
        });
    }
    if let Some(date_range) = &parsed.date_range {
        range::push_date_range(&mut shape, Column::VideoPublishedAt, date_range);
    }
    Ok(shape)
}
