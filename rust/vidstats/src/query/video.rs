use super::sql::{BindParam, ParamKey, Predicate, Projection, QueryShape};
use crate::{
    error::{Result, ServiceError},
    range,
    request::{Entity, Metric, ParsedQuery},
    schema::{Column, Source},
};

/// Generic path over final per-video statistics.
pub(super) fn shape(parsed: &ParsedQuery) -> Result<QueryShape> {
    let projection = match parsed.metric {
        Metric::VideosCount => Projection::Count,
        Metric::SumViewsTotal => Projection::ZeroFilledSum(Column::VideoViews),
        Metric::SumLikesTotal => Projection::ZeroFilledSum(Column::VideoLikes),
        Metric::SumViewsDelta => {
            return Err(ServiceError::UnsupportedMetric {
                metric: parsed.metric,
                entity: Entity::Video,
            })
        }
    };

    let mut shape = QueryShape::new(projection, Source::Videos);

    if let Some(creator_id) = &parsed.creator_id {
        shape.push(Predicate::Eq {
            column: Column::VideoCreatorId,
            key: ParamKey::CreatorId,
            value: BindParam::Text(creator_id.clone()),
        });
    }

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
