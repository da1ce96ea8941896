mod executor;
mod snapshot;
mod special;
pub mod sql;
mod video;

pub use executor::{PgExecutor, ScalarExecutor};
pub use sql::{BindParam, ParamKey, Params, SqlQuery};

use crate::{
    error::Result,
    request::{Entity, ParsedQuery},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Maps a request to SQL text and named parameters.
///
/// Pure and deterministic: equal requests produce byte-identical output.
/// A special mode, when present, fully decides the shape of the query.
pub fn build_query(parsed: &ParsedQuery) -> Result<SqlQuery> {
    let shape = match parsed.special {
        Some(special) => special::shape(special, parsed)?,
        None => match parsed.entity {
            Entity::Video => video::shape(parsed)?,
            Entity::Snapshot => snapshot::shape(parsed)?,
        },
    };
    shape.render()
}

#[derive(Clone)]
pub struct QueryEngine {
    executor: Arc<dyn ScalarExecutor>,
}

impl QueryEngine {
    pub fn new(executor: Arc<dyn ScalarExecutor>) -> Self {
        Self { executor }
    }

    pub async fn execute(&self, parsed: ParsedQuery) -> Result<AnswerResponse> {
        let query = self.prepare(&parsed)?;
        let value = self.executor.fetch_scalar(&query).await?;
        debug!(value, "analytics query answered");
        Ok(AnswerResponse { value })
    }

    pub fn translate(&self, parsed: ParsedQuery) -> Result<TranslateResponse> {
        let SqlQuery { sql, params } = self.prepare(&parsed)?;
        Ok(TranslateResponse { sql, params })
    }

    fn prepare(&self, parsed: &ParsedQuery) -> Result<SqlQuery> {
        parsed.validate()?;
        let query = build_query(parsed)?;
        debug!(
            metric = %parsed.metric,
            entity = %parsed.entity,
            special = ?parsed.special,
            sql = %query.sql,
            "built analytics query"
        );
        Ok(query)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub value: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslateResponse {
    pub sql: String,
    pub params: Params,
}
