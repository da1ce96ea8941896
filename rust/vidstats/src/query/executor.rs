//! Runs rendered queries and decodes their single `value` column.

use super::sql::{BindParam, SqlQuery};
use crate::{
    db::PgPool,
    error::{Result, ServiceError},
};
use async_trait::async_trait;
use diesel::deserialize::QueryableByName;
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery as RawSqlQuery};
use diesel::sql_query;
use diesel::sql_types::{Date, Int8, Nullable, Text, Timestamp};
use diesel_async::RunQueryDsl;
use std::time::Duration;
use tracing::error;

/// Executes one rendered query and returns its scalar result.
///
/// Failures propagate unchanged as [`ServiceError::Execution`]; nothing here
/// retries.
#[async_trait]
pub trait ScalarExecutor: Send + Sync {
    async fn fetch_scalar(&self, query: &SqlQuery) -> Result<i64>;
}

#[derive(Debug, QueryableByName)]
struct ScalarRow {
    #[diesel(sql_type = Nullable<Int8>)]
    value: Option<i64>,
}

#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
    timeout: Duration,
}

impl PgExecutor {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn load(&self, statement: BoxedSqlQuery<'static, Pg, RawSqlQuery>) -> Result<i64> {
        let mut conn = self.pool.get().await.map_err(|err| {
            error!(error = ?err, "failed to acquire database connection");
            ServiceError::Execution(anyhow::anyhow!("{err:?}"))
        })?;

        let rows: Vec<ScalarRow> = statement
            .load(&mut *conn)
            .await
            .map_err(|err| ServiceError::Execution(err.into()))?;

        Ok(rows.into_iter().next().and_then(|row| row.value).unwrap_or(0))
    }
}

#[async_trait]
impl ScalarExecutor for PgExecutor {
    async fn fetch_scalar(&self, query: &SqlQuery) -> Result<i64> {
        let (sql, binds) = query.to_positional()?;
        let mut statement = sql_query(sql.clone()).into_boxed::<Pg>();
        for bind in binds {
            statement = apply_bind(statement, bind);
        }

        match tokio::time::timeout(self.timeout, self.load(statement)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                error!(error = ?err, sql = %sql, "analytics query failed");
                Err(err)
            }
            Err(_) => {
                error!(timeout = ?self.timeout, sql = %sql, "analytics query timed out");
                Err(ServiceError::Execution(anyhow::anyhow!(
                    "query timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}

fn apply_bind<'a>(
    query: BoxedSqlQuery<'a, Pg, RawSqlQuery>,
    bind: &BindParam,
) -> BoxedSqlQuery<'a, Pg, RawSqlQuery> {
    match bind {
        BindParam::Text(value) => query.bind::<Text, _>(value.clone()),
        BindParam::Int(value) => query.bind::<Int8, _>(*value),
        BindParam::Date(value) => query.bind::<Date, _>(*value),
        BindParam::Timestamp(value) => query.bind::<Timestamp, _>(*value),
    }
}
