//! Structured predicate/projection model and its rendering to SQL text.

use crate::{
    error::{Result, ServiceError},
    schema::{Column, Source},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Stable placeholder names. The rendered text references them as `:name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParamKey {
    CreatorId,
    MinViews,
    StartDate,
    EndDate,
    StartTs,
    EndTs,
}

impl ParamKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKey::CreatorId => "creator_id",
            ParamKey::MinViews => "min_views",
            ParamKey::StartDate => "start_date",
            ParamKey::EndDate => "end_date",
            ParamKey::StartTs => "start_ts",
            ParamKey::EndTs => "end_ts",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindParam {
    Text(String),
    Int(i64),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Serialize for BindParam {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BindParam::Text(value) => serializer.serialize_str(value),
            BindParam::Int(value) => serializer.serialize_i64(*value),
            BindParam::Date(value) => serializer.collect_str(&value.format("%Y-%m-%d")),
            BindParam::Timestamp(value) => {
                serializer.collect_str(&value.format("%Y-%m-%d %H:%M:%S"))
            }
        }
    }
}

/// Named parameters keyed by placeholder name, in a stable order.
pub type Params = BTreeMap<&'static str, BindParam>;

/// One WHERE fragment. Column names come from the allowlist; values are
/// carried alongside and only ever rendered as placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq {
        column: Column,
        key: ParamKey,
        value: BindParam,
    },
    GreaterThan {
        column: Column,
        key: ParamKey,
        value: BindParam,
    },
    Positive(Column),
    Negative(Column),
    DateBetween {
        column: Column,
        start: NaiveDate,
        end: NaiveDate,
    },
    DateOnOrAfter {
        column: Column,
        start: NaiveDate,
    },
    DateOnOrBefore {
        column: Column,
        end: NaiveDate,
    },
    TimestampBetween {
        column: Column,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

impl Predicate {
    pub fn column(&self) -> Column {
        match self {
            Predicate::Eq { column, .. }
            | Predicate::GreaterThan { column, .. }
            | Predicate::DateBetween { column, .. }
            | Predicate::DateOnOrAfter { column, .. }
            | Predicate::DateOnOrBefore { column, .. }
            | Predicate::TimestampBetween { column, .. } => *column,
            Predicate::Positive(column) | Predicate::Negative(column) => *column,
        }
    }

    fn render(&self) -> String {
        let col = self.column().qualified();
        match self {
            Predicate::Eq { key, .. } => format!("{col} = :{}", key.as_str()),
            Predicate::GreaterThan { key, .. } => format!("{col} > :{}", key.as_str()),
            Predicate::Positive(_) => format!("{col} > 0"),
            Predicate::Negative(_) => format!("{col} < 0"),
            Predicate::DateBetween { .. } => format!(
                "{col}::date BETWEEN :{} AND :{}",
                ParamKey::StartDate.as_str(),
                ParamKey::EndDate.as_str()
            ),
            Predicate::DateOnOrAfter { .. } => {
                format!("{col}::date >= :{}", ParamKey::StartDate.as_str())
            }
            Predicate::DateOnOrBefore { .. } => {
                format!("{col}::date <= :{}", ParamKey::EndDate.as_str())
            }
            Predicate::TimestampBetween { .. } => format!(
                "{col} BETWEEN :{} AND :{}",
                ParamKey::StartTs.as_str(),
                ParamKey::EndTs.as_str()
            ),
        }
    }

    fn binds(&self) -> Vec<(ParamKey, BindParam)> {
        match self {
            Predicate::Eq { key, value, .. } | Predicate::GreaterThan { key, value, .. } => {
                vec![(*key, value.clone())]
            }
            Predicate::Positive(_) | Predicate::Negative(_) => Vec::new(),
            Predicate::DateBetween { start, end, .. } => vec![
                (ParamKey::StartDate, BindParam::Date(*start)),
                (ParamKey::EndDate, BindParam::Date(*end)),
            ],
            Predicate::DateOnOrAfter { start, .. } => {
                vec![(ParamKey::StartDate, BindParam::Date(*start))]
            }
            Predicate::DateOnOrBefore { end, .. } => {
                vec![(ParamKey::EndDate, BindParam::Date(*end))]
            }
            Predicate::TimestampBetween { start, end, .. } => vec![
                (ParamKey::StartTs, BindParam::Timestamp(*start)),
                (ParamKey::EndTs, BindParam::Timestamp(*end)),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Count,
    CountDistinct(Column),
    /// `SUM` that yields 0 over an empty set, cast so it always decodes as BIGINT.
    ZeroFilledSum(Column),
}

impl Projection {
    fn render(&self) -> String {
        match self {
            Projection::Count => "COUNT(*)".to_string(),
            Projection::CountDistinct(column) => format!("COUNT(DISTINCT {})", column.qualified()),
            Projection::ZeroFilledSum(column) => {
                format!("COALESCE(SUM({}), 0)::bigint", column.qualified())
            }
        }
    }

    fn column(&self) -> Option<Column> {
        match self {
            Projection::Count => None,
            Projection::CountDistinct(column) | Projection::ZeroFilledSum(column) => Some(*column),
        }
    }
}

/// What a dispatch handler decides: projection, source and predicates in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryShape {
    pub projection: Projection,
    pub source: Source,
    pub predicates: Vec<Predicate>,
}

impl QueryShape {
    pub fn new(projection: Projection, source: Source) -> Self {
        Self {
            projection,
            source,
            predicates: Vec::new(),
        }
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn render(&self) -> Result<SqlQuery> {
        self.ensure_columns_in_source()?;

        let mut params = Params::new();
        let mut clauses = Vec::with_capacity(self.predicates.len());
        for predicate in &self.predicates {
            for (key, value) in predicate.binds() {
                if params.insert(key.as_str(), value).is_some() {
                    return Err(ServiceError::Internal(anyhow::anyhow!(
                        "placeholder :{} bound twice",
                        key.as_str()
                    )));
                }
            }
            clauses.push(predicate.render());
        }

        let mut sql = format!(
            "SELECT {} AS value\nFROM {}",
            self.projection.render(),
            self.source.render()
        );
        if !clauses.is_empty() {
            sql.push_str("\nWHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        Ok(SqlQuery { sql, params })
    }

    fn ensure_columns_in_source(&self) -> Result<()> {
        let columns = self
            .predicates
            .iter()
            .map(Predicate::column)
            .chain(self.projection.column());
        for column in columns {
            if !self.source.includes(column.table()) {
                return Err(ServiceError::Internal(anyhow::anyhow!(
                    "column {} is not reachable from {}",
                    column.qualified(),
                    self.source.render()
                )));
            }
        }
        Ok(())
    }
}

/// Rendered SQL text plus exactly the named parameters it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Params,
}

impl SqlQuery {
    /// Rewrites `:name` placeholders into PostgreSQL `$n` form and returns the
    /// binds in positional order. `::` casts are left untouched.
    pub fn to_positional(&self) -> Result<(String, Vec<&BindParam>)> {
        let mut sql = String::with_capacity(self.sql.len());
        let mut order: Vec<&str> = Vec::new();
        let mut binds = Vec::new();
        let mut chars = self.sql.char_indices().peekable();

        while let Some((idx, ch)) = chars.next() {
            if ch != ':' {
                sql.push(ch);
                continue;
            }

            if matches!(chars.peek(), Some((_, ':'))) {
                chars.next();
                sql.push_str("::");
                continue;
            }

            let start = idx + 1;
            let mut end = start;
            while let Some((next_idx, next)) = chars.peek().copied() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    end = next_idx + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }

            if end == start {
                sql.push(ch);
                continue;
            }

            let name = &self.sql[start..end];
            let position = match order.iter().position(|seen| *seen == name) {
                Some(existing) => existing + 1,
                None => {
                    let value = self.params.get(name).ok_or_else(|| {
                        ServiceError::Internal(anyhow::anyhow!(
                            "placeholder :{name} has no bound value"
                        ))
                    })?;
                    order.push(name);
                    binds.push(value);
                    order.len()
                }
            };
            sql.push('$');
            sql.push_str(&position.to_string());
        }

        if binds.len() != self.params.len() {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "sql references {} placeholders but {} params were collected",
                binds.len(),
                self.params.len()
            )));
        }

        Ok((sql, binds))
    }
}
