//! Execution of sanitized queries against a private in-memory SQLite database.
//!
//! Every execution opens a fresh connection holding exactly one table, the
//! bound snapshot relation, so nothing a query does can outlive the request.

use std::time::Duration;

use serde_json::Value;
use tokio_rusqlite::rusqlite::functions::{Context, FunctionFlags};
use tokio_rusqlite::rusqlite::types::{Value as SqlValue, ValueRef};
use tokio_rusqlite::{Connection, params, rusqlite};

use super::sanitize::{BOUND_RELATION, sanitize, substring_predicate};
use crate::Error;
use crate::cache::Snapshot;
use crate::config::DEFAULT_TABLE;
use crate::dataset::Record;

/// Default upper bound for one execution.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// One result row, keyed by column name in select order.
pub type Row = serde_json::Map<String, Value>;

/// Rows produced by a translated query, with the query text shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub sql: String,
    pub rows: Vec<Row>,
    pub substitutions: usize,
}

/// Runs translator output against a snapshot.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    table: String,
    timeout: Duration,
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE, DEFAULT_QUERY_TIMEOUT)
    }
}

impl QueryExecutor {
    /// `table` is the logical name the translator was told to query.
    pub fn new(table: impl Into<String>, timeout: Duration) -> Self {
        Self { table: table.into(), timeout }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Sanitize `raw` translator output and run it against `snapshot`.
    ///
    /// # Errors
    ///
    /// `QueryRejected`/`EmptyTranslation` from the sanitizer, `Execution` with
    /// the engine's message when SQLite refuses the query, `ExecutionTimeout`
    /// when it runs too long.
    pub async fn execute(&self, raw: &str, snapshot: &Snapshot) -> Result<QueryOutput, Error> {
        let query = sanitize(raw, &self.table)?;
        tracing::debug!(substitutions = query.substitutions, "executing: {}", query.runnable);

        let rows = self.run(query.runnable, snapshot.records.clone()).await?;

        Ok(QueryOutput { sql: query.display, rows, substitutions: query.substitutions })
    }

    /// The bound is measured on the tokio clock, so callers running with a
    /// paused clock see it elapse as soon as the runtime idles on the engine.
    async fn run(&self, sql: String, records: Vec<Record>) -> Result<Vec<Row>, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;

        let interrupt = conn
            .call(|conn| Ok::<_, rusqlite::Error>(conn.get_interrupt_handle()))
            .await
            .map_err(Error::Database)?;

        let work = conn.call(move |conn| -> Result<Vec<Row>, Error> {
            load_snapshot(conn, &records)?;
            register_functions(conn)?;
            query_rows(conn, &sql)
        });

        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => {
                interrupt.interrupt();
                Err(Error::ExecutionTimeout(self.timeout.as_millis() as u64))
            }
        }
    }
}

fn load_snapshot(conn: &mut rusqlite::Connection, records: &[Record]) -> Result<(), Error> {
    conn.execute_batch(&format!(
        "CREATE TABLE {BOUND_RELATION} (
            id,
            country TEXT NOT NULL,
            region TEXT NOT NULL,
            lpi_score REAL NOT NULL,
            year INTEGER NOT NULL
        )"
    ))?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {BOUND_RELATION} (id, country, region, lpi_score, year) VALUES (?1, ?2, ?3, ?4, ?5)"
        ))?;
        for record in records {
            stmt.execute(params![
                id_value(&record.id),
                &record.country,
                &record.region,
                record.lpi_score,
                record.year
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn register_functions(conn: &rusqlite::Connection) -> Result<(), Error> {
    conn.create_scalar_function(
        "ilike",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(substring_predicate(&text_arg(ctx, 0), &text_arg(ctx, 1))),
    )?;
    Ok(())
}

fn query_rows(conn: &rusqlite::Connection, sql: &str) -> Result<Vec<Row>, Error> {
    let mut stmt = conn.prepare(sql).map_err(execution)?;
    if !stmt.readonly() {
        return Err(Error::QueryRejected("statement would modify the database".into()));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query([]).map_err(execution)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(execution)? {
        let mut object = Row::new();
        for (idx, name) in columns.iter().enumerate() {
            object.insert(name.clone(), json_value(row.get_ref(idx).map_err(execution)?));
        }
        out.push(object);
    }
    Ok(out)
}

fn execution(err: rusqlite::Error) -> Error {
    Error::Execution(err.to_string())
}

/// Pattern-function argument as text; NULL reads as empty.
fn text_arg(ctx: &Context<'_>, idx: usize) -> String {
    match ctx.get_raw(idx) {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn id_value(id: &Value) -> SqlValue {
    match id {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}
