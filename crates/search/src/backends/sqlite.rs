//! SQLite reference executor.
//!
//! Runs compiled plans against a `rusqlite` connection. Used by the
//! integration tests and the CLI; production deployments plug their own
//! executor in behind [`LogicalQueryPlan`].

use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, ToSql};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::ExecutionError;
use crate::planner::LogicalQueryPlan;
use crate::schema::SchemaRegistry;
use crate::sql::{SqlFragment, SqlParam, SqlRenderer, schema_ddl};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlParam::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            SqlParam::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            SqlParam::Null => ToSqlOutput::Owned(SqlValue::Null),
        })
    }
}

/// Executes logical plans on SQLite.
pub struct SqliteExecutor {
    conn: Connection,
    registry: Arc<SchemaRegistry>,
}

impl SqliteExecutor {
    /// Wraps an open connection, registering `REGEXP` and making `LIKE`
    /// case-sensitive.
    pub fn new(conn: Connection, registry: Arc<SchemaRegistry>) -> Result<Self, ExecutionError> {
        register_regexp(&conn)?;
        conn.execute_batch("PRAGMA case_sensitive_like = ON")?;
        Ok(Self { conn, registry })
    }

    /// Opens a private in-memory database.
    pub fn in_memory(registry: Arc<SchemaRegistry>) -> Result<Self, ExecutionError> {
        Self::new(Connection::open_in_memory()?, registry)
    }

    /// Opens a database file.
    pub fn open(path: &Path, registry: Arc<SchemaRegistry>) -> Result<Self, ExecutionError> {
        Self::new(Connection::open(path)?, registry)
    }

    /// Creates the tables the registry describes, if missing.
    pub fn init_schema(&self) -> Result<(), ExecutionError> {
        let ddl = schema_ddl(&self.registry);
        debug!(tables = ddl.len(), "Initializing SQLite schema");
        self.conn.execute_batch(&ddl.join(";\n"))?;
        Ok(())
    }

    /// The underlying connection, for loading fixtures.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Renders `plan` without running it.
    pub fn render(&self, plan: &LogicalQueryPlan) -> Result<SqlFragment, ExecutionError> {
        Ok(SqlRenderer::new(&self.registry).render(plan)?)
    }

    /// Runs `plan` and returns the primary keys of the matching root rows in
    /// plan order.
    pub fn execute(&self, plan: &LogicalQueryPlan) -> Result<Vec<Value>, ExecutionError> {
        let fragment = self.render(plan)?;
        trace!(sql = %fragment.sql, params = fragment.params.len(), "Executing search");

        let mut stmt = self.conn.prepare(&fragment.sql)?;
        let param_refs: Vec<&dyn ToSql> = fragment.params.iter().map(|p| p as &dyn ToSql).collect();
        let rows = stmt.query_map(param_refs.as_slice(), |row| Ok(json_value(row.get_ref(0)?)))?;

        let ids = rows.collect::<Result<Vec<_>, _>>()?;
        debug!(root = %plan.root_entity, rows = ids.len(), "Search executed");
        Ok(ids)
    }

    /// Counts every root row matching `plan`, ignoring pagination.
    pub fn count(&self, plan: &LogicalQueryPlan) -> Result<u64, ExecutionError> {
        let fragment = SqlRenderer::new(&self.registry).render_count(plan)?;
        let param_refs: Vec<&dyn ToSql> = fragment.params.iter().map(|p| p as &dyn ToSql).collect();
        let count: i64 = self
            .conn
            .query_row(&fragment.sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// `x REGEXP y` calls `regexp(y, x)`. The compiled pattern is cached per
/// statement.
fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let pattern: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> Result<_, BoxError> {
                Ok(Regex::new(vr.as_str()?)?)
            })?;
            let text: Option<String> = ctx.get(1)?;
            Ok(text.map(|t| pattern.is_match(&t)))
        },
    )
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::SearchCompiler;
    use crate::schema::builtin::old_schema;
    use serde_json::json;

    fn setup() -> (SqliteExecutor, SearchCompiler) {
        let registry = Arc::new(old_schema().unwrap());
        let executor = SqliteExecutor::in_memory(registry.clone()).unwrap();
        executor.init_schema().unwrap();
        executor
            .connection()
            .execute_batch(
                "INSERT INTO form (id, transcription) VALUES (1, 'Dog'), (2, 'dog'), (3, 'cat');",
            )
            .unwrap();
        (executor, SearchCompiler::new(registry))
    }

    #[test]
    fn test_regexp_function() {
        let (executor, compiler) = setup();
        let plan = compiler
            .compile("Form", &json!(["Form", "transcription", "regex", "^d"]), &Value::Null, None)
            .unwrap();
        assert_eq!(executor.execute(&plan).unwrap(), vec![json!(2)]);
    }

    #[test]
    fn test_like_is_case_sensitive() {
        let (executor, compiler) = setup();
        let plan = compiler
            .compile("Form", &json!(["Form", "transcription", "like", "D%"]), &Value::Null, None)
            .unwrap();
        assert_eq!(executor.execute(&plan).unwrap(), vec![json!(1)]);
        assert_eq!(executor.count(&plan).unwrap(), 1);
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let (executor, _) = setup();
        executor.init_schema().unwrap();
    }
}
