use async_trait::async_trait;
use rillcore::{ExecutionContext, NodeError, NodeExecutor, NodeResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::{Column, Connection, MySqlConnection, PgConnection, Row};

#[derive(Deserialize)]
struct DbData {
    #[serde(default)]
    host: String,
    #[serde(default)]
    port: u16,
    #[serde(default)]
    user: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    dbname: String,
    #[serde(default)]
    query: String,
}

impl DbData {
    fn url(&self, scheme: &str, default_port: u16) -> String {
        let port = if self.port == 0 {
            default_port
        } else {
            self.port
        };
        format!(
            "{}://{}:{}@{}:{}/{}",
            scheme, self.user, self.password, self.host, port, self.dbname
        )
    }
}

/// Execute a SQL query against PostgreSQL and return the rows.
///
/// Opens one connection per invocation and releases it on every return
/// path; pooling is left to dedicated database nodes upstream.
pub struct PostgresQueryExecutor;

#[async_trait]
impl NodeExecutor for PostgresQueryExecutor {
    fn type_key(&self) -> &str {
        "db_postgres"
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: DbData = serde_json::from_slice(input)?;
        let url = data.url("postgres", 5432);

        let query = async {
            let mut conn = match PgConnection::connect(&url).await {
                Ok(conn) => conn,
                Err(err) => {
                    return Ok(NodeResult::soft_error(
                        format!("failed to connect to database: {err}"),
                        err.to_string(),
                    ));
                }
            };

            let rows = sqlx::query(&data.query).fetch_all(&mut conn).await;
            let _ = conn.close().await;

            let rows = match rows {
                Ok(rows) => rows,
                Err(err) => {
                    return Ok(NodeResult::soft_error(
                        format!("query failed: {err}"),
                        err.to_string(),
                    ));
                }
            };

            let results: Vec<Value> = rows
                .iter()
                .map(|row| Value::Object(pg_row_to_json(row)))
                .collect();

            Ok(NodeResult::completed("output_success")
                .with_log(format!(
                    "query executed successfully, rows returned: {}",
                    results.len()
                ))
                .with_output("rows", Value::Array(results)))
        };

        tokio::select! {
            result = query => result,
            _ = ctx.cancellation.cancelled() => Err(NodeError::Cancelled),
        }
    }
}

/// Execute a SQL query against MySQL and return the rows.
pub struct MysqlQueryExecutor;

#[async_trait]
impl NodeExecutor for MysqlQueryExecutor {
    fn type_key(&self) -> &str {
        "db_mysql"
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: DbData = serde_json::from_slice(input)?;
        let url = data.url("mysql", 3306);

        let query = async {
            let mut conn = match MySqlConnection::connect(&url).await {
                Ok(conn) => conn,
                Err(err) => {
                    return Ok(NodeResult::soft_error(
                        format!("failed to connect to database: {err}"),
                        err.to_string(),
                    ));
                }
            };

            let rows = sqlx::query(&data.query).fetch_all(&mut conn).await;
            let _ = conn.close().await;

            let rows = match rows {
                Ok(rows) => rows,
                Err(err) => {
                    return Ok(NodeResult::soft_error(
                        format!("query failed: {err}"),
                        err.to_string(),
                    ));
                }
            };

            let results: Vec<Value> = rows
                .iter()
                .map(|row| Value::Object(mysql_row_to_json(row)))
                .collect();

            Ok(NodeResult::completed("output_success")
                .with_log(format!(
                    "query executed successfully, rows returned: {}",
                    results.len()
                ))
                .with_output("rows", Value::Array(results)))
        };

        tokio::select! {
            result = query => result,
            _ = ctx.cancellation.cancelled() => Err(NodeError::Cancelled),
        }
    }
}

// Column types are unknown at compile time; values are decoded by
// trying the common scalar types in order. Byte-typed columns are
// coerced to strings.

fn pg_row_to_json(row: &PgRow) -> Map<String, Value> {
    let mut map = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), decode_pg_column(row, i));
    }
    map
}

fn decode_pg_column(row: &PgRow, i: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(i) {
        return v.map(|f| Value::from(f as f64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(i) {
        return v
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null);
    }
    Value::Null
}

fn mysql_row_to_json(row: &MySqlRow) -> Map<String, Value> {
    let mut map = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), decode_mysql_column(row, i));
    }
    map
}

fn decode_mysql_column(row: &MySqlRow, i: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(i) {
        return v
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null);
    }
    Value::Null
}
