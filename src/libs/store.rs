use serde::ser::{Serialize, SerializeMap, Serializer};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteQueryResult, SqliteRow};
use sqlx::{Column, Row};
use tracing::{debug, info};

use crate::libs::error::{EditorError, Result};
use crate::libs::ident::Ident;
use crate::libs::query_builder::Statement;
use crate::libs::schema::{ColumnSchema, TableSchema};

/// One fetched row, in the table's column order. `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(pub Vec<(String, Option<String>)>);

impl Record {
    pub fn get(&self, column: &str) -> Option<&Option<String>> {
        self.0.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Connection pool plus catalog access.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        info!("Connecting to {}", database_url);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // -------- Catalog --------

    /// User tables, sorted case-insensitively.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r"SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\_%' ESCAPE '\'",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name")?;
            if !name.trim().is_empty() {
                tables.push(name);
            }
        }
        tables.sort_by_key(|t| t.to_lowercase());
        Ok(tables)
    }

    /// Reads columns in declaration order and the key columns in key order.
    pub async fn table_schema(&self, table: &Ident) -> Result<TableSchema> {
        let rows = sqlx::query(
            r#"SELECT cid, name, type AS sql_type, "notnull" AS not_null, dflt_value, pk
               FROM pragma_table_info(?) ORDER BY cid"#,
        )
        .bind(table.as_str())
        .fetch_all(&self.pool)
        .await?;
        if rows.is_empty() {
            return Err(EditorError::not_found("table not found"));
        }

        let mut columns = Vec::with_capacity(rows.len());
        let mut keyed: Vec<(i64, String)> = Vec::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            let sql_type: String = row.try_get::<Option<String>, _>("sql_type")?.unwrap_or_default();
            let not_null: i64 = row.try_get("not_null")?;
            let pk: i64 = row.try_get("pk")?;
            if pk > 0 {
                keyed.push((pk, name.clone()));
            }
            columns.push(ColumnSchema {
                name,
                sql_type,
                nullable: not_null == 0,
                auto: false,
                default: row.try_get::<Option<String>, _>("dflt_value").unwrap_or(None),
            });
        }
        keyed.sort_by_key(|(seq, _)| *seq);
        let primary_key: Vec<String> = keyed.into_iter().map(|(_, name)| name).collect();

        // A lone INTEGER key is the rowid alias and gets assigned on insert,
        // unless it is backed by its own index (WITHOUT ROWID, or a DESC key).
        if let [pk] = primary_key.as_slice() {
            let integer = columns
                .iter()
                .any(|c| &c.name == pk && c.sql_type.eq_ignore_ascii_case("INTEGER"));
            if integer && !self.has_key_index(table).await? {
                if let Some(col) = columns.iter_mut().find(|c| &c.name == pk) {
                    col.auto = true;
                }
            }
        }

        debug!("schema for {}: {} columns, key {:?}", table, columns.len(), primary_key);
        Ok(TableSchema {
            name: table.to_string(),
            primary_key,
            columns,
        })
    }

    async fn has_key_index(&self, table: &Ident) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) FROM pragma_index_list(?) WHERE origin = 'pk'")
            .bind(table.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)? > 0)
    }

    // -------- Statements --------

    pub async fn fetch_count(&self, stmt: &Statement) -> Result<i64> {
        let row = stmt.query().fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    pub async fn fetch_records(&self, stmt: &Statement) -> Result<Vec<Record>> {
        let rows = stmt.query().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(to_record).collect())
    }

    pub async fn fetch_record(&self, stmt: &Statement) -> Result<Option<Record>> {
        let row = stmt.query().fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(to_record))
    }

    pub async fn execute(&self, stmt: &Statement) -> Result<SqliteQueryResult> {
        debug!("{}", stmt.sql);
        Ok(stmt.query().execute(&self.pool).await?)
    }
}

fn to_record(r: &SqliteRow) -> Record {
    let mut values = Vec::with_capacity(r.columns().len());
    for col in r.columns() {
        let col_name = col.name();
        values.push((col_name.to_string(), text_value(r, col_name)));
    }
    Record(values)
}

/// Flattens whatever the column holds into text, keeping NULL distinct.
fn text_value(r: &SqliteRow, col_name: &str) -> Option<String> {
    match r.try_get::<Option<i64>, _>(col_name) {
        Ok(v) => v.map(|v| v.to_string()),
        Err(_) => match r.try_get::<Option<f64>, _>(col_name) {
            Ok(v) => v.map(real_text),
            Err(_) => match r.try_get::<Option<String>, _>(col_name) {
                Ok(v) => v,
                Err(_) => match r.try_get::<Option<Vec<u8>>, _>(col_name) {
                    Ok(v) => v.map(|b| String::from_utf8_lossy(&b).into_owned()),
                    Err(_) => None,
                },
            },
        },
    }
}

/// REALs always read as reals: `2.0` stays `"2.0"`, not `"2"`.
fn real_text(v: f64) -> String {
    let text = v.to_string();
    if v.is_finite() && !text.contains(['.', 'e', 'E']) {
        format!("{text}.0")
    } else {
        text
    }
}
