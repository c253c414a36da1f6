use serde::Serialize;
use tracing::info;

use crate::libs::error::{EditorError, Result};
use crate::libs::ident::Ident;
use crate::libs::json::Row;
use crate::libs::query_builder::QueryBuilder;
use crate::libs::schema::TableSchema;
use crate::libs::store::{Record, Store};

pub const DEFAULT_LIMIT: i64 = 200;
pub const MAX_LIMIT: i64 = 1000;
pub const MAX_OFFSET: i64 = 1_000_000;

/// Clamped pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset: offset.clamp(0, MAX_OFFSET),
        }
    }

    /// Unparsable values fall back to the defaults before clamping.
    pub fn from_query(limit: Option<&str>, offset: Option<&str>) -> Self {
        let parse = |s: Option<&str>, default: i64| {
            s.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(default)
        };
        Self::new(parse(limit, DEFAULT_LIMIT), parse(offset, 0))
    }
}

#[derive(Debug, Serialize)]
pub struct RowPage {
    pub table: String,
    #[serde(rename = "primaryKey")]
    pub primary_key: Vec<String>,
    pub columns: Vec<String>,
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
    pub rows: Vec<Record>,
}

/// A handle to one table, opened against its live schema.
pub struct Table<'a> {
    store: &'a Store,
    ident: Ident,
    schema: TableSchema,
}

impl<'a> Table<'a> {
    /// Checks the name, then reads the schema. Unknown tables are `NotFound`.
    pub async fn open(store: &'a Store, name: &str) -> Result<Self> {
        let ident = Ident::table(name)?;
        let schema = store.table_schema(&ident).await?;
        Ok(Self {
            store,
            ident,
            schema,
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn into_schema(self) -> TableSchema {
        self.schema
    }

    fn key_column(&self) -> Result<Ident> {
        Ident::column(self.schema.single_primary_key()?)
    }

    /// Keeps only safe, known columns, sorted by name.
    fn writable(&self, row: Row) -> Result<Vec<(Ident, Option<String>)>> {
        let mut values: Vec<(Ident, Option<String>)> = row
            .into_iter()
            .filter(|(k, _)| self.schema.has_column(k))
            .filter_map(|(k, v)| Ident::new(&k).map(|ident| (ident, v)))
            .collect();
        if values.is_empty() {
            return Err(EditorError::bad_request("no valid columns"));
        }
        values.sort_by(|(a, _), (b, _)| {
            a.as_str()
                .to_lowercase()
                .cmp(&b.as_str().to_lowercase())
                .then_with(|| a.as_str().cmp(b.as_str()))
        });
        Ok(values)
    }

    pub async fn list(&self, page: Page) -> Result<RowPage> {
        let order = Ident::column(self.schema.order_column())?;
        let qb = QueryBuilder::new(&self.ident)
            .order_by_desc(&order)
            .limit(page.limit)
            .offset(page.offset);
        let total = self.store.fetch_count(&qb.count()).await?;
        let rows = self.store.fetch_records(&qb.select()).await?;
        Ok(RowPage {
            table: self.schema.name.clone(),
            primary_key: self.schema.primary_key.clone(),
            columns: self.schema.column_names(),
            limit: page.limit,
            offset: page.offset,
            total,
            rows,
        })
    }

    pub async fn get(&self, pk: &str) -> Result<Record> {
        let key = self.key_column()?;
        let stmt = QueryBuilder::new(&self.ident).r#where(&key, pk).limit(1).select();
        self.store
            .fetch_record(&stmt)
            .await?
            .ok_or_else(|| EditorError::not_found("row not found"))
    }

    /// Returns the generated key when the table assigns one.
    pub async fn insert(&self, row: Row) -> Result<Option<i64>> {
        if row.is_empty() {
            return Err(EditorError::bad_request("empty body"));
        }
        let values = self.writable(row)?;
        let stmt = QueryBuilder::new(&self.ident).insert(&values);
        let result = self.store.execute(&stmt).await?;
        info!("inserted into {} ({} columns)", self.ident, values.len());
        Ok(self.schema.auto_key().then(|| result.last_insert_rowid()))
    }

    /// The key column is never written, even when the body carries it.
    /// Zero affected rows is returned, not raised.
    pub async fn update(&self, pk: &str, mut row: Row) -> Result<u64> {
        let key = self.key_column()?;
        row.remove(key.as_str());
        let values = self.writable(row)?;
        let stmt = QueryBuilder::new(&self.ident).r#where(&key, pk).update(&values);
        let updated = self.store.execute(&stmt).await?.rows_affected();
        info!("updated {} where {} = {}: {} rows", self.ident, key, pk, updated);
        Ok(updated)
    }

    pub async fn delete(&self, pk: &str) -> Result<u64> {
        let key = self.key_column()?;
        let stmt = QueryBuilder::new(&self.ident).r#where(&key, pk).delete();
        let deleted = self.store.execute(&stmt).await?.rows_affected();
        info!("deleted from {} where {} = {}: {} rows", self.ident, key, pk, deleted);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store_with(ddl: &[&str]) -> Store {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        for sql in ddl {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }
        Store::from_pool(pool)
    }

    fn row(pairs: &[(&str, Option<&str>)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(Page::from_query(None, None), Page { limit: 200, offset: 0 });
        assert_eq!(Page::from_query(Some("0"), Some("-5")), Page { limit: 1, offset: 0 });
        assert_eq!(Page::from_query(Some("5000"), Some("2000000")), Page { limit: 1000, offset: 1_000_000 });
        assert_eq!(Page::from_query(Some("abc"), Some("7")), Page { limit: 200, offset: 7 });
    }

    proptest! {
        #[test]
        fn limit_always_in_range(limit in any::<i64>(), offset in any::<i64>()) {
            let page = Page::new(limit, offset);
            prop_assert!((1..=MAX_LIMIT).contains(&page.limit));
            prop_assert!((0..=MAX_OFFSET).contains(&page.offset));
        }
    }

    #[tokio::test]
    async fn unsafe_and_unknown_tables() {
        let store = store_with(&[]).await;
        let err = Table::open(&store, "demo;--").await.err().unwrap();
        assert_eq!(err.to_string(), "invalid table");
        let err = Table::open(&store, "ghost").await.err().unwrap();
        assert!(matches!(err, EditorError::NotFound(_)));
    }

    #[tokio::test]
    async fn insert_drops_unknown_columns_and_returns_generated_key() {
        let store = store_with(&["CREATE TABLE demo (id INTEGER PRIMARY KEY, label TEXT)"]).await;
        let table = Table::open(&store, "demo").await.unwrap();
        let id = table
            .insert(row(&[("label", Some("hello")), ("bogus", Some("x"))]))
            .await
            .unwrap()
            .unwrap();
        let rec = table.get(&id.to_string()).await.unwrap();
        assert_eq!(rec.0, vec![
            ("id".to_string(), Some(id.to_string())),
            ("label".to_string(), Some("hello".to_string())),
        ]);
    }

    #[tokio::test]
    async fn round_trip_leaves_missing_nullable_column_null() {
        let store = store_with(&["CREATE TABLE t (id INTEGER PRIMARY KEY, a TEXT, b TEXT, c TEXT)"]).await;
        let table = Table::open(&store, "t").await.unwrap();
        let id = table
            .insert(row(&[("a", Some("1")), ("b", Some("x"))]))
            .await
            .unwrap()
            .unwrap();
        let rec = table.get(&id.to_string()).await.unwrap();
        assert_eq!(rec.get("a"), Some(&Some("1".to_string())));
        assert_eq!(rec.get("b"), Some(&Some("x".to_string())));
        assert_eq!(rec.get("c"), Some(&None));
    }

    #[tokio::test]
    async fn insert_rejects_empty_and_all_unknown_bodies() {
        let store = store_with(&["CREATE TABLE demo (id INTEGER PRIMARY KEY, label TEXT)"]).await;
        let table = Table::open(&store, "demo").await.unwrap();
        let err = table.insert(Row::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "empty body");
        let err = table.insert(row(&[("bogus", Some("x"))])).await.unwrap_err();
        assert_eq!(err.to_string(), "no valid columns");
    }

    #[tokio::test]
    async fn text_key_tables_report_no_generated_key() {
        let store = store_with(&["CREATE TABLE kv (k TEXT PRIMARY KEY, v TEXT)"]).await;
        let table = Table::open(&store, "kv").await.unwrap();
        let id = table
            .insert(row(&[("k", Some("a")), ("v", Some("1"))]))
            .await
            .unwrap();
        assert_eq!(id, None);
        assert_eq!(table.get("a").await.unwrap().get("v"), Some(&Some("1".to_string())));
    }

    #[tokio::test]
    async fn without_rowid_tables_report_no_generated_key() {
        let store = store_with(&["CREATE TABLE w (id INTEGER PRIMARY KEY, v TEXT) WITHOUT ROWID"]).await;
        let table = Table::open(&store, "w").await.unwrap();
        assert!(table.schema().columns.iter().all(|c| !c.auto));
        let id = table
            .insert(row(&[("id", Some("7")), ("v", Some("x"))]))
            .await
            .unwrap();
        assert_eq!(id, None);
        assert_eq!(table.get("7").await.unwrap().get("v"), Some(&Some("x".to_string())));
    }

    #[tokio::test]
    async fn update_never_touches_the_key() {
        let store = store_with(&[
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)",
            "INSERT INTO t (id, name) VALUES (5, 'old')",
        ])
        .await;
        let table = Table::open(&store, "t").await.unwrap();
        let n = table
            .update("5", row(&[("id", Some("999")), ("name", Some("new"))]))
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(table.get("5").await.unwrap().get("name"), Some(&Some("new".to_string())));
        assert!(matches!(table.get("999").await.unwrap_err(), EditorError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_with_only_the_key_has_no_valid_columns() {
        let store = store_with(&["CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)"]).await;
        let table = Table::open(&store, "t").await.unwrap();
        let err = table.update("1", row(&[("id", Some("2"))])).await.unwrap_err();
        assert_eq!(err.to_string(), "no valid columns");
    }

    #[tokio::test]
    async fn missing_rows_report_zero_not_error() {
        let store = store_with(&["CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)"]).await;
        let table = Table::open(&store, "t").await.unwrap();
        assert_eq!(table.update("42", row(&[("name", Some("x"))])).await.unwrap(), 0);
        assert_eq!(table.delete("42").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn composite_and_keyless_tables_refuse_point_access() {
        let store = store_with(&[
            "CREATE TABLE pair (a TEXT, b TEXT, PRIMARY KEY (a, b))",
            "CREATE TABLE loose (a TEXT, b TEXT)",
        ])
        .await;
        for name in ["pair", "loose"] {
            let table = Table::open(&store, name).await.unwrap();
            for err in [
                table.get("1").await.unwrap_err(),
                table.update("1", row(&[("a", Some("x"))])).await.unwrap_err(),
                table.delete("1").await.unwrap_err(),
            ] {
                assert_eq!(err.to_string(), "composite primary key not supported");
            }
        }
    }

    #[tokio::test]
    async fn list_orders_descending_and_respects_page() {
        let store = store_with(&["CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)"]).await;
        for i in 1..=5 {
            sqlx::query("INSERT INTO t (id, name) VALUES (?, ?)")
                .bind(i)
                .bind(format!("n{i}"))
                .execute(store.pool())
                .await
                .unwrap();
        }
        let table = Table::open(&store, "t").await.unwrap();
        let page = table.list(Page::new(2, 1)).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.columns, vec!["id", "name"]);
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[0].get("id"), Some(&Some("4".to_string())));
        assert_eq!(page.rows[1].get("id"), Some(&Some("3".to_string())));
    }

    #[tokio::test]
    async fn keyless_tables_list_by_first_column() {
        let store = store_with(&[
            "CREATE TABLE loose (a INTEGER, b TEXT)",
            "INSERT INTO loose VALUES (1, 'x'), (3, 'z'), (2, 'y')",
        ])
        .await;
        let table = Table::open(&store, "loose").await.unwrap();
        let page = table.list(Page::default()).await.unwrap();
        let firsts: Vec<_> = page.rows.iter().map(|r| r.get("a").cloned().flatten()).collect();
        assert_eq!(firsts, vec![Some("3".into()), Some("2".into()), Some("1".into())]);
    }
}
