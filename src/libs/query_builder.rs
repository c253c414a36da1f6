use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};

use crate::libs::ident::Ident;

/// A value bound to a `?` placeholder. Row values always travel as text or NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(Option<String>),
    Int(i64),
}

/// SQL text plus the values for its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

impl Statement {
    pub fn query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        let mut query = sqlx::query(&self.sql);
        for param in &self.params {
            query = match param {
                Param::Text(v) => query.bind(v.clone()),
                Param::Int(n) => query.bind(*n),
            };
        }
        query
    }
}

/// Builds statements for one table. Identifiers come in as [`Ident`] only;
/// values are never written into the SQL text.
pub struct QueryBuilder {
    table: Ident,
    wheres: Vec<String>,
    where_params: Vec<Param>,
    order_clause: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl QueryBuilder {
    pub fn new(table: &Ident) -> Self {
        Self {
            table: table.clone(),
            wheres: vec![],
            where_params: vec![],
            order_clause: None,
            limit: None,
            offset: None,
        }
    }

    pub fn r#where(mut self, column: &Ident, value: &str) -> Self {
        self.wheres.push(format!("{} = ?", column.quoted()));
        self.where_params.push(Param::Text(Some(value.to_string())));
        self
    }

    pub fn order_by_desc(mut self, column: &Ident) -> Self {
        self.order_clause = Some(format!("ORDER BY {} DESC", column.quoted()));
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    fn where_sql(&self) -> String {
        if self.wheres.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.wheres.join(" AND "))
        }
    }

    pub fn count(&self) -> Statement {
        Statement {
            sql: format!("SELECT COUNT(*) FROM {}{}", self.table.quoted(), self.where_sql()),
            params: self.where_params.clone(),
        }
    }

    pub fn select(&self) -> Statement {
        let mut sql = format!("SELECT * FROM {}{}", self.table.quoted(), self.where_sql());
        let mut params = self.where_params.clone();
        if let Some(order) = &self.order_clause {
            sql += &format!(" {}", order);
        }
        if let Some(limit) = self.limit {
            sql += " LIMIT ?";
            params.push(Param::Int(limit));
        }
        if let Some(offset) = self.offset {
            // SQLite only accepts OFFSET after LIMIT
            if self.limit.is_none() {
                sql += " LIMIT -1";
            }
            sql += " OFFSET ?";
            params.push(Param::Int(offset));
        }
        Statement { sql, params }
    }

    pub fn insert(&self, values: &[(Ident, Option<String>)]) -> Statement {
        let cols: Vec<String> = values.iter().map(|(c, _)| c.quoted()).collect();
        let placeholders = vec!["?"; values.len()];
        Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table.quoted(),
                cols.join(","),
                placeholders.join(",")
            ),
            params: values.iter().map(|(_, v)| Param::Text(v.clone())).collect(),
        }
    }

    pub fn update(&self, values: &[(Ident, Option<String>)]) -> Statement {
        let sets: Vec<String> = values
            .iter()
            .map(|(c, _)| format!("{} = ?", c.quoted()))
            .collect();
        let mut params: Vec<Param> = values.iter().map(|(_, v)| Param::Text(v.clone())).collect();
        params.extend(self.where_params.iter().cloned());
        Statement {
            sql: format!("UPDATE {} SET {}{}", self.table.quoted(), sets.join(", "), self.where_sql()),
            params,
        }
    }

    pub fn delete(&self) -> Statement {
        Statement {
            sql: format!("DELETE FROM {}{}", self.table.quoted(), self.where_sql()),
            params: self.where_params.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Ident {
        Ident::new(s).unwrap()
    }

    #[test]
    fn paged_select_binds_limit_and_offset() {
        let stmt = QueryBuilder::new(&ident("demo"))
            .order_by_desc(&ident("id"))
            .limit(200)
            .offset(10)
            .select();
        assert_eq!(stmt.sql, "SELECT * FROM \"demo\" ORDER BY \"id\" DESC LIMIT ? OFFSET ?");
        assert_eq!(stmt.params, vec![Param::Int(200), Param::Int(10)]);
    }

    #[test]
    fn point_select_binds_key_as_text() {
        let stmt = QueryBuilder::new(&ident("demo"))
            .r#where(&ident("id"), "5")
            .limit(1)
            .select();
        assert_eq!(stmt.sql, "SELECT * FROM \"demo\" WHERE \"id\" = ? LIMIT ?");
        assert_eq!(stmt.params, vec![Param::Text(Some("5".into())), Param::Int(1)]);
    }

    #[test]
    fn offset_without_limit_is_valid_sqlite() {
        let stmt = QueryBuilder::new(&ident("t")).offset(3).select();
        assert_eq!(stmt.sql, "SELECT * FROM \"t\" LIMIT -1 OFFSET ?");
    }

    #[test]
    fn insert_never_inlines_values() {
        let stmt = QueryBuilder::new(&ident("demo")).insert(&[
            (ident("label"), Some("'); DROP TABLE demo; --".into())),
            (ident("note"), None),
        ]);
        assert_eq!(stmt.sql, "INSERT INTO \"demo\" (\"label\",\"note\") VALUES (?,?)");
        assert!(!stmt.sql.contains("DROP"));
        assert_eq!(stmt.params[1], Param::Text(None));
    }

    #[test]
    fn update_puts_key_param_last() {
        let stmt = QueryBuilder::new(&ident("demo"))
            .r#where(&ident("id"), "5")
            .update(&[(ident("a"), Some("1".into())), (ident("b"), Some("x".into()))]);
        assert_eq!(stmt.sql, "UPDATE \"demo\" SET \"a\" = ?, \"b\" = ? WHERE \"id\" = ?");
        assert_eq!(stmt.params.last(), Some(&Param::Text(Some("5".into()))));
    }

    #[test]
    fn count_and_delete() {
        let qb = QueryBuilder::new(&ident("demo"));
        assert_eq!(qb.count().sql, "SELECT COUNT(*) FROM \"demo\"");
        let del = qb.r#where(&ident("id"), "7").delete();
        assert_eq!(del.sql, "DELETE FROM \"demo\" WHERE \"id\" = ?");
        assert_eq!(del.params.len(), 1);
    }
}
