// schema.rs
use serde::Serialize;

use crate::libs::error::{EditorError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    pub nullable: bool,
    pub auto: bool,
    pub default: Option<String>,
}

/// Shape of a table as read from the catalog. Never cached between requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    #[serde(rename = "table")]
    pub name: String,
    #[serde(rename = "primaryKey")]
    pub primary_key: Vec<String>,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Point lookups need exactly one key column.
    pub fn single_primary_key(&self) -> Result<&str> {
        match self.primary_key.as_slice() {
            [pk] => Ok(pk),
            _ => Err(EditorError::bad_request("composite primary key not supported")),
        }
    }

    /// Listing order: the single key column if there is one, else the first column.
    pub fn order_column(&self) -> &str {
        match self.primary_key.as_slice() {
            [pk] => pk,
            _ => &self.columns[0].name,
        }
    }

    pub fn auto_key(&self) -> bool {
        match self.primary_key.as_slice() {
            [pk] => self.columns.iter().any(|c| &c.name == pk && c.auto),
            _ => false,
        }
    }
}
