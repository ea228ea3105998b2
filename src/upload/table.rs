//! Loading an uploaded file into a database table
//!
//! The caller describes the source columns (name, whether to load it, and
//! its target type). From that description an `INSERT` statement template
//! is generated in which `$i` stands for the value of source column `i`;
//! the receiver substitutes the values row by row.

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATE_FORMAT: &str = "DD-MON-YYYY";
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "DD-MON-YYYY HH24:MI:SS";

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

fn default_include() -> bool {
    true
}

/// Target type of a column and how its values are written into SQL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Date {
        #[serde(default = "default_date_format")]
        format: String,
    },
    Timestamp {
        #[serde(default = "default_timestamp_format")]
        format: String,
    },
}

impl FieldType {
    pub fn date() -> Self {
        FieldType::Date {
            format: default_date_format(),
        }
    }

    pub fn timestamp() -> Self {
        FieldType::Timestamp {
            format: default_timestamp_format(),
        }
    }

    /// Wrap a value expression according to the type
    pub fn format_value(&self, value: &str) -> String {
        match self {
            FieldType::String => format!("'{}'", value),
            FieldType::Number => value.to_string(),
            FieldType::Date { format } => format!("to_date('{}', '{}')", value, format),
            FieldType::Timestamp { format } => format!("to_timestamp('{}', '{}')", value, format),
        }
    }

    /// Column type used when creating a table for this field
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::String => "VARCHAR(100)",
            FieldType::Number => "NUMBER",
            FieldType::Date { .. } => "DATE",
            FieldType::Timestamp { .. } => "TIMESTAMP",
        }
    }
}

/// One source column of the uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default = "default_include")]
    pub include: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            include: true,
            field_type,
        }
    }

    pub fn excluded(mut self) -> Self {
        self.include = false;
        self
    }
}

/// Generated statement template plus the column inclusion mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    pub insert_sql: String,
    /// One `1` or `0` per source column
    pub included_columns: String,
}

impl InsertPlan {
    pub fn build(table: &str, columns: &[ColumnSpec]) -> Result<Self> {
        validate_table_name(table)?;

        for (idx, column) in columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(IngestError::invalid_parameter(
                    "columns",
                    format!("Column {} has no name", idx),
                ));
            }
        }

        let included: Vec<(usize, &ColumnSpec)> = columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.include)
            .collect();

        if included.is_empty() {
            return Err(IngestError::invalid_parameter(
                "columns",
                "At least one column must be included",
            ));
        }

        let column_list = included
            .iter()
            .map(|(_, column)| column.name.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let value_list = included
            .iter()
            .map(|(idx, column)| column.field_type.format_value(&format!("${}", idx)))
            .collect::<Vec<_>>()
            .join(",");

        let included_columns = columns
            .iter()
            .map(|column| if column.include { '1' } else { '0' })
            .collect();

        Ok(Self {
            insert_sql: format!(
                "INSERT INTO {} ({}) VALUES({})",
                table, column_list, value_list
            ),
            included_columns,
        })
    }
}

fn validate_table_name(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && !table.starts_with('.')
        && !table.ends_with('.')
        && table
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.');

    if !valid {
        return Err(IngestError::invalid_parameter(
            "target_table_name",
            format!("Invalid table name: {:?}", table),
        ));
    }
    Ok(())
}

/// Request asking the receiver to load an uploaded file into a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLoadRequest {
    pub file_name: String,
    pub included_columns: String,
    pub insert_sql: String,
    pub field_separator: char,
}

impl TableLoadRequest {
    pub fn new(file_name: impl Into<String>, plan: InsertPlan, field_separator: char) -> Self {
        Self {
            file_name: file_name.into(),
            included_columns: plan.included_columns,
            insert_sql: plan.insert_sql,
            field_separator,
        }
    }

    /// Query parameters of the load request
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("filename", self.file_name.clone()),
            ("includedcolumns", self.included_columns.clone()),
            ("insertsql", self.insert_sql.clone()),
            ("fieldsep", self.field_separator.to_string()),
        ]
    }
}
