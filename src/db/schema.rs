//! Database schema snapshot and its text rendering.
//!
//! The rendered text is the schema context handed to the text-generation
//! backend when translating a question into SQL.

use serde::{Deserialize, Serialize};

/// Represents the schema of a database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// All tables in the schema.
    pub tables: Vec<Table>,

    /// Foreign key relationships between tables.
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// The CRM tables as created by the application's setup script.
    ///
    /// Used as schema context whenever live introspection is unavailable.
    pub fn crm_default() -> Self {
        Self {
            tables: vec![
                Table {
                    name: "customers".to_string(),
                    columns: vec![
                        Column::new("id", "int").nullable(false),
                        Column::new("name", "varchar(255)").nullable(false),
                        Column::new("email", "varchar(255)").nullable(false),
                        Column::new("visits", "int").with_default("1"),
                        Column::new("last_active", "timestamp")
                            .with_default("CURRENT_TIMESTAMP"),
                        Column::new("total_spend", "decimal(10,2)").with_default("0.00"),
                        Column::new("is_admin", "tinyint(1)").with_default("0"),
                        Column::new("created_at", "timestamp")
                            .with_default("CURRENT_TIMESTAMP"),
                    ],
                    primary_key: vec!["id".to_string()],
                },
                Table {
                    name: "orders".to_string(),
                    columns: vec![
                        Column::new("id", "int").nullable(false),
                        Column::new("customer_id", "int"),
                        Column::new("spend", "decimal(10,2)").nullable(false),
                        Column::new("order_date", "timestamp")
                            .with_default("CURRENT_TIMESTAMP"),
                    ],
                    primary_key: vec!["id".to_string()],
                },
                Table {
                    name: "campaigns".to_string(),
                    columns: vec![
                        Column::new("id", "int").nullable(false),
                        Column::new("admin_email", "varchar(255)").nullable(false),
                        Column::new("query_text", "text").nullable(false),
                        Column::new("result_count", "int"),
                        Column::new("created_at", "timestamp")
                            .with_default("CURRENT_TIMESTAMP"),
                    ],
                    primary_key: vec!["id".to_string()],
                },
            ],
            foreign_keys: vec![ForeignKey::new(
                "orders",
                vec!["customer_id".to_string()],
                "customers",
                vec!["id".to_string()],
            )],
        }
    }

    /// Returns true if the schema has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Formats the schema for inclusion in a text-generation prompt.
    pub fn format_for_llm(&self) -> String {
        let tables_text = self
            .tables
            .iter()
            .map(|table| self.format_table_for_llm(table))
            .collect::<Vec<_>>()
            .join("");

        let foreign_keys_text = if self.foreign_keys.is_empty() {
            String::new()
        } else {
            let fk_lines = self
                .foreign_keys
                .iter()
                .map(|fk| {
                    format!(
                        "  - {}.{} -> {}.{}\n",
                        fk.from_table,
                        fk.from_columns.join(", "),
                        fk.to_table,
                        fk.to_columns.join(", ")
                    )
                })
                .collect::<Vec<_>>()
                .join("");
            format!("Foreign Keys:\n{}", fk_lines)
        };

        format!("Database Schema:\n\n{}{}", tables_text, foreign_keys_text)
    }

    fn format_table_for_llm(&self, table: &Table) -> String {
        let column_lines = table
            .columns
            .iter()
            .map(|column| Self::format_column_line(column, &self.annotations(table, column)))
            .collect::<Vec<_>>()
            .join("");

        format!("Table: {}\n{}\n", table.name, column_lines)
    }

    fn annotations(&self, table: &Table, column: &Column) -> Vec<String> {
        let mut annotations = Vec::new();
        if table.primary_key.contains(&column.name) {
            annotations.push("PK".to_string());
        }
        if !column.is_nullable {
            annotations.push("NOT NULL".to_string());
        }
        annotations.extend(
            self.foreign_keys
                .iter()
                .filter(|fk| fk.from_table == table.name && fk.from_columns.contains(&column.name))
                .map(|fk| {
                    format!(
                        "FK -> {}.{}",
                        fk.to_table,
                        fk.to_columns.first().map(String::as_str).unwrap_or("")
                    )
                }),
        );
        if let Some(default) = &column.default {
            annotations.push(format!("DEFAULT {default}"));
        }
        annotations
    }

    fn format_column_line(column: &Column, annotations: &[String]) -> String {
        if annotations.is_empty() {
            format!("  - {}: {}\n", column.name, column.data_type)
        } else {
            format!(
                "  - {}: {} ({})\n",
                column.name,
                column.data_type,
                annotations.join(", ")
            )
        }
    }
}

/// Represents a database table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in the table.
    pub columns: Vec<Column>,

    /// Column names that form the primary key.
    pub primary_key: Vec<String>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Data type (e.g., "int", "varchar(255)").
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub is_nullable: bool,

    /// Default value expression, if any.
    pub default: Option<String>,
}

impl Column {
    /// Creates a new column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }

    /// Sets the default value.
    pub fn with_default(self, default: impl Into<String>) -> Self {
        Self {
            default: Some(default.into()),
            ..self
        }
    }
}

/// Represents a foreign key relationship between tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Source table name.
    pub from_table: String,

    /// Source column names.
    pub from_columns: Vec<String>,

    /// Target table name.
    pub to_table: String,

    /// Target column names.
    pub to_columns: Vec<String>,
}

impl ForeignKey {
    /// Creates a new foreign key relationship.
    pub fn new(
        from_table: impl Into<String>,
        from_columns: Vec<String>,
        to_table: impl Into<String>,
        to_columns: Vec<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_columns,
            to_table: to_table.into(),
            to_columns,
        }
    }
}
