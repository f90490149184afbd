#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub const DEFAULT_TABLE: &str = "nodes";
const MAX_IDENTIFIER_LEN: usize = 64;

/// Storage column names for the four logical node fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    pub parent_path: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            name: "name".to_string(),
            parent_id: "parent_id".to_string(),
            parent_path: "parent_path".to_string(),
        }
    }
}

impl ColumnMap {
    pub fn try_new(
        id: impl Into<String>,
        name: impl Into<String>,
        parent_id: impl Into<String>,
        parent_path: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let columns = Self {
            id: id.into(),
            name: name.into(),
            parent_id: parent_id.into(),
            parent_path: parent_path.into(),
        };
        columns.validate()?;
        Ok(columns)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let fields = [
            ("id", &self.id),
            ("name", &self.name),
            ("parent_id", &self.parent_id),
            ("parent_path", &self.parent_path),
        ];
        for (field, value) in fields {
            validate_identifier(field, value)?;
        }
        for (index, &(field, value)) in fields.iter().enumerate() {
            if fields[..index].iter().any(|&(_, other)| other == value) {
                return Err(SchemaError::DuplicateColumn { field });
            }
        }
        Ok(())
    }

    /// Column names in the order rows are selected: id, name, parent_id, parent_path.
    pub fn as_array(&self) -> [&str; 4] {
        [&self.id, &self.name, &self.parent_id, &self.parent_path]
    }
}

/// Which table holds the nodes and how its columns are named.
///
/// Built once at startup and handed to the store; it never changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSchema {
    pub table: String,
    pub columns: ColumnMap,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            columns: ColumnMap::default(),
        }
    }
}

impl TableSchema {
    pub fn try_new(table: impl Into<String>, columns: ColumnMap) -> Result<Self, SchemaError> {
        let schema = Self {
            table: table.into(),
            columns,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Parses a JSON config object; missing keys take the defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, SchemaError> {
        let schema: Self =
            serde_json::from_str(raw).map_err(|err| SchemaError::Config(err.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        validate_identifier("table", &self.table)?;
        self.columns.validate()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("{field}: identifier must not be empty")]
    Empty { field: &'static str },
    #[error("{field}: identifier is too long")]
    TooLong { field: &'static str },
    #[error("{field}: invalid character {ch:?} at {index}")]
    InvalidChar {
        field: &'static str,
        ch: char,
        index: usize,
    },
    #[error("{field}: column name is already used by another field")]
    DuplicateColumn { field: &'static str },
    #[error("schema config: {0}")]
    Config(String),
}

impl SchemaError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty { .. } => "identifier must not be empty",
            Self::TooLong { .. } => "identifier is too long",
            Self::InvalidChar { .. } => "identifier contains an invalid character",
            Self::DuplicateColumn { .. } => "two fields map to the same column",
            Self::Config(_) => "schema config could not be parsed",
        }
    }
}

// Identifiers end up inside SQL text, so only plain ASCII names are accepted.
fn validate_identifier(field: &'static str, value: &str) -> Result<(), SchemaError> {
    if value.is_empty() {
        return Err(SchemaError::Empty { field });
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(SchemaError::TooLong { field });
    }
    for (index, ch) in value.chars().enumerate() {
        let ok = if index == 0 {
            ch.is_ascii_alphabetic() || ch == '_'
        } else {
            ch.is_ascii_alphanumeric() || ch == '_'
        };
        if !ok {
            return Err(SchemaError::InvalidChar { field, ch, index });
        }
    }
    Ok(())
}
