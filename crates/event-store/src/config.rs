use crate::{EventLogError, Result};

/// Name of the table holding the event log.
///
/// Restricted to a plain identifier so it can be spliced into SQL text.
/// Short enough that the derived `<table>_changes` notification channel
/// still fits Postgres' 63-byte identifier limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    const MAX_LEN: usize = 55;

    /// Validates and wraps a table name.
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if valid_start && valid_rest && name.len() <= Self::MAX_LEN {
            Ok(Self(name))
        } else {
            Err(EventLogError::InvalidTableName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of the event log, passed to a log implementation at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub table: TableName,
}

impl LogConfig {
    pub fn new(table: TableName) -> Self {
        Self { table }
    }

    /// Builds a config from an unvalidated table name.
    pub fn for_table(table: impl Into<String>) -> Result<Self> {
        Ok(Self::new(TableName::parse(table)?))
    }
}
