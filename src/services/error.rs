use std::collections::BTreeMap;
use std::fmt;

use sea_orm::{DbErr, SqlErr, TransactionError};
use serde::Serialize;

/// Key for errors that belong to a record as a whole.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Messages for one input field, or one error set per item of a list field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldError {
    Messages(Vec<String>),
    Items(Vec<FieldErrors>),
}

/// Field name to error mapping, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let entry = self
            .0
            .entry(field.to_string())
            .or_insert_with(|| FieldError::Messages(Vec::new()));
        if let FieldError::Items(_) = entry {
            *entry = FieldError::Messages(Vec::new());
        }
        if let FieldError::Messages(messages) = entry {
            messages.push(message.into());
        }
    }

    /// Record per-item errors for a list field. Nothing is recorded if every item is clean.
    pub fn add_items(&mut self, field: &str, items: Vec<FieldErrors>) {
        if items.iter().any(|item| !item.is_empty()) {
            self.0.insert(field.to_string(), FieldError::Items(items));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.0.get(field)
    }

    /// Messages recorded directly on `field`, empty if there are none.
    #[cfg(test)]
    pub fn messages(&self, field: &str) -> &[String] {
        match self.0.get(field) {
            Some(FieldError::Messages(messages)) => messages,
            _ => &[],
        }
    }

    pub fn into_result(self) -> ServiceResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "{}", fields.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("Invalid page: {0}")]
    InvalidPage(String),
    #[error("Invalid fields: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }
}

impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(db_err) => Self::Database(db_err),
            TransactionError::Transaction(service_err) => service_err,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// A unique index rejected the write, e.g. a row inserted since validation ran.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// A referenced row is gone, e.g. deleted since validation ran.
pub fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}
