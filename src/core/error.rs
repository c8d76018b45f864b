use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Unregistered entity ({0})")]
    UnregisteredEntity(String),

    #[error("Unknown registry action '{0}'")]
    UnknownAction(String),

    #[error("Invalid entity state: {0}")]
    InvalidState(String),

    #[error("Action priorities exhausted: {0}")]
    PriorityExhausted(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::TypeMismatch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DbError::UnregisteredEntity("users#3".to_string());
        assert_eq!(err.to_string(), "Unregistered entity (users#3)");

        let err = DbError::UnknownAction("archive".to_string());
        assert_eq!(err.to_string(), "Unknown registry action 'archive'");
    }

    #[test]
    fn test_poison_error_maps_to_lock_error() {
        let lock = std::sync::Arc::new(std::sync::Mutex::new(0));
        let cloned = lock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock().unwrap();
            panic!("poison");
        })
        .join();

        let err: DbError = lock.lock().unwrap_err().into();
        assert!(matches!(err, DbError::LockError(_)));
    }
}
