use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Not found")]
    NotFound,
    /// A unique constraint rejected the write; holds the offending field.
    #[error("Duplicate value for {0}")]
    DuplicateKey(String),
}

/// Maps a driver error, surfacing unique violations as [`RepositoryError::DuplicateKey`].
pub fn map_db_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let field = db
                .constraint()
                .map(field_from_constraint)
                .unwrap_or_else(|| "value".to_string());
            return RepositoryError::DuplicateKey(field);
        }
    }
    RepositoryError::DatabaseError(e.to_string())
}

/// `tours_name_key` -> `name`, `reviews_tour_user_key` -> `tour, user`.
fn field_from_constraint(constraint: &str) -> String {
    let trimmed = constraint
        .strip_suffix("_key")
        .unwrap_or(constraint);
    let mut parts = trimmed.split('_');
    parts.next();
    let fields: Vec<&str> = parts.collect();
    if fields.is_empty() {
        constraint.to_string()
    } else {
        fields.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_from_constraint() {
        assert_eq!(field_from_constraint("tours_name_key"), "name");
        assert_eq!(field_from_constraint("users_email_key"), "email");
        assert_eq!(field_from_constraint("reviews_tour_user_key"), "tour, user");
    }

    #[test]
    fn test_non_database_errors_are_opaque() {
        let err = map_db_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::DatabaseError(_)));
    }
}
