//! Translation of database errors into store errors.

use domain::services::IdentifierKind;
use domain::StoreError;
use tracing::error;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Constraint names declared in the migrations.
pub(crate) const SERIAL_NUMBER_UNIQUE: &str = "equipment_serial_number_key";
pub(crate) const ASSET_TAG_UNIQUE: &str = "equipment_asset_tag_key";
pub(crate) const RFID_TAG_UNIQUE: &str = "equipment_rfid_tag_id_key";
pub(crate) const ONE_PENDING_PER_EQUIPMENT: &str = "idx_location_change_one_pending";

/// Name of the unique constraint `err` violated, if any.
pub(crate) fn violated_unique_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Maps a driver error to the store taxonomy. Unique violations on the
/// identifier columns become `Duplicate`; everything else is a backend error.
pub fn store_error(err: sqlx::Error) -> StoreError {
    if let Some(constraint) = violated_unique_constraint(&err) {
        if let Some(kind) = identifier_for_constraint(&constraint) {
            return StoreError::Duplicate(kind.as_str().to_string());
        }
    }
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
            return StoreError::Backend(format!("Referenced row missing: {}", db.message()));
        }
    }
    error!(error = %err, "Database operation failed");
    StoreError::Backend(err.to_string())
}

fn identifier_for_constraint(constraint: &str) -> Option<IdentifierKind> {
    match constraint {
        SERIAL_NUMBER_UNIQUE => Some(IdentifierKind::SerialNumber),
        ASSET_TAG_UNIQUE => Some(IdentifierKind::AssetTag),
        RFID_TAG_UNIQUE => Some(IdentifierKind::RfidTag),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_constraints() {
        assert_eq!(
            identifier_for_constraint(SERIAL_NUMBER_UNIQUE),
            Some(IdentifierKind::SerialNumber)
        );
        assert_eq!(
            identifier_for_constraint(RFID_TAG_UNIQUE),
            Some(IdentifierKind::RfidTag)
        );
        assert_eq!(identifier_for_constraint(ONE_PENDING_PER_EQUIPMENT), None);
    }

    #[test]
    fn test_non_database_error_is_backend() {
        assert!(matches!(
            store_error(sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
        assert_eq!(violated_unique_constraint(&sqlx::Error::PoolTimedOut), None);
    }
}
