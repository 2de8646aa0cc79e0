//! Audit log queries.
//!
//! The audit log is append-only: there is deliberately no update or delete
//! query in this module.

use hydra_core::db::{DatabaseError, unix_timestamp};

use super::db::ControlDatabase;
use super::models::AuditLogEntry;

impl ControlDatabase {
    /// Append an audit entry for a lifecycle action.
    pub async fn append_audit(
        &self,
        user_id: &str,
        action: &str,
        entity: &str,
        entity_id: &str,
        metadata: &str,
    ) -> Result<i64, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "INSERT INTO audit_log (user_id, action, entity, entity_id, metadata, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(action)
        .bind(entity)
        .bind(entity_id)
        .bind(metadata)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// List audit entries for a user, oldest first.
    pub async fn list_audit_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<AuditLogEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            "SELECT * FROM audit_log WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }

    /// Count audit entries for a user.
    pub async fn count_audit_for_user(&self, user_id: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_log WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;

        Ok(row.0)
    }
}
