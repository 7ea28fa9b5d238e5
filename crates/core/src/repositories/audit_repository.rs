use diesel::prelude::*;
use lendora_primitives::error::ApiError;
use lendora_primitives::models::entities::audit_log::{AuditLog, NewAuditLog};
use lendora_primitives::schema::audit_logs;

pub struct AuditLogRepository;

impl AuditLogRepository {
    pub fn create(conn: &mut PgConnection, new_log: NewAuditLog) -> Result<(), ApiError> {
        diesel::insert_into(audit_logs::table)
            .values(&new_log)
            .execute(conn)
            .map_err(ApiError::Database)?;
        Ok(())
    }

    pub fn find_by_target(
        conn: &mut PgConnection,
        target_type: &str,
        target_id: &str,
    ) -> Result<Vec<AuditLog>, ApiError> {
        audit_logs::table
            .filter(audit_logs::target_type.eq(target_type))
            .filter(audit_logs::target_id.eq(target_id))
            .order(audit_logs::created_at.asc())
            .select(AuditLog::as_select())
            .load(conn)
            .map_err(ApiError::Database)
    }
}
