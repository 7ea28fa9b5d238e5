use crate::repositories::audit_repository::AuditLogRepository;
use diesel::PgConnection;
use lendora_primitives::error::ApiError;
use lendora_primitives::models::entities::audit_log::NewAuditLog;
use uuid::Uuid;

pub struct AuditService;

impl AuditService {
    /// Writes on the caller's connection so the event commits or rolls back
    /// with the change it describes.
    pub fn record(
        conn: &mut PgConnection,
        user_id: Option<Uuid>,
        event_type: &str,
        target_type: &str,
        target_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), ApiError> {
        AuditLogRepository::create(
            conn,
            NewAuditLog {
                id: Uuid::new_v4(),
                user_id,
                event_type: event_type.to_string(),
                target_type: Some(target_type.to_string()),
                target_id: Some(target_id.to_string()),
                metadata,
                ip_address: None,
            },
        )
    }
}
