use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::user::{NewUser, User};
use lendora_primitives::schema::users;
use uuid::Uuid;

pub struct UserRepository;

impl UserRepository {
    pub fn find_by_id(conn: &mut PgConnection, user_id: Uuid) -> Result<User, ApiError> {
        users::table
            .find(user_id)
            .select(User::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("User not found".into()).into())
    }

    /// Mirrors an identity-service user locally. Existing rows are left untouched.
    pub fn upsert(conn: &mut PgConnection, user: NewUser<'_>) -> Result<(), ApiError> {
        diesel::insert_into(users::table)
            .values(&user)
            .on_conflict(users::id)
            .do_nothing()
            .execute(conn)
            .map_err(ApiError::Database)?;
        Ok(())
    }
}
