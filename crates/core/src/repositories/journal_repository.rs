use diesel::dsl::sql;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use lendora_primitives::error::ApiError;
use lendora_primitives::models::entities::enum_types::LedgerEntryStatus;
use lendora_primitives::models::wallet_transaction::{NewWalletTransaction, WalletTransaction};
use lendora_primitives::schema::wallet_transactions;
use uuid::Uuid;

const SIGNED_SUM: &str =
    "COALESCE(SUM(CASE WHEN entry_type = 'credit' THEN amount ELSE -amount END), 0)::BIGINT";

/// Append-only access to `wallet_transactions`. Entries are never updated or deleted.
pub struct JournalRepository;

impl JournalRepository {
    pub fn append(
        conn: &mut PgConnection,
        entry: NewWalletTransaction<'_>,
    ) -> Result<WalletTransaction, diesel::result::Error> {
        diesel::insert_into(wallet_transactions::table)
            .values(&entry)
            .returning(WalletTransaction::as_returning())
            .get_result(conn)
    }

    pub fn find_by_reference(
        conn: &mut PgConnection,
        reference: &str,
    ) -> Result<Option<WalletTransaction>, ApiError> {
        wallet_transactions::table
            .filter(wallet_transactions::reference.eq(reference))
            .select(WalletTransaction::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)
    }

    /// Signed sum of every completed entry on the wallet.
    pub fn journal_balance(conn: &mut PgConnection, wallet_id: Uuid) -> Result<i64, ApiError> {
        wallet_transactions::table
            .filter(wallet_transactions::wallet_id.eq(wallet_id))
            .filter(wallet_transactions::status.eq(LedgerEntryStatus::Completed))
            .select(sql::<BigInt>(SIGNED_SUM))
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    /// Net signed movement of completed entries posted at or after `since`.
    pub fn sum_completed_since(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, ApiError> {
        wallet_transactions::table
            .filter(wallet_transactions::wallet_id.eq(wallet_id))
            .filter(wallet_transactions::status.eq(LedgerEntryStatus::Completed))
            .filter(wallet_transactions::created_at.ge(since))
            .select(sql::<BigInt>(SIGNED_SUM))
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn count_completed(conn: &mut PgConnection, wallet_id: Uuid) -> Result<i64, ApiError> {
        wallet_transactions::table
            .filter(wallet_transactions::wallet_id.eq(wallet_id))
            .filter(wallet_transactions::status.eq(LedgerEntryStatus::Completed))
            .count()
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn list_for_wallet(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WalletTransaction>, ApiError> {
        wallet_transactions::table
            .filter(wallet_transactions::wallet_id.eq(wallet_id))
            .order((
                wallet_transactions::created_at.desc(),
                wallet_transactions::id.desc(),
            ))
            .limit(limit)
            .select(WalletTransaction::as_select())
            .load(conn)
            .map_err(ApiError::Database)
    }

    /// The compensating entry pointing back at `entry_id`, if one was posted.
    pub fn reversal_of(
        conn: &mut PgConnection,
        entry_id: Uuid,
    ) -> Result<Option<WalletTransaction>, ApiError> {
        wallet_transactions::table
            .filter(wallet_transactions::reverses_entry_id.eq(entry_id))
            .select(WalletTransaction::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)
    }
}
