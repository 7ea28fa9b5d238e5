use chrono::Utc;
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::CurrencyCode;
use lendora_primitives::models::wallet::{NewWallet, Wallet};
use lendora_primitives::schema::wallets;
use uuid::Uuid;

pub struct WalletRepository;

impl WalletRepository {
    pub fn find_by_id(conn: &mut PgConnection, wallet_id: Uuid) -> Result<Wallet, ApiError> {
        wallets::table
            .find(wallet_id)
            .select(Wallet::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Wallet not found".into()).into())
    }

    /// Exclusive row lock; concurrent postings on the same account serialize here.
    pub fn find_by_id_for_update(
        conn: &mut PgConnection,
        wallet_id: Uuid,
    ) -> Result<Wallet, ApiError> {
        wallets::table
            .find(wallet_id)
            .select(Wallet::as_select())
            .for_update()
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Wallet not found".into()).into())
    }

    pub fn find_user_wallet(
        conn: &mut PgConnection,
        user_id: Uuid,
        currency: CurrencyCode,
    ) -> Result<Option<Wallet>, ApiError> {
        wallets::table
            .filter(wallets::user_id.eq(user_id))
            .filter(wallets::currency.eq(currency))
            .filter(wallets::virtual_card_id.is_null())
            .select(Wallet::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)
    }

    pub fn find_card_account(
        conn: &mut PgConnection,
        card_id: Uuid,
    ) -> Result<Wallet, ApiError> {
        wallets::table
            .filter(wallets::virtual_card_id.eq(card_id))
            .select(Wallet::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Card account not found".into()).into())
    }

    /// Returns the user's wallet in `currency`, opening it on first use.
    pub fn create_if_not_exists(
        conn: &mut PgConnection,
        user_id: Uuid,
        currency: CurrencyCode,
    ) -> Result<Wallet, ApiError> {
        diesel::insert_into(wallets::table)
            .values(&NewWallet {
                user_id,
                virtual_card_id: None,
                currency,
            })
            .on_conflict_do_nothing()
            .execute(conn)
            .map_err(ApiError::Database)?;

        Self::find_user_wallet(conn, user_id, currency)?
            .ok_or_else(|| ApiError::Internal("Wallet could not be opened".into()))
    }

    pub fn create_card_account(
        conn: &mut PgConnection,
        user_id: Uuid,
        card_id: Uuid,
        currency: CurrencyCode,
    ) -> Result<Wallet, ApiError> {
        diesel::insert_into(wallets::table)
            .values(&NewWallet {
                user_id,
                virtual_card_id: Some(card_id),
                currency,
            })
            .returning(Wallet::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    /// Only the ledger service calls this, under the row lock, right after
    /// appending the journal entry that justifies the new balance.
    pub fn set_balance(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        balance: i64,
    ) -> Result<(), ApiError> {
        diesel::update(wallets::table.find(wallet_id))
            .set((
                wallets::balance.eq(balance),
                wallets::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;
        Ok(())
    }

    pub fn set_lock(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        locked: bool,
        reason: Option<&str>,
    ) -> Result<Wallet, ApiError> {
        diesel::update(wallets::table.find(wallet_id))
            .set((
                wallets::is_locked.eq(locked),
                wallets::lock_reason.eq(reason),
                wallets::updated_at.eq(Utc::now()),
            ))
            .returning(Wallet::as_returning())
            .get_result(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Wallet not found".into()).into())
    }

    pub fn set_active(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        active: bool,
    ) -> Result<(), ApiError> {
        diesel::update(wallets::table.find(wallet_id))
            .set((
                wallets::is_active.eq(active),
                wallets::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;
        Ok(())
    }
}
