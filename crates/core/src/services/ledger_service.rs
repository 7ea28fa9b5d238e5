use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::{
    CurrencyCode, EntryCategory, LedgerEntryStatus, LedgerEntryType, LedgerSource,
};
use lendora_primitives::models::wallet::Wallet;
use lendora_primitives::models::wallet_transaction::{NewWalletTransaction, WalletTransaction};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::repositories::journal_repository::JournalRepository;
use crate::repositories::wallet_repository::WalletRepository;

/// One balance movement request. `reference` is the idempotency key and is
/// unique across the whole journal.
#[derive(Debug, Clone)]
pub struct LedgerPosting<'a> {
    pub wallet_id: Uuid,
    pub amount: i64,
    pub source: LedgerSource,
    pub category: EntryCategory,
    pub reference: &'a str,
    pub source_reference: Option<&'a str>,
    pub description: Option<&'a str>,
    pub reverses_entry_id: Option<Uuid>,
    pub metadata: Value,
}

impl<'a> LedgerPosting<'a> {
    pub fn new(wallet_id: Uuid, amount: i64, category: EntryCategory, reference: &'a str) -> Self {
        Self {
            wallet_id,
            amount,
            source: LedgerSource::Internal,
            category,
            reference,
            source_reference: None,
            description: None,
            reverses_entry_id: None,
            metadata: json!({}),
        }
    }

    pub fn source(mut self, source: LedgerSource, source_reference: Option<&'a str>) -> Self {
        self.source = source;
        self.source_reference = source_reference;
        self
    }

    pub fn description(mut self, description: &'a str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn reverses(mut self, entry_id: Uuid) -> Self {
        self.reverses_entry_id = Some(entry_id);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Posted {
    pub entry: WalletTransaction,
    /// The reference had already been posted with identical parameters; nothing moved.
    pub replayed: bool,
}

/// Balance after applying `amount` to `wallet`, or the reason it cannot move.
///
/// Credits land on locked accounts so refunds and compensations always
/// succeed; debits do not. Inactive accounts accept neither.
pub fn next_balance(
    wallet: &Wallet,
    entry_type: LedgerEntryType,
    amount: i64,
) -> Result<i64, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount);
    }

    if !wallet.is_active {
        return Err(LedgerError::AccountInactive);
    }

    match entry_type {
        LedgerEntryType::Credit => wallet
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount),
        LedgerEntryType::Debit => {
            if wallet.is_locked {
                return Err(LedgerError::AccountLocked(
                    wallet
                        .lock_reason
                        .clone()
                        .unwrap_or_else(|| "locked".to_string()),
                ));
            }

            if wallet.balance < amount {
                return Err(LedgerError::InsufficientFunds {
                    balance: wallet.balance,
                    requested: amount,
                });
            }

            Ok(wallet.balance - amount)
        }
    }
}

/// A reference seen before is a replay only if it describes the same movement.
pub fn ensure_same_posting(
    existing: &WalletTransaction,
    wallet_id: Uuid,
    entry_type: LedgerEntryType,
    amount: i64,
) -> Result<(), LedgerError> {
    if existing.wallet_id == wallet_id
        && existing.entry_type == entry_type
        && existing.amount == amount
    {
        Ok(())
    } else {
        Err(LedgerError::DuplicateReference(existing.reference.clone()))
    }
}

pub struct LedgerService;

impl LedgerService {
    pub fn credit(conn: &mut PgConnection, posting: LedgerPosting<'_>) -> Result<Posted, ApiError> {
        Self::post(conn, LedgerEntryType::Credit, posting)
    }

    pub fn debit(conn: &mut PgConnection, posting: LedgerPosting<'_>) -> Result<Posted, ApiError> {
        Self::post(conn, LedgerEntryType::Debit, posting)
    }

    /// Lock, re-read, compute, append, write balance. Runs in its own
    /// transaction, which becomes a savepoint when the caller already has one.
    fn post(
        conn: &mut PgConnection,
        entry_type: LedgerEntryType,
        posting: LedgerPosting<'_>,
    ) -> Result<Posted, ApiError> {
        if posting.amount <= 0 {
            return Err(LedgerError::InvalidAmount.into());
        }

        conn.transaction::<Posted, ApiError, _>(|conn| {
            let wallet = WalletRepository::find_by_id_for_update(conn, posting.wallet_id)?;

            if let Some(existing) = JournalRepository::find_by_reference(conn, posting.reference)? {
                ensure_same_posting(&existing, wallet.id, entry_type, posting.amount)?;
                debug!(reference = posting.reference, "ledger.post: replayed");
                return Ok(Posted {
                    entry: existing,
                    replayed: true,
                });
            }

            let balance_after = next_balance(&wallet, entry_type, posting.amount).map_err(|e| {
                warn!(
                    wallet_id = %wallet.id,
                    reference = posting.reference,
                    error = %e,
                    "ledger.post: rejected"
                );
                e
            })?;

            let entry = JournalRepository::append(
                conn,
                NewWalletTransaction {
                    wallet_id: wallet.id,
                    reference: posting.reference,
                    entry_type,
                    amount: posting.amount,
                    balance_before: wallet.balance,
                    balance_after,
                    description: posting.description,
                    category: posting.category,
                    source: posting.source,
                    source_reference: posting.source_reference,
                    status: LedgerEntryStatus::Completed,
                    reverses_entry_id: posting.reverses_entry_id,
                    metadata: posting.metadata.clone(),
                },
            )
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    ApiError::from(LedgerError::DuplicateReference(posting.reference.to_string()))
                }
                other => ApiError::Database(other),
            })?;

            WalletRepository::set_balance(conn, wallet.id, balance_after)?;

            info!(
                wallet_id = %wallet.id,
                reference = posting.reference,
                entry_type = %entry_type,
                amount = posting.amount,
                balance_after,
                "ledger.post: completed"
            );

            Ok(Posted {
                entry,
                replayed: false,
            })
        })
    }

    /// The user's main wallet in `currency`, opened on first use.
    pub fn ensure_wallet(
        conn: &mut PgConnection,
        user_id: Uuid,
        currency: CurrencyCode,
    ) -> Result<Wallet, ApiError> {
        WalletRepository::create_if_not_exists(conn, user_id, currency)
    }

    pub fn lock(conn: &mut PgConnection, wallet_id: Uuid, reason: &str) -> Result<Wallet, ApiError> {
        conn.transaction(|conn| {
            WalletRepository::find_by_id_for_update(conn, wallet_id)?;
            WalletRepository::set_lock(conn, wallet_id, true, Some(reason))
        })
    }

    pub fn unlock(conn: &mut PgConnection, wallet_id: Uuid) -> Result<Wallet, ApiError> {
        conn.transaction(|conn| {
            WalletRepository::find_by_id_for_update(conn, wallet_id)?;
            WalletRepository::set_lock(conn, wallet_id, false, None)
        })
    }
}
