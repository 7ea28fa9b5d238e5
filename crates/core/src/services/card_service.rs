use crate::app_state::AppState;
use crate::repositories::card_movement_repository::CardMovementRepository;
use crate::repositories::card_repository::VirtualCardRepository;
use crate::repositories::wallet_repository::WalletRepository;
use crate::services::audit_service::AuditService;
use crate::services::ledger_service::{LedgerPosting, LedgerService};
use chrono::Utc;
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, GatewayError, LedgerError};
use lendora_primitives::models::card_dto::{
    CardMovementResponse, IssueCardRequest, VirtualCardDto,
};
use lendora_primitives::models::card_movement::{CardMovement, NewCardMovement};
use lendora_primitives::models::entities::enum_types::{
    CardMovementKind, CardMovementStatus, CardStatus, EntryCategory,
};
use lendora_primitives::models::virtual_card::{NewVirtualCard, VirtualCard};
use lendora_primitives::models::wallet::Wallet;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

/// Direction of a card movement; the two legs swap accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    Fund,
    Withdraw,
}

impl Leg {
    fn category(self) -> EntryCategory {
        match self {
            Leg::Fund => EntryCategory::CardFunding,
            Leg::Withdraw => EntryCategory::CardWithdrawal,
        }
    }

    fn completion_suffix(self) -> &'static str {
        match self {
            Leg::Fund => "card",
            Leg::Withdraw => "wallet",
        }
    }

    fn kind(self) -> CardMovementKind {
        match self {
            Leg::Fund => CardMovementKind::Fund,
            Leg::Withdraw => CardMovementKind::Withdraw,
        }
    }
}

impl From<CardMovementKind> for Leg {
    fn from(kind: CardMovementKind) -> Self {
        match kind {
            CardMovementKind::Fund => Leg::Fund,
            CardMovementKind::Withdraw => Leg::Withdraw,
        }
    }
}

enum Claim {
    Run(CardMovement),
    Settled(CardMovement),
}

enum Settlement {
    Completed(CardMovement),
    Reversed(CardMovement),
    Superseded(CardMovement),
}

pub fn reversal_reference(reference: &str) -> String {
    format!("{}:reversal", reference)
}

/// Attempt `n` of a retry family: the base itself first, then `base#n`.
pub fn attempt_reference(base: &str, attempt: i32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}#{}", base, attempt)
    }
}

pub fn terminate_reference(card_id: Uuid) -> String {
    format!("card-terminate:{}", card_id)
}

/// A processing claim younger than this belongs to a live caller: two issuer
/// timeouts plus slack for the surrounding transactions.
fn claim_ttl(gateway_timeout_secs: u64) -> chrono::Duration {
    let secs = gateway_timeout_secs.saturating_mul(2).saturating_add(5);
    chrono::Duration::from_std(Duration::from_secs(secs)).unwrap_or_else(|_| chrono::Duration::hours(1))
}

fn already_reversed(reference: &str) -> ApiError {
    LedgerError::CardProvisioningFailed(format!("{} was already reversed", reference)).into()
}

fn still_in_progress(reference: &str) -> ApiError {
    LedgerError::InvalidState(format!("Card movement {} is still in progress", reference)).into()
}

pub struct CardService;

impl CardService {
    pub async fn issue_card(
        state: &AppState,
        user_id: Uuid,
        req: IssueCardRequest,
    ) -> Result<VirtualCardDto, ApiError> {
        req.validate()?;
        let currency = req.currency.unwrap_or(state.config.default_currency);

        let issued = Self::bounded(state, state.card_issuer.create_card(&currency.to_string(), &req.name_on_card))
            .await
            .map_err(|e| LedgerError::CardProvisioningFailed(e.to_string()))?;

        let mut conn = state.db.get()?;
        let card = conn.transaction::<_, ApiError, _>(|conn| {
            LedgerService::ensure_wallet(conn, user_id, currency)?;

            let card = VirtualCardRepository::create(
                conn,
                NewVirtualCard {
                    user_id,
                    external_card_id: &issued.external_card_id,
                    masked_pan: issued.masked_pan.as_deref(),
                    currency,
                    status: CardStatus::Active,
                },
            )?;
            WalletRepository::create_card_account(conn, user_id, card.id, currency)?;
            Ok(card)
        })?;

        info!(card_id = %card.id, %user_id, "cards.issue: card issued");
        Ok(VirtualCardDto::new(card, 0))
    }

    pub async fn list_cards(state: &AppState, user_id: Uuid) -> Result<Vec<VirtualCardDto>, ApiError> {
        let mut conn = state.db.get()?;

        VirtualCardRepository::list_for_user(&mut conn, user_id)?
            .into_iter()
            .map(|card| -> Result<VirtualCardDto, ApiError> {
                let balance = WalletRepository::find_card_account(&mut conn, card.id)?.balance;
                Ok(VirtualCardDto::new(card, balance))
            })
            .collect()
    }

    /// Wallet -> card. Debit the wallet, call the issuer with no lock held,
    /// then either credit the card account or reverse the debit.
    pub async fn fund(
        state: &AppState,
        user_id: Uuid,
        card_id: Uuid,
        amount: i64,
        reference: &str,
    ) -> Result<CardMovementResponse, ApiError> {
        let (card, wallet, card_account) = Self::load(state, user_id, card_id)?;

        if card.status != CardStatus::Active {
            return Err(LedgerError::InvalidState(format!("Card is {}", card.status)).into());
        }

        Self::move_funds(state, Leg::Fund, &card, &wallet, &card_account, amount, reference, 1).await
    }

    /// Card -> wallet, the mirror image of [`fund`](Self::fund).
    pub async fn withdraw(
        state: &AppState,
        user_id: Uuid,
        card_id: Uuid,
        amount: i64,
        reference: &str,
    ) -> Result<CardMovementResponse, ApiError> {
        let (card, wallet, card_account) = Self::load(state, user_id, card_id)?;

        if card.status == CardStatus::Terminated {
            return Err(LedgerError::InvalidState("Card is terminated".into()).into());
        }

        Self::move_funds(state, Leg::Withdraw, &card, &wallet, &card_account, amount, reference, 1).await
    }

    pub async fn block(state: &AppState, user_id: Uuid, card_id: Uuid) -> Result<VirtualCardDto, ApiError> {
        Self::set_blocked(state, user_id, card_id, true).await
    }

    pub async fn unblock(state: &AppState, user_id: Uuid, card_id: Uuid) -> Result<VirtualCardDto, ApiError> {
        Self::set_blocked(state, user_id, card_id, false).await
    }

    /// Moves `amount` from the wallet onto the card under the retry family
    /// `base`: a completed attempt is reported, a processing one is resumed,
    /// and a reversed one is followed by `base#2`, `base#3`...
    pub async fn fund_attempt(
        state: &AppState,
        user_id: Uuid,
        card_id: Uuid,
        amount: i64,
        base: &str,
    ) -> Result<CardMovementResponse, ApiError> {
        let (card, wallet, card_account) = Self::load(state, user_id, card_id)?;

        if card.status != CardStatus::Active {
            return Err(LedgerError::InvalidState(format!("Card is {}", card.status)).into());
        }

        let latest = {
            let mut conn = state.db.get()?;
            CardMovementRepository::latest_attempt(&mut conn, card.id, base)?
        };

        match latest {
            Some(m) if m.status == CardMovementStatus::Completed => {
                Self::movement(state, &card, &wallet, &card_account, &m, true)
            }
            Some(m) if m.status == CardMovementStatus::Processing => {
                Self::move_funds(state, Leg::Fund, &card, &wallet, &card_account, m.amount, base, m.attempt).await
            }
            latest => {
                let attempt = latest.map_or(1, |m| m.attempt + 1);
                Self::move_funds(state, Leg::Fund, &card, &wallet, &card_account, amount, base, attempt).await
            }
        }
    }

    /// Withdraws whatever is left on the card, then terminates it at the issuer.
    /// A sweep that was reversed earlier is retried under a fresh attempt.
    pub async fn terminate(state: &AppState, user_id: Uuid, card_id: Uuid) -> Result<VirtualCardDto, ApiError> {
        let (card, wallet, card_account) = Self::load(state, user_id, card_id)?;

        if card.status == CardStatus::Terminated {
            return Ok(VirtualCardDto::new(card, card_account.balance));
        }

        let base = terminate_reference(card.id);
        let latest = {
            let mut conn = state.db.get()?;
            CardMovementRepository::latest_attempt(&mut conn, card.id, &base)?
        };

        match latest {
            Some(m) if m.status == CardMovementStatus::Processing => {
                Self::move_funds(state, Leg::Withdraw, &card, &wallet, &card_account, m.amount, &base, m.attempt)
                    .await?;
            }
            latest if card_account.balance > 0 => {
                let attempt = latest.map_or(1, |m| m.attempt + 1);
                Self::move_funds(
                    state,
                    Leg::Withdraw,
                    &card,
                    &wallet,
                    &card_account,
                    card_account.balance,
                    &base,
                    attempt,
                )
                .await?;
            }
            _ => {}
        }

        Self::bounded(state, state.card_issuer.terminate_card(&card.external_card_id))
            .await
            .map_err(|e| LedgerError::CardProvisioningFailed(e.to_string()))?;

        let mut conn = state.db.get()?;
        let card = conn.transaction::<_, ApiError, _>(|conn| {
            let card = VirtualCardRepository::set_status(conn, card_id, CardStatus::Terminated)?;
            WalletRepository::set_active(conn, card_account.id, false)?;
            AuditService::record(
                conn,
                Some(user_id),
                "card.terminated",
                "virtual_card",
                &card_id.to_string(),
                json!({}),
            )?;
            Ok(card)
        })?;

        info!(%card_id, "cards.terminate: card terminated");
        Ok(VirtualCardDto::new(card, 0))
    }

    /// Settles movements whose claim outlived the issuer timeout, e.g. after
    /// a crash between the debit and the issuer's answer. Returns how many
    /// reached a terminal state.
    pub async fn resume_abandoned(state: &AppState, limit: i64) -> Result<usize, ApiError> {
        let cutoff = Utc::now() - claim_ttl(state.config.gateway_timeout_secs);
        let abandoned = {
            let mut conn = state.db.get()?;
            CardMovementRepository::find_abandoned(&mut conn, cutoff, limit)?
        };

        let mut settled = 0;
        for m in abandoned {
            let (card, wallet, card_account) = {
                let mut conn = state.db.get()?;
                let card = VirtualCardRepository::find_by_id(&mut conn, m.virtual_card_id)?;
                let wallet = LedgerService::ensure_wallet(&mut conn, card.user_id, card.currency)?;
                let card_account = WalletRepository::find_card_account(&mut conn, card.id)?;
                (card, wallet, card_account)
            };
            let leg = Leg::from(m.kind);

            match Self::move_funds(state, leg, &card, &wallet, &card_account, m.amount, &m.base_reference, m.attempt)
                .await
            {
                Ok(_) => settled += 1,
                Err(ApiError::Ledger(LedgerError::CardProvisioningFailed(_))) => settled += 1,
                Err(e) => warn!(reference = %m.reference, error = %e, "cards: abandoned movement still unsettled"),
            }
        }

        Ok(settled)
    }

    async fn set_blocked(
        state: &AppState,
        user_id: Uuid,
        card_id: Uuid,
        blocked: bool,
    ) -> Result<VirtualCardDto, ApiError> {
        let (card, _, card_account) = Self::load(state, user_id, card_id)?;

        let target = if blocked { CardStatus::Blocked } else { CardStatus::Active };
        if card.status == CardStatus::Terminated {
            return Err(LedgerError::InvalidState("Card is terminated".into()).into());
        }
        if card.status == target {
            return Ok(VirtualCardDto::new(card, card_account.balance));
        }

        Self::bounded(state, state.card_issuer.set_blocked(&card.external_card_id, blocked))
            .await
            .map_err(|e| LedgerError::CardProvisioningFailed(e.to_string()))?;

        let mut conn = state.db.get()?;
        let card = VirtualCardRepository::set_status(&mut conn, card_id, target)?;
        Ok(VirtualCardDto::new(card, card_account.balance))
    }

    fn load(state: &AppState, user_id: Uuid, card_id: Uuid) -> Result<(VirtualCard, Wallet, Wallet), ApiError> {
        let mut conn = state.db.get()?;
        let card = VirtualCardRepository::find_for_user(&mut conn, card_id, user_id)?;
        let wallet = LedgerService::ensure_wallet(&mut conn, user_id, card.currency)?;
        let card_account = WalletRepository::find_card_account(&mut conn, card.id)?;
        Ok((card, wallet, card_account))
    }

    async fn bounded<T, F>(state: &AppState, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        let limit = Duration::from_secs(state.config.gateway_timeout_secs);
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(GatewayError::Unavailable("card issuer timed out".into())))
    }

    /// Claim, call, settle. The claim debits `from` and records a processing
    /// movement under the card lock; the issuer is called with no lock held;
    /// the settlement posts the completion or the reversal, never both, and
    /// only if the claim is still the current one.
    #[allow(clippy::too_many_arguments)]
    async fn move_funds(
        state: &AppState,
        leg: Leg,
        card: &VirtualCard,
        wallet: &Wallet,
        card_account: &Wallet,
        amount: i64,
        base: &str,
        attempt: i32,
    ) -> Result<CardMovementResponse, ApiError> {
        let (from, to) = match leg {
            Leg::Fund => (wallet, card_account),
            Leg::Withdraw => (card_account, wallet),
        };
        let reference = attempt_reference(base, attempt);
        let completion_reference = format!("{}:{}", reference, leg.completion_suffix());
        let reversal_ref = reversal_reference(&reference);
        let ttl = claim_ttl(state.config.gateway_timeout_secs);

        // Step 1: claim.
        let claim = {
            let mut conn = state.db.get()?;
            conn.transaction::<_, ApiError, _>(|conn| {
                VirtualCardRepository::lock(conn, card.id)?;

                let Some(existing) = CardMovementRepository::find_by_reference_for_update(conn, &reference)? else {
                    let debit = LedgerService::debit(
                        conn,
                        LedgerPosting::new(from.id, amount, leg.category(), &reference)
                            .metadata(json!({ "card_id": card.id })),
                    )?;
                    // the journal already holds this reference for something else
                    if debit.replayed {
                        return Err(LedgerError::DuplicateReference(reference.clone()).into());
                    }
                    let movement = CardMovementRepository::create(
                        conn,
                        NewCardMovement {
                            virtual_card_id: card.id,
                            reference: &reference,
                            base_reference: base,
                            attempt,
                            kind: leg.kind(),
                            amount,
                            debit_entry_id: debit.entry.id,
                        },
                    )?;
                    return Ok(Claim::Run(movement));
                };

                if existing.virtual_card_id != card.id || existing.kind != leg.kind() || existing.amount != amount {
                    return Err(LedgerError::DuplicateReference(reference.clone()).into());
                }

                let now = Utc::now();
                match existing.status {
                    CardMovementStatus::Completed => Ok(Claim::Settled(existing)),
                    CardMovementStatus::Reversed => Err(already_reversed(&reference)),
                    CardMovementStatus::Processing if now - existing.claimed_at < ttl => {
                        Err(still_in_progress(&reference))
                    }
                    CardMovementStatus::Processing => {
                        warn!(reference = %reference, claims = existing.claims, "cards: taking over an abandoned movement");
                        Ok(Claim::Run(CardMovementRepository::reclaim(conn, existing.id, now)?))
                    }
                }
            })?
        };

        let claimed = match claim {
            Claim::Settled(existing) => {
                return Self::movement(state, card, wallet, card_account, &existing, true);
            }
            Claim::Run(movement) => movement,
        };

        // Step 2: external call, no lock held. The reference doubles as the
        // issuer's idempotency key.
        let external = match leg {
            Leg::Fund => {
                Self::bounded(
                    state,
                    state.card_issuer.fund_card(
                        &card.external_card_id,
                        &card.currency.to_string(),
                        amount,
                        &reference,
                    ),
                )
                .await
            }
            Leg::Withdraw => {
                Self::bounded(
                    state,
                    state
                        .card_issuer
                        .withdraw_from_card(&card.external_card_id, amount, &reference),
                )
                .await
            }
        };

        // Step 3: settle exactly once.
        let settlement = {
            let mut conn = state.db.get()?;
            conn.transaction::<_, ApiError, _>(|conn| {
                VirtualCardRepository::lock(conn, card.id)?;

                let current = CardMovementRepository::find_by_reference_for_update(conn, &reference)?
                    .ok_or_else(|| LedgerError::NotFound(format!("Card movement {} not found", reference)))?;
                if current.status != CardMovementStatus::Processing || current.claims != claimed.claims {
                    return Ok(Settlement::Superseded(current));
                }

                match &external {
                    Ok(()) => {
                        LedgerService::credit(
                            conn,
                            LedgerPosting::new(to.id, amount, leg.category(), &completion_reference)
                                .metadata(json!({ "card_id": card.id, "debit_entry_id": current.debit_entry_id })),
                        )?;
                        if leg == Leg::Fund {
                            VirtualCardRepository::touch_last_funded(conn, card.id)?;
                        }
                        let settled =
                            CardMovementRepository::settle(conn, current.id, CardMovementStatus::Completed, None)?;
                        Ok(Settlement::Completed(settled))
                    }
                    Err(issuer_error) => {
                        let message = issuer_error.to_string();
                        LedgerService::credit(
                            conn,
                            LedgerPosting::new(from.id, amount, EntryCategory::Reversal, &reversal_ref)
                                .reverses(current.debit_entry_id)
                                .description("Card movement reversed")
                                .metadata(json!({ "card_id": card.id, "error": message })),
                        )?;
                        AuditService::record(
                            conn,
                            Some(card.user_id),
                            "card.movement_reversed",
                            "virtual_card",
                            &card.id.to_string(),
                            json!({
                                "reference": reference,
                                "amount": amount,
                                "leg": format!("{:?}", leg),
                                "error": message,
                            }),
                        )?;
                        let settled = CardMovementRepository::settle(
                            conn,
                            current.id,
                            CardMovementStatus::Reversed,
                            Some(&message),
                        )?;
                        Ok(Settlement::Reversed(settled))
                    }
                }
            })
            .map_err(|e| {
                error!(reference = %reference, issuer_ok = external.is_ok(), error = %e, "cards: settlement failed, movement stays processing");
                e
            })?
        };

        match settlement {
            Settlement::Completed(movement) => {
                info!(card_id = %card.id, reference = %reference, amount, ?leg, "cards: movement completed");
                Self::movement(state, card, wallet, card_account, &movement, false)
            }
            Settlement::Reversed(_) => {
                let issuer_error = external.err().map(|e| e.to_string()).unwrap_or_default();
                warn!(card_id = %card.id, reference = %reference, error = %issuer_error, "cards: issuer failed, debit reversed");
                Err(LedgerError::CardProvisioningFailed(issuer_error).into())
            }
            Settlement::Superseded(current) => {
                warn!(reference = %reference, status = %current.status, "cards: claim was taken over before settlement");
                match current.status {
                    CardMovementStatus::Completed => Self::movement(state, card, wallet, card_account, &current, true),
                    CardMovementStatus::Reversed => Err(already_reversed(&reference)),
                    CardMovementStatus::Processing => Err(still_in_progress(&reference)),
                }
            }
        }
    }

    fn movement(
        state: &AppState,
        card: &VirtualCard,
        wallet: &Wallet,
        card_account: &Wallet,
        movement: &CardMovement,
        replayed: bool,
    ) -> Result<CardMovementResponse, ApiError> {
        let mut conn = state.db.get()?;
        Ok(CardMovementResponse {
            card_id: card.id,
            reference: movement.reference.clone(),
            amount: movement.amount,
            card_balance: WalletRepository::find_by_id(&mut conn, card_account.id)?.balance,
            wallet_balance: WalletRepository::find_by_id(&mut conn, wallet.id)?.balance,
            replayed,
        })
    }
}
