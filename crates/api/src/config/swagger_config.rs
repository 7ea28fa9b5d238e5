use crate::handlers::{
    admin::{
        __path_approve_loan, __path_approve_transfer_request, __path_audit_logs,
        __path_audit_wallet, __path_create_savings_plan, __path_disburse_loan,
        __path_lock_wallet, __path_reject_loan, __path_reject_transfer_request,
        __path_review_loan, __path_unlock_wallet,
    },
    cards::{
        __path_block_card, __path_fund_card, __path_issue_card, __path_list_cards,
        __path_terminate_card, __path_unblock_card, __path_withdraw_from_card,
    },
    health::__path_health_check,
    loans::{__path_apply_for_loan, __path_get_loan, __path_repay_loan},
    payments::{__path_initialize_payment, __path_retry_card_funding, __path_verify_payment},
    savings::{
        __path_deposit_savings, __path_list_savings, __path_list_savings_plans,
        __path_withdraw_savings,
    },
    transfer_requests::__path_submit_transfer_request,
    wallet::{
        __path_fund_wallet, __path_get_wallet, __path_verify_wallet_funding,
        __path_wallet_transactions,
    },
    webhooks::{__path_flutterwave_webhook, __path_paystack_webhook},
};
use lendora_primitives::error::ApiErrorResponse;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        initialize_payment, verify_payment, retry_card_funding,
        paystack_webhook, flutterwave_webhook,
        get_wallet, wallet_transactions, fund_wallet, verify_wallet_funding,
        issue_card, list_cards, fund_card, withdraw_from_card,
        block_card, unblock_card, terminate_card,
        list_savings_plans, list_savings, deposit_savings, withdraw_savings,
        apply_for_loan, get_loan, repay_loan,
        submit_transfer_request,
        lock_wallet, unlock_wallet, audit_wallet,
        review_loan, approve_loan, reject_loan, disburse_loan,
        create_savings_plan,
        approve_transfer_request, reject_transfer_request,
        audit_logs
    ),
    components(schemas(ApiErrorResponse)),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and dependency status"),
        (name = "Payments", description = "Gateway checkouts and reconciliation"),
        (name = "Webhooks", description = "Signed provider callbacks"),
        (name = "Wallet", description = "Ledger account and journal"),
        (name = "Cards", description = "Virtual cards backed by their own ledger accounts"),
        (name = "Savings", description = "Fixed-term savings plans"),
        (name = "Loans", description = "Loan applications and repayments"),
        (name = "Transfers", description = "Manual bank-transfer claims"),
        (name = "Admin", description = "Back-office operations; admin role required")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_family() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/api/health",
            "/api/payments/initialize",
            "/api/webhooks/paystack",
            "/api/wallet",
            "/api/cards/{id}/fund",
            "/api/savings/{id}/withdraw",
            "/api/loans/{id}/repay",
            "/api/admin/loans/{id}/disburse",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {expected}");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearerAuth"));
    }
}
