use diesel::pg::PgConnection;
use diesel::prelude::*;
use dotenvy::dotenv;
use eyre::{eyre, Result, WrapErr};
use lendora_core::repositories::loan_repository::LoanRepository;
use lendora_core::repositories::savings_repository::SavingsRepository;
use lendora_core::repositories::user_repository::UserRepository;
use lendora_core::services::ledger_service::{LedgerPosting, LedgerService};
use lendora_primitives::models::entities::enum_types::{CurrencyCode, EntryCategory, LoanStatus};
use lendora_primitives::models::entities::loan::NewLoan;
use lendora_primitives::models::entities::savings::NewSavingsPlan;
use lendora_primitives::models::entities::user::NewUser;
use lendora_primitives::money::apply_bps;
use serde_json::json;
use std::env;
use uuid::Uuid;

// Fixed ids so developers can mint tokens for the seeded accounts.
const CUSTOMER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001);
const ADMIN_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0002);

struct PlanSeed {
    name: &'static str,
    interest_rate_bps: i32,
    duration_days: i32,
    early_withdrawal_penalty_bps: i32,
    min_amount: i64,
}

const PLANS: [PlanSeed; 3] = [
    PlanSeed {
        name: "Harvest 30",
        interest_rate_bps: 800,
        duration_days: 30,
        early_withdrawal_penalty_bps: 500,
        min_amount: 100_000,
    },
    PlanSeed {
        name: "Harvest 90",
        interest_rate_bps: 1000,
        duration_days: 90,
        early_withdrawal_penalty_bps: 750,
        min_amount: 500_000,
    },
    PlanSeed {
        name: "School Fees 365",
        interest_rate_bps: 1400,
        duration_days: 365,
        early_withdrawal_penalty_bps: 1000,
        min_amount: 1_000_000,
    },
];

fn establish_connection() -> Result<PgConnection> {
    let database_url = env::var("DATABASE_URL").map_err(|_| eyre!("DATABASE_URL must be set"))?;
    PgConnection::establish(&database_url).wrap_err("Error connecting to the database")
}

fn main() -> Result<()> {
    dotenv().ok();
    println!("Seeding database...");

    let mut conn = establish_connection()?;

    seed_user(&mut conn, CUSTOMER_ID, "amaka@lendora.test", "Amaka Eze", "customer")?;
    seed_user(&mut conn, ADMIN_ID, "ops@lendora.test", "Lendora Ops", "admin")?;

    // Opening balances go through the ledger so the journal explains them.
    seed_balance(&mut conn, CUSTOMER_ID, CurrencyCode::NGN, 5_000_000)?;
    seed_balance(&mut conn, CUSTOMER_ID, CurrencyCode::USD, 100_000)?;

    seed_plans(&mut conn)?;
    seed_loan_application(&mut conn, CUSTOMER_ID)?;

    println!("Database seeded.");
    println!("  customer: {}", CUSTOMER_ID);
    println!("  admin:    {}", ADMIN_ID);
    Ok(())
}

fn seed_user(conn: &mut PgConnection, id: Uuid, email: &str, name: &str, role: &str) -> Result<()> {
    UserRepository::upsert(
        conn,
        NewUser {
            id,
            email,
            full_name: Some(name),
            role,
        },
    )?;
    println!("User {} ({})", email, role);
    Ok(())
}

fn seed_balance(conn: &mut PgConnection, user_id: Uuid, currency: CurrencyCode, amount: i64) -> Result<()> {
    let wallet = LedgerService::ensure_wallet(conn, user_id, currency)?;
    let reference = format!("seed-opening:{}:{}", user_id, currency);

    let posted = LedgerService::credit(
        conn,
        LedgerPosting::new(wallet.id, amount, EntryCategory::ManualTransfer, &reference)
            .description("Opening balance")
            .metadata(json!({ "seeded": true })),
    )?;

    if posted.replayed {
        println!("{} wallet already funded", currency);
    } else {
        println!("{} wallet funded with {} minor units", currency, amount);
    }
    Ok(())
}

fn seed_plans(conn: &mut PgConnection) -> Result<()> {
    let existing = SavingsRepository::list_active_plans(conn)?;

    for plan in PLANS.iter() {
        if existing.iter().any(|p| p.name == plan.name) {
            println!("Plan {} already exists", plan.name);
            continue;
        }

        SavingsRepository::create_plan(
            conn,
            NewSavingsPlan {
                name: plan.name,
                interest_rate_bps: plan.interest_rate_bps,
                duration_days: plan.duration_days,
                early_withdrawal_penalty_bps: plan.early_withdrawal_penalty_bps,
                min_amount: plan.min_amount,
            },
        )?;
        println!("Created plan {}", plan.name);
    }
    Ok(())
}

/// A pending application, ready for an admin to walk through review.
fn seed_loan_application(conn: &mut PgConnection, borrower: Uuid) -> Result<()> {
    use lendora_primitives::schema::loans::dsl::*;

    let open: i64 = loans.filter(user_id.eq(borrower)).count().get_result(conn)?;
    if open > 0 {
        println!("Loan application already present");
        return Ok(());
    }

    let amount = 2_000_000;
    let loan = LoanRepository::create(
        conn,
        NewLoan {
            user_id: borrower,
            principal: amount,
            interest_rate_bps: 1500,
            tenure_months: 6,
            admin_fee: apply_bps(amount, 100)?,
            currency: CurrencyCode::NGN,
            status: LoanStatus::Pending,
        },
    )?;
    println!("Created loan application {}", loan.id);
    Ok(())
}
