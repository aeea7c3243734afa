//! One-shot setup: applies the schema, seeds the fundraising goal, and
//! optionally registers an initial admin from the environment.
//!
//! Usage:
//!   GOAL_AMOUNT=1000000 ADMIN_NAME="Padre José" ADMIN_PIN=1234 cargo run --bin migrate

use std::env;

use buildflow::auth::{self, RegisterOutcome};
use buildflow::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    println!("Connecting to database...");
    let pool = db::init_pool().await?;

    println!("Applying schema...");
    db::run_migrations(&pool).await?;

    let goal_amount = env::var("GOAL_AMOUNT")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(1_000_000.0);
    db::ensure_goal(&pool, goal_amount, chrono::Utc::now()).await?;
    println!("Fundraising goal set to Q{:.2}", goal_amount);

    if let (Ok(name), Ok(pin)) = (env::var("ADMIN_NAME"), env::var("ADMIN_PIN")) {
        match auth::register_admin(&pool, &name, &pin).await? {
            RegisterOutcome::Created(id) => println!("Admin \"{}\" created ({})", name, id),
            RegisterOutcome::InvalidPin => {
                anyhow::bail!("ADMIN_PIN must be 4 to 6 digits")
            }
            RegisterOutcome::PinInUse => {
                println!("Admin PIN already registered, skipping seed");
            }
        }
    }

    let total = db::recompute_goal_total(&pool, chrono::Utc::now()).await?;
    println!("Ledger reconciled: Q{:.2} raised so far", total);

    println!("Done.");
    Ok(())
}
