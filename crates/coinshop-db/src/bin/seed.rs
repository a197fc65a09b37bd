//! # Demo Ledger Seeder
//!
//! Opens demo accounts and runs a little traffic through the engine so a
//! fresh database has something to look at.
//!
//! ## Usage
//! ```bash
//! # 5 users in ./coinshop_dev.db (default)
//! cargo run -p coinshop-db --bin seed
//!
//! # Custom user count and database path
//! cargo run -p coinshop-db --bin seed -- --users 20 --db ./data/coinshop.db
//! ```
//!
//! ## What It Does
//! - Opens `user-1` .. `user-N` with the starting balance
//! - Each user sends 10 coins to the next (the last one wraps to `user-1`)
//! - Each user buys one catalog item, cycling through the price list
//! - Logs every account summary

use std::env;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coinshop_db::{LedgerConfig, LedgerEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut users: usize = 5;
    let mut config = LedgerConfig::from_env()?;
    if env::var("COINSHOP_DATABASE_PATH").is_err() {
        config.database_path = "./coinshop_dev.db".into();
    }

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--users" | "-u" => {
                if i + 1 < args.len() {
                    users = args[i + 1].parse().unwrap_or(5);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Coin Shop Demo Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --users <N>    Number of demo accounts (default: 5)");
                println!("  -d, --db <PATH>    Database file path (default: ./coinshop_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    if users == 0 {
        return Err("--users must be at least 1".into());
    }

    info!(path = %config.database_path.display(), users, "Seeding ledger");

    let engine = LedgerEngine::connect(config).await?;
    let catalog = engine.database().catalog().list().await?;

    let names: Vec<String> = (1..=users).map(|n| format!("user-{n}")).collect();
    for name in &names {
        engine.open_account(name).await?;
    }

    for (idx, from) in names.iter().enumerate() {
        let to = &names[(idx + 1) % names.len()];
        if let Err(e) = engine.transfer(from, to, 10, engine.default_deadline()).await {
            warn!(from = %from, to = %to, error = %e, "Transfer skipped");
        }
    }

    if !catalog.is_empty() {
        for (idx, name) in names.iter().enumerate() {
            let item = &catalog[idx % catalog.len()];
            if let Err(e) = engine
                .purchase(name, &item.name, engine.default_deadline())
                .await
            {
                warn!(username = %name, item = %item.name, error = %e, "Purchase skipped");
            }
        }
    }

    for name in &names {
        let summary = engine.account_summary(name).await?;
        info!(
            username = %name,
            summary = %serde_json::to_string(&summary)?,
            "Account"
        );
    }

    let total = engine.database().accounts().total_balance().await?;
    info!(total_coins = total, "Seed complete");

    engine.database().close().await;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,coinshop_db=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();
}
