//! # Seed Data Generator
//!
//! Populates an event database with demo users, the default categories and
//! a batch of consigned items for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./bazaar_dev.db with 3 sellers and 40 items (default)
//! cargo run -p bazaar-db --bin seed
//!
//! # Custom amounts
//! cargo run -p bazaar-db --bin seed -- --sellers 10 --items 500
//!
//! # Specify database path and the shared demo password
//! cargo run -p bazaar-db --bin seed -- --db ./data/bazaar.db --password secret
//! ```
//!
//! ## Generated Users
//! - `1`: admin
//! - `2..=N+1`: sellers
//! - the next two ids: cashiers
//!
//! Every demo account shares the same password.

use bazaar_core::{Id, MoneyInCents, NewItem, Role, Timestamp, DEFAULT_CATEGORIES};
use bazaar_db::{Database, DbConfig};
use std::env;

/// Item descriptions per default category id
const DESCRIPTIONS: &[(Id, &[&str])] = &[
    (1, &["Winter jacket", "Rain coat", "Fleece vest"]),
    (2, &["Jeans", "Summer dress", "Cardigan", "Hoodie"]),
    (3, &["Rubber boots", "Sneakers", "Sandals"]),
    (4, &["Board game", "Puzzle 500 pieces"]),
    (7, &["Picture book", "Comic album", "Novel"]),
    (11, &["Wooden train", "Plush bear", "Building blocks", "Doll house"]),
];

/// Prices in cents, cycled through per item
const PRICES: &[i64] = &[50, 150, 250, 400, 500, 750, 1000, 1500, 2500];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut sellers: usize = 3;
    let mut items: usize = 40;
    let mut password = String::from("bazaar");
    let mut db_path = String::from("./bazaar_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sellers" | "-s" => {
                if i + 1 < args.len() {
                    sellers = args[i + 1].parse().unwrap_or(3).max(1);
                    i += 1;
                }
            }
            "--items" | "-n" => {
                if i + 1 < args.len() {
                    items = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--password" | "-p" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bazaar Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sellers <N>      Number of seller accounts (default: 3)");
                println!("  -n, --items <N>        Number of items to consign (default: 40)");
                println!("  -p, --password <PW>    Password for every demo account (default: bazaar)");
                println!("  -d, --db <PATH>        Database file path (default: ./bazaar_dev.db)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Bazaar Seed Data Generator");
    println!("==========================");
    println!("Database: {}", db_path);
    println!("Sellers:  {}", sellers);
    println!("Items:    {}", items);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let inserted = db.categories().add_defaults().await?;
    println!("✓ Categories: {} inserted, {} total", inserted, DEFAULT_CATEGORIES.len());

    let existing = db.users().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} users", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Users
    let now = Timestamp::now();
    let users = db.users();
    users.add_with_id(1, Role::Admin, now, &password).await?;

    let seller_ids: Vec<Id> = (0..sellers as Id).map(|n| n + 2).collect();
    for &seller_id in &seller_ids {
        users.add_with_id(seller_id, Role::Seller, now, &password).await?;
    }

    let first_cashier = seller_ids.len() as Id + 2;
    for cashier_id in first_cashier..first_cashier + 2 {
        users.add_with_id(cashier_id, Role::Cashier, now, &password).await?;
    }
    println!(
        "✓ Users: admin 1, sellers 2..={}, cashiers {}..={}",
        first_cashier - 1,
        first_cashier,
        first_cashier + 1
    );

    // Items
    println!();
    println!("Consigning items...");
    let start = std::time::Instant::now();
    let mut generated = 0;

    for n in 0..items {
        let item = generate_item(n, seller_ids[n % seller_ids.len()], now);
        if let Err(e) = db.items().create(&item).await {
            eprintln!("Failed to add '{}': {}", item.description, e);
            continue;
        }
        generated += 1;
    }

    println!("✓ Added {} items in {:?}", generated, start.elapsed());
    println!();
    println!("✓ Seed complete! Log in with any id above and password '{}'.", password);

    Ok(())
}

/// Builds the `n`th demo item for `seller_id`.
fn generate_item(n: usize, seller_id: Id, now: Timestamp) -> NewItem {
    let (category_id, names) = DESCRIPTIONS[n % DESCRIPTIONS.len()];
    let name = names[(n / DESCRIPTIONS.len()) % names.len()];

    NewItem {
        added_at: now,
        description: format!("{} #{}", name, n + 1),
        price_in_cents: MoneyInCents::from_cents(PRICES[n % PRICES.len()]),
        category_id,
        seller_id,
        donation: n % 5 == 0,
        charity: n % 7 == 0,
    }
}
