//! # Seed Data Generator
//!
//! Populates a database with a demo branch: menu, attribute options and
//! tables.
//!
//! ## Usage
//! ```bash
//! cargo run -p tavola-db --bin seed
//!
//! # Custom branch id and database path
//! cargo run -p tavola-db --bin seed -- --branch branch-kemang --db ./data/tavola.db
//! ```

use chrono::Utc;
use std::env;
use tavola_core::{Money, Product, ProductOption, Table, TableStatus};
use tavola_db::{Database, DbConfig};
use uuid::Uuid;

/// (name, price, stock, options as (attribute, option, modifier))
type MenuEntry = (&'static str, i64, i64, &'static [(&'static str, &'static str, i64)]);

const MENU: &[MenuEntry] = &[
    (
        "Latte",
        30_000,
        40,
        &[
            ("Size", "Regular", 0),
            ("Size", "Large", 5_000),
            ("Milk", "Dairy", 0),
            ("Milk", "Oat", 8_000),
        ],
    ),
    (
        "Americano",
        25_000,
        60,
        &[("Size", "Regular", 0), ("Size", "Large", 4_000)],
    ),
    (
        "Es Kopi Susu",
        22_000,
        80,
        &[("Sugar", "Normal", 0), ("Sugar", "Less", 0), ("Sugar", "None", 0)],
    ),
    ("Matcha Latte", 35_000, 25, &[("Size", "Regular", 0), ("Size", "Large", 5_000)]),
    ("Croissant", 18_000, 20, &[]),
    ("Nasi Goreng", 45_000, 30, &[("Spice", "Mild", 0), ("Spice", "Hot", 0), ("Egg", "Extra", 6_000)]),
    ("Mie Goreng", 40_000, 30, &[("Spice", "Mild", 0), ("Spice", "Hot", 0)]),
    ("Banana Bread", 28_000, 12, &[]),
];

/// (number, name, capacity)
const TABLES: &[(&str, Option<&str>, i64)] = &[
    ("A1", Some("Window"), 2),
    ("A2", Some("Window"), 2),
    ("B1", None, 4),
    ("B2", None, 4),
    ("C1", Some("Garden"), 6),
    ("VIP", Some("Private Room"), 10),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut branch_id = String::from("branch-demo");
    let mut db_path = String::from("./tavola_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--branch" | "-b" => {
                if i + 1 < args.len() {
                    branch_id = args[i + 1].clone();
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
                println!("Tavola POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -b, --branch <ID>  Branch id to seed (default: branch-demo)");
                println!("  -d, --db <PATH>    Database file path (default: ./tavola_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tavola POS Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!("Branch:   {}", branch_id);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().list(Some(&branch_id)).await?;
    if !existing.is_empty() {
        println!("⚠ Branch already has {} products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let now = Utc::now();
    let mut option_count = 0;
    for (name, price, stock, options) in MENU {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            branch_id: branch_id.clone(),
            name: name.to_string(),
            price: Money::from_units(*price),
            stock: *stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await?;

        for (attribute, option, modifier) in options.iter() {
            db.products()
                .insert_option(&ProductOption {
                    id: Uuid::new_v4().to_string(),
                    product_id: product.id.clone(),
                    attribute_name: attribute.to_string(),
                    option_name: option.to_string(),
                    price_modifier: Money::from_units(*modifier),
                })
                .await?;
            option_count += 1;
        }

        println!("  {:<14} {:>8}  stock {:>3}  id {}", name, product.price.to_string(), stock, product.id);
    }

    for (number, name, capacity) in TABLES {
        db.tables()
            .insert(&Table {
                id: Uuid::new_v4().to_string(),
                branch_id: branch_id.clone(),
                number: number.to_string(),
                name: name.map(str::to_string),
                capacity: *capacity,
                status: TableStatus::Available,
                current_order_id: None,
                reservation: None,
                updated_at: now,
            })
            .await?;
    }

    println!();
    println!(
        "✓ Seeded {} products, {} options, {} tables",
        MENU.len(),
        option_count,
        TABLES.len()
    );

    db.close().await;
    Ok(())
}
