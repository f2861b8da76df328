//! # Seed Data Generator
//!
//! Populates the database with a demo pharmacy catalog and accounts.
//!
//! ## Usage
//! ```bash
//! # Seed the whole demo catalog
//! cargo run -p apotheca-db --bin seed
//!
//! # Stop after 50 products
//! cargo run -p apotheca-db --bin seed -- --count 50
//!
//! # Specify database path
//! cargo run -p apotheca-db --bin seed -- --db ./data/apotheca.db
//! ```
//!
//! ## Generated Data
//! - One formula per generic (e.g. "Paracetamol 500mg")
//! - Every brand of that generic in every pack size, linked to the formula
//! - An `admin` and a `cashier` account (passwords `admin123` / `cashier123`)
//!
//! Stock levels cycle through 0..60 so a fresh register shows out-of-stock
//! and low-stock products straight away.

use std::env;

use apotheca_core::{Category, ProductDraft, Role};
use apotheca_db::{Database, DbConfig, DbError};
use tracing_subscriber::EnvFilter;

/// Generic formula, dosage form, brands, base price in cents.
const FORMULAS: &[(&str, Category, &[&str], i64)] = &[
    ("Paracetamol 500mg", Category::Tablet, &["Panadol", "Calpol", "Tylenol"], 500),
    ("Ibuprofen 400mg", Category::Tablet, &["Brufen", "Advil", "Nurofen"], 800),
    ("Amoxicillin 500mg", Category::Capsule, &["Amoxil", "Moxilin"], 1_500),
    ("Omeprazole 20mg", Category::Capsule, &["Losec", "Risek", "Omezol"], 1_200),
    ("Cetirizine 10mg", Category::Tablet, &["Zyrtec", "Rigix"], 650),
    ("Dextromethorphan 15mg/5ml", Category::Syrup, &["Robitussin", "Tixylix"], 1_800),
    ("Salbutamol 100mcg", Category::Inhaler, &["Ventolin", "Asmavent"], 10_000),
    ("Hydrocortisone 1%", Category::Cream, &["Dermacort", "Hydrocort"], 900),
    ("Chloramphenicol 0.5%", Category::Drops, &["Chloromycetin", "Optichlor"], 700),
    ("Insulin Glargine 100IU/ml", Category::Injection, &["Lantus", "Basaglar"], 45_000),
];

/// Pack-size variants and their price multiplier in percent.
const PACKS: &[(&str, i64)] = &[("10s", 100), ("20s", 190), ("30s", 270)];

/// Stand-alone items with no generic formula.
const DEVICES: &[(&str, i64)] = &[
    ("Digital Thermometer", 2_500),
    ("Blood Pressure Monitor", 60_000),
    ("Glucometer Strips 50s", 3_500),
    ("Surgical Mask Box 50s", 1_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = usize::MAX;
    let mut db_path = String::from("./apotheca_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(usize::MAX);
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
                println!("Apotheca POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Maximum number of products (default: all)");
                println!("  -d, --db <PATH>    Database file path (default: ./apotheca_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    // warn by default, RUST_LOG overrides
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("Apotheca POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    seed_users(&db).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping catalog seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating catalog...");

    let start = std::time::Instant::now();
    let mut generated = 0usize;
    let mut seed = 0usize;

    'formulas: for (generic, category, brands, base_price) in FORMULAS {
        let formula = db.formulas().create(generic, None).await?;

        for brand in brands.iter() {
            for (pack, multiplier) in PACKS {
                if generated >= count {
                    break 'formulas;
                }

                let sale_price_cents = base_price * multiplier / 100;
                let draft = ProductDraft {
                    name: format!("{brand} {generic} {pack}"),
                    barcode: Some(format!("896{:010}", seed)),
                    category: *category,
                    quantity: stock_for(seed),
                    purchase_price_cents: sale_price_cents * 70 / 100,
                    sale_price_cents,
                    description: None,
                    formula_id: Some(formula.id.clone()),
                };
                seed += 1;

                match db.products().insert(draft).await {
                    Ok(_) => generated += 1,
                    Err(e) => eprintln!("Failed to insert {brand} {pack}: {e}"),
                }
            }
        }
    }

    for (name, price) in DEVICES {
        if generated >= count {
            break;
        }
        let draft = ProductDraft {
            name: name.to_string(),
            barcode: Some(format!("896{:010}", seed)),
            category: Category::Device,
            quantity: stock_for(seed),
            purchase_price_cents: price * 70 / 100,
            sale_price_cents: *price,
            ..Default::default()
        };
        seed += 1;

        match db.products().insert(draft).await {
            Ok(_) => generated += 1,
            Err(e) => eprintln!("Failed to insert {name}: {e}"),
        }
    }

    let elapsed = start.elapsed();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    println!();
    println!("Verifying search...");
    let hits = db.products().search("panadol", 10).await?;
    println!("  Search 'panadol': {} results", hits.len());
    let low = db.products().low_stock(apotheca_core::DEFAULT_LOW_STOCK_THRESHOLD).await?;
    println!("  Low stock: {} products", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

async fn seed_users(db: &Database) -> Result<(), DbError> {
    if db
        .users()
        .ensure_bootstrap_admin("admin", "admin123")
        .await?
        .is_some()
    {
        println!("✓ Created admin account (admin / admin123)");
    }

    match db
        .users()
        .create("cashier", "Counter Cashier", "cashier123", Role::Cashier)
        .await
    {
        Ok(_) => println!("✓ Created cashier account (cashier / cashier123)"),
        Err(e) if e.is_unique_violation() => {}
        Err(e) => return Err(e),
    }

    Ok(())
}

/// 0, 3, 6, ... 57, then again.
fn stock_for(seed: usize) -> i64 {
    ((seed * 3) % 60) as i64
}
