//! # Seed Data Generator
//!
//! Populates the database with a demo farm account for development.
//!
//! ## Usage
//! ```bash
//! # Seed account "demo-farm" into ./harvest_dev.db
//! cargo run -p harvest-db --bin seed
//!
//! # Custom account and database path
//! cargo run -p harvest-db --bin seed -- --account hillside --db ./data/harvest.db
//! ```
//!
//! ## Generated Data
//! - Business settings (prefix `FARM`, 8.25% tax)
//! - Two identities sharing the account (`<account>-owner`, `<account>-staff`)
//! - A produce catalog with cost and selling prices
//! - A handful of customers
//! - A multi-product order with its invoice, and a single-line order

use std::env;

use harvest_core::{OrderLine, Product, SaleStatus};
use harvest_db::ledger::NewOrder;
use harvest_db::repository::product::NewProduct;
use harvest_db::repository::settings::SettingsUpdate;
use harvest_db::{Database, DbConfig};

/// (SKU, name, cost cents, selling price cents, stock)
const CATALOG: &[(&str, &str, i64, i64, i64)] = &[
    ("CORN-01", "Sweet Corn (dozen)", 600, 1000, 120),
    ("TOM-HEIR", "Heirloom Tomatoes (kg)", 350, 700, 80),
    ("EGG-12", "Free Range Eggs (dozen)", 280, 550, 60),
    ("HONEY-500", "Wildflower Honey 500g", 420, 950, 40),
    ("APL-GALA", "Gala Apples (kg)", 150, 320, 200),
    ("POT-RUS", "Russet Potatoes (5kg)", 300, 650, 90),
    ("CHV-JAM", "Cherry Jam 250g", 210, 480, 35),
    ("BASIL-B", "Basil Bunch", 60, 200, 8),
];

/// (name, email)
const CUSTOMERS: &[(&str, &str)] = &[
    ("Greenway Grocers", "orders@greenway.example"),
    ("Hilltop Bakery", "kitchen@hilltop.example"),
    ("Riverside Market Stall", "stall@riverside.example"),
    ("Maple Street Co-op", "buying@maplecoop.example"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut account = String::from("demo-farm");
    let mut db_path = String::from("./harvest_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--account" | "-a" => {
                if i + 1 < args.len() {
                    account = args[i + 1].clone();
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
                println!("Harvest Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -a, --account <ID>  Account to seed (default: demo-farm)");
                println!("  -d, --db <PATH>     Database file path (default: ./harvest_dev.db)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Harvest Ledger Seed Data Generator");
    println!("====================================");
    println!("Database: {}", db_path);
    println!("Account:  {}", account);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().list(&account).await?;
    if !existing.is_empty() {
        println!("⚠ Account already has {} products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Identities
    let owner_identity = format!("{account}-owner");
    let staff_identity = format!("{account}-staff");
    db.accounts().add_member(&owner_identity, &account).await?;
    db.accounts().add_member(&staff_identity, &account).await?;
    let owner = db.accounts().resolve(&owner_identity).await?;
    println!("✓ Identities {} and {} share the account", owner_identity, staff_identity);

    // Settings: provision defaults, then set farm preferences
    db.numbering().peek_next_number(&account).await?;
    db.settings()
        .update(
            &account,
            &SettingsUpdate {
                invoice_prefix: "FARM".into(),
                currency: "USD".into(),
                tax_rate_bps: 825,
                payment_terms: "Net 30".into(),
                bank_details: Some("Harvest Credit Union 000-1234".into()),
            },
        )
        .await?;
    println!("✓ Business settings configured");

    let mut products: Vec<Product> = Vec::with_capacity(CATALOG.len());
    for (sku, name, cost, price, stock) in CATALOG {
        let new = NewProduct {
            sku: format!("{}-{}", sku, account.to_uppercase()),
            name: name.to_string(),
            cost_price_cents: *cost,
            selling_price_cents: *price,
            stock: *stock,
        };
        match db.products().create(&account, &new).await {
            Ok(product) => products.push(product),
            Err(e) => eprintln!("Failed to insert {}: {}", new.sku, e),
        }
    }
    println!("✓ Created {} products", products.len());

    let mut customers = Vec::with_capacity(CUSTOMERS.len());
    for (name, email) in CUSTOMERS {
        match db.customers().create(&account, name, Some(email), None).await {
            Ok(customer) => customers.push(customer),
            Err(e) => eprintln!("Failed to insert customer {}: {}", name, e),
        }
    }
    println!("✓ Created {} customers", customers.len());

    if products.len() < 3 || customers.len() < 2 {
        println!("⚠ Not enough catalog data for demo orders; stopping here.");
        return Ok(());
    }

    let line = |product: &Product, quantity: i64| OrderLine {
        product_id: product.id.clone(),
        quantity,
        unit_price_cents: product.selling_price_cents,
        discount_cents: 0,
    };

    let wholesale = db
        .orders()
        .create_order(
            &owner,
            NewOrder {
                customer_id: customers[0].id.clone(),
                status: SaleStatus::PendingShipment,
                sale_date: None,
                platform_source: Some("wholesale".into()),
                notes: Some("Weekly standing order".into()),
                lines: vec![line(&products[0], 12), line(&products[1], 10), line(&products[2], 6)],
            },
        )
        .await?;
    let invoice = db
        .orders()
        .generate_invoice(&owner, &wholesale.sales[0].id)
        .await?;
    println!(
        "✓ Multi-product order ({} lines) invoiced as {} for {}",
        wholesale.sales.len(),
        invoice.invoice.invoice_number,
        invoice.invoice.total_cents
    );

    let stall = db
        .orders()
        .create_order(
            &owner,
            NewOrder {
                customer_id: customers[1].id.clone(),
                status: SaleStatus::Paid,
                sale_date: None,
                platform_source: Some("farmers market".into()),
                notes: None,
                lines: vec![line(&products[3], 4)],
            },
        )
        .await?;
    println!("✓ Single-line order {}", stall.sales[0].id);

    for warning in wholesale.stock_warnings.iter().chain(&stall.stock_warnings) {
        println!("  ⚠ {}", warning.message());
    }

    println!();
    println!("Next invoice number: {}", db.numbering().peek_next_number(&account).await?);
    println!("✓ Seed complete!");

    Ok(())
}
