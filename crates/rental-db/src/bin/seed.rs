//! # Catalog Seed Data
//!
//! Populates the equipment and insurance tables for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p rental-db --bin seed
//!
//! # Specify database path
//! cargo run -p rental-db --bin seed -- --db ./data/rental.db
//! ```
//!
//! Seeding is an upsert, so running it twice leaves the same rows.

use rental_core::{Equipment, InsurancePackage, Money};
use rental_db::{Database, DbConfig};
use std::env;

/// (id, owner, name, daily rate, replacement price, unit serials)
const EQUIPMENT: &[(&str, &str, &str, i64, i64, &[&str])] = &[
    ("cam-a7iv", "owner-001", "Mirrorless Camera Body", 800_000, 45_000_000, &[]),
    ("lens-2470", "owner-001", "24-70mm f/2.8 Zoom Lens", 450_000, 28_000_000, &[]),
    ("drone-mini", "owner-002", "Compact Camera Drone", 600_000, 18_000_000, &["DM-0101", "DM-0102"]),
    ("tent-4p", "owner-003", "Four Person Camping Tent", 150_000, 3_500_000, &[]),
    ("kayak-solo", "owner-003", "Sit-on-top Kayak", 300_000, 12_000_000, &["KY-17", "KY-18", "KY-19"]),
    ("light-kit", "owner-004", "Three Point LED Light Kit", 350_000, 9_000_000, &[]),
];

/// (id, name, min coverage, max coverage)
const PACKAGES: &[(&str, &str, i64, i64)] = &[
    ("basic", "Basic Protection", 10_000_000, 30_000_000),
    ("standard", "Standard Protection", 20_000_000, 60_000_000),
    ("premium", "Premium Protection", 50_000_000, 150_000_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = env::var("RENTAL_DATABASE_PATH").unwrap_or_else(|_| "rental.db".to_string());

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-d" | "--db" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "-h" | "--help" => {
                println!("Rental Engine Seed Data");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./rental.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Rental Engine Seed Data");
    println!("=======================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let catalog = db.catalog();

    for (id, owner_id, name, daily_rate, replacement_price, serials) in EQUIPMENT {
        let equipment = Equipment {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            daily_rate: Money::from_units(*daily_rate),
            replacement_price: Money::from_units(*replacement_price),
            serials: serials.iter().map(|s| s.to_string()).collect(),
        };

        if let Err(e) = catalog.upsert_equipment(&equipment).await {
            eprintln!("Failed to upsert {}: {}", equipment.id, e);
            continue;
        }
        println!("  {:<12} {:<28} {:>10}/day", equipment.id, equipment.name, equipment.daily_rate);
    }

    for (id, name, min_coverage, max_coverage) in PACKAGES {
        let package = InsurancePackage {
            id: id.to_string(),
            name: name.to_string(),
            min_coverage: Money::from_units(*min_coverage),
            max_coverage: Money::from_units(*max_coverage),
        };

        if let Err(e) = catalog.upsert_package(&package).await {
            eprintln!("Failed to upsert {}: {}", package.id, e);
            continue;
        }
        println!(
            "  {:<12} {:<28} {} - {}",
            package.id, package.name, package.min_coverage, package.max_coverage
        );
    }

    println!();
    println!("✓ {} equipment listings", catalog.count_equipment().await?);
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
