//! # Price Preview
//!
//! Prints the price breakdown for renting a listing over a date range.
//!
//! ## Usage
//! ```bash
//! cargo run -p rental-engine --bin quote -- cam-a7iv 2024-03-01 2024-03-05
//! cargo run -p rental-engine --bin quote -- cam-a7iv 2024-03-01 2024-03-05 --insurance basic
//! cargo run -p rental-engine --bin quote -- cam-a7iv 2024-03-01 2024-03-05 --db ./data/rental.db
//! ```
//!
//! Reads the catalog only; nothing is reserved.

use chrono::NaiveDate;
use std::env;
use tracing::debug;

use rental_engine::{telemetry, BookingEngine, EngineConfig, QuoteRequest};

fn usage() {
    println!("Rental Engine Price Preview");
    println!();
    println!("Usage: quote <EQUIPMENT_ID> <START> <END> [OPTIONS]");
    println!();
    println!("Dates are YYYY-MM-DD; END is the return day.");
    println!();
    println!("Options:");
    println!("  -i, --insurance <ID>  Insurance package id (default: none)");
    println!("  -d, --db <PATH>       Database file path (default: $RENTAL_DATABASE_PATH or ./rental.db)");
    println!("  -h, --help            Show this help message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config = EngineConfig::from_env()?;
    let mut insurance_id: Option<String> = None;
    let mut positional = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-i" | "--insurance" => {
                if i + 1 < args.len() {
                    insurance_id = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "-d" | "--db" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "-h" | "--help" => {
                usage();
                return Ok(());
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let [equipment_id, start, end] = positional.as_slice() else {
        usage();
        return Err("expected <EQUIPMENT_ID> <START> <END>".into());
    };

    let start_date = NaiveDate::parse_from_str(start, "%Y-%m-%d")?;
    let end_date = NaiveDate::parse_from_str(end, "%Y-%m-%d")?;
    debug!(%equipment_id, %start_date, %end_date, "Quoting");

    let engine = BookingEngine::connect(config).await?;
    let result = engine
        .quote(QuoteRequest {
            equipment_id: equipment_id.clone(),
            start_date,
            end_date,
            insurance_id,
        })
        .await;

    let quote = match result {
        Ok(quote) => quote,
        Err(err) if err.is_business() => {
            eprintln!("✗ {}", err.user_message());
            eprintln!("  {}", err);
            engine.database().close().await;
            std::process::exit(2);
        }
        Err(err) => return Err(err.into()),
    };

    let b = &quote.breakdown;
    println!("{} from {} to {}", quote.equipment_id, quote.start_date, quote.end_date);
    println!("================================");
    println!("  Chargeable days   {:>14}", b.chargeable_days);
    println!("  Daily rate        {:>14}", b.daily_rate.to_string());
    println!("  Base price        {:>14}", b.base_price.to_string());
    println!("  Service fee       {:>14}", b.service_fee.to_string());
    println!(
        "  Insurance ({:<6}) {:>13}",
        quote.insurance_id.as_deref().unwrap_or("none"),
        b.insurance_fee.to_string()
    );
    println!("  --------------------------------");
    println!("  Total             {:>14}", b.total_price.to_string());

    engine.database().close().await;
    Ok(())
}
