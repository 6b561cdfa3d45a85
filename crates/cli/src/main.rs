//! Recipe Box CLI - Inspect and edit the persisted cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! rb-cli list
//!
//! # Add a meal from a catalog lookup response
//! curl -s 'https://www.themealdb.com/api/json/v1/1/lookup.php?i=52772' | rb-cli add-json -
//!
//! # Add a meal by hand
//! rb-cli add --id 52772 --name "Teriyaki Chicken Casserole" --price 9.99
//!
//! # Change quantities
//! rb-cli inc 52772
//! rb-cli dec 52772
//! rb-cli set 52772 3
//!
//! # Remove, total, checkout
//! rb-cli remove 52772
//! rb-cli total
//! rb-cli checkout --policy clear
//! ```
//!
//! Configuration comes from `RECIPE_BOX_*` environment variables (or `.env`);
//! see `recipe_box_cart::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use recipe_box_cart::CheckoutPolicy;

mod commands;

#[derive(Parser)]
#[command(name = "rb-cli")]
#[command(author, version, about = "Recipe Box cart tools")]
struct Cli {
    /// Override the store directory (RECIPE_BOX_STORE_DIR)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart
    List {
        /// Print the stored line items as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item by hand
    Add {
        /// Catalog id
        #[arg(long)]
        id: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Image URL
        #[arg(long, default_value = "")]
        image: String,

        /// Unit price (defaults to RECIPE_BOX_DEFAULT_PRICE)
        #[arg(long)]
        price: Option<Decimal>,
    },
    /// Add a meal from catalog JSON (a lookup response or a single meal)
    AddJson {
        /// File to read, or `-` for stdin
        path: PathBuf,
    },
    /// Increase an item's quantity by one
    Inc { id: String },
    /// Decrease an item's quantity by one (never below 1)
    Dec { id: String },
    /// Set an item's quantity
    Set {
        id: String,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove an item
    Remove { id: String },
    /// Print the cart total
    Total,
    /// Remove every item
    Clear,
    /// Hand the cart off to checkout
    Checkout {
        /// Override RECIPE_BOX_CHECKOUT_POLICY (`keep` or `clear`)
        #[arg(long)]
        policy: Option<CheckoutPolicy>,
    },
}

fn main() {
    // Logs go to stderr so command output stays pipeable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recipe_box_cart=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("Command failed: {e}");
        #[allow(clippy::print_stderr)]
        {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let mut ctx = commands::Context::load(cli.store_dir)?;
    match cli.command {
        Commands::List { json } => commands::list(&ctx, json)?,
        Commands::Add {
            id,
            name,
            image,
            price,
        } => commands::add(&ctx, &id, &name, &image, price)?,
        Commands::AddJson { path } => commands::add_json(&ctx, &path)?,
        Commands::Inc { id } => commands::increment(&mut ctx, &id)?,
        Commands::Dec { id } => commands::decrement(&mut ctx, &id)?,
        Commands::Set { id, quantity } => commands::set_quantity(&mut ctx, &id, quantity)?,
        Commands::Remove { id } => commands::remove(&mut ctx, &id)?,
        Commands::Total => commands::total(&ctx),
        Commands::Clear => commands::clear(&ctx),
        Commands::Checkout { policy } => commands::checkout(&mut ctx, policy),
    }
    Ok(())
}
