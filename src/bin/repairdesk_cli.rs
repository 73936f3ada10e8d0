use std::{
    collections::HashMap,
    io::{self, BufRead, Write},
    str::FromStr,
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, QueryOrder};

use repairdesk_api::{
    common::format_money,
    config::{self, AppConfig},
    db, entities::product, migrator,
    pos::{Cart, CartPhase, ProductSnapshot},
    seed,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let database_url = cli.database_url.clone().unwrap_or_else(|| cfg.database_url.clone());

    match cli.command {
        Commands::Migrate => {
            migrator::run_migration(&database_url).await?;
            println!("Migrations applied to {}", database_url);
        }
        Commands::Seed => {
            let pool = connect(&cfg, &database_url).await?;
            let report = seed::seed_all(&pool).await?;
            println!(
                "Seeded {} technician(s) and {} product(s)",
                report.technicians, report.products
            );
        }
        Commands::Pos(args) => {
            let pool = connect(&cfg, &database_url).await?;
            run_pos(&pool, &cfg, args).await?;
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "repairdesk", about = "RepairDesk operator tools", version)]
struct Cli {
    #[arg(long, global = true, help = "Database URL; defaults to the configured one")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Insert the default technicians and catalog into empty tables
    Seed,
    /// Run an interactive cashier session over the live catalog
    Pos(PosArgs),
}

#[derive(Args)]
struct PosArgs {
    #[arg(long, help = "Receipt number prefix; defaults to the configured one")]
    receipt_prefix: Option<String>,
    #[arg(long, default_value_t = 40, help = "Receipt width in characters")]
    width: usize,
}

async fn connect(cfg: &AppConfig, database_url: &str) -> Result<db::DbPool> {
    let mut db_cfg = db::DbConfig::from(cfg);
    db_cfg.url = database_url.to_string();
    db_cfg.sqlx_logging = false;
    db::establish_connection_with_config(&db_cfg)
        .await
        .map_err(|e| anyhow!("failed to connect to {}: {}", database_url, e))
}

/// One line typed at the POS prompt
#[derive(Debug, Clone, PartialEq)]
enum PosCommand {
    List,
    Cart,
    Add { product_id: i32, quantity: u32 },
    Remove { product_id: i32 },
    Cash(Decimal),
    SetCash(Decimal),
    Checkout,
    Edit,
    Done,
    Reset,
    Help,
    Quit,
}

impl FromStr for PosCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Err("type `help` for commands".into());
        };
        let args: Vec<&str> = parts.collect();

        let id = |i: usize| -> Result<i32, String> {
            args.get(i)
                .ok_or_else(|| "missing product id".to_string())?
                .parse::<i32>()
                .map_err(|_| "product id must be a number".to_string())
        };
        let amount = || -> Result<Decimal, String> {
            args.first()
                .ok_or_else(|| "missing amount".to_string())
                .and_then(|a| Decimal::from_str(a).map_err(|_| "amount must be a number".into()))
        };

        match verb.to_ascii_lowercase().as_str() {
            "list" | "ls" => Ok(PosCommand::List),
            "cart" => Ok(PosCommand::Cart),
            "add" => {
                let quantity = match args.get(1) {
                    Some(q) => q
                        .parse::<u32>()
                        .map_err(|_| "quantity must be a whole number".to_string())?,
                    None => 1,
                };
                Ok(PosCommand::Add {
                    product_id: id(0)?,
                    quantity,
                })
            }
            "remove" | "rm" => Ok(PosCommand::Remove { product_id: id(0)? }),
            "cash" => Ok(PosCommand::Cash(amount()?)),
            "setcash" => Ok(PosCommand::SetCash(amount()?)),
            "checkout" | "pay" => Ok(PosCommand::Checkout),
            "edit" => Ok(PosCommand::Edit),
            "done" => Ok(PosCommand::Done),
            "reset" => Ok(PosCommand::Reset),
            "help" | "?" => Ok(PosCommand::Help),
            "quit" | "exit" | "q" => Ok(PosCommand::Quit),
            other => Err(format!("unknown command `{}`; type `help`", other)),
        }
    }
}

const HELP: &str = "\
commands:
  list                 show the catalog
  cart                 show the current order
  add <id> [qty]       add a product (default 1)
  remove <id>          take one of a product off the order
  cash <amount>        add cash on the counter
  setcash <amount>     set the cash tendered
  checkout             open the receipt
  edit                 close the receipt and keep editing
  done                 finish the sale and start the next one
  reset                clear the order (asks first)
  quit                 leave";

async fn run_pos(pool: &db::DbPool, cfg: &AppConfig, args: PosArgs) -> Result<()> {
    let catalog: HashMap<i32, product::Model> = product::Entity::find()
        .order_by_asc(product::Column::Id)
        .all(pool)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let prefix = args
        .receipt_prefix
        .unwrap_or_else(|| cfg.receipt_prefix.clone());
    let mut rng = rand::thread_rng();
    let mut cart = Cart::new(prefix, &mut rng);

    println!("POS session, receipt {}. Type `help` for commands.", cart.receipt_no());
    print_catalog(&catalog);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("pos> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<PosCommand>() {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match command {
            PosCommand::List => print_catalog(&catalog),
            PosCommand::Cart => print_cart(&cart),
            PosCommand::Add {
                product_id,
                quantity,
            } => match catalog.get(&product_id) {
                Some(model) => match cart.add_quantity(ProductSnapshot::from(model), quantity) {
                    Ok(()) => print_cart(&cart),
                    Err(e) => println!("{}", e),
                },
                None => println!("no product with id {}", product_id),
            },
            PosCommand::Remove { product_id } => match cart.remove(product_id) {
                Ok(true) => print_cart(&cart),
                Ok(false) => println!("product {} is not in the order", product_id),
                Err(e) => println!("{}", e),
            },
            PosCommand::Cash(amount) => match cart.add_cash(amount) {
                Ok(()) => print_cash(&cart),
                Err(e) => println!("{}", e),
            },
            PosCommand::SetCash(amount) => match cart.set_cash(amount) {
                Ok(()) => print_cash(&cart),
                Err(e) => println!("{}", e),
            },
            PosCommand::Checkout => match cart.checkout(Utc::now()) {
                Ok(receipt) => println!("{}", receipt.render_text(args.width)),
                Err(e) => println!("{}", e),
            },
            PosCommand::Edit => {
                cart.edit_order();
                print_cart(&cart);
            }
            PosCommand::Done => {
                if matches!(cart.phase(), CartPhase::Ordering) {
                    println!("check out first");
                    continue;
                }
                let next = cart.complete_transaction(&mut rng);
                println!("Sale complete. Next receipt {}", next);
            }
            PosCommand::Reset => {
                let cleared = cart.reset(|| confirm("Clear the whole order?"));
                println!("{}", if cleared { "order cleared" } else { "kept the order" });
            }
            PosCommand::Help => println!("{}", HELP),
            PosCommand::Quit => break,
        }
    }

    Ok(())
}

/// Blocking yes/no question on the terminal; anything but y/yes is no.
fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn print_catalog(catalog: &HashMap<i32, product::Model>) {
    let mut products: Vec<&product::Model> = catalog.values().collect();
    products.sort_by_key(|p| p.id);
    if products.is_empty() {
        println!("catalog is empty; run `repairdesk-cli seed`");
        return;
    }
    for p in products {
        println!(
            "{:>4}  {:<24} {:>10}  {:?}",
            p.id,
            p.name,
            format_money(p.price),
            p.category
        );
    }
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("order is empty");
        return;
    }
    for line in cart.lines() {
        println!(
            "{:>4}  {:<24} x{:<3} {:>10}",
            line.product().id,
            line.product().name,
            line.quantity(),
            format_money(line.line_total())
        );
    }
    println!("items {}  total {}", cart.item_count(), format_money(cart.total()));
}

fn print_cash(cart: &Cart) {
    println!(
        "cash {}  total {}  change {}",
        format_money(cart.cash_tendered()),
        format_money(cart.total()),
        format_money(cart.change())
    );
}
