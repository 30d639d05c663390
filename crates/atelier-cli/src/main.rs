// Atelier CLI - operator tool for the Atelier studio API

mod client;

use clap::{Parser, Subcommand};
use client::ApiClient;

/// Atelier - studio operations tool
#[derive(Parser)]
#[command(name = "atelier")]
#[command(version, about, long_about = None)]
struct Cli {
    /// API base URL (defaults to $ATELIER_API_URL, then http://127.0.0.1:8080)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server is up
    Health,
    /// Manage works
    Works {
        #[command(subcommand)]
        action: WorksAction,
    },
    /// Manage orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum WorksAction {
    /// List works (drafts included)
    List,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List recent orders
    List {
        /// Filter by status (pending, paid, cancelled, refunded)
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of orders to show
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },
    /// Confirm an order without the payment gateway (non-production)
    SimulatePay {
        /// The order number, e.g. ATL-20260807-9F2C11AB
        order_no: String,
    },
    /// Force a status onto a set of orders
    SetStatus {
        /// Target status (paid, cancelled, refunded)
        status: String,

        /// Order ids (can be specified multiple times)
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete orders by id
    Delete {
        /// Order ids (can be specified multiple times)
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    let api = ApiClient::from_env(cli.api_url);

    let result = match cli.command {
        Commands::Health => handle_health(&api),
        Commands::Works { action } => handle_works(&api, action),
        Commands::Orders { action } => handle_orders(&api, action),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn handle_health(api: &ApiClient) -> anyhow::Result<()> {
    use colored::Colorize;

    let health = api.get_public("/healthz")?;
    if health["ok"] == true {
        println!("{} server is up", "ok".green());
    } else {
        println!("{} server responded but is unhealthy", "warn".yellow());
    }
    Ok(())
}

fn handle_works(api: &ApiClient, action: WorksAction) -> anyhow::Result<()> {
    match action {
        WorksAction::List => {
            let works = api.get_admin("/api/v1/works")?;
            let works = works.as_array().cloned().unwrap_or_default();
            if works.is_empty() {
                println!("No works yet.");
                return Ok(());
            }
            for work in works {
                println!(
                    "{}  {:12} {:10} {:8} {}",
                    work["id"].as_str().unwrap_or("-"),
                    work["workType"].as_str().unwrap_or("-"),
                    work["status"].as_str().unwrap_or("-"),
                    work["price"].as_str().unwrap_or("-"),
                    work["title"].as_str().unwrap_or("-"),
                );
            }
            Ok(())
        }
    }
}

fn handle_orders(api: &ApiClient, action: OrdersAction) -> anyhow::Result<()> {
    use colored::Colorize;

    match action {
        OrdersAction::List { status, limit } => {
            let mut path = format!("/api/v1/orders?limit={}", limit);
            if let Some(status) = status {
                path.push_str(&format!("&status={}", status));
            }
            let orders = api.get_admin(&path)?;
            let orders = orders.as_array().cloned().unwrap_or_default();
            if orders.is_empty() {
                println!("No matching orders.");
                return Ok(());
            }
            for order in orders {
                let status = order["status"].as_str().unwrap_or("-");
                let colored_status = match status {
                    "paid" => status.green(),
                    "pending" => status.yellow(),
                    _ => status.red(),
                };
                println!(
                    "{}  {:9} {:>8}  {}",
                    order["orderNo"].as_str().unwrap_or("-"),
                    colored_status,
                    order["amount"].as_str().unwrap_or("-"),
                    order["buyerEmail"].as_str().unwrap_or("-"),
                );
            }
            Ok(())
        }
        OrdersAction::SimulatePay { order_no } => {
            let result = api.send_admin(
                "POST",
                "/api/v1/orders/simulate-pay",
                serde_json::json!({ "orderNo": order_no }),
            )?;
            println!("{} order {} marked paid", "ok".green(), order_no);
            if let Some(url) = result["deliveryUrl"].as_str() {
                println!("Delivery: {}", url);
            }
            if let Some(url) = result["figmaUrl"].as_str() {
                println!("Figma:    {}", url);
            }
            Ok(())
        }
        OrdersAction::SetStatus { status, ids } => {
            let result = api.send_admin(
                "PATCH",
                "/api/v1/orders",
                serde_json::json!({ "ids": ids, "status": status }),
            )?;
            println!(
                "{} {} order(s) updated",
                "ok".green(),
                result["affected"].as_u64().unwrap_or(0)
            );
            Ok(())
        }
        OrdersAction::Delete { ids } => {
            let result = api.send_admin(
                "DELETE",
                "/api/v1/orders",
                serde_json::json!({ "ids": ids }),
            )?;
            println!(
                "{} {} order(s) deleted",
                "ok".green(),
                result["affected"].as_u64().unwrap_or(0)
            );
            Ok(())
        }
    }
}
