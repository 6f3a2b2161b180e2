use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::net::IpAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dividend_tools::api::{
    CompoundingArgs, LeveragedArgs, compounding_response, cost_basis_response,
    leveraged_response, parse_lot, run_http_server,
};
use dividend_tools::core::{CostBasisLedger, CostLot};

#[derive(Parser, Debug)]
#[command(
    name = "dividend_tools",
    version,
    about = "Dividend reinvestment, cost basis and return-on-debt projections"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "DIVIDEND_TOOLS_LOG",
        default_value = "info",
        help = "Log filter used when RUST_LOG is not set (trace, debug, info, warn, error)"
    )]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Serve the JSON HTTP API")]
    Serve(ServeArgs),
    #[command(about = "Project share growth under dividend reinvestment, tax and withdrawals")]
    Compound(CompoundingArgs),
    #[command(about = "Weighted-average cost basis across purchase lots")]
    CostBasis(CostBasisArgs),
    #[command(about = "Project a leveraged position whose dividends service a fixed loan payment")]
    Leverage(LeveragedArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "DIVIDEND_TOOLS_HOST", default_value = "0.0.0.0")]
    host: IpAddr,
    #[arg(long, env = "DIVIDEND_TOOLS_PORT", default_value_t = 8080)]
    port: u16,
}

#[derive(Args, Debug)]
struct CostBasisArgs {
    #[arg(
        long = "lot",
        value_parser = parse_lot,
        help = "Purchase lot as SHARES@PRICE; repeat for each lot in entry order"
    )]
    lots: Vec<CostLot>,
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn run_cost_basis(args: &CostBasisArgs) -> Result<(), String> {
    let ledger = CostBasisLedger::from_lots(&args.lots).map_err(|e| e.to_string())?;
    print_json(&cost_basis_response(None, &ledger))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let outcome = match cli.command {
        Command::Serve(args) => run_http_server(args.host, args.port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Compound(args) => compounding_response(&args).and_then(|r| print_json(&r)),
        Command::CostBasis(args) => run_cost_basis(&args),
        Command::Leverage(args) => leveraged_response(&args).and_then(|r| print_json(&r)),
    };

    if let Err(e) = outcome {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
