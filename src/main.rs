use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use pos_gateway::application::client::{ClientSession, TcpConnector};
use pos_gateway::application::engine::AuthDecisionEngine;
use pos_gateway::application::server::GatewayServer;
use pos_gateway::config::{ClientConfig, ServerConfig};
use pos_gateway::domain::ports::LedgerBox;
use pos_gateway::domain::transaction::Amount;
use pos_gateway::infrastructure::in_memory::InMemoryLedger;
#[cfg(feature = "storage-rocksdb")]
use pos_gateway::infrastructure::rocksdb::RocksDBLedger;
use pos_gateway::interfaces::csv::record_writer::RecordWriter;
use rust_decimal::Decimal;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the payment gateway
    Server {
        #[arg(long)]
        port: u16,

        /// Path to persistent ledger (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Send one sale request to a gateway
    Sale {
        #[arg(long)]
        amount: Amount,

        #[arg(long)]
        host: String,

        #[arg(long)]
        port: u16,
    },
    /// Print the most recent ledger records as CSV, newest first
    History {
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Path to persistent ledger (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Server { port, db_path } => {
            let config = ServerConfig::default();
            let engine = AuthDecisionEngine::new(open_ledger(db_path)?, config.processing_delay);
            let server = GatewayServer::bind(("0.0.0.0", port), engine, config)
                .await
                .into_diagnostic()?;
            server.run().await;
        }
        Command::Sale { amount, host, port } => {
            if amount.value() <= Decimal::ZERO {
                miette::bail!("Amount must be greater than zero");
            }
            let config = ClientConfig::default();
            let connector = TcpConnector::new(format!("{host}:{port}"), config.connect_timeout);
            let mut session = ClientSession::new(connector, config);

            let response = session
                .send_sale(amount)
                .await
                .into_diagnostic()?;
            println!("{response}");
        }
        Command::History { count, db_path } => {
            let ledger = open_ledger(db_path)?;
            let records = ledger.query_last(count).await.into_diagnostic()?;

            let stdout = io::stdout();
            let mut writer = RecordWriter::new(stdout.lock());
            writer.write_records(&records).into_diagnostic()?;
        }
    }

    Ok(())
}

fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let ledger = RocksDBLedger::open(path).into_diagnostic()?;
            Ok(Box::new(ledger))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(path) => {
            tracing::warn!(
                db_path = %path.display(),
                "Persistent ledger requested via --db-path, but the 'storage-rocksdb' feature \
                 is not enabled. Falling back to in-memory ledger."
            );
            Ok(Box::new(InMemoryLedger::new()))
        }
        None => Ok(Box::new(InMemoryLedger::new())),
    }
}
