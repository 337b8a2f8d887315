//! Wallet CLI
//!
//! Command-line interface for the Wallet API, plus a local mail relay that
//! prints the notifications the server would email.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use clap::{Parser, Subcommand};

use wallet_client::WalletClient;
use wallet_repo::notifier::SIGNATURE_HEADER;
use wallet_repo::security::verify_signature;
use wallet_types::SessionId;

#[derive(Parser)]
#[command(name = "wallet")]
#[command(author, version, about = "Wallet API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the Wallet API
    #[arg(long, env = "WALLET_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

/// Identifies a wallet by document and phone.
#[derive(clap::Args)]
struct Holder {
    /// National document number
    #[arg(long)]
    document: String,
    /// Registered mobile number
    #[arg(long)]
    phone: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new client
    Register {
        #[arg(long)]
        document: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
    },
    /// Credit a wallet
    Recharge {
        #[command(flatten)]
        holder: Holder,
        #[arg(long)]
        amount: i64,
    },
    /// Start a payment; the confirmation token is emailed
    Pay {
        #[command(flatten)]
        holder: Holder,
        #[arg(long)]
        amount: i64,
    },
    /// Confirm a pending payment
    Confirm {
        /// Session id returned by `pay`
        #[arg(long)]
        session: String,
        /// Six-digit token
        #[arg(long)]
        token: String,
    },
    /// Show a wallet balance
    Balance {
        #[command(flatten)]
        holder: Holder,
    },
    /// List a wallet's transactions
    History {
        #[command(flatten)]
        holder: Holder,
    },
    /// Check API health
    Health,
    /// Start a local mail relay that prints received notifications
    Relay {
        /// Port to listen on
        #[arg(long, default_value = "4000")]
        port: u16,
        /// Shared secret used to check request signatures
        #[arg(long, env = "NOTIFY_RELAY_SECRET", default_value = "")]
        secret: String,
    },
}

fn parse_session(s: &str) -> Result<SessionId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid session ID: {}", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = WalletClient::new(&cli.api_url);

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Register {
            document,
            name,
            email,
            phone,
        } => {
            let registered = client.register(&document, &name, &email, &phone).await?;
            println!("{}", serde_json::to_string_pretty(&registered)?);
        }

        Commands::Recharge { holder, amount } => {
            let result = client
                .recharge(&holder.document, &holder.phone, amount)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Pay { holder, amount } => {
            let result = client
                .initiate_payment(&holder.document, &holder.phone, amount)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.token_fallback.is_some() {
                eprintln!("! The token email could not be sent; the token is shown above");
            }
        }

        Commands::Confirm { session, token } => {
            let session_id = parse_session(&session)?;
            let result = client.confirm_payment(session_id, &token).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Balance { holder } => {
            let result = client.balance(&holder.document, &holder.phone).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::History { holder } => {
            let result = client
                .transactions(&holder.document, &holder.phone)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Relay { port, secret } => {
            let app = axum::Router::new()
                .route("/send", axum::routing::post(handle_relay))
                .with_state(Arc::new(secret));
            let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
            println!("Listening for notifications on http://{}/send", addr);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn handle_relay(
    State(secret): State<Arc<String>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify_signature(&body, signature, &secret) {
        println!("✗ Rejected notification with a bad signature");
        return StatusCode::UNAUTHORIZED;
    }

    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(message) => {
            println!(
                "✉ {} -> {}: {}",
                message["from"].as_str().unwrap_or_default(),
                message["to"].as_str().unwrap_or_default(),
                message["subject"].as_str().unwrap_or_default()
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&message["params"]).unwrap_or_default()
            );
            println!("----------------------------------------");
            StatusCode::OK
        }
        Err(e) => {
            println!("✗ Malformed notification: {}", e);
            StatusCode::BAD_REQUEST
        }
    }
}
