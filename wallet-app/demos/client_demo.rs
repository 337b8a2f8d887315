//! Client demo walking through the wallet flows against a local server.
//!
//! Run with: cargo run -p wallet-app --example client_demo

use std::net::SocketAddr;
use std::sync::Arc;

use tempfile::tempdir;
use tokio::net::TcpListener;
use wallet_client::WalletClient;
use wallet_hex::{WalletPolicy, WalletService, inbound::HttpServer};
use wallet_repo::{LogNotifier, build_repo};

const DOCUMENT: &str = "1111111111";
const PHONE: &str = "3001234567";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    let port = addr.port();

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_path = tmp.path().join("wallet.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    println!("🚀 Starting server on port {port}...");
    println!("   Database: {db_url}");

    // Build repository (handles connection and migration)
    let repo = build_repo(&db_url).await?;

    // The log-only notifier never delivers, so tokens come back in responses
    let service = WalletService::new(repo, Arc::new(LogNotifier), WalletPolicy::default());
    let router = HttpServer::new(service).router();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router.into_make_service()).await {
            eprintln!("server stopped: {e}");
        }
    });

    let client = WalletClient::new(format!("http://127.0.0.1:{port}"));

    // ─────────────────────────────────────────────────────────────────────────
    // Demo: Full payment flow
    // ─────────────────────────────────────────────────────────────────────────

    let health = client.health().await?;
    println!("✅ Server health: {health}");

    let ana = client
        .register(DOCUMENT, "Ana Gomez", "a@x.com", PHONE)
        .await?;
    println!("✅ Registered {} (id={})", ana.full_name, ana.id);

    let duplicate = client
        .register(DOCUMENT, "Ana Gomez", "other@x.com", PHONE)
        .await;
    if let Err(e) = duplicate {
        println!("✅ Duplicate registration rejected: {e}");
    }

    let recharge = client.recharge(DOCUMENT, PHONE, 50_000).await?;
    println!("✅ Recharged 50000, balance {}", recharge.new_balance);

    let payment = client.initiate_payment(DOCUMENT, PHONE, 20_000).await?;
    println!(
        "✅ Payment {} pending, token sent to {}",
        payment.session_id, payment.email
    );

    let Some(token) = payment.token_fallback else {
        anyhow::bail!("expected the token in the response when notifications are only logged");
    };

    let confirmed = client.confirm_payment(payment.session_id, &token).await?;
    println!(
        "✅ Paid {}, balance {}",
        confirmed.amount, confirmed.new_balance
    );

    if let Err(e) = client.confirm_payment(payment.session_id, &token).await {
        println!("✅ Second confirmation rejected: {e}");
    }

    let balance = client.balance(DOCUMENT, PHONE).await?;
    println!("   {} has {}", balance.full_name, balance.balance);

    let history = client.transactions(DOCUMENT, PHONE).await?;
    println!("\n📋 Transactions:");
    for tx in history {
        println!(
            "   - {:?} {} {:?} at {}",
            tx.transaction_type, tx.amount, tx.status, tx.created_at
        );
    }

    println!("\n🎉 Demo completed successfully!");

    Ok(())
}
