use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "watcherctl")]
#[command(about = "Management CLI for the failover watcher", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://localhost:8089")]
    url: String,

    /// Admin API key (omit when auth is disabled).
    #[arg(short, long, default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Current failover state
    Status,
    /// Per-pool health and window detail
    Pools,
    /// Recent alerts
    Alerts,
    /// Drive a pool's chaos toggle for failover drills.
    /// Talks to the pool directly; the watcher itself has no idea.
    Chaos {
        #[command(subcommand)]
        action: ChaosAction,
    },
}

#[derive(Subcommand)]
enum ChaosAction {
    /// Start fault injection on a pool
    Start {
        /// Pool base URL, e.g. http://localhost:3001
        #[arg(long)]
        pool_url: String,
    },
    /// Stop fault injection on a pool
    Stop {
        #[arg(long)]
        pool_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if !cli.key.is_empty() {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
        );
    }

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Pools => {
            let res = client
                .get(format!("{}/admin/pools", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Alerts => {
            let res = client
                .get(format!("{}/admin/alerts", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Chaos { action } => {
            let (pool_url, toggle) = match &action {
                ChaosAction::Start { pool_url } => (pool_url, "start"),
                ChaosAction::Stop { pool_url } => (pool_url, "stop"),
            };
            let res = client
                .post(format!("{}/chaos/{}", pool_url.trim_end_matches('/'), toggle))
                .send()
                .await?;
            let status = res.status();
            if status.is_success() {
                println!("chaos {toggle}: ok");
            } else {
                eprintln!("chaos {toggle} failed: pool returned {status}");
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
