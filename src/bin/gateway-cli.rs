use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the gRPC gateway", long_about = None)]
struct Cli {
    /// Admin endpoint base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List loaded services and their route tables
    Services,
    /// Reload every service schema from disk, or only the named one
    Reload {
        /// Service directory to load or replace
        service: Option<String>,
    },
    /// List pooled backend connections
    Connections,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")).send().await?,
        Commands::Services => client.get(format!("{base}/admin/services")).send().await?,
        Commands::Reload { service: None } => client.post(format!("{base}/admin/reload")).send().await?,
        Commands::Reload { service: Some(service) } => {
            client.post(format!("{base}/admin/reload/{service}")).send().await?
        }
        Commands::Connections => client.get(format!("{base}/admin/connections")).send().await?,
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // Reload failures still carry a JSON body worth printing.
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{text}"),
    }

    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        std::process::exit(1);
    }
    Ok(())
}
