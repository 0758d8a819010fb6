use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "wsgate-cli")]
#[command(about = "Management CLI for the wsgate WebSocket server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081", env = "WSGATE_ADMIN_URL")]
    url: String,

    #[arg(short, long, env = "WSGATE_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server status
    Status,
    /// List open sessions
    Sessions,
    /// List path spec mappings and their configuration
    Mappings,
    /// Close one session by id
    Close { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let base = cli.url.trim_end_matches('/');
    let request = match &cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::Sessions => client.get(format!("{base}/admin/sessions")),
        Commands::Mappings => client.get(format!("{base}/admin/mappings")),
        Commands::Close { id } => client.post(format!("{base}/admin/sessions/{id}/close")),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let body = res.text().await?;
    if body.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&body)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
