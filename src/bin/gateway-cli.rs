use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the adaptive request gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "GATEWAY_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// Per-service health, breaker states and balancer stats
    Health,
    /// Request, retry and breaker counters
    Metrics,
    /// List routes in match order
    Routes,
    /// Remove every route registered under a path pattern
    RemoveRoute { path: String },
    /// Circuit breaker stats for every service
    Breakers,
    /// Force a service's circuit breaker closed
    ResetBreaker { service: String },
    /// Load balancer stats
    Balancers,
    /// Clear a load balancer's cursor and stats
    ResetBalancer { service: String, algorithm: String },
    /// List registered instances
    Services,
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

    let (method, path) = match &cli.command {
        Commands::Status => (Method::GET, "/admin/status".to_string()),
        Commands::Health => (Method::GET, "/admin/health".to_string()),
        Commands::Metrics => (Method::GET, "/admin/metrics".to_string()),
        Commands::Routes => (Method::GET, "/admin/routes".to_string()),
        Commands::RemoveRoute { .. } => (Method::DELETE, "/admin/routes".to_string()),
        Commands::Breakers => (Method::GET, "/admin/breakers".to_string()),
        Commands::ResetBreaker { service } => {
            (Method::POST, format!("/admin/breakers/{}/reset", service))
        }
        Commands::Balancers => (Method::GET, "/admin/balancers".to_string()),
        Commands::ResetBalancer { service, algorithm } => (
            Method::POST,
            format!("/admin/balancers/{}/{}/reset", service, algorithm),
        ),
        Commands::Services => (Method::GET, "/admin/services".to_string()),
    };

    let mut request = client
        .request(method, format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers);
    if let Commands::RemoveRoute { path } = &cli.command {
        request = request.query(&[("path", path)]);
    }

    let res = request.send().await?;
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

    let text = res.text().await?;
    if text.is_empty() {
        println!("OK ({})", status);
        return Ok(());
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
