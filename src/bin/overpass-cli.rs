use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use overpass_proxy::config::{load_config, ProxyConfig};
use overpass_proxy::http::request::{parse_query, InputError};
use overpass_proxy::http::X_UPSTREAM_ENDPOINT;
use overpass_proxy::query;

#[derive(Parser)]
#[command(name = "overpass-cli")]
#[command(about = "Validate and send Overpass queries through the proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a query locally against the proxy's rules
    Check {
        /// Query file, or `-` for stdin
        file: PathBuf,

        /// Proxy config supplying the query limits
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Send a query to a running proxy and print the result
    Query {
        /// Query file, or `-` for stdin
        file: PathBuf,

        #[arg(short, long, default_value = "http://localhost:8080/proxy")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file, config } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => ProxyConfig::default(),
            };
            let text = read_query(&file)?;

            match check_query(&text, &config) {
                Ok(()) => {
                    println!("valid");
                    Ok(ExitCode::SUCCESS)
                }
                Err(reason) => {
                    eprintln!("Rejected: {}", reason);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Query { file, url } => {
            let text = read_query(&file)?;
            let res = reqwest::Client::new()
                .post(&url)
                .json(&json!({ "query": text }))
                .send()
                .await?;
            print_response(res).await
        }
    }
}

/// Apply the same input checks and validation the proxy applies to a request.
fn check_query(text: &str, config: &ProxyConfig) -> Result<(), String> {
    let body = json!({ "query": text }).to_string();
    let query = parse_query(body.as_bytes(), config.query.max_length).map_err(|e| match e {
        InputError::QueryTooLarge { max } => format!("{} (maximum {} characters)", e, max),
        other => other.to_string(),
    })?;
    query::validate(&query, &config.query).map_err(|e| e.to_string())
}

fn read_query(file: &PathBuf) -> std::io::Result<String> {
    if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(file)
    }
}

async fn print_response(res: reqwest::Response) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(host) = res.headers().get(X_UPSTREAM_ENDPOINT).and_then(|v| v.to_str().ok()) {
        eprintln!("Served by: {}", host);
    }

    let text = res.text().await?;
    let output = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", output);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Error: proxy returned status {}", status);
        eprintln!("{}", output);
        Ok(ExitCode::FAILURE)
    }
}
