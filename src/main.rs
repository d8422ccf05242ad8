use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use unfollow_check::{
    export::ExportKind,
    instagram::{InstagramService, WebClientConfig, WebInstagramConnector},
    proxy::{ProxyEndpoint, ProxyParser, ProxyPool, ProxyType},
    report,
    resolver::{normalize_username, to_json},
    AppConfig, CheckRequest, CheckResult, UnfollowersEngine,
};

/// Find Instagram accounts that do not follow back
#[derive(Parser)]
#[command(name = "unfollow-check")]
#[command(about = "Find Instagram accounts that do not follow back")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a public account through the Instagram API
    Check {
        /// Instagram username (with or without @)
        username: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Give up after this many seconds
        #[arg(long, default_value = "600")]
        timeout: u64,
    },
    /// Check an uploaded data export (.zip or .json)
    Parse {
        /// Export file from Instagram's Download Your Information
        input: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Write the complete unfollowers list to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Inspect the proxy pool
    Proxies {
        #[command(subcommand)]
        command: ProxyCommands,
    },
}

#[derive(Subcommand)]
enum ProxyCommands {
    /// List candidate proxies from the public sources
    Fetch {
        /// Proxy type (http, socks4, socks5)
        #[arg(short = 't', long, default_value = "http")]
        proxy_type: String,
    },
    /// Find the best proxy (HTTP → SOCKS5 → SOCKS4)
    Best,
    /// Validate a single proxy
    Validate {
        /// Proxy address (IP:PORT or scheme://IP:PORT)
        proxy: String,
        /// Proxy type when the address has no scheme
        #[arg(short = 't', long, default_value = "http")]
        proxy_type: String,
    },
    /// Show pool statistics after fetching every proxy type
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("unfollow_check=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Commands::Check {
            username,
            json,
            timeout,
        } => {
            let username = normalize_username(&username)
                .ok_or_else(|| anyhow!("Invalid username: use at most 30 characters and no spaces"))?;
            if !config.credentials.is_complete() {
                return Err(anyhow!("IG_USERNAME and IG_PASSWORD must be set for automated checks"));
            }

            let pool = Arc::new(ProxyPool::with_configs(
                config.pool.clone(),
                config.crawler.clone(),
                config.checker.clone(),
            )?);
            let connector = Arc::new(WebInstagramConnector::new(WebClientConfig::default()));
            let service = Arc::new(InstagramService::new(
                config.session.clone(),
                config.credentials.clone(),
                connector,
                pool,
            ));
            let engine = UnfollowersEngine::new(service);

            let result = engine
                .run_with_timeout(&CheckRequest::Username(username.clone()), Duration::from_secs(timeout))
                .await;
            print_result(&username, &result, json);
        }
        Commands::Parse { input, json, output } => {
            let file_name = input
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let kind = ExportKind::from_file_name(&file_name)
                .ok_or_else(|| anyhow!("Unsupported file {:?}: expected .zip or .json", input))?;
            let bytes = tokio::fs::read(&input).await?;

            let engine = UnfollowersEngine::export_only();
            let result = engine.run(&CheckRequest::Export { bytes, kind }).await;

            print_result(&report::account_label(&input), &result, json);

            if let (Some(output_path), Ok(checked)) = (output, &result) {
                tokio::fs::write(&output_path, report::full_listing(&checked.unfollowers)).await?;
                println!("Saved {} unfollowers to {:?}", checked.unfollowers_count, output_path);
            }
        }
        Commands::Proxies { command } => {
            let pool = ProxyPool::with_configs(config.pool.clone(), config.crawler.clone(), config.checker.clone())?;
            run_proxy_command(&pool, command).await?;
        }
    }

    Ok(())
}

async fn run_proxy_command(pool: &ProxyPool, command: ProxyCommands) -> Result<()> {
    match command {
        ProxyCommands::Fetch { proxy_type } => {
            let ptype: ProxyType = proxy_type.parse()?;
            let proxies = pool.fetch_candidates(ptype).await;
            for proxy in &proxies {
                println!("{}", ProxyParser::format_proxy_url(proxy, ptype));
            }
            println!("\nTotal {} proxies: {}", ptype, proxies.len());
        }
        ProxyCommands::Best => match pool.get_best_proxy().await {
            Some(selected) if selected.validated => println!("{} (validated)", selected.endpoint),
            Some(selected) => println!("{} (unverified fallback)", selected.endpoint),
            None => println!("No proxy available"),
        },
        ProxyCommands::Validate { proxy, proxy_type } => {
            let ptype: ProxyType = proxy_type.parse()?;
            let endpoint: ProxyEndpoint = ProxyParser::parse_endpoint(&proxy, ptype);
            if pool.validate(&endpoint).await {
                println!("{} is working", endpoint);
            } else {
                println!("{} failed validation", endpoint);
            }
        }
        ProxyCommands::Stats => {
            for ptype in ProxyType::PRIORITY {
                pool.fetch_candidates(ptype).await;
            }
            let stats = pool.stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

fn print_result(account: &str, result: &CheckResult, json: bool) {
    if json {
        println!("{}", to_json(result));
        return;
    }
    println!("{}", report::render(account, result));
}
