use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use supports_color::Stream as ColorStream;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use invflask_client::config::ConfigManager;
use invflask_client::{client_for, shared_client, ApiClient};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Inspect and exercise the shared Invflask API client."
)]
struct Cli {
    /// Log client activity to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the base URL, default headers and credentials mode in effect.
    Show,
    /// Send a single request through the configured client.
    Request(RequestArgs),
}

#[derive(Args)]
struct RequestArgs {
    /// HTTP method, e.g. GET or POST.
    method: String,
    /// Path resolved against the base URL.
    path: String,
    /// JSON payload sent as the request body.
    #[arg(short, long)]
    data: Option<String>,
    /// Extra header as NAME:VALUE. May be repeated.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

fn main() -> Result<()> {
    let Cli { verbose, command } = Cli::parse();
    init_tracing(verbose);

    let manager = match ConfigManager::new() {
        Ok(manager) => Some(manager),
        Err(err) => {
            warn!(error = %err, "config directory unavailable, using built-in defaults");
            None
        }
    };

    let owned = load_client(manager.as_ref())?;
    let client: &ApiClient = match &owned {
        Some(client) => client,
        None => shared_client().context("failed to initialize API client")?,
    };

    match command {
        Commands::Show => handle_show(client, manager.as_ref()),
        Commands::Request(args) => handle_request(client, args),
    }
}

/// Build a client from `config.toml`, or `None` when the shared client applies.
fn load_client(manager: Option<&ConfigManager>) -> Result<Option<ApiClient>> {
    let Some(manager) = manager else {
        return Ok(None);
    };
    let config = manager
        .load_optional()
        .with_context(|| format!("failed to load {}", manager.config_file().display()))?;
    match config {
        Some(config) => Ok(Some(
            client_for(config).context("failed to initialize API client")?,
        )),
        None => Ok(None),
    }
}

fn log_directive(verbose: bool, rust_log: Option<String>) -> String {
    if verbose {
        return "invflask_client=debug".to_string();
    }
    rust_log
        .filter(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| "warn".to_string())
}

fn init_tracing(verbose: bool) {
    let directive = log_directive(verbose, std::env::var("RUST_LOG").ok());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_show(client: &ApiClient, manager: Option<&ConfigManager>) -> Result<()> {
    let source = match manager {
        Some(manager) if manager.config_file().exists() => {
            manager.config_file().display().to_string()
        }
        _ => "built-in defaults".to_string(),
    };
    println!("Config: {source}");
    println!("Base URL: {}", client.base_url());
    for (name, value) in client.default_headers() {
        println!(
            "Header: {}: {}",
            name,
            value.to_str().unwrap_or("<non-ascii value>")
        );
    }
    println!("Credentials: {}", client.credentials());
    Ok(())
}

fn handle_request(client: &ApiClient, args: RequestArgs) -> Result<()> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method {:?}", args.method))?;

    let mut builder = client
        .request(method.clone(), &args.path)
        .context("failed to resolve request path")?;

    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        builder = builder.header(name, value);
    }

    if let Some(data) = &args.data {
        let payload: serde_json::Value =
            serde_json::from_str(data).context("--data must be valid JSON")?;
        builder = builder.json(&payload);
    }

    let request = builder.build().context("failed to build request")?;
    let spinner = create_spinner(format!("{} {}", request.method(), request.url()))?;
    let result = request.send();
    spinner.finish_and_clear();

    let response = result.with_context(|| format!("{method} {} failed", args.path))?;
    let status = response.status();
    let version = response.version();
    let body = response.text().context("failed to read response body")?;

    println!("{:?} {}", version, paint_status(status));
    if !body.is_empty() {
        println!("{}", pretty_body(&body));
    }
    Ok(())
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header {raw:?} must be NAME:VALUE"))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("invalid header name in {raw:?}"))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("invalid header value in {raw:?}"))?;
    Ok((name, value))
}

fn pretty_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}

fn create_spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {wide_msg}")?.tick_chars("⠁⠃⠇⡇⣇⣧⣷⣿"));
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn paint_status(status: StatusCode) -> String {
    let text = status.to_string();
    if !color_enabled() {
        return text;
    }
    if status.is_success() {
        format!("{}", text.green().bold())
    } else if status.is_redirection() {
        format!("{}", text.yellow().bold())
    } else {
        format!("{}", text.red().bold())
    }
}

fn color_enabled() -> bool {
    supports_color::on_cached(ColorStream::Stdout)
        .map(|level| level.has_basic)
        .unwrap_or(false)
}
