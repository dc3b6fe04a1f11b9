use clap::Parser;
use libregent::Method;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod format;

/// Regent - OCI Registry HTTP Client
///
/// Sends a single request to an OCI distribution registry, answering
/// authentication challenges along the way, and prints the response.
#[derive(Parser, Debug)]
#[command(name = "regent")]
#[command(version, about, long_about = None)]
#[command(after_help = "Example: regent --registry localhost:5000 --name alpine GET '/v2/<name>/tags/list'")]
pub struct Cli {
    /// HTTP method (GET, HEAD, POST, PUT, PATCH, DELETE)
    #[arg(value_parser = parse_method)]
    pub method: Method,

    /// Path template; <name>, <reference>, <digest> and <session_id> are substituted
    pub path: String,

    /// Registry address (overrides the config file)
    #[arg(long)]
    pub registry: Option<String>,

    /// Config file [default: <config dir>/regent/config.yaml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Username for registry authentication
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password (will prompt if a username is given without one)
    #[arg(short, long)]
    pub password: Option<String>,

    /// Repository namespace substituted for <name>
    #[arg(long)]
    pub name: Option<String>,

    /// Tag or digest substituted for <reference>
    #[arg(long)]
    pub reference: Option<String>,

    /// Digest substituted for <digest>
    #[arg(long)]
    pub digest: Option<String>,

    /// Upload session ID substituted for <session_id>
    #[arg(long)]
    pub session_id: Option<String>,

    /// Extra header, "Key: Value" (can be repeated)
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Query parameter, key=value (can be repeated)
    #[arg(short = 'q', long = "query", value_name = "PARAM")]
    pub query: Vec<String>,

    /// Request body
    #[arg(short = 'd', long, conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Read the request body from a file
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// User-Agent header value
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Scope requested from the token server instead of the challenge scope
    #[arg(long)]
    pub auth_scope: Option<String>,

    /// Print response headers
    #[arg(short, long)]
    pub include: bool,

    /// Print the registry error list of a failed response
    #[arg(long)]
    pub errors: bool,

    /// Log requests and responses to stderr
    #[arg(long)]
    pub debug: bool,

    /// Control colored output: auto, always, never
    #[arg(long, default_value = "auto")]
    pub color: String,
}

fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_bytes(s.to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("invalid HTTP method: {}", s))
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let ctx = match context::AppContext::build(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            format::error(&e);
            return ExitCode::FAILURE;
        }
    };

    match commands::request::handle_request(&ctx, &cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            format::error(&e);
            ExitCode::FAILURE
        }
    }
}
