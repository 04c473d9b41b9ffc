mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "waypost")]
#[command(version, about = "Waypost CLI - inspect and exercise a routing table", long_about = None)]
struct Cli {
    /// Routing table to load
    #[arg(short, long, global = true, default_value = "routes.toml")]
    config: PathBuf,

    /// Log every route tried (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List scopes and routes
    Routes {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a request path to its params
    Parse {
        /// Request path, e.g. /posts/view/5
        path: String,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request host
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Request scheme
        #[arg(long, default_value = "http")]
        scheme: String,

        /// Request header as name=value (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a URL
    Url {
        /// `Controller::action` shorthand, controller name or literal path
        target: String,

        /// Params as key=value; `key=` clears a param
        params: Vec<String>,

        /// Scope to generate in
        #[arg(short, long)]
        scope: Option<String>,

        /// Include scheme and host
        #[arg(short, long)]
        absolute: bool,

        /// Host for absolute URLs
        #[arg(long)]
        host: Option<String>,

        /// Scheme for absolute URLs
        #[arg(long)]
        scheme: Option<String>,

        /// Base path the application is mounted at
        #[arg(long)]
        base: Option<String>,

        /// Query pair as key=value (repeatable)
        #[arg(short, long = "query")]
        query: Vec<String>,

        /// Fragment without `#`
        #[arg(short, long)]
        fragment: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("waypost_router=trace")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "waypost_router=warn".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let router = commands::load_router(&cli.config)?;

    match cli.command {
        Commands::Routes { json } => {
            commands::routes::execute(&router, json)?;
        }
        Commands::Parse {
            path,
            method,
            host,
            scheme,
            headers,
            json,
        } => {
            let request = commands::parse::build_request(&path, &method, &host, &scheme, &headers)?;
            commands::parse::execute(router, &request, json)?;
        }
        Commands::Url {
            target,
            params,
            scope,
            absolute,
            host,
            scheme,
            base,
            query,
            fragment,
        } => {
            let target = commands::url::build_target(&target, &params, &query, fragment)?;
            let options = commands::url::build_options(scope, absolute, host, scheme, base);
            commands::url::execute(&router, target, &options)?;
        }
    }

    Ok(())
}
