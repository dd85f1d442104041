//! Binary entry point for the plangraph server CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use plangraph::server::{self, ServerOptions};

#[derive(Parser, Debug)]
#[command(
    name = "plangraph",
    version,
    about = "Query-plan visualization service",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Serve the plan-graph HTTP API")]
    Serve(ServeCmd),
}

#[derive(Args, Debug)]
struct ServeCmd {
    #[arg(value_name = "DB", help = "Database file queries run against")]
    db_path: PathBuf,

    #[arg(long, default_value = "127.0.0.1", help = "Network interface to bind")]
    host: IpAddr,

    #[arg(long, default_value_t = 3001, help = "Listening port")]
    port: u16,

    #[arg(
        long,
        value_name = "DIR",
        default_value = "uploads",
        help = "Directory uploaded database files are stored under"
    )]
    uploads: PathBuf,

    #[arg(long, value_name = "DIR", help = "Static asset directory for the frontend")]
    assets: Option<PathBuf>,

    #[arg(long, help = "Disable mutating endpoints (database upload)")]
    read_only: bool,

    #[arg(
        long = "allow-origin",
        value_name = "ORIGIN",
        help = "CORS origin allowed to call the API (repeatable)"
    )]
    allow_origins: Vec<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => {
            let options = ServerOptions {
                db_path: cmd.db_path,
                host: cmd.host,
                port: cmd.port,
                uploads_dir: cmd.uploads,
                assets_dir: cmd.assets,
                read_only: cmd.read_only,
                allow_origins: cmd.allow_origins,
            };
            server::serve(options).await?;
        }
    }

    Ok(())
}
