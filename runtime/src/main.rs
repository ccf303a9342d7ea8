// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use newsparse_runtime::cli;
use newsparse_runtime::cli::parse_cmd::ParseMode;
use newsparse_runtime::config::RuntimeConfig;
use newsparse_runtime::types::ExtractionRequest;

#[derive(Parser)]
#[command(
    name = "newsparse",
    about = "Newsparse: article extraction with static-first, browser-fallback routing",
    version,
    after_help = "Run 'newsparse <command> --help' for details on each command."
)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST API
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Address to bind (overrides NEWSPARSE_HOST)
        #[arg(long)]
        host: Option<String>,
    },
    /// Extract one article and print the result as JSON
    Parse {
        /// Page URL
        url: String,
        /// Skip routing and render in a browser
        #[arg(long, conflicts_with = "static_only")]
        dynamic: bool,
        /// Skip routing and use the lightweight fetch only
        #[arg(long = "static")]
        static_only: bool,
        /// Lightweight fetch attempts
        #[arg(long)]
        max_retries: Option<u32>,
        /// Disable TLS certificate verification
        #[arg(long)]
        skip_ssl: bool,
        /// CSS selector to wait for while rendering
        #[arg(long)]
        wait_for: Option<String>,
        /// Keep ads while rendering
        #[arg(long)]
        no_block_ads: bool,
        /// Disable automation fingerprint masking
        #[arg(long)]
        no_stealth: bool,
    },
    /// Show how a URL would be routed
    Classify {
        url: String,
        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.log_json, cli.verbose);

    let mut config = RuntimeConfig::from_env();

    let result = match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            cli::serve::run(config).await
        }
        Commands::Parse {
            url,
            dynamic,
            static_only,
            max_retries,
            skip_ssl,
            wait_for,
            no_block_ads,
            no_stealth,
        } => {
            let mode = if dynamic {
                ParseMode::DynamicOnly
            } else if static_only {
                ParseMode::StaticOnly
            } else {
                ParseMode::Routed
            };
            let mut req = ExtractionRequest::new(url)?
                .with_max_retries(max_retries.unwrap_or(config.default_max_retries))
                .with_skip_ssl(skip_ssl);
            if let Some(selector) = wait_for {
                req = req.with_wait_for_selector(selector);
            }
            req.block_ads = !no_block_ads;
            req.stealth_mode = !no_stealth;

            match cli::parse_cmd::run(&config, req, mode).await {
                Ok(true) => Ok(()),
                Ok(false) => std::process::exit(2),
                Err(e) => Err(e),
            }
        }
        Commands::Classify { url, json } => cli::classify_cmd::run(&config, &url, json),
        Commands::Doctor => cli::doctor::run(&config).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "newsparse", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error, 2=extraction failed
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
