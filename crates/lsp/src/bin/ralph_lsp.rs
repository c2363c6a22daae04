//! The `ralph-lsp` binary: wires the [`ralph_lsp::server::Backend`] onto a
//! stdio transport, the same shape as every other `tower-lsp` server in
//! the ecosystem.

use clap::Parser;
use ralph_lsp::server::Backend;
use tower_lsp::{LspService, Server};

#[derive(Parser, Debug)]
#[command(name = "ralph-lsp", about = "Language Server Protocol implementation for Ralph")]
struct Cli {
    /// Minimum level of log lines written to stderr.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
