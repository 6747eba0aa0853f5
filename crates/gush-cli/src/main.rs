use std::process::ExitCode;
use std::sync::Arc;

use gush_auth::{CredentialStore, KeyringStore};
use gush_cli::helpers::Style;
use gush_cli::session::{ConfiguredFactory, Session};
use gush_cli::subscribers::default_dispatcher;
use gush_cli::Cli;
use gush_core::config::GushConfig;
use gush_git::Git;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("GUSH_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, matches: clap::ArgMatches, style: Style) -> anyhow::Result<()> {
    let dispatcher = default_dispatcher();
    let config_path = GushConfig::config_path()?;
    let config = GushConfig::load()?;
    let credentials: Arc<dyn CredentialStore> = Arc::new(KeyringStore::new());
    let factory = Box::new(ConfiguredFactory::new(credentials.clone()));
    let git = Git::system(std::env::current_dir()?);

    let mut session = Session::new(config, config_path, git, style, credentials, factory)?;
    gush_cli::execute(cli.command, &matches, &dispatcher, &mut session).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let (cli, matches) = match gush_cli::parse(&default_dispatcher(), std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(e) => e.exit(),
    };
    init_logging(cli.verbose);

    let no_color = cli.no_color;
    if let Err(e) = run(cli, matches, Style::terminal(no_color)).await {
        let style = Style::terminal(no_color);
        let _ = style.error(format!("{e:#}"));
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
