mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use bmsdash_config::KeyringStore;
use bmsdash_core::{Dashboard, Session, SessionEvent};

use crate::cli::{Cli, Command};
use crate::commands::Context;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a backend
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "bmsdash", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = config::load_config()?;
            let profile_name = config::active_profile_name(&cli.global, &cfg);
            let dashboard_config =
                config::resolve_dashboard_config(&cli.global, &cfg, &profile_name)?;

            let session = Arc::new(Session::new(Arc::new(KeyringStore::new(&profile_name))));
            let dashboard = Dashboard::new(dashboard_config, session)
                .map_err(|e| CliError::from_core(e, &profile_name))?;
            let mut events = dashboard.subscribe();

            let ctx = Context {
                dashboard,
                global: &cli.global,
                config: &cfg,
                profile_name: &profile_name,
            };

            tracing::debug!(command = ?cmd, profile = %profile_name, "dispatching command");
            let result = commands::dispatch(cmd, &ctx).await;
            report_session_events(&mut events, &profile_name, cli.global.quiet);
            result
        }
    }
}

/// Surface session transitions that happened during the command.
fn report_session_events(
    events: &mut broadcast::Receiver<SessionEvent>,
    profile_name: &str,
    quiet: bool,
) {
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::Invalidated { reason } => {
                tracing::warn!(%reason, "session invalidated");
                if !quiet {
                    eprintln!(
                        "Session for profile '{profile_name}' has ended ({reason}). \
                         Run: bmsdash login --profile {profile_name}"
                    );
                }
            }
            SessionEvent::Refreshed => tracing::debug!("access token refreshed"),
            SessionEvent::LoggedIn | SessionEvent::LoggedOut => {}
        }
    }
}
