//! Command dispatch: bridges CLI args -> dashboard calls -> output formatting.

pub mod config_cmd;
pub mod machines;
pub mod session;
pub mod telemetry;

use std::future::Future;
use std::io::IsTerminal;
use std::str::FromStr;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use bmsdash_core::{CoreError, Dashboard, Domain};

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Everything a backend-bound handler needs.
pub struct Context<'a> {
    pub dashboard: Dashboard,
    pub global: &'a GlobalOpts,
    pub config: &'a Config,
    pub profile_name: &'a str,
}

impl Context<'_> {
    /// Attach the profile name to a core error.
    pub fn fail(&self, err: CoreError) -> CliError {
        CliError::from_core(err, self.profile_name)
    }

    /// Explicit domain, else the persisted active application.
    pub fn resolve_domain(&self, explicit: Option<Domain>) -> Result<Domain, CliError> {
        if let Some(domain) = explicit {
            return Ok(domain);
        }
        let active = self
            .dashboard
            .session()
            .active_application()
            .map_err(|e| self.fail(e.into()))?;
        active
            .as_deref()
            .and_then(|name| Domain::from_str(name).ok())
            .ok_or(CliError::NoDomain)
    }

    /// Await `fut` behind a spinner on interactive terminals.
    pub async fn with_spinner<T>(&self, message: &str, fut: impl Future<Output = T>) -> T {
        if self.global.quiet || !std::io::stderr().is_terminal() {
            return fut.await;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_owned());
        spinner.enable_steady_tick(Duration::from_millis(80));

        let out = fut.await;
        spinner.finish_and_clear();
        out
    }
}

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context<'_>) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => session::login(ctx, args).await,
        Command::Logout => session::logout(ctx).await,
        Command::Whoami => session::whoami(ctx),
        Command::App(args) => session::app(ctx, args),
        Command::Machines(args) => machines::list(ctx, args).await,
        Command::Summary(arg) => machines::summary(ctx, arg).await,
        Command::Trend(args) => telemetry::trend(ctx, args).await,
        Command::Logs(args) => telemetry::logs(ctx, args).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}
