//! Login, logout, whoami and the active-application selector.

use std::fmt::Write as _;

use dialoguer::{Input, Select};
use secrecy::SecretString;
use serde_json::Value;
use strum::IntoEnumIterator;

use bmsdash_core::{CoreError, Domain};

use crate::cli::{AppArgs, AppCommand, LoginArgs};
use crate::error::CliError;
use crate::output;

use super::Context;

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

// ── Login / logout ──────────────────────────────────────────────────

pub async fn login(ctx: &Context<'_>, args: LoginArgs) -> Result<(), CliError> {
    let profile = ctx.config.profiles.get(ctx.profile_name);

    let username = match args
        .username
        .or_else(|| profile.and_then(|p| p.username.clone()))
    {
        Some(name) => name,
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(prompt_err)?,
    };

    if username.trim().is_empty() {
        return Err(CliError::Validation {
            field: "username".into(),
            reason: "cannot be empty".into(),
        });
    }

    let password = match bmsdash_config::resolve_password(ctx.profile_name) {
        Some(pw) => pw,
        None => SecretString::from(rpassword::prompt_password("Password: ").map_err(prompt_err)?),
    };

    let outcome = ctx
        .with_spinner("Logging in", ctx.dashboard.login(&username, &password))
        .await
        .map_err(|e| match e {
            CoreError::NotAuthenticated { message } => CliError::LoginFailed {
                profile: ctx.profile_name.into(),
                reason: message,
            },
            other => ctx.fail(other),
        })?;

    if args.save_password {
        use secrecy::ExposeSecret;
        bmsdash_config::store_password(ctx.profile_name, password.expose_secret())?;
    }

    if !ctx.global.quiet {
        let who = outcome
            .profile
            .as_ref()
            .and_then(display_name)
            .unwrap_or(&username);
        eprintln!("Logged in as {who} (profile '{}')", ctx.profile_name);
    }
    Ok(())
}

pub async fn logout(ctx: &Context<'_>) -> Result<(), CliError> {
    ctx.dashboard.logout().await.map_err(|e| ctx.fail(e))?;
    if !ctx.global.quiet {
        eprintln!("Logged out of profile '{}'", ctx.profile_name);
    }
    Ok(())
}

// ── Whoami ──────────────────────────────────────────────────────────

fn display_name(profile: &Value) -> Option<&str> {
    ["name", "fullName", "username", "email"]
        .iter()
        .find_map(|key| profile.get(*key).and_then(Value::as_str))
}

fn profile_detail(profile: &Value) -> String {
    let mut out = String::new();
    match profile.as_object() {
        Some(fields) => {
            for (key, value) in fields {
                let shown = value.as_str().map_or_else(|| value.to_string(), str::to_owned);
                let _ = writeln!(out, "{key:<14} {shown}");
            }
        }
        None => {
            let _ = writeln!(out, "{profile}");
        }
    }
    out.trim_end().to_owned()
}

pub fn whoami(ctx: &Context<'_>) -> Result<(), CliError> {
    let session = ctx.dashboard.session();
    if !session.is_logged_in() {
        return Err(CliError::NotLoggedIn {
            profile: ctx.profile_name.into(),
            reason: "no stored session".into(),
        });
    }

    let profile = session
        .profile()
        .map_err(|e| ctx.fail(e.into()))?
        .unwrap_or(Value::Null);

    let out = output::render_single(&ctx.global.output, &profile, profile_detail, |p| {
        display_name(p).unwrap_or_default().to_owned()
    });
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

// ── Active application ──────────────────────────────────────────────

pub fn app(ctx: &Context<'_>, args: AppArgs) -> Result<(), CliError> {
    let session = ctx.dashboard.session();
    match args.command {
        AppCommand::Show => {
            let active = session
                .active_application()
                .map_err(|e| ctx.fail(e.into()))?;
            output::print_output(active.as_deref().unwrap_or("(none)"), ctx.global.quiet);
            Ok(())
        }

        AppCommand::Select { name } => {
            let domain = match name {
                Some(domain) => domain,
                None => {
                    let choices: Vec<Domain> = Domain::iter().collect();
                    let labels: Vec<String> = choices.iter().map(ToString::to_string).collect();
                    let index = Select::new()
                        .with_prompt("Application")
                        .items(&labels)
                        .default(0)
                        .interact()
                        .map_err(prompt_err)?;
                    choices.get(index).copied().ok_or_else(|| CliError::Validation {
                        field: "application".into(),
                        reason: format!("no choice at index {index}"),
                    })?
                }
            };

            session
                .set_active_application(&domain.to_string())
                .map_err(|e| ctx.fail(e.into()))?;
            if !ctx.global.quiet {
                eprintln!("Active application: {domain}");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_name_prefers_name_fields() {
        assert_eq!(
            display_name(&json!({ "username": "ops", "name": "Operations" })),
            Some("Operations")
        );
        assert_eq!(display_name(&json!({ "id": 4 })), None);
    }

    #[test]
    fn profile_detail_lists_fields() {
        let out = profile_detail(&json!({ "name": "Ops", "role": "admin" }));
        assert!(out.contains("name"));
        assert!(out.contains("admin"));
    }
}
