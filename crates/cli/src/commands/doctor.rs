//! Doctor command - validate configuration and show status

use anyhow::Result;
use devshare_domain::PostStore;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    database: CheckResult,
    generator: CheckResult,
    linkedin: CheckResult,
    x: CheckResult,
    bluesky: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        database: CheckResult::error("Not checked"),
        generator: CheckResult::error("Not checked"),
        linkedin: CheckResult::error("Not checked"),
        x: CheckResult::error("Not checked"),
        bluesky: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.database = check_database(config).await;
        report.generator = check_generator(config);
        report.linkedin = check_linkedin(config);
        report.x = check_x(config);
        report.bluesky = check_platform_toggle("bluesky", config.bluesky.enabled);
    }

    // Determine overall status; platform toggles only warn
    let checks = [&report.config, &report.database, &report.generator];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_database(config: &AppConfig) -> CheckResult {
    let store = match crate::commands::open_store(config).await {
        Ok(s) => s,
        Err(e) => return CheckResult::error(format!("Failed to open database: {}", e)),
    };

    let email = config.general.user_email.trim();
    if email.is_empty() {
        return CheckResult::warn(format!(
            "Database opened at {} but general.user_email is not set",
            config.general.db_path.display()
        ));
    }

    match store.upsert_user(email, None).await {
        Ok(user) => match store.accounts_for_user(user.id).await {
            Ok(accounts) => {
                let providers: Vec<String> =
                    accounts.iter().map(|a| a.provider.to_string()).collect();
                CheckResult::ok(format!(
                    "Database ready, user {} with {} linked account(s)",
                    user.email,
                    accounts.len()
                ))
                .with_details(serde_json::json!({
                    "db_path": config.general.db_path.display().to_string(),
                    "linked_providers": providers,
                }))
            }
            Err(e) => CheckResult::error(format!("Failed to list accounts: {}", e)),
        },
        Err(e) => CheckResult::error(format!("Failed to resolve user: {}", e)),
    }
}

fn check_generator(config: &AppConfig) -> CheckResult {
    match config.generator.provider.as_str() {
        "stub" => CheckResult::ok("Provider: stub (offline)"),
        "http" => {
            if config.generator.endpoint.trim().is_empty() {
                return CheckResult::error("generator.endpoint is empty");
            }

            let env_var = &config.generator.api_key_env;
            match std::env::var(env_var) {
                Ok(val) if !val.trim().is_empty() => CheckResult::ok(format!(
                    "Provider: http, endpoint: {}, API key: {} (set)",
                    config.generator.endpoint, env_var
                )),
                _ => CheckResult::warn(format!(
                    "Provider: http, endpoint: {}, API key: {} (not set)",
                    config.generator.endpoint, env_var
                )),
            }
        }
        other => CheckResult::error(format!("Unknown generator provider: {}", other)),
    }
}

fn check_x(config: &AppConfig) -> CheckResult {
    if !config.x.enabled {
        return CheckResult::warn("X publishing disabled");
    }

    if config.x.client_id.trim().is_empty() {
        return CheckResult::warn(
            "X enabled but x.client_id is empty; 'devshare auth x-begin' will fail",
        );
    }

    CheckResult::ok(format!(
        "X enabled, client_id set, redirect_uri: {}",
        config.x.redirect_uri
    ))
}

fn check_linkedin(config: &AppConfig) -> CheckResult {
    if !config.linkedin.enabled {
        return CheckResult::warn("LinkedIn publishing disabled");
    }

    let env_var = &config.linkedin.access_token_env;
    match std::env::var(env_var) {
        Ok(val) if !val.trim().is_empty() => CheckResult::ok(format!(
            "LinkedIn enabled, token: {} (set); link with 'devshare auth linkedin-token'",
            env_var
        )),
        _ => CheckResult::warn(format!(
            "LinkedIn enabled, token: {} (not set); linked accounts keep working",
            env_var
        )),
    }
}

fn check_platform_toggle(name: &str, enabled: bool) -> CheckResult {
    if enabled {
        CheckResult::ok(format!("{} publishing enabled", name))
    } else {
        CheckResult::warn(format!("{} publishing disabled", name))
    }
}

fn print_report(report: &DoctorReport) {
    println!("devshare doctor");
    println!();
    print_check("config", &report.config);
    print_check("database", &report.database);
    print_check("generator", &report.generator);
    print_check("linkedin", &report.linkedin);
    print_check("x", &report.x);
    print_check("bluesky", &report.bluesky);
    println!();
    println!("overall: {}", report.overall);
}

fn print_check(name: &str, check: &CheckResult) {
    let marker = match check.status.as_str() {
        "ok" => "✓",
        "warn" => "!",
        _ => "✗",
    };
    println!("  {} {:<10} {}", marker, name, check.message);
}
