// CertAlert - TLS certificate expiry monitor
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

use anyhow::Result;
use certalert::monitor::config::{DingTalkConfig, EmailConfig};
use certalert::{Args, MonitorConfig, MonitorDaemon};
use clap::Parser;
use colored::Colorize;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging - respect RUST_LOG unless -v is given
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    args.validate()?;

    if args.output.no_color {
        colored::control::set_override(false);
    }

    // Handle --config-example (write example config and exit)
    if let Some(path) = &args.monitoring.config_example {
        example_config().save_to_file(path)?;
        println!("✓ Example configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = args.load_config()?;
    let daemon = MonitorDaemon::new(config)?;

    // Handle test alert
    if args.monitoring.test_alert {
        info!("Testing alert channels...");
        let results = daemon.test_alerts().await;

        println!("\nAlert Channel Tests:");
        println!("{}", "=".repeat(80));

        if results.is_empty() {
            println!("No alert channels configured");
        } else {
            for (channel_name, result) in &results {
                let status = if result.is_ok() { "✓".green() } else { "✗".red() };
                let message = result
                    .as_ref()
                    .map(|_| "Success".to_string())
                    .unwrap_or_else(|e| format!("Failed: {}", e));
                println!("  {} {} - {}", status, channel_name, message);
            }
        }
        println!();

        if results.iter().any(|(_, r)| r.is_err()) {
            std::process::exit(1);
        }
        return Ok(());
    }

    if daemon.config().domains.is_empty() {
        anyhow::bail!("No domains to check. Use --domain, --domains-file or a config file.");
    }

    // Handle single check cycle
    if args.monitoring.once {
        let report = daemon.run_check_cycle().await;

        if args.output.json {
            println!("{}", report.to_json()?);
        } else {
            println!("{}", report.render_text());
        }

        if !report.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    // Start the monitoring daemon
    daemon.start().await?;

    Ok(())
}

fn example_config() -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.domains = vec!["example.com".to_string(), "mail.example.com:465".to_string()];
    config.notify.dingtalk = Some(DingTalkConfig {
        enabled: true,
        webhook: "https://oapi.dingtalk.com/robot/send?access_token=YOUR_TOKEN".to_string(),
        at_mobiles: vec![],
    });
    config.notify.email = Some(EmailConfig {
        enabled: false,
        smtp_server: "smtp.example.com".to_string(),
        smtp_port: 465,
        smtp_username: "alerts@example.com".to_string(),
        smtp_password: "change-me".to_string(),
        from: "alerts@example.com".to_string(),
        from_name: "CertAlert".to_string(),
        to: vec!["admin@example.com".to_string()],
        cc: vec![],
        accept_invalid_certs: false,
        timeout_seconds: 30,
    });
    config
}
