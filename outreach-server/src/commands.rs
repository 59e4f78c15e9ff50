//! CLI subcommands. Most talk to a running daemon over its operator API;
//! `init-config` works on the data directory directly.

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;
use std::time::Duration;

use outreach_core::config as core_config;
use outreach_types::{AppConfig, PoolStats};

use crate::api::StatusResponse;

#[derive(serde::Deserialize)]
struct RetryFailedResponse {
    requeued: usize,
}

fn api_base(port: u16) -> String {
    format!("http://127.0.0.1:{port}/api")
}

fn client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?)
}

pub async fn handle_status(port: u16, json: bool) -> Result<()> {
    let status: StatusResponse = client()?
        .get(format!("{}/status", api_base(port)))
        .send()
        .await
        .with_context(|| format!("Is the daemon running on port {port}?"))?
        .error_for_status()?
        .json()
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Outreach Status".cyan().bold());
    println!("{}", render_pool_table(&[&status.accounts, &status.proxies]));
    println!(
        "  Queue: {} total, {} pending, {} in flight, {} retrying, {} done, {} failed",
        status.queue.total,
        status.queue.pending,
        status.queue.in_flight,
        status.queue.retry_scheduled,
        status.queue.done,
        status.queue.failed
    );
    println!(
        "  Capacity: {} of {} dispatch slots usable",
        status.processing.processing_capacity, status.processing.max_concurrent
    );
    println!("  Version: {}", status.version);
    Ok(())
}

pub async fn handle_retry_failed(port: u16) -> Result<()> {
    let response: RetryFailedResponse = client()?
        .post(format!("{}/queue/retry-failed", api_base(port)))
        .send()
        .await
        .with_context(|| format!("Is the daemon running on port {port}?"))?
        .error_for_status()?
        .json()
        .await?;

    println!("{} Requeued {} failed work items", "✓".green(), response.requeued);
    Ok(())
}

/// Write the config file. An existing valid file is normalized (missing
/// fields filled with defaults) unless `force` resets it entirely.
pub fn handle_init_config(data_dir: &Path, force: bool) -> Result<()> {
    let path = core_config::config_path(data_dir);
    let config = if force { AppConfig::default() } else { core_config::load_config(data_dir)? };
    core_config::save_config(data_dir, &config)?;
    println!("{} Config written to {}", "✓".green(), path.display());
    Ok(())
}

fn render_pool_table(pools: &[&PoolStats]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Pool", "Total", "Active", "Cooldown", "Suspended", "Disabled", "Leased", "Success",
    ]);

    for stats in pools {
        let active = if stats.active == 0 {
            Cell::new(stats.active).fg(Color::Red)
        } else {
            Cell::new(stats.active).fg(Color::Green)
        };
        table.add_row(vec![
            Cell::new(stats.kind),
            Cell::new(stats.total),
            active,
            Cell::new(stats.cooldown),
            Cell::new(stats.suspended),
            Cell::new(stats.disabled),
            Cell::new(stats.leased),
            Cell::new(format!("{:.1}%", stats.avg_success_rate)),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_types::ResourceKind;

    fn stats(kind: ResourceKind, active: usize) -> PoolStats {
        PoolStats {
            kind,
            total: 3,
            active,
            cooldown: 1,
            suspended: 0,
            disabled: 3 - active - 1,
            leased: 0,
            avg_success_rate: 87.5,
            daily_limit: 50,
        }
    }

    #[test]
    fn test_init_config_fills_defaults_and_force_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = core_config::config_path(dir.path());
        std::fs::write(&path, r#"{"rate_limit":{"hourly_limit":4}}"#).unwrap();

        handle_init_config(dir.path(), false).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["rate_limit"]["hourly_limit"], 4);
        assert_eq!(written["dispatcher"]["max_concurrent"], 3);

        handle_init_config(dir.path(), true).unwrap();
        assert_eq!(core_config::load_config(dir.path()).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_pool_table_lists_both_pools() {
        let accounts = stats(ResourceKind::Account, 2);
        let proxies = stats(ResourceKind::Proxy, 0);
        let rendered = render_pool_table(&[&accounts, &proxies]).to_string();

        assert!(rendered.contains("account"));
        assert!(rendered.contains("proxy"));
        assert!(rendered.contains("87.5%"));
    }
}
