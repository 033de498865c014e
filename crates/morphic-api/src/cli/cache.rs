//! `morphic cache-config`: show the effective chat cache settings.

use anyhow::Result;
use console::style;
use serde_json::json;

use morphic_types::config::CacheSettings;

pub fn print_cache_config(configured: &CacheSettings, json_output: bool) -> Result<()> {
    let effective = configured.effective();

    if json_output {
        let value = json!({
            "ttlSecs": effective.ttl_secs,
            "maxEntries": effective.max_entries,
            "sweepIntervalSecs": effective.sweep_interval_secs,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let clamped = |changed: bool| if changed { style(" (clamped)").yellow().to_string() } else { String::new() };

    println!();
    println!("  {}", style("Chat cache").bold());
    println!(
        "  TTL:            {}s{}",
        style(effective.ttl_secs).cyan(),
        clamped(effective.ttl_secs != configured.ttl_secs)
    );
    println!(
        "  Max entries:    {}{}",
        style(effective.max_entries).cyan(),
        clamped(effective.max_entries != configured.max_entries)
    );
    println!("  Sweep interval: {}s", style(effective.sweep_interval_secs).cyan());
    println!();
    Ok(())
}
