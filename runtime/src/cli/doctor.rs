// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Environment readiness check.

use crate::config::RuntimeConfig;
use crate::renderer::chromium::find_chromium;
use crate::renderer::sweep::TempSweeper;
use crate::routing::DomainPolicy;
use anyhow::Result;
use std::process::Command;

/// Check Chromium availability, temp space, policy file, and memory.
pub async fn run(config: &RuntimeConfig) -> Result<()> {
    println!("Newsparse Doctor");
    println!("================");
    println!();

    // OS and architecture
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    // Check Chromium
    let chromium_path = config.chromium_path.clone().or_else(find_chromium);
    match &chromium_path {
        Some(path) if path.exists() => println!("[OK] Chromium found: {}", path.display()),
        Some(path) => println!("[!!] Chromium path does not exist: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Set NEWSPARSE_CHROMIUM_PATH; dynamic rendering is unavailable."
        ),
    }

    // Check temp dir and leftovers
    let sweeper = TempSweeper::new(config.temp_dir.clone());
    let scratch = sweeper.claim_profile();
    match std::fs::create_dir(&scratch).and_then(|_| sweeper.release_profile(&scratch)) {
        Ok(()) => println!("[OK] Temp dir writable: {}", config.temp_dir.display()),
        Err(e) => println!("[!!] Temp dir {} not writable: {e}", config.temp_dir.display()),
    }
    let leftovers = sweeper.matching().len();
    if leftovers == 0 {
        println!("[OK] No stale browser temp files");
    } else {
        println!("[..] {leftovers} stale browser temp entries (swept after the next render)");
    }

    // Check policy tables
    match &config.policy_file {
        Some(path) => match DomainPolicy::load(path) {
            Ok(p) => println!(
                "[OK] Policy file {}: {} blocked, {} dynamic, {} static",
                path.display(),
                p.blocked().len(),
                p.dynamic_required().len(),
                p.static_ok().len()
            ),
            Err(e) => println!("[!!] Policy file {} invalid: {e}", path.display()),
        },
        None => println!("[OK] Using built-in domain policy"),
    }

    // Check available memory
    let mem_mb = get_available_memory_mb();
    let needed = 256 * config.max_concurrent_renders as u64;
    match mem_mb {
        Some(mb) if mb >= needed => {
            println!("[OK] Available memory: {mb}MB (>= {needed}MB for {} renders)", config.max_concurrent_renders)
        }
        Some(mb) => println!(
            "[!!] Available memory: {mb}MB (< {needed}MB for {} renders, lower NEWSPARSE_MAX_CONCURRENT_RENDERS)",
            config.max_concurrent_renders
        ),
        None => println!("[??] Could not determine available memory"),
    }

    println!();
    println!("Listen:  {}", config.bind_addr());
    println!(
        "Retries: static {}, render {}",
        config.default_max_retries, config.render_retries
    );
    println!();
    if chromium_path.is_some_and(|p| p.exists()) {
        println!("Status: READY");
    } else {
        println!("Status: STATIC ONLY");
    }

    Ok(())
}

/// Get available memory in MB (platform-specific).
fn get_available_memory_mb() -> Option<u64> {
    #[cfg(target_os = "macos")]
    {
        let output = Command::new("sysctl")
            .args(["-n", "hw.memsize"])
            .output()
            .ok()?;
        let s = String::from_utf8_lossy(&output.stdout);
        let bytes: u64 = s.trim().parse().ok()?;
        Some(bytes / 1_048_576)
    }
    #[cfg(target_os = "linux")]
    {
        let output = Command::new("free").args(["-m"]).output().ok()?;
        let s = String::from_utf8_lossy(&output.stdout);
        for line in s.lines() {
            if line.starts_with("Mem:") {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 7 {
                    return parts[6].parse().ok();
                }
            }
        }
        None
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}
