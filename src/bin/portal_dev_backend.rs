//!
//! campus_portal dev backend binary
//! ---------------------------------
//! Serves the in-memory auth backend with seeded demo accounts. Port comes from
//! `--port N` or CAMPUS_PORTAL_DEV_PORT (default 7880).

use anyhow::Result;
use std::env;

use campus_portal::devserver::{run_with_port, DevState, DEFAULT_DEV_PORT};

fn parse_port_env(name: &str) -> Option<u16> {
    match env::var(name) {
        Ok(val) => val.parse::<u16>().ok(),
        Err(_) => None,
    }
}

fn parse_port_arg(args: &[String], flag: &str) -> Option<u16> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return args[i + 1].parse::<u16>().ok();
        }
        i += 1;
    }
    None
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("campus_portal dev backend\n\nUSAGE:\n  portal_dev_backend [--port N]\n\nOPTIONS:\n  --port N   HTTP port (env: CAMPUS_PORTAL_DEV_PORT, default {})\n\nSeeded accounts:\n  2021-00001 / student123   STUDENT\n  president  / executive123 ADMIN EXECUTIVE\n  treasurer  / finance123   ADMIN FINANCE\n  secretary  / general123   ADMIN GENERAL\n  2019-99999 / student123   STUDENT (disabled)", DEFAULT_DEV_PORT);
        return Ok(());
    }

    let port = parse_port_arg(&args, "--port")
        .or_else(|| parse_port_env("CAMPUS_PORTAL_DEV_PORT"))
        .unwrap_or(DEFAULT_DEV_PORT);
    tracing::info!("campus_portal dev backend using port {}", port);

    let state = DevState::seeded().await?;
    run_with_port(port, state).await
}
