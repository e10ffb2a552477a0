//!
//! sqlchat server binary
//! ---------------------
//! Starts the HTTP/JSON API. Settings come from `SQLCHAT_*` environment variables;
//! `--port` and `--bind` override them.

use anyhow::Result;
use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use sqlchat::config::{ServerConfig, SessionConfig};

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn parse_port_arg(args: &[String], flag: &str) -> Option<u16> {
    arg_value(args, flag).and_then(|v| v.trim().parse::<u16>().ok())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();

    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("sqlchat server\n\nUSAGE:\n  sqlchat-server [--port N] [--bind ADDR]\n\nOPTIONS:\n  --port N        HTTP port (env: SQLCHAT_HTTP_PORT, default 7979)\n  --bind ADDR     Bind address (env: SQLCHAT_BIND, default 127.0.0.1)\n\nSession defaults come from SQLCHAT_DEFAULT_TABLE, SQLCHAT_ROW_LIMIT, SQLCHAT_USE_VIEWS,\nSQLCHAT_AUTO_FROM, SQLCHAT_PREVIEW_ROWS and SQLCHAT_CAPTURE_RESULT_AS.\n");
        return Ok(());
    }

    let mut server = ServerConfig::from_env();
    if let Some(port) = parse_port_arg(&args, "--port") { server.http_port = port; }
    if let Some(bind) = arg_value(&args, "--bind") { server.bind = bind; }
    let session_defaults = SessionConfig::from_env();

    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "sqlchat::server",
        "sqlchat starting: RUST_LOG='{}', bind={}, http_port={}, default_table='{}', creation_mode={:?}",
        rust_log, server.bind, server.http_port, session_defaults.default_table_name, session_defaults.creation_mode
    );

    sqlchat::server::run(server, session_defaults).await
}
