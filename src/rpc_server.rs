//! GitBrowser Archive RPC Server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"archive.declutter", "params":{}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Logs go to stderr; stdout carries responses only.

use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use gitbrowser_archive::app::App;
use gitbrowser_archive::platform;
use gitbrowser_archive::rpc_handler::handle_method;

use serde_json::{json, Value};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gitbrowser_archive=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn respond(out: &mut impl Write, response: &Value) -> io::Result<()> {
    writeln!(out, "{}", response)?;
    out.flush()
}

fn main() {
    init_tracing();

    let data_dir = platform::get_data_dir();
    if let Err(err) = fs::create_dir_all(&data_dir) {
        warn!(dir = %data_dir.display(), error = %err, "could not create data directory");
    }
    let db_path = data_dir.join("archive.db");
    let mut app = match App::new(&db_path.to_string_lossy()) {
        Ok(app) => app,
        Err(err) => {
            error!(path = %db_path.display(), error = %err, "failed to initialize archive");
            std::process::exit(1);
        }
    };
    app.startup();
    let app = Mutex::new(app);
    info!(path = %db_path.display(), "archive RPC server ready");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let ready = json!({"event":"ready","version":env!("CARGO_PKG_VERSION")});
    if respond(&mut out, &ready).is_err() {
        return;
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(req) => {
                let id = req.get("id").cloned().unwrap_or(Value::Null);
                let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
                let params = req.get("params").cloned().unwrap_or(json!({}));
                match handle_method(&app, method, &params) {
                    Ok(val) => json!({"id": id, "result": val}),
                    Err(err) => {
                        warn!(method, error = %err, "rpc call failed");
                        json!({"id": id, "error": err})
                    }
                }
            }
            Err(e) => json!({"id":null,"error":format!("parse error: {}",e)}),
        };
        if respond(&mut out, &response).is_err() {
            break;
        }
    }

    match app.into_inner() {
        Ok(mut app) => app.shutdown(),
        Err(poisoned) => poisoned.into_inner().shutdown(),
    }
}
