//! RPC method handler for the GitBrowser Archive JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches JSON-RPC method calls to the
//! windows, the archival engine and the settings via the `App` struct.

use std::sync::Mutex;

use crate::app::App;
use crate::managers::source_registry::SourceId;
use crate::services::archival_engine::TriggerOutcome;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::archive::ArchiveEntry;
use crate::types::tab::{Tab, TabId, INVALID_TIMESTAMP};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};

/// Encode bytes to base64 string.
pub fn base64_encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Decode base64 string to bytes.
pub fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    BASE64.decode(input).map_err(|e| format!("base64 decode error: {}", e))
}

fn tab_to_json(tab: &Tab, active: Option<TabId>) -> Value {
    json!({
        "id": tab.id,
        "url": tab.url,
        "title": tab.title,
        "last_active_ms": tab.last_active_ms,
        "group_id": tab.group_id.as_ref().map(|g| g.0.clone()),
        "active": active == Some(tab.id),
        "state": tab.state.as_deref().map(base64_encode),
    })
}

fn entry_to_json(entry: &ArchiveEntry) -> Value {
    let tab = &entry.tab;
    json!({
        "id": tab.id,
        "url": tab.url,
        "title": tab.title,
        "last_active_ms": tab.last_active_ms,
        "group_id": tab.group_id.as_ref().map(|g| g.0.clone()),
        "archived_at_ms": entry.archived_at_ms,
        "state": tab.state.as_deref().map(base64_encode),
    })
}

fn window_param(params: &Value) -> Result<SourceId, String> {
    let raw = params.get("window").and_then(|v| v.as_u64()).ok_or("missing window")?;
    u32::try_from(raw)
        .map(SourceId)
        .map_err(|_| format!("invalid window: {}", raw))
}

fn ids_param(params: &Value) -> Result<Vec<TabId>, String> {
    let ids = params.get("ids").and_then(|v| v.as_array()).ok_or("missing ids")?;
    ids.iter()
        .map(|v| v.as_i64().ok_or_else(|| format!("invalid tab id: {}", v)))
        .collect()
}

fn bool_param(params: &Value, key: &str, default: bool) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Windows and tabs ───
        "window.open" => {
            let initialized = bool_param(params, "initialized", true);
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let id = a.open_window(initialized).map_err(|e| e.to_string())?;
            Ok(json!({"window": id.0}))
        }
        "window.ready" => {
            let window = window_param(params)?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let ready = a.mark_window_ready(window).map_err(|e| e.to_string())?;
            Ok(json!({"ready": ready}))
        }
        "window.close" => {
            let window = window_param(params)?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let closed = a.close_window(window).map_err(|e| e.to_string())?;
            Ok(json!({"closed_tabs": closed}))
        }
        "tab.open" => {
            let window = window_param(params)?;
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            if !url.starts_with("http://") && !url.starts_with("https://") && !url.starts_with("gb://") {
                return Err("invalid url: must start with http://, https://, or gb://".to_string());
            }
            let last_active_ms = params.get("last_active_ms").and_then(|v| v.as_i64());
            if let Some(ms) = last_active_ms {
                if ms < 0 && ms != INVALID_TIMESTAMP {
                    return Err(format!("invalid last_active_ms: {}", ms));
                }
            }
            let state = match params.get("state").and_then(|v| v.as_str()) {
                Some(encoded) => Some(base64_decode(encoded)?),
                None => None,
            };
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let id = a
                .open_tab(window, url, last_active_ms, state)
                .map_err(|e| e.to_string())?;
            Ok(json!({"id": id}))
        }
        "tab.list" => {
            let window = window_param(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let (tabs, active) = a.list_tabs(window).map_err(|e| e.to_string())?;
            let arr: Vec<Value> = tabs.iter().map(|t| tab_to_json(t, active)).collect();
            Ok(json!(arr))
        }
        "tab.activate" => {
            let window = window_param(params)?;
            let id = params.get("id").and_then(|v| v.as_i64()).ok_or("missing id")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.activate_tab(window, id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Archive ───
        "archive.declutter" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            match a.run_declutter() {
                (TriggerOutcome::Started { .. }, Some(summary)) => {
                    serde_json::to_value(summary).map_err(|e| e.to_string())
                }
                (TriggerOutcome::Started { pass_id, .. }, None) => {
                    Err(format!("declutter pass {} did not settle", pass_id))
                }
                (TriggerOutcome::AlreadyInFlight, _) => Err("declutter pass already in flight".to_string()),
                (TriggerOutcome::Destroyed, _) => Err("archiver has been shut down".to_string()),
            }
        }
        "archive.list" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let entries = a.archived_entries().map_err(|e| e.to_string())?;
            let arr: Vec<Value> = entries.iter().map(entry_to_json).collect();
            Ok(json!(arr))
        }
        "archive.tab" => {
            let window = window_param(params)?;
            let ids = ids_param(params)?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let archived = a
                .engine
                .archive_and_remove_tabs(window, &ids)
                .map_err(|e| e.to_string())?;
            Ok(json!({"archived": archived}))
        }
        "archive.restore" => {
            let window = window_param(params)?;
            let ids = ids_param(params)?;
            let update_timestamp = bool_param(params, "update_timestamp", true);
            let opening_new_tabs = bool_param(params, "opening_new_tabs", false);
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let restored = a
                .engine
                .unarchive_and_restore_tabs(window, &ids, update_timestamp, opening_new_tabs)
                .map_err(|e| e.to_string())?;
            Ok(json!({"restored": restored}))
        }
        "archive.rescue" => {
            let window = window_param(params)?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let rescued = a.engine.rescue_archived_tabs(window).map_err(|e| e.to_string())?;
            Ok(json!({"restored": rescued}))
        }
        "archive.delete_expired" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let deleted = a.engine.delete_eligible_archived_tabs();
            Ok(json!({"deleted": deleted}))
        }

        // ─── Settings ───
        "settings.get" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let engine = a.settings_engine.borrow();
            serde_json::to_value(engine.get_settings()).map_err(|e| e.to_string())
        }
        "settings.set" => {
            let key = params.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let rescued = a.set_setting(key, value).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "rescued": rescued}))
        }
        "settings.reset" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let mut engine = a.settings_engine.borrow_mut();
            engine.reset().map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
