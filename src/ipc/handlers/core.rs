use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, ListingStates, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            let seeded = match db::seed_demo_data(&conn) {
                Ok(v) => v,
                Err(e) => return err(&req.id, "db_seed_failed", format!("{e:?}"), None),
            };
            if seeded {
                info!(path = %path.display(), "seeded demo data into fresh workspace");
            }

            state.workspace = Some(path.clone());
            state.db = Some(conn);
            // A different workspace means different rows; stale search or
            // page state must not leak across.
            state.listings = ListingStates::default();
            ok(
                &req.id,
                json!({ "workspacePath": path.to_string_lossy(), "seeded": seeded }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
