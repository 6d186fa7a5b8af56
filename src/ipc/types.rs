use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::table::ViewState;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Search/sort/page state for each listing the dashboard shows. Lives here
/// for the lifetime of the workspace; the UI only sends the action that
/// happened and gets the resulting state echoed back.
#[derive(Debug, Default, Clone)]
pub struct ListingStates {
    pub students: ViewState,
    pub courses: ViewState,
    pub attendance: ViewState,
    pub grades: ViewState,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub listings: ListingStates,
}
