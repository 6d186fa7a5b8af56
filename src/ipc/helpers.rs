use serde_json::json;

use crate::ipc::error::err;
use crate::table::{self, CellValue, Column, ViewAction, ViewState};

pub const LIST_PAGE_SIZE_DEFAULT: usize = 10;
pub const LIST_PAGE_SIZE_MAX: usize = 100;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn db(e: rusqlite::Error) -> Self {
        HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        }
    }
}

pub fn no_workspace() -> HandlerErr {
    HandlerErr {
        code: "no_workspace",
        message: "select a workspace first".to_string(),
        details: None,
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    if v.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(v)
}

pub fn get_opt_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn page_size_param(params: &serde_json::Value) -> usize {
    params
        .get("pageSize")
        .and_then(|v| v.as_u64())
        .map(|n| (n as usize).clamp(1, LIST_PAGE_SIZE_MAX))
        .unwrap_or(LIST_PAGE_SIZE_DEFAULT)
}

/// Parse an ISO date string into a date cell. Unparseable or absent values
/// become `Missing` so they drop out of search and sort to one end.
pub fn date_cell(raw: Option<&str>) -> CellValue {
    raw.and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .map(CellValue::Date)
        .unwrap_or(CellValue::Missing)
}

/// Fold the view actions a list request carries into the listing's state,
/// in UI event order: search edit, then header click, then page jump.
pub fn apply_listing_params<R>(
    view: &mut ViewState,
    params: &serde_json::Value,
    records: &[R],
    columns: &[Column<R>],
    page_size: usize,
) -> Result<(), HandlerErr> {
    if let Some(term) = params.get("search").and_then(|v| v.as_str()) {
        table::apply(
            view,
            ViewAction::Search(term.to_string()),
            records,
            columns,
            page_size,
        );
    }
    if let Some(key) = params.get("sortBy").and_then(|v| v.as_str()) {
        if !columns.iter().any(|c| c.key == key) {
            let known: Vec<&str> = columns.iter().map(|c| c.key).collect();
            return Err(HandlerErr {
                code: "bad_params",
                message: format!("unknown sort column: {}", key),
                details: Some(json!({ "knownKeys": known })),
            });
        }
        table::apply(
            view,
            ViewAction::SortBy(key.to_string()),
            records,
            columns,
            page_size,
        );
    }
    if let Some(n) = params.get("page").and_then(|v| v.as_u64()) {
        table::apply(
            view,
            ViewAction::GoToPage(n as usize),
            records,
            columns,
            page_size,
        );
    }
    Ok(())
}

/// Common listing envelope: the page rows under `key`, pagination metadata
/// for the "Showing X–Y of Z" caption, and the echoed view state.
pub fn listing_result(
    key: &str,
    rows: Vec<serde_json::Value>,
    total_count: usize,
    total_pages: usize,
    range_start: usize,
    range_end: usize,
    view: &ViewState,
) -> serde_json::Value {
    let mut result = json!({
        "totalCount": total_count,
        "totalPages": total_pages,
        "page": view.current_page.clamp(1, total_pages),
        "rangeStart": range_start,
        "rangeEnd": range_end,
        "search": view.search_term,
        "sortKey": view.sort_key,
        "sortDirection": view.sort_direction.as_str(),
    });
    result[key] = serde_json::Value::Array(rows);
    result
}
