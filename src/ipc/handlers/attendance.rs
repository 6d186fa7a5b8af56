use crate::format;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    apply_listing_params, date_cell, listing_result, no_workspace, page_size_param, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::table::{self, CellValue, Column};
use rusqlite::Connection;
use serde_json::json;

struct AttendanceRow {
    id: String,
    student_id: String,
    name: String,
    entry_date: String,
    status: String,
    time_in: Option<String>,
}

fn attendance_columns() -> Vec<Column<AttendanceRow>> {
    vec![
        Column::new("name", |a| CellValue::text(a.name.clone()), true),
        Column::new("date", |a| date_cell(Some(&a.entry_date)), true),
        Column::new("status", |a| CellValue::text(a.status.clone()), true),
        Column::new(
            "timeIn",
            |a| match &a.time_in {
                Some(t) => CellValue::text(t.clone()),
                None => CellValue::Missing,
            },
            true,
        ),
    ]
}

fn load_attendance(conn: &Connection) -> Result<Vec<AttendanceRow>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT a.id, a.student_id, s.first_name, s.last_name, a.entry_date, a.status, a.time_in
             FROM attendance_entries a
             JOIN students s ON s.id = a.student_id
             ORDER BY a.entry_date, s.sort_order",
        )
        .map_err(HandlerErr::db)?;
    stmt.query_map([], |r| {
        let first: String = r.get(2)?;
        let last: String = r.get(3)?;
        Ok(AttendanceRow {
            id: r.get(0)?,
            student_id: r.get(1)?,
            name: format!("{} {}", first, last),
            entry_date: r.get(4)?,
            status: r.get(5)?,
            time_in: r.get(6)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(HandlerErr::db)
}

fn attendance_list(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let AppState { db, listings, .. } = state;
    let conn = db.as_ref().ok_or_else(no_workspace)?;
    let view = &mut listings.attendance;

    let records = load_attendance(conn)?;
    let columns = attendance_columns();
    let page_size = page_size_param(params);
    apply_listing_params(view, params, &records, &columns, page_size)?;

    let slice = table::view(&records, &columns, view, page_size);
    let rows: Vec<serde_json::Value> = slice
        .page_records
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "studentId": a.student_id,
                "name": a.name,
                "date": a.entry_date,
                "dateDisplay": format::format_date(Some(&a.entry_date)),
                "status": a.status,
                "statusDisplay": format::capitalize(&a.status),
                "timeIn": a.time_in,
                "timeInDisplay": format::or_dash(a.time_in.as_deref()),
            })
        })
        .collect();

    Ok(listing_result(
        "entries",
        rows,
        slice.total_count,
        slice.total_pages,
        slice.range_start,
        slice.range_end,
        view,
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.list" => attendance_list(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
