use crate::format;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    apply_listing_params, date_cell, get_opt_str, get_required_str, listing_result, no_workspace,
    page_size_param, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::table::{self, CellValue, Column};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

struct StudentRow {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    birth_date: Option<String>,
    gender: Option<String>,
    address: Option<String>,
    enrollment_date: Option<String>,
    status: String,
}

impl StudentRow {
    fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn student_columns() -> Vec<Column<StudentRow>> {
    vec![
        Column::new("name", |s| CellValue::Text(s.full_name()), true),
        Column::new("email", |s| CellValue::text(s.email.clone()), true),
        Column::new(
            "enrollmentDate",
            |s| date_cell(s.enrollment_date.as_deref()),
            true,
        ),
        Column::new("status", |s| CellValue::text(s.status.clone()), true),
    ]
}

fn load_students(conn: &Connection) -> Result<Vec<StudentRow>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, first_name, last_name, email, phone, birth_date,
                    gender, address, enrollment_date, status
             FROM students
             ORDER BY sort_order",
        )
        .map_err(HandlerErr::db)?;
    stmt.query_map([], |r| {
        Ok(StudentRow {
            id: r.get(0)?,
            first_name: r.get(1)?,
            last_name: r.get(2)?,
            email: r.get(3)?,
            phone: r.get(4)?,
            birth_date: r.get(5)?,
            gender: r.get(6)?,
            address: r.get(7)?,
            enrollment_date: r.get(8)?,
            status: r.get(9)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(HandlerErr::db)
}

fn parse_status(raw: &str) -> Result<String, HandlerErr> {
    let s = raw.trim().to_ascii_lowercase();
    match s.as_str() {
        "active" | "inactive" => Ok(s),
        _ => Err(HandlerErr {
            code: "bad_params",
            message: "status must be one of: active, inactive".to_string(),
            details: Some(json!({ "status": raw })),
        }),
    }
}

fn students_list(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let AppState { db, listings, .. } = state;
    let conn = db.as_ref().ok_or_else(no_workspace)?;
    let view = &mut listings.students;

    let records = load_students(conn)?;
    let columns = student_columns();
    let page_size = page_size_param(params);
    apply_listing_params(view, params, &records, &columns, page_size)?;

    let slice = table::view(&records, &columns, view, page_size);
    let rows: Vec<serde_json::Value> = slice
        .page_records
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "firstName": s.first_name,
                "lastName": s.last_name,
                "name": s.full_name(),
                "email": s.email,
                "phone": s.phone,
                "birthDate": s.birth_date,
                "gender": s.gender,
                "address": s.address,
                "enrollmentDate": s.enrollment_date,
                "enrollmentDateDisplay": format::format_date(s.enrollment_date.as_deref()),
                "status": s.status,
                "statusDisplay": format::capitalize(&s.status),
            })
        })
        .collect();

    Ok(listing_result(
        "students",
        rows,
        slice.total_count,
        slice.total_pages,
        slice.range_start,
        slice.range_end,
        view,
    ))
}

fn students_create(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;

    let first_name = get_required_str(params, "firstName")?;
    let last_name = get_required_str(params, "lastName")?;
    let email = get_required_str(params, "email")?;
    let phone = get_opt_str(params, "phone");
    let birth_date = get_opt_str(params, "birthDate");
    let gender = get_opt_str(params, "gender");
    let address = get_opt_str(params, "address");
    let enrollment_date = get_opt_str(params, "enrollmentDate");
    let status = match get_opt_str(params, "status") {
        Some(s) => parse_status(&s)?,
        None => "active".to_string(),
    };

    let next_order: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM students",
            [],
            |r| r.get(0),
        )
        .map_err(HandlerErr::db)?;

    let student_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO students(id, first_name, last_name, email, phone, birth_date,
                              gender, address, enrollment_date, status, sort_order, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            student_id,
            first_name,
            last_name,
            email,
            phone,
            birth_date,
            gender,
            address,
            enrollment_date,
            status,
            next_order,
            now
        ],
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "students" })),
    })?;

    Ok(json!({
        "studentId": student_id,
        "name": format!("{} {}", first_name, last_name)
    }))
}

// (json key, column, required)
const STUDENT_PATCH_FIELDS: [(&str, &str, bool); 9] = [
    ("firstName", "first_name", true),
    ("lastName", "last_name", true),
    ("email", "email", true),
    ("phone", "phone", false),
    ("birthDate", "birth_date", false),
    ("gender", "gender", false),
    ("address", "address", false),
    ("enrollmentDate", "enrollment_date", false),
    ("status", "status", true),
];

fn students_update(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let student_id = get_required_str(params, "studentId")?;
    let patch = params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| HandlerErr::bad_params("missing patch object"))?;

    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [&student_id], |r| {
            r.get(0)
        })
        .optional()
        .map_err(HandlerErr::db)?;
    if exists.is_none() {
        return Err(HandlerErr {
            code: "not_found",
            message: "student not found".to_string(),
            details: None,
        });
    }

    let mut sets: Vec<String> = Vec::new();
    let mut vals: Vec<Value> = Vec::new();
    for (json_key, column, required) in STUDENT_PATCH_FIELDS {
        let Some(v) = patch.get(json_key) else {
            continue;
        };
        if v.is_null() {
            if required {
                return Err(HandlerErr::bad_params(format!(
                    "{} must not be null",
                    json_key
                )));
            }
            sets.push(format!("{} = ?", column));
            vals.push(Value::Null);
            continue;
        }
        let Some(s) = v.as_str() else {
            return Err(HandlerErr::bad_params(format!(
                "{} must be a string",
                json_key
            )));
        };
        let trimmed = s.trim();
        if required && trimmed.is_empty() {
            return Err(HandlerErr::bad_params(format!(
                "{} must not be empty",
                json_key
            )));
        }
        let stored = if json_key == "status" {
            parse_status(trimmed)?
        } else {
            trimmed.to_string()
        };
        sets.push(format!("{} = ?", column));
        vals.push(Value::Text(stored));
    }

    if sets.is_empty() {
        return Err(HandlerErr::bad_params("empty patch"));
    }

    sets.push("updated_at = ?".to_string());
    vals.push(Value::Text(chrono::Utc::now().to_rfc3339()));
    vals.push(Value::Text(student_id.clone()));

    let sql = format!("UPDATE students SET {} WHERE id = ?", sets.join(", "));
    conn.execute(&sql, params_from_iter(vals.iter()))
        .map_err(|e| HandlerErr {
            code: "db_update_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "students" })),
        })?;

    Ok(json!({ "studentId": student_id }))
}

fn students_delete(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let student_id = get_required_str(params, "studentId")?;

    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [&student_id], |r| {
            r.get(0)
        })
        .optional()
        .map_err(HandlerErr::db)?;
    if exists.is_none() {
        return Err(HandlerErr {
            code: "not_found",
            message: "student not found".to_string(),
            details: None,
        });
    }

    let tx = conn.unchecked_transaction().map_err(|e| HandlerErr {
        code: "db_tx_failed",
        message: e.to_string(),
        details: None,
    })?;

    // Dependent rows first; there is no ON DELETE CASCADE.
    for table in ["attendance_entries", "grade_entries"] {
        tx.execute(
            &format!("DELETE FROM {} WHERE student_id = ?", table),
            [&student_id],
        )
        .map_err(|e| HandlerErr {
            code: "db_delete_failed",
            message: e.to_string(),
            details: Some(json!({ "table": table })),
        })?;
    }
    tx.execute("DELETE FROM students WHERE id = ?", [&student_id])
        .map_err(|e| HandlerErr {
            code: "db_delete_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "students" })),
        })?;

    tx.commit().map_err(|e| HandlerErr {
        code: "db_commit_failed",
        message: e.to_string(),
        details: None,
    })?;

    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state, &req.params),
        "students.create" => students_create(state, &req.params),
        "students.update" => students_update(state, &req.params),
        "students.delete" => students_delete(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
