use crate::format;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    apply_listing_params, get_opt_str, get_required_str, listing_result, no_workspace,
    page_size_param, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::table::{self, CellValue, Column};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

struct CourseRow {
    id: String,
    code: String,
    name: String,
    instructor: String,
    department: Option<String>,
    credits: i64,
    capacity: Option<i64>,
    enrolled: i64,
    semester: Option<String>,
    status: String,
    description: Option<String>,
}

fn course_columns() -> Vec<Column<CourseRow>> {
    vec![
        Column::new("code", |c| CellValue::text(c.code.clone()), true),
        Column::new("name", |c| CellValue::text(c.name.clone()), true),
        Column::new("instructor", |c| CellValue::text(c.instructor.clone()), true),
        Column::new(
            "department",
            |c| match &c.department {
                Some(d) => CellValue::text(d.clone()),
                None => CellValue::Missing,
            },
            true,
        ),
        Column::new("credits", |c| CellValue::Number(c.credits as f64), true),
        Column::new("enrolled", |c| CellValue::Number(c.enrolled as f64), true),
        Column::new(
            "semester",
            |c| match &c.semester {
                Some(s) => CellValue::text(s.clone()),
                None => CellValue::Missing,
            },
            true,
        ),
        Column::new("status", |c| CellValue::text(c.status.clone()), true),
    ]
}

fn load_courses(conn: &Connection) -> Result<Vec<CourseRow>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, code, name, instructor, department, credits, capacity,
                    enrolled, semester, status, description
             FROM courses
             ORDER BY sort_order",
        )
        .map_err(HandlerErr::db)?;
    stmt.query_map([], |r| {
        Ok(CourseRow {
            id: r.get(0)?,
            code: r.get(1)?,
            name: r.get(2)?,
            instructor: r.get(3)?,
            department: r.get(4)?,
            credits: r.get(5)?,
            capacity: r.get(6)?,
            enrolled: r.get(7)?,
            semester: r.get(8)?,
            status: r.get(9)?,
            description: r.get(10)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(HandlerErr::db)
}

fn parse_course_status(raw: &str) -> Result<String, HandlerErr> {
    let s = raw.trim().to_ascii_lowercase();
    match s.as_str() {
        "active" | "inactive" | "pending" | "ongoing" | "completed" => Ok(s),
        _ => Err(HandlerErr {
            code: "bad_params",
            message: "status must be one of: active, inactive, pending, ongoing, completed"
                .to_string(),
            details: Some(json!({ "status": raw })),
        }),
    }
}

fn courses_list(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let AppState { db, listings, .. } = state;
    let conn = db.as_ref().ok_or_else(no_workspace)?;
    let view = &mut listings.courses;

    let records = load_courses(conn)?;
    let columns = course_columns();
    let page_size = page_size_param(params);
    apply_listing_params(view, params, &records, &columns, page_size)?;

    let slice = table::view(&records, &columns, view, page_size);
    let rows: Vec<serde_json::Value> = slice
        .page_records
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "code": c.code,
                "name": c.name,
                "instructor": c.instructor,
                "department": c.department,
                "credits": c.credits,
                "capacity": c.capacity,
                "enrolled": c.enrolled,
                "semester": c.semester,
                "status": c.status,
                "statusDisplay": format::capitalize(&c.status),
                "description": c.description,
                "descriptionDisplay": c.description.as_deref().map(|d| format::truncate(d, 50)),
            })
        })
        .collect();

    Ok(listing_result(
        "courses",
        rows,
        slice.total_count,
        slice.total_pages,
        slice.range_start,
        slice.range_end,
        view,
    ))
}

fn get_opt_i64(params: &serde_json::Value, key: &str) -> Result<Option<i64>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number", key))),
    }
}

fn courses_create(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;

    let code = get_required_str(params, "code")?;
    let name = get_required_str(params, "name")?;
    let instructor = get_required_str(params, "instructor")?;
    let department = get_opt_str(params, "department");
    let credits = get_opt_i64(params, "credits")?.unwrap_or(3);
    if credits <= 0 {
        return Err(HandlerErr::bad_params("credits must be positive"));
    }
    let capacity = get_opt_i64(params, "capacity")?;
    let enrolled = get_opt_i64(params, "enrolled")?.unwrap_or(0);
    let semester = get_opt_str(params, "semester");
    let description = get_opt_str(params, "description");
    let status = match get_opt_str(params, "status") {
        Some(s) => parse_course_status(&s)?,
        None => "active".to_string(),
    };

    let next_order: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM courses",
            [],
            |r| r.get(0),
        )
        .map_err(HandlerErr::db)?;

    let course_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO courses(id, code, name, instructor, department, credits, capacity,
                             enrolled, semester, status, description, sort_order, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            course_id,
            code,
            name,
            instructor,
            department,
            credits,
            capacity,
            enrolled,
            semester,
            status,
            description,
            next_order,
            now
        ],
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "courses" })),
    })?;

    Ok(json!({ "courseId": course_id, "code": code }))
}

const COURSE_STRING_FIELDS: [(&str, &str, bool); 7] = [
    ("code", "code", true),
    ("name", "name", true),
    ("instructor", "instructor", true),
    ("department", "department", false),
    ("semester", "semester", false),
    ("status", "status", true),
    ("description", "description", false),
];

const COURSE_NUMBER_FIELDS: [(&str, &str); 3] = [
    ("credits", "credits"),
    ("capacity", "capacity"),
    ("enrolled", "enrolled"),
];

fn courses_update(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let course_id = get_required_str(params, "courseId")?;
    let patch = params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| HandlerErr::bad_params("missing patch object"))?;

    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM courses WHERE id = ?", [&course_id], |r| {
            r.get(0)
        })
        .optional()
        .map_err(HandlerErr::db)?;
    if exists.is_none() {
        return Err(HandlerErr {
            code: "not_found",
            message: "course not found".to_string(),
            details: None,
        });
    }

    let mut sets: Vec<String> = Vec::new();
    let mut vals: Vec<Value> = Vec::new();
    for (json_key, column, required) in COURSE_STRING_FIELDS {
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
            parse_course_status(trimmed)?
        } else {
            trimmed.to_string()
        };
        sets.push(format!("{} = ?", column));
        vals.push(Value::Text(stored));
    }
    for (json_key, column) in COURSE_NUMBER_FIELDS {
        let Some(v) = patch.get(json_key) else {
            continue;
        };
        if v.is_null() && json_key == "capacity" {
            sets.push(format!("{} = ?", column));
            vals.push(Value::Null);
            continue;
        }
        let Some(n) = v.as_i64() else {
            return Err(HandlerErr::bad_params(format!(
                "{} must be a number",
                json_key
            )));
        };
        if json_key == "credits" && n <= 0 {
            return Err(HandlerErr::bad_params("credits must be positive"));
        }
        if n < 0 {
            return Err(HandlerErr::bad_params(format!(
                "{} must not be negative",
                json_key
            )));
        }
        sets.push(format!("{} = ?", column));
        vals.push(Value::Integer(n));
    }

    if sets.is_empty() {
        return Err(HandlerErr::bad_params("empty patch"));
    }

    sets.push("updated_at = ?".to_string());
    vals.push(Value::Text(chrono::Utc::now().to_rfc3339()));
    vals.push(Value::Text(course_id.clone()));

    let sql = format!("UPDATE courses SET {} WHERE id = ?", sets.join(", "));
    conn.execute(&sql, params_from_iter(vals.iter()))
        .map_err(|e| HandlerErr {
            code: "db_update_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "courses" })),
        })?;

    Ok(json!({ "courseId": course_id }))
}

fn courses_delete(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let course_id = get_required_str(params, "courseId")?;

    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM courses WHERE id = ?", [&course_id], |r| {
            r.get(0)
        })
        .optional()
        .map_err(HandlerErr::db)?;
    if exists.is_none() {
        return Err(HandlerErr {
            code: "not_found",
            message: "course not found".to_string(),
            details: None,
        });
    }

    let tx = conn.unchecked_transaction().map_err(|e| HandlerErr {
        code: "db_tx_failed",
        message: e.to_string(),
        details: None,
    })?;

    tx.execute("DELETE FROM grade_entries WHERE course_id = ?", [&course_id])
        .map_err(|e| HandlerErr {
            code: "db_delete_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "grade_entries" })),
        })?;
    tx.execute("DELETE FROM courses WHERE id = ?", [&course_id])
        .map_err(|e| HandlerErr {
            code: "db_delete_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "courses" })),
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
        "courses.list" => courses_list(state, &req.params),
        "courses.create" => courses_create(state, &req.params),
        "courses.update" => courses_update(state, &req.params),
        "courses.delete" => courses_delete(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
