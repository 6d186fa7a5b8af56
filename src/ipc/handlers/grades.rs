use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    apply_listing_params, listing_result, no_workspace, page_size_param, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::table::{self, CellValue, Column};
use rusqlite::Connection;
use serde_json::json;

struct GradeRow {
    id: String,
    student_id: String,
    course_id: String,
    student: String,
    course: String,
    mid_term: Option<f64>,
    final_exam: Option<f64>,
}

impl GradeRow {
    fn total(&self) -> Option<f64> {
        calc::course_total(self.mid_term, self.final_exam)
    }
}

fn grade_columns() -> Vec<Column<GradeRow>> {
    vec![
        Column::new("student", |g| CellValue::text(g.student.clone()), true),
        Column::new("course", |g| CellValue::text(g.course.clone()), true),
        Column::new(
            "midTerm",
            |g| match g.mid_term {
                Some(v) => CellValue::Number(v),
                None => CellValue::Missing,
            },
            true,
        ),
        Column::new(
            "final",
            |g| match g.final_exam {
                Some(v) => CellValue::Number(v),
                None => CellValue::Missing,
            },
            true,
        ),
        Column::new(
            "total",
            |g| match g.total() {
                Some(v) => CellValue::Number(v),
                None => CellValue::Missing,
            },
            true,
        ),
        Column::new(
            "grade",
            |g| match g.total() {
                Some(v) => CellValue::text(calc::letter_grade(v)),
                None => CellValue::Missing,
            },
            true,
        ),
    ]
}

fn load_grades(conn: &Connection) -> Result<Vec<GradeRow>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT g.id, g.student_id, g.course_id,
                    s.first_name, s.last_name, c.name,
                    g.mid_term, g.final_exam
             FROM grade_entries g
             JOIN students s ON s.id = g.student_id
             JOIN courses c ON c.id = g.course_id
             ORDER BY c.sort_order, s.sort_order",
        )
        .map_err(HandlerErr::db)?;
    stmt.query_map([], |r| {
        let first: String = r.get(3)?;
        let last: String = r.get(4)?;
        Ok(GradeRow {
            id: r.get(0)?,
            student_id: r.get(1)?,
            course_id: r.get(2)?,
            student: format!("{} {}", first, last),
            course: r.get(5)?,
            mid_term: r.get(6)?,
            final_exam: r.get(7)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(HandlerErr::db)
}

fn grades_list(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let AppState { db, listings, .. } = state;
    let conn = db.as_ref().ok_or_else(no_workspace)?;
    let view = &mut listings.grades;

    let records = load_grades(conn)?;
    let columns = grade_columns();
    let page_size = page_size_param(params);
    apply_listing_params(view, params, &records, &columns, page_size)?;

    let slice = table::view(&records, &columns, view, page_size);
    let rows: Vec<serde_json::Value> = slice
        .page_records
        .iter()
        .map(|g| {
            json!({
                "id": g.id,
                "studentId": g.student_id,
                "courseId": g.course_id,
                "student": g.student,
                "course": g.course,
                "midTerm": g.mid_term,
                "final": g.final_exam,
                "total": g.total(),
                "grade": g.total().map(calc::letter_grade),
            })
        })
        .collect();

    Ok(listing_result(
        "grades",
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
        "grades.list" => grades_list(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
