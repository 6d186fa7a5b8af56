use crate::calc;
use crate::format;
use crate::ipc::error::ok;
use crate::ipc::helpers::{no_workspace, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn dashboard_stats(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;

    let (total_students, active_students): (i64, i64) = conn
        .query_row(
            "SELECT COUNT(*), COALESCE(SUM(status = 'active'), 0) FROM students",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .map_err(HandlerErr::db)?;

    let (total_courses, active_courses, active_enrollments): (i64, i64, i64) = conn
        .query_row(
            "SELECT COUNT(*), COALESCE(SUM(status = 'active'), 0), COALESCE(SUM(enrolled), 0)
             FROM courses",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .map_err(HandlerErr::db)?;

    let mut stmt = conn
        .prepare("SELECT mid_term, final_exam FROM grade_entries")
        .map_err(HandlerErr::db)?;
    let totals: Vec<f64> = stmt
        .query_map([], |r| {
            let mid: Option<f64> = r.get(0)?;
            let fin: Option<f64> = r.get(1)?;
            Ok(calc::course_total(mid, fin))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?
        .into_iter()
        .flatten()
        .collect();
    let average_grade = calc::mean(&totals).map(calc::round_off_1_decimal);

    let mut stmt = conn
        .prepare("SELECT status, COUNT(*) FROM attendance_entries GROUP BY status")
        .map_err(HandlerErr::db)?;
    let mut counts = calc::AttendanceCounts::default();
    let rows = stmt
        .query_map([], |r| {
            let status: String = r.get(0)?;
            let n: i64 = r.get(1)?;
            Ok((status, n))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    for (status, n) in rows {
        let n = n as usize;
        match status.as_str() {
            "present" => counts.present += n,
            "absent" => counts.absent += n,
            "late" => counts.late += n,
            "excused" => counts.excused += n,
            _ => {}
        }
    }
    let attendance_rate = counts
        .rate()
        .map(calc::round_off_1_decimal);

    Ok(json!({
        "totalStudents": total_students,
        "activeStudents": active_students,
        "totalCourses": total_courses,
        "activeCourses": active_courses,
        "activeEnrollments": active_enrollments,
        "averageGrade": average_grade,
        "averageGradeDisplay": average_grade.map(|v| format::format_percent(v, 1)),
        "attendanceRate": attendance_rate,
        "attendanceRateDisplay": attendance_rate.map(|v| format::format_percent(v, 1)),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "dashboard.stats" => dashboard_stats(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
