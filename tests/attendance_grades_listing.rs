use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_campusd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn campusd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn field(result: &serde_json::Value, key: &str, field: &str) -> Vec<String> {
    result
        .get(key)
        .and_then(|v| v.as_array())
        .unwrap_or_else(|| panic!("missing {} array: {}", key, result))
        .iter()
        .map(|r| {
            r.get(field)
                .map(|v| match v.as_str() {
                    Some(s) => s.to_string(),
                    None => v.to_string(),
                })
                .unwrap_or_default()
        })
        .collect()
}

#[test]
fn attendance_listing_joins_names_and_formats_cells() {
    let workspace = temp_dir("campusd-attendance");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let list = request_ok(&mut stdin, &mut reader, "2", "attendance.list", json!({}));
    assert_eq!(list.get("totalCount").and_then(|v| v.as_u64()), Some(8));

    let entries = list.get("entries").and_then(|v| v.as_array()).expect("entries");
    let sarah = entries
        .iter()
        .find(|r| r.get("name").and_then(|v| v.as_str()) == Some("Sarah Johnson"))
        .expect("sarah entry");
    assert_eq!(sarah.get("statusDisplay").and_then(|v| v.as_str()), Some("Present"));
    assert_eq!(sarah.get("dateDisplay").and_then(|v| v.as_str()), Some("Sep 16, 2024"));
    assert_eq!(sarah.get("timeInDisplay").and_then(|v| v.as_str()), Some("08:55 AM"));

    let emma = entries
        .iter()
        .find(|r| r.get("name").and_then(|v| v.as_str()) == Some("Emma Williams"))
        .expect("emma entry");
    assert_eq!(emma.get("status").and_then(|v| v.as_str()), Some("absent"));
    assert!(emma.get("timeIn").map(|v| v.is_null()).unwrap_or(false));
    assert_eq!(emma.get("timeInDisplay").and_then(|v| v.as_str()), Some("-"));

    let list = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.list",
        json!({ "search": "absent" }),
    );
    assert_eq!(field(&list, "entries", "name"), vec!["Emma Williams"]);

    // Entries with no check-in time sort ahead of every recorded time and
    // keep their relative order.
    let list = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.list",
        json!({ "search": "", "sortBy": "timeIn" }),
    );
    assert_eq!(
        field(&list, "entries", "name"),
        vec![
            "Emma Williams",
            "Olivia Martin",
            "Emily Davis",
            "Sarah Johnson",
            "Daniel Wilson",
            "Lucas Anderson",
            "Michael Chen",
            "James Brown",
        ]
    );
}

#[test]
fn grades_listing_derives_totals_and_letters() {
    let workspace = temp_dir("campusd-grades");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let list = request_ok(&mut stdin, &mut reader, "2", "grades.list", json!({}));
    assert_eq!(list.get("totalCount").and_then(|v| v.as_u64()), Some(6));

    let grades = list.get("grades").and_then(|v| v.as_array()).expect("grades");
    let sarah = grades
        .iter()
        .find(|r| r.get("student").and_then(|v| v.as_str()) == Some("Sarah Johnson"))
        .expect("sarah grade");
    assert_eq!(
        sarah.get("course").and_then(|v| v.as_str()),
        Some("Introduction to Computer Science")
    );
    assert_eq!(sarah.get("midTerm").and_then(|v| v.as_f64()), Some(88.0));
    assert_eq!(sarah.get("final").and_then(|v| v.as_f64()), Some(92.0));
    assert_eq!(sarah.get("total").and_then(|v| v.as_f64()), Some(90.0));
    assert_eq!(sarah.get("grade").and_then(|v| v.as_str()), Some("A"));

    let emma = grades
        .iter()
        .find(|r| r.get("student").and_then(|v| v.as_str()) == Some("Emma Williams"))
        .expect("emma grade");
    assert_eq!(emma.get("total").and_then(|v| v.as_f64()), Some(94.5));
    assert_eq!(emma.get("grade").and_then(|v| v.as_str()), Some("A"));

    let daniel = grades
        .iter()
        .find(|r| r.get("student").and_then(|v| v.as_str()) == Some("Daniel Wilson"))
        .expect("daniel grade");
    assert_eq!(daniel.get("total").and_then(|v| v.as_f64()), Some(48.5));
    assert_eq!(daniel.get("grade").and_then(|v| v.as_str()), Some("F"));

    // Sorting by the derived total orders numerically.
    let list = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.list",
        json!({ "sortBy": "total" }),
    );
    assert_eq!(
        field(&list, "grades", "student"),
        vec![
            "Daniel Wilson",
            "James Brown",
            "Michael Chen",
            "Emily Davis",
            "Sarah Johnson",
            "Emma Williams",
        ]
    );

    // Sorting by letter groups equal letters in roster order.
    let list = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.list",
        json!({ "sortBy": "grade" }),
    );
    assert_eq!(
        field(&list, "grades", "student"),
        vec![
            "Sarah Johnson",
            "Emma Williams",
            "Emily Davis",
            "Michael Chen",
            "James Brown",
            "Daniel Wilson",
        ]
    );

    let list = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grades.list",
        json!({ "search": "emma" }),
    );
    assert_eq!(list.get("totalCount").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(field(&list, "grades", "student"), vec!["Emma Williams"]);
}
