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

#[test]
fn listing_state_survives_requests_but_not_workspace_switches() {
    let workspace_a = temp_dir("campusd-ws-a");
    let workspace_b = temp_dir("campusd-ws-b");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace_a.to_string_lossy() }),
    );
    assert_eq!(selected.get("seeded").and_then(|v| v.as_bool()), Some(true));

    let list = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "search": "sarah", "sortBy": "name" }),
    );
    assert_eq!(list.get("totalCount").and_then(|v| v.as_u64()), Some(1));

    // A bare list call sees the same filter and sort.
    let list = request_ok(&mut stdin, &mut reader, "3", "students.list", json!({}));
    assert_eq!(list.get("search").and_then(|v| v.as_str()), Some("sarah"));
    assert_eq!(list.get("sortKey").and_then(|v| v.as_str()), Some("name"));
    assert_eq!(list.get("totalCount").and_then(|v| v.as_u64()), Some(1));

    // A different workspace starts from clean view state.
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.select",
        json!({ "path": workspace_b.to_string_lossy() }),
    );
    assert_eq!(selected.get("seeded").and_then(|v| v.as_bool()), Some(true));

    let list = request_ok(&mut stdin, &mut reader, "5", "students.list", json!({}));
    assert_eq!(list.get("search").and_then(|v| v.as_str()), Some(""));
    assert!(list.get("sortKey").map(|v| v.is_null()).unwrap_or(false));
    assert_eq!(list.get("totalCount").and_then(|v| v.as_u64()), Some(8));

    // Mutations land in the selected workspace only.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.create",
        json!({
            "firstName": "Only",
            "lastName": "InB",
            "email": "only.b@university.edu"
        }),
    );

    // Reopening an already-populated workspace does not reseed, and comes
    // back with defaults again.
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "workspace.select",
        json!({ "path": workspace_a.to_string_lossy() }),
    );
    assert_eq!(selected.get("seeded").and_then(|v| v.as_bool()), Some(false));

    let list = request_ok(&mut stdin, &mut reader, "8", "students.list", json!({}));
    assert_eq!(list.get("search").and_then(|v| v.as_str()), Some(""));
    assert_eq!(list.get("totalCount").and_then(|v| v.as_u64()), Some(8));
    let has_b_student = list
        .get("students")
        .and_then(|v| v.as_array())
        .expect("students")
        .iter()
        .any(|r| r.get("name").and_then(|v| v.as_str()) == Some("Only InB"));
    assert!(!has_b_student, "workspace A must not see workspace B rows");
}
