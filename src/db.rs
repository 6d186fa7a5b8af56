use rusqlite::Connection;
use std::path::Path;
use uuid::Uuid;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("campus.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            birth_date TEXT,
            gender TEXT,
            address TEXT,
            enrollment_date TEXT,
            status TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    ensure_students_updated_at(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_sort ON students(sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            instructor TEXT NOT NULL,
            department TEXT,
            credits INTEGER NOT NULL,
            capacity INTEGER,
            enrolled INTEGER NOT NULL DEFAULT 0,
            semester TEXT,
            status TEXT NOT NULL,
            description TEXT,
            sort_order INTEGER NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    ensure_courses_updated_at(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_sort ON courses(sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_entries(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            entry_date TEXT NOT NULL,
            status TEXT NOT NULL,
            time_in TEXT,
            FOREIGN KEY(student_id) REFERENCES students(id),
            UNIQUE(student_id, entry_date)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_entries_student ON attendance_entries(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_entries_date ON attendance_entries(entry_date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grade_entries(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            mid_term REAL,
            final_exam REAL,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            UNIQUE(student_id, course_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grade_entries_student ON grade_entries(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grade_entries_course ON grade_entries(course_id)",
        [],
    )?;

    Ok(conn)
}

fn ensure_students_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "students", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE students ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn ensure_courses_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "courses", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE courses ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Populate an empty workspace with the demo dataset so every listing has
/// rows before the first mutation. No-op when students already exist.
/// Returns whether anything was inserted.
pub fn seed_demo_data(conn: &Connection) -> anyhow::Result<bool> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;
    if existing > 0 {
        return Ok(false);
    }

    // (first, last, email, phone, birth, gender, address, enrolled, status)
    let students = [
        (
            "Sarah",
            "Johnson",
            "sarah.j@university.edu",
            "+1 (555) 123-4567",
            "2002-05-15",
            "female",
            "123 Main St, New York, NY 10001",
            "2023-09-01",
            "active",
        ),
        (
            "Michael",
            "Chen",
            "michael.c@university.edu",
            "+1 (555) 234-5678",
            "2001-08-22",
            "male",
            "456 Oak Ave, San Francisco, CA 94102",
            "2023-09-01",
            "active",
        ),
        (
            "Emma",
            "Williams",
            "emma.w@university.edu",
            "+1 (555) 345-6789",
            "2002-11-30",
            "female",
            "789 Pine Rd, Chicago, IL 60601",
            "2024-01-15",
            "active",
        ),
        (
            "James",
            "Brown",
            "james.b@university.edu",
            "+1 (555) 456-7890",
            "2001-03-18",
            "male",
            "321 Elm St, Boston, MA 02101",
            "2023-09-01",
            "inactive",
        ),
        (
            "Emily",
            "Davis",
            "emily.d@university.edu",
            "+1 (555) 567-8901",
            "2002-02-09",
            "female",
            "654 Maple Dr, Seattle, WA 98101",
            "2023-09-01",
            "active",
        ),
        (
            "Daniel",
            "Wilson",
            "daniel.w@university.edu",
            "+1 (555) 678-9012",
            "2001-12-04",
            "male",
            "987 Cedar Ln, Austin, TX 78701",
            "2024-01-15",
            "active",
        ),
        (
            "Olivia",
            "Martin",
            "olivia.m@university.edu",
            "+1 (555) 789-0123",
            "2002-07-27",
            "female",
            "135 Birch Ct, Denver, CO 80201",
            "2023-09-01",
            "active",
        ),
        (
            "Lucas",
            "Anderson",
            "lucas.a@university.edu",
            "+1 (555) 890-1234",
            "2001-10-11",
            "male",
            "246 Spruce Way, Portland, OR 97201",
            "2024-01-15",
            "active",
        ),
    ];

    // (code, name, instructor, department, credits, capacity, enrolled,
    //  semester, description)
    let courses = [
        (
            "CS101",
            "Introduction to Computer Science",
            "Dr. Alan Smith",
            "Computer Science",
            4i64,
            50i64,
            45i64,
            "Fall 2024",
            "Fundamental concepts of computing and programming.",
        ),
        (
            "MATH201",
            "Calculus II",
            "Prof. Mary Johnson",
            "Mathematics",
            3,
            40,
            38,
            "Fall 2024",
            "Integration techniques and applications.",
        ),
        (
            "PHY102",
            "Physics: Electromagnetism",
            "Dr. Robert Brown",
            "Physics",
            4,
            35,
            30,
            "Spring 2025",
            "Study of electric and magnetic fields.",
        ),
        (
            "ENG101",
            "English Composition",
            "Prof. Sarah Davis",
            "Humanities",
            3,
            25,
            25,
            "Fall 2024",
            "Academic writing and critical thinking.",
        ),
    ];

    // One recorded day, row-aligned with the student list above.
    let attendance_day = "2024-09-16";
    let attendance = [
        ("present", Some("08:55 AM")),
        ("present", Some("09:02 AM")),
        ("absent", None),
        ("late", Some("09:45 AM")),
        ("present", Some("08:50 AM")),
        ("present", Some("08:58 AM")),
        ("excused", None),
        ("present", Some("09:00 AM")),
    ];

    // CS101 mid-term/final pairs for the first six students.
    let grades = [
        (88.0, 92.0),
        (76.0, 82.0),
        (95.0, 94.0),
        (65.0, 70.0),
        (82.0, 88.0),
        (45.0, 52.0),
    ];

    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;

    let mut student_ids: Vec<String> = Vec::with_capacity(students.len());
    for (i, s) in students.iter().enumerate() {
        let id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO students(id, first_name, last_name, email, phone, birth_date,
                                  gender, address, enrollment_date, status, sort_order, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![id, s.0, s.1, s.2, s.3, s.4, s.5, s.6, s.7, s.8, i as i64, now],
        )?;
        student_ids.push(id);
    }

    let mut course_ids: Vec<String> = Vec::with_capacity(courses.len());
    for (i, c) in courses.iter().enumerate() {
        let id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO courses(id, code, name, instructor, department, credits, capacity,
                                 enrolled, semester, status, description, sort_order, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?, ?)",
            rusqlite::params![id, c.0, c.1, c.2, c.3, c.4, c.5, c.6, c.7, c.8, i as i64, now],
        )?;
        course_ids.push(id);
    }

    for (i, (status, time_in)) in attendance.iter().enumerate() {
        tx.execute(
            "INSERT INTO attendance_entries(id, student_id, entry_date, status, time_in)
             VALUES(?, ?, ?, ?, ?)",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                student_ids[i],
                attendance_day,
                status,
                time_in
            ],
        )?;
    }

    for (i, (mid, fin)) in grades.iter().enumerate() {
        tx.execute(
            "INSERT INTO grade_entries(id, student_id, course_id, mid_term, final_exam)
             VALUES(?, ?, ?, ?, ?)",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                student_ids[i],
                course_ids[0],
                mid,
                fin
            ],
        )?;
    }

    tx.commit()?;
    Ok(true)
}
