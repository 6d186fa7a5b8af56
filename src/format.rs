use chrono::NaiveDate;

/// "Sep 01, 2023"-style display for ISO dates; `-` when absent or
/// unparseable, matching the dashboard's empty-cell convention.
pub fn format_date(raw: Option<&str>) -> String {
    match raw.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()) {
        Some(d) => d.format("%b %d, %Y").to_string(),
        None => "-".to_string(),
    }
}

pub fn or_dash(raw: Option<&str>) -> String {
    match raw {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => "-".to_string(),
    }
}

/// First letter upper, rest lower ("active" -> "Active").
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{}...", cut)
}

pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value)
}
