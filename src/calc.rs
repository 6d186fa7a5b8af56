/// Letter boundaries used on report cards and the grades listing.
pub fn letter_grade(score: f64) -> &'static str {
    if score >= 90.0 {
        "A"
    } else if score >= 80.0 {
        "B"
    } else if score >= 70.0 {
        "C"
    } else if score >= 60.0 {
        "D"
    } else {
        "F"
    }
}

/// Course total: the mean of the components that exist. A single recorded
/// component stands alone rather than averaging against an implicit zero.
pub fn course_total(mid_term: Option<f64>, final_exam: Option<f64>) -> Option<f64> {
    match (mid_term, final_exam) {
        (Some(m), Some(f)) => Some((m + f) / 2.0),
        (Some(m), None) => Some(m),
        (None, Some(f)) => Some(f),
        (None, None) => None,
    }
}

/// 1-decimal rounding for dashboard figures:
/// `Int(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AttendanceCounts {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
}

impl AttendanceCounts {
    pub fn total(&self) -> usize {
        self.present + self.absent + self.late + self.excused
    }

    /// Percent of recorded entries where the student was in the room;
    /// late arrivals still count as attended. None when nothing is recorded.
    pub fn rate(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some(100.0 * (self.present + self.late) as f64 / total as f64)
    }
}
