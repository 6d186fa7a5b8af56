use chrono::NaiveDate;
use std::cmp::Ordering;

/// Comparable value derived from one record for filtering and ordering.
/// `Missing` never matches a non-empty search and sorts below everything,
/// equal to other `Missing` values.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Missing,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// The string the UI would show for this cell, used for substring search.
    pub fn display(&self) -> String {
        match self {
            CellValue::Missing => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    // Cross-type ordering: Missing < Number < Date < Text. Mixed-type
    // columns are a caller mistake, but the order must stay total.
    fn type_rank(&self) -> u8 {
        match self {
            CellValue::Missing => 0,
            CellValue::Number(_) => 1,
            CellValue::Date(_) => 2,
            CellValue::Text(_) => 3,
        }
    }

    fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Missing, CellValue::Missing) => Ordering::Equal,
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

/// How to derive a sortable/searchable value from a record. Presentation
/// (cell rendering) lives entirely on the UI side and has no field here.
pub struct Column<R> {
    pub key: &'static str,
    pub accessor: fn(&R) -> CellValue,
    pub sortable: bool,
}

impl<R> Column<R> {
    pub fn new(key: &'static str, accessor: fn(&R) -> CellValue, sortable: bool) -> Self {
        Column {
            key,
            accessor,
            sortable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    fn toggled(&self) -> SortDirection {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Mutable listing state: search term, sort key/direction, current page.
/// One instance per listing, owned by the caller and only changed through
/// `apply`.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub search_term: String,
    pub sort_key: Option<String>,
    pub sort_direction: SortDirection,
    pub current_page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            search_term: String::new(),
            sort_key: None,
            sort_direction: SortDirection::Ascending,
            current_page: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ViewAction {
    /// Replace the search term. Always jumps back to page 1: the old page
    /// number is meaningless against a different filtered set.
    Search(String),
    /// Header click: toggles direction on the current key, otherwise sorts
    /// ascending by the new key. Does not touch the page.
    SortBy(String),
    /// Jump to a page, clamped to the filtered set's page range.
    GoToPage(usize),
}

/// One page of a filtered, sorted listing plus the numbers the UI needs for
/// its pagination controls ("Showing X–Y of Z").
pub struct TableSlice<'a, R> {
    pub page_records: Vec<&'a R>,
    pub total_pages: usize,
    pub total_count: usize,
    pub range_start: usize,
    pub range_end: usize,
}

pub fn apply<R>(
    state: &mut ViewState,
    action: ViewAction,
    records: &[R],
    columns: &[Column<R>],
    page_size: usize,
) {
    debug_assert!(keys_unique(columns), "duplicate column key");
    match action {
        ViewAction::Search(term) => {
            state.search_term = term;
            state.current_page = 1;
        }
        ViewAction::SortBy(key) => {
            let Some(col) = columns.iter().find(|c| c.key == key) else {
                debug_assert!(false, "unknown sort key: {key}");
                return;
            };
            if !col.sortable {
                return;
            }
            if state.sort_key.as_deref() == Some(col.key) {
                state.sort_direction = state.sort_direction.toggled();
            } else {
                state.sort_key = Some(col.key.to_string());
                state.sort_direction = SortDirection::Ascending;
            }
        }
        ViewAction::GoToPage(n) => {
            let count = filtered(records, columns, &state.search_term).len();
            state.current_page = n.clamp(1, total_pages(count, page_size));
        }
    }
}

/// Pure read: recomputes the filtered, sorted page from scratch on every
/// call. Record counts here are small; nothing is cached, so nothing can go
/// stale.
pub fn view<'a, R>(
    records: &'a [R],
    columns: &[Column<R>],
    state: &ViewState,
    page_size: usize,
) -> TableSlice<'a, R> {
    debug_assert!(keys_unique(columns), "duplicate column key");
    let page_size = page_size.max(1);

    let mut rows = filtered(records, columns, &state.search_term);

    if let Some(key) = state.sort_key.as_deref() {
        if let Some(col) = columns.iter().find(|c| c.key == key) {
            // Vec::sort_by is stable: ties keep their base order, both
            // ascending and descending.
            rows.sort_by(|a, b| {
                let ord = (col.accessor)(a).compare(&(col.accessor)(b));
                match state.sort_direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
    }

    let total_count = rows.len();
    let total_pages = total_pages(total_count, page_size);
    let page = state.current_page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_count);

    TableSlice {
        page_records: rows[start..end].to_vec(),
        total_pages,
        total_count,
        range_start: if total_count == 0 { 0 } else { start + 1 },
        range_end: end,
    }
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    count.div_ceil(page_size).max(1)
}

fn filtered<'a, R>(records: &'a [R], columns: &[Column<R>], term: &str) -> Vec<&'a R> {
    if term.is_empty() {
        return records.iter().collect();
    }
    let needle = term.to_lowercase();
    records
        .iter()
        .filter(|r| {
            columns.iter().any(|c| {
                let cell = (c.accessor)(r);
                !matches!(cell, CellValue::Missing)
                    && cell.display().to_lowercase().contains(&needle)
            })
        })
        .collect()
}

fn keys_unique<R>(columns: &[Column<R>]) -> bool {
    for (i, a) in columns.iter().enumerate() {
        if columns[i + 1..].iter().any(|b| b.key == a.key) {
            return false;
        }
    }
    true
}
