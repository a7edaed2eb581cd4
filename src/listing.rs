// src/listing.rs

//! Paginated list management shared by every back-office list page.
//!
//! Filters are staged locally and only reach the backend once applied, so
//! typing into a search box never triggers a request by itself.
//!
//! Console handlers are stateless per request and only use `ListQuery` and
//! `ListPage`. `ListState` and `DateFilter::date_range` are the surface for
//! embedders that keep a list open across requests.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::common::Paginated};

pub const DEFAULT_PER_PAGE: u32 = 15;
pub const MAX_PER_PAGE: u32 = 100;

static MONTH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());

/// Query-string keys owned by the list machinery; anything else is an extra filter.
const RESERVED_KEYS: &[&str] = &[
    "page",
    "per_page",
    "sort_by",
    "sort_order",
    "search",
    "date_filter_mode",
    "date_field",
    "exact_date",
    "month",
    "year",
    "start_date",
    "end_date",
    "clear",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Date window applied to a list's date column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DateFilter {
    #[default]
    None,
    Exact {
        date: NaiveDate,
    },
    Month {
        year: i32,
        month: u32,
    },
    Year {
        year: i32,
    },
    Range {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl DateFilter {
    pub fn mode(&self) -> Option<&'static str> {
        match self {
            DateFilter::None => None,
            DateFilter::Exact { .. } => Some("exact"),
            DateFilter::Month { .. } => Some("month"),
            DateFilter::Year { .. } => Some("year"),
            DateFilter::Range { .. } => Some("range"),
        }
    }

    /// Parses the `date_filter_mode` family of query parameters.
    /// A mode without its companion value is treated as no filter.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self, AppError> {
        let get = |key: &str| params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let filter = match get("date_filter_mode") {
            None | Some("none") => DateFilter::None,
            Some("exact") => match get("exact_date") {
                Some(raw) => DateFilter::Exact {
                    date: parse_date(raw)?,
                },
                None => DateFilter::None,
            },
            Some("month") => match get("month") {
                Some(raw) => {
                    let caps = MONTH_RE
                        .captures(raw)
                        .ok_or_else(|| AppError::BadRequest(format!("Invalid month '{}'", raw)))?;
                    let year = caps[1].parse::<i32>().unwrap_or_default();
                    let month = caps[2].parse::<u32>().unwrap_or_default();
                    if !(1..=12).contains(&month) {
                        return Err(AppError::BadRequest(format!("Invalid month '{}'", raw)));
                    }
                    DateFilter::Month { year, month }
                }
                None => DateFilter::None,
            },
            Some("year") => match get("year") {
                Some(raw) if YEAR_RE.is_match(raw) => DateFilter::Year {
                    year: raw.parse().unwrap_or_default(),
                },
                Some(raw) => return Err(AppError::BadRequest(format!("Invalid year '{}'", raw))),
                None => DateFilter::None,
            },
            Some("range") => {
                let start = get("start_date").map(parse_date).transpose()?;
                let end = get("end_date").map(parse_date).transpose()?;
                if start.is_none() && end.is_none() {
                    DateFilter::None
                } else {
                    DateFilter::Range { start, end }
                }
            }
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "Unknown date filter mode '{}'",
                    other
                )));
            }
        };

        Ok(filter)
    }

    /// Inclusive window covered by the filter. Open ends are `None`.
    pub fn date_range(&self) -> Option<(Option<NaiveDateTime>, Option<NaiveDateTime>)> {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)?;
        match *self {
            DateFilter::None => None,
            DateFilter::Exact { date } => Some((
                Some(date.and_time(NaiveTime::MIN)),
                Some(date.and_time(end_of_day)),
            )),
            DateFilter::Month { year, month } => {
                let first = NaiveDate::from_ymd_opt(year, month, 1)?;
                let next = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)?
                };
                let last = next.pred_opt()?;
                Some((
                    Some(first.and_time(NaiveTime::MIN)),
                    Some(last.and_time(end_of_day)),
                ))
            }
            DateFilter::Year { year } => Some((
                Some(NaiveDate::from_ymd_opt(year, 1, 1)?.and_time(NaiveTime::MIN)),
                Some(NaiveDate::from_ymd_opt(year, 12, 31)?.and_time(end_of_day)),
            )),
            DateFilter::Range { start, end } => Some((
                start.map(|d| d.and_time(NaiveTime::MIN)),
                end.map(|d| d.and_time(end_of_day)),
            )),
        }
    }

    fn push_pairs(&self, date_field: &str, pairs: &mut Vec<(String, String)>) {
        let Some(mode) = self.mode() else {
            return;
        };
        pairs.push(("date_filter_mode".into(), mode.into()));
        pairs.push(("date_field".into(), date_field.into()));

        match *self {
            DateFilter::None => {}
            DateFilter::Exact { date } => {
                pairs.push(("exact_date".into(), date.format("%Y-%m-%d").to_string()));
            }
            DateFilter::Month { year, month } => {
                pairs.push(("month".into(), format!("{:04}-{:02}", year, month)));
            }
            DateFilter::Year { year } => {
                pairs.push(("year".into(), format!("{:04}", year)));
            }
            DateFilter::Range { start, end } => {
                if let Some(start) = start {
                    pairs.push(("start_date".into(), start.format("%Y-%m-%d").to_string()));
                }
                if let Some(end) = end {
                    pairs.push(("end_date".into(), end.format("%Y-%m-%d").to_string()));
                }
            }
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

/// Per-page defaults of a list.
#[derive(Debug, Clone)]
pub struct ListConfig {
    pub endpoint: &'static str,
    pub per_page: u32,
    pub sort_by: &'static str,
    pub sort_order: SortOrder,
    /// Column the date filter applies to.
    pub date_field: &'static str,
    pub initial_filters: BTreeMap<String, String>,
}

impl ListConfig {
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            per_page: DEFAULT_PER_PAGE,
            sort_by: "created_at",
            sort_order: SortOrder::Desc,
            date_field: "created_at",
            initial_filters: BTreeMap::new(),
        }
    }

    pub fn date_field(mut self, field: &'static str) -> Self {
        self.date_field = field;
        self
    }

    pub fn sort(mut self, field: &'static str, order: SortOrder) -> Self {
        self.sort_by = field;
        self.sort_order = order;
        self
    }
}

/// The applied part of a list's state, i.e. what is actually sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub search: String,
    pub date_filter: DateFilter,
    pub date_field: String,
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn defaults(config: &ListConfig) -> Self {
        Self {
            page: 1,
            per_page: config.per_page.clamp(1, MAX_PER_PAGE),
            sort_by: config.sort_by.to_string(),
            sort_order: config.sort_order,
            search: String::new(),
            date_filter: DateFilter::None,
            date_field: config.date_field.to_string(),
            filters: config.initial_filters.clone(),
        }
    }

    /// Builds the applied query from a console request's query string.
    /// `clear` drops every filter and returns to page 1.
    pub fn from_params(
        config: &ListConfig,
        params: &BTreeMap<String, String>,
    ) -> Result<Self, AppError> {
        let mut query = Self::defaults(config);

        if params.get("clear").is_some_and(|v| v == "1" || v == "true") {
            if let Some(per_page) = parse_number(params, "per_page")? {
                query.per_page = per_page.clamp(1, MAX_PER_PAGE);
            }
            return Ok(query);
        }

        if let Some(page) = parse_number(params, "page")? {
            query.page = page.max(1);
        }
        if let Some(per_page) = parse_number(params, "per_page")? {
            query.per_page = per_page.clamp(1, MAX_PER_PAGE);
        }
        if let Some(sort_by) = params.get("sort_by").filter(|v| !v.is_empty()) {
            query.sort_by = sort_by.clone();
        }
        match params.get("sort_order").map(String::as_str) {
            None | Some("") => {}
            Some("asc") => query.sort_order = SortOrder::Asc,
            Some("desc") => query.sort_order = SortOrder::Desc,
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "sort_order must be 'asc' or 'desc', got '{}'",
                    other
                )));
            }
        }
        if let Some(search) = params.get("search") {
            query.search = search.trim().to_string();
        }
        query.date_filter = DateFilter::from_params(params)?;
        if let Some(field) = params.get("date_field").filter(|v| !v.is_empty()) {
            query.date_field = field.clone();
        }
        for (key, value) in params {
            if !RESERVED_KEYS.contains(&key.as_str()) && !value.is_empty() {
                query.filters.insert(key.clone(), value.clone());
            }
        }

        Ok(query)
    }

    /// Query-string pairs for the backend's paginated list endpoint.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("per_page".to_string(), self.per_page.to_string()),
            ("sort_by".to_string(), self.sort_by.clone()),
            ("sort_order".to_string(), self.sort_order.as_str().to_string()),
        ];
        if !self.search.is_empty() {
            pairs.push(("search".to_string(), self.search.clone()));
        }
        self.date_filter.push_pairs(&self.date_field, &mut pairs);
        for (key, value) in &self.filters {
            if !value.is_empty() {
                pairs.push((key.clone(), value.clone()));
            }
        }
        pairs
    }
}

fn parse_number(params: &BTreeMap<String, String>, key: &str) -> Result<Option<u32>, AppError> {
    match params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{} must be a positive integer", key))),
        None => Ok(None),
    }
}

/// One rendered page of a list.
#[derive(Debug, Clone, Serialize)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> From<Paginated<T>> for ListPage<T> {
    fn from(p: Paginated<T>) -> Self {
        let total_pages = p.total_pages.max(1);
        let page = p.page.max(1);
        Self {
            has_previous: page > 1,
            has_next: page < total_pages,
            items: p.data,
            total: p.total,
            page,
            per_page: p.per_page,
            total_pages,
        }
    }
}

/// Full list state: the applied query, the staged (not yet applied) filters
/// and the last page received. Held by embedders, not by the HTTP handlers.
#[derive(Debug, Clone)]
pub struct ListState<T> {
    config: ListConfig,
    applied: ListQuery,
    staged_search: String,
    staged_date_filter: DateFilter,
    staged_filters: BTreeMap<String, String>,
    page: Option<ListPage<T>>,
    error: Option<String>,
}

impl<T> ListState<T> {
    pub fn new(config: ListConfig) -> Self {
        let applied = ListQuery::defaults(&config);
        Self {
            staged_filters: applied.filters.clone(),
            config,
            applied,
            staged_search: String::new(),
            staged_date_filter: DateFilter::None,
            page: None,
            error: None,
        }
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    /// What the next fetch will send.
    pub fn query(&self) -> &ListQuery {
        &self.applied
    }

    pub fn staged_search(&self) -> &str {
        &self.staged_search
    }

    pub fn current(&self) -> Option<&ListPage<T>> {
        self.page.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn stage_search(&mut self, term: impl Into<String>) {
        self.staged_search = term.into();
    }

    pub fn stage_date_filter(&mut self, filter: DateFilter) {
        self.staged_date_filter = filter;
    }

    pub fn stage_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.staged_filters.insert(key.into(), value.into());
    }

    /// Makes staged filters effective and goes back to the first page.
    pub fn apply(&mut self) {
        self.applied.search = self.staged_search.trim().to_string();
        self.applied.date_filter = self.staged_date_filter;
        self.applied.filters = self
            .staged_filters
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.applied.page = 1;
    }

    /// Resets staged and applied filters to the list defaults, page 1.
    pub fn clear(&mut self) {
        self.staged_search.clear();
        self.staged_date_filter = DateFilter::None;
        self.staged_filters = self.config.initial_filters.clone();
        self.applied.search.clear();
        self.applied.date_filter = DateFilter::None;
        self.applied.filters = self.config.initial_filters.clone();
        self.applied.page = 1;
    }

    pub fn total_pages(&self) -> u32 {
        self.page.as_ref().map(|p| p.total_pages).unwrap_or(1)
    }

    pub fn has_previous(&self) -> bool {
        self.applied.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.applied.page < self.total_pages()
    }

    pub fn set_page(&mut self, page: u32) {
        self.applied.page = page.clamp(1, self.total_pages());
    }

    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.applied.page += 1;
        true
    }

    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.applied.page -= 1;
        true
    }

    pub fn set_page_size(&mut self, per_page: u32) {
        self.applied.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self.applied.page = 1;
    }

    /// Sorts by `field`; without an explicit order, re-selecting the
    /// current column flips its direction.
    pub fn set_sort(&mut self, field: &str, order: Option<SortOrder>) {
        let order = order.unwrap_or_else(|| {
            if self.applied.sort_by == field {
                self.applied.sort_order.toggled()
            } else {
                SortOrder::Asc
            }
        });
        self.applied.sort_by = field.to_string();
        self.applied.sort_order = order;
    }

    /// Stores the outcome of a fetch. On failure the previous page stays
    /// visible under the error banner.
    pub fn receive(&mut self, result: Result<Paginated<T>, AppError>) {
        match result {
            Ok(page) => {
                let page = ListPage::from(page);
                self.applied.page = page.page;
                self.page = Some(page);
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err.banner());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn page_of(page: u32, total_pages: u32) -> Paginated<u32> {
        Paginated {
            data: vec![1, 2, 3],
            total: (total_pages * 3) as u64,
            page,
            per_page: 3,
            total_pages,
        }
    }

    #[test]
    fn test_typing_does_not_change_applied_query() {
        let mut state: ListState<u32> = ListState::new(ListConfig::new("/deliveries"));
        state.stage_search("cardio");
        state.stage_filter("status", "ongoing");

        assert_eq!(state.query().search, "");
        assert!(state.query().filters.is_empty());
        assert_eq!(state.staged_search(), "cardio");

        state.apply();
        assert_eq!(state.query().search, "cardio");
        assert_eq!(state.query().filters.get("status").unwrap(), "ongoing");
    }

    #[test]
    fn test_apply_resets_to_first_page() {
        let mut state: ListState<u32> = ListState::new(ListConfig::new("/exams"));
        state.receive(Ok(page_of(1, 5)));
        state.set_page(4);
        assert_eq!(state.query().page, 4);

        state.stage_search("anatomy");
        state.apply();
        assert_eq!(state.query().page, 1);
    }

    #[test]
    fn test_clear_resets_input_and_applied() {
        let mut state: ListState<u32> = ListState::new(ListConfig::new("/groups"));
        state.receive(Ok(page_of(1, 3)));
        state.stage_search("batch 7");
        state.stage_date_filter(DateFilter::Year { year: 2024 });
        state.apply();
        state.next();

        state.clear();
        assert_eq!(state.staged_search(), "");
        assert_eq!(state.query(), &ListQuery::defaults(state.config()));
    }

    #[test]
    fn test_pagination_boundaries() {
        let mut state: ListState<u32> = ListState::new(ListConfig::new("/categories"));
        state.receive(Ok(page_of(1, 3)));
        assert!(!state.has_previous());
        assert!(!state.previous());
        assert!(state.has_next());

        state.set_page(3);
        assert!(!state.has_next());
        assert!(!state.next());
        assert!(state.has_previous());

        state.set_page(99);
        assert_eq!(state.query().page, 3);
    }

    #[test]
    fn test_page_size_change_resets_page() {
        let mut state: ListState<u32> = ListState::new(ListConfig::new("/deliveries"));
        state.receive(Ok(page_of(2, 4)));
        state.set_page_size(50);
        assert_eq!(state.query().page, 1);
        assert_eq!(state.query().per_page, 50);

        state.set_page_size(1000);
        assert_eq!(state.query().per_page, MAX_PER_PAGE);
    }

    #[test]
    fn test_sort_toggle() {
        let mut state: ListState<u32> = ListState::new(ListConfig::new("/deliveries"));
        state.set_sort("created_at", None);
        assert_eq!(state.query().sort_order, SortOrder::Asc);
        state.set_sort("name", None);
        assert_eq!(state.query().sort_order, SortOrder::Asc);
        state.set_sort("name", None);
        assert_eq!(state.query().sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_failed_fetch_keeps_previous_page() {
        let mut state: ListState<u32> = ListState::new(ListConfig::new("/deliveries"));
        state.receive(Ok(page_of(1, 2)));
        state.receive(Err(AppError::Transport("connection refused".into())));
        assert_eq!(state.error(), Some("connection refused"));
        assert_eq!(state.current().unwrap().items, vec![1, 2, 3]);
    }

    #[test]
    fn test_query_pairs_order_and_date_filter() {
        let config = ListConfig::new("/deliveries").date_field("scheduled_at");
        let query = ListQuery::from_params(
            &config,
            &params(&[
                ("page", "2"),
                ("search", " mock "),
                ("date_filter_mode", "range"),
                ("start_date", "2024-01-01"),
                ("end_date", "2024-01-31"),
                ("status", "ongoing"),
                ("exam_id", ""),
            ]),
        )
        .unwrap();

        let pairs = query.to_query_pairs();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "page",
                "per_page",
                "sort_by",
                "sort_order",
                "search",
                "date_filter_mode",
                "date_field",
                "start_date",
                "end_date",
                "status"
            ]
        );
        assert!(pairs.contains(&("search".to_string(), "mock".to_string())));
        assert!(pairs.contains(&("date_field".to_string(), "scheduled_at".to_string())));
    }

    #[test]
    fn test_clear_param_drops_filters() {
        let config = ListConfig::new("/exams");
        let query = ListQuery::from_params(
            &config,
            &params(&[("clear", "1"), ("search", "x"), ("page", "7")]),
        )
        .unwrap();
        assert_eq!(query, ListQuery::defaults(&config));
    }

    #[test]
    fn test_date_filter_validation() {
        assert!(DateFilter::from_params(&params(&[("date_filter_mode", "month"), ("month", "2024-13")])).is_err());
        assert!(DateFilter::from_params(&params(&[("date_filter_mode", "year"), ("year", "24")])).is_err());
        assert!(DateFilter::from_params(&params(&[("date_filter_mode", "weekly")])).is_err());
        assert_eq!(
            DateFilter::from_params(&params(&[("date_filter_mode", "exact")])).unwrap(),
            DateFilter::None
        );
    }

    #[test]
    fn test_month_range_covers_leap_day() {
        let filter = DateFilter::from_params(&params(&[("date_filter_mode", "month"), ("month", "2024-02")])).unwrap();
        let (start, end) = filter.date_range().unwrap();
        assert_eq!(start.unwrap().to_string(), "2024-02-01 00:00:00");
        assert_eq!(end.unwrap().to_string(), "2024-02-29 23:59:59");

        let december = DateFilter::Month { year: 2023, month: 12 }.date_range().unwrap();
        assert_eq!(december.1.unwrap().to_string(), "2023-12-31 23:59:59");
    }
}
