use std::fmt;

use crate::records::{GrievanceStatus, Record};

/// Value carried by a status filter button (`data-filter`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    All,
    Only(GrievanceStatus),
}

impl StatusFilter {
    pub fn parse(value: &str) -> Option<Self> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        GrievanceStatus::parse(value).map(Self::Only)
    }

    pub fn matches(self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::Only(status) => record.status == status,
        }
    }

    pub fn data_value(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Only(status) => status.label(),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.data_value())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// The most recent search or button click alone decides visibility.
    #[default]
    Last,
    /// A record must pass both the search term and the active button.
    Combined,
}

impl FilterMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "last" | "last-wins" => Some(Self::Last),
            "combined" | "and" => Some(Self::Combined),
            _ => None,
        }
    }
}

pub fn normalize_term(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// `term` must already be normalized.
pub fn search_matches(record: &Record, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    record.id.to_lowercase().contains(term)
        || record.status.label().to_lowercase().contains(term)
        || record.content.to_lowercase().contains(term)
}

/// Filter buttons with a single active selection.
#[derive(Clone, Debug)]
pub struct FilterBar {
    buttons: Vec<StatusFilter>,
    active: usize,
}

impl Default for FilterBar {
    fn default() -> Self {
        let mut buttons = vec![StatusFilter::All];
        buttons.extend(GrievanceStatus::ALL.into_iter().map(StatusFilter::Only));
        Self { buttons, active: 0 }
    }
}

impl FilterBar {
    pub fn buttons(&self) -> &[StatusFilter] {
        &self.buttons
    }

    pub fn active(&self) -> StatusFilter {
        self.buttons[self.active]
    }

    pub fn is_active(&self, filter: StatusFilter) -> bool {
        self.active() == filter
    }

    /// Activates the button for `filter`, deactivating every other one.
    /// Returns false when no such button exists.
    pub fn select(&mut self, filter: StatusFilter) -> bool {
        match self.buttons.iter().position(|b| *b == filter) {
            Some(idx) => {
                self.active = idx;
                true
            }
            None => false,
        }
    }
}

/// Which rule produced the current visibility in [`FilterMode::Last`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LastRule {
    Search,
    Status,
}

#[derive(Clone, Debug)]
pub struct FilterState {
    pub mode: FilterMode,
    pub bar: FilterBar,
    term: String,
    last: LastRule,
}

impl FilterState {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            bar: FilterBar::default(),
            term: String::new(),
            last: LastRule::Status,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn set_term(&mut self, raw: &str) {
        self.term = normalize_term(raw);
        self.last = LastRule::Search;
    }

    pub fn select(&mut self, filter: StatusFilter) -> bool {
        let ok = self.bar.select(filter);
        if ok {
            self.last = LastRule::Status;
        }
        ok
    }

    pub fn is_visible(&self, record: &Record) -> bool {
        match self.mode {
            FilterMode::Combined => {
                search_matches(record, &self.term) && self.bar.active().matches(record)
            }
            FilterMode::Last => match self.last {
                LastRule::Search => search_matches(record, &self.term),
                LastRule::Status => self.bar.active().matches(record),
            },
        }
    }
}

pub fn visible_records<'a>(records: &'a [Record], state: &FilterState) -> Vec<&'a Record> {
    records.iter().filter(|r| state.is_visible(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Record> {
        vec![
            Record::new("482913", GrievanceStatus::Pending, "Category: [Water] supply cut"),
            Record::new("100200", GrievanceStatus::Resolved, "Category: [Roads] pothole"),
            Record::new("777001", GrievanceStatus::InProgress, "Sentiment: WATER logging"),
        ]
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn search_is_case_insensitive_over_all_fields() {
        let records = sample();
        let mut state = FilterState::new(FilterMode::Last);

        state.set_term("water");
        assert_eq!(ids(&visible_records(&records, &state)), vec!["482913", "777001"]);

        state.set_term("RESOLVED");
        assert_eq!(ids(&visible_records(&records, &state)), vec!["100200"]);

        state.set_term("1002");
        assert_eq!(ids(&visible_records(&records, &state)), vec!["100200"]);

        state.set_term("progress");
        assert_eq!(ids(&visible_records(&records, &state)), vec!["777001"]);
    }

    #[test]
    fn empty_term_shows_everything() {
        let records = sample();
        let mut state = FilterState::new(FilterMode::Last);
        state.set_term("zzz");
        assert!(visible_records(&records, &state).is_empty());
        state.set_term("");
        assert_eq!(visible_records(&records, &state).len(), 3);
    }

    #[test]
    fn filter_bar_keeps_one_active_button() {
        let mut bar = FilterBar::default();
        assert_eq!(bar.active(), StatusFilter::All);
        assert!(bar.select(StatusFilter::Only(GrievanceStatus::Resolved)));
        let active: Vec<_> = bar.buttons().iter().filter(|b| bar.is_active(**b)).collect();
        assert_eq!(active, vec![&StatusFilter::Only(GrievanceStatus::Resolved)]);
    }

    #[test]
    fn status_filter_shows_exact_matches() {
        let records = sample();
        let mut state = FilterState::new(FilterMode::Last);
        state.select(StatusFilter::Only(GrievanceStatus::Pending));
        assert_eq!(ids(&visible_records(&records, &state)), vec!["482913"]);
        state.select(StatusFilter::Only(GrievanceStatus::Rejected));
        assert!(visible_records(&records, &state).is_empty());
        state.select(StatusFilter::All);
        assert_eq!(visible_records(&records, &state).len(), 3);
    }

    #[test]
    fn last_mode_uses_most_recent_rule() {
        let records = sample();
        let mut state = FilterState::new(FilterMode::Last);
        state.select(StatusFilter::Only(GrievanceStatus::Resolved));
        state.set_term("water");
        assert_eq!(ids(&visible_records(&records, &state)), vec!["482913", "777001"]);
    }

    #[test]
    fn combined_mode_intersects() {
        let records = sample();
        let mut state = FilterState::new(FilterMode::Combined);
        state.select(StatusFilter::Only(GrievanceStatus::Pending));
        state.set_term("water");
        assert_eq!(ids(&visible_records(&records, &state)), vec!["482913"]);
    }

    #[test]
    fn parse_filter_values() {
        assert_eq!(StatusFilter::parse("ALL"), Some(StatusFilter::All));
        assert_eq!(
            StatusFilter::parse("resolved"),
            Some(StatusFilter::Only(GrievanceStatus::Resolved))
        );
        assert_eq!(StatusFilter::parse("nope"), None);
    }
}
