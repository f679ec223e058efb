//! Page tracking for the airport search.

use serde::{Deserialize, Serialize};

use crate::models::{Airport, AirportPage};

/// Rows per page of the airport search.
pub const AIRPORTS_PER_PAGE: usize = 100;

/// Search criteria of the airports pane.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AirportFilters {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl AirportFilters {
    fn trimmed(self) -> Self {
        Self {
            search: self.search.trim().to_string(),
            country: self.country.trim().to_string(),
            kind: self.kind.trim().to_string(),
        }
    }
}

/// Parameters of one `/search_airports` request.
#[derive(Debug, Clone, PartialEq)]
pub struct AirportQuery {
    pub filters: AirportFilters,
    pub limit: usize,
    pub offset: usize,
}

impl AirportQuery {
    /// Query string pairs; empty criteria are left out.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if !self.filters.search.is_empty() {
            pairs.push(("search", self.filters.search.clone()));
        }
        if !self.filters.country.is_empty() {
            pairs.push(("country", self.filters.country.clone()));
        }
        if !self.filters.kind.is_empty() {
            pairs.push(("type", self.filters.kind.clone()));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs.push(("offset", self.offset.to_string()));
        pairs
    }
}

/// Current page, total and rows of the airport search.
#[derive(Debug, Clone, PartialEq)]
pub struct AirportPager {
    page: usize,
    page_size: usize,
    total: usize,
    filters: AirportFilters,
    rows: Vec<Airport>,
    searched: bool,
}

impl Default for AirportPager {
    fn default() -> Self {
        Self::new(AIRPORTS_PER_PAGE)
    }
}

impl AirportPager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total: 0,
            filters: AirportFilters::default(),
            rows: Vec::new(),
            searched: false,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn filters(&self) -> &AirportFilters {
        &self.filters
    }

    pub fn rows(&self) -> &[Airport] {
        &self.rows
    }

    /// Whether a search result has been received at least once.
    pub fn searched(&self) -> bool {
        self.searched
    }

    pub fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    /// `ceil(total / page_size)`; zero while nothing matched.
    pub fn last_page(&self) -> usize {
        self.total.div_ceil(self.page_size)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.last_page()
    }

    /// Request for the current page.
    pub fn query(&self) -> AirportQuery {
        AirportQuery {
            filters: self.filters.clone(),
            limit: self.page_size,
            offset: self.offset(),
        }
    }

    /// New criteria always start from the first page.
    pub fn set_filters(&mut self, filters: AirportFilters) {
        self.filters = filters.trimmed();
        self.page = 1;
    }

    pub fn reset_filters(&mut self) {
        self.set_filters(AirportFilters::default());
    }

    /// Moves one page forward; returns `false` when already on the last page.
    pub fn next(&mut self) -> bool {
        if self.has_next() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Moves one page back; returns `false` when already on the first page.
    pub fn prev(&mut self) -> bool {
        if self.has_prev() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Replaces the total and the rows with a fresh search result.
    ///
    /// When the total shrank below the current page, the page is pulled back
    /// to the last one and `true` is returned: the rows are then stale and
    /// the search has to be run again.
    pub fn apply(&mut self, result: AirportPage) -> bool {
        self.total = result.total;
        self.rows = result.airports;
        self.searched = true;
        let page = self.page.clamp(1, self.last_page().max(1));
        let moved = page != self.page;
        self.page = page;
        moved
    }
}
