//! Pure browse-page operations over catalog items.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::models::CatalogItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortCriterion {
    #[default]
    Newest,
    Oldest,
    EcoPointsHigh,
    EcoPointsLow,
    NameAsc,
    NameDesc,
    Upvotes,
}

// case-insensitive, raw title breaks ties between case variants
fn by_title(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.title.cmp(&b.title))
}

impl SortCriterion {
    pub const ALL: [SortCriterion; 7] = [
        SortCriterion::Newest,
        SortCriterion::Oldest,
        SortCriterion::EcoPointsHigh,
        SortCriterion::EcoPointsLow,
        SortCriterion::NameAsc,
        SortCriterion::NameDesc,
        SortCriterion::Upvotes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortCriterion::Newest => "newest",
            SortCriterion::Oldest => "oldest",
            SortCriterion::EcoPointsHigh => "eco-points-high",
            SortCriterion::EcoPointsLow => "eco-points-low",
            SortCriterion::NameAsc => "name-asc",
            SortCriterion::NameDesc => "name-desc",
            SortCriterion::Upvotes => "upvotes",
        }
    }

    fn primary(&self, a: &CatalogItem, b: &CatalogItem) -> Ordering {
        match self {
            SortCriterion::Newest => b.posted_at.cmp(&a.posted_at),
            SortCriterion::Oldest => a.posted_at.cmp(&b.posted_at),
            SortCriterion::EcoPointsHigh => b.price.cmp(&a.price),
            SortCriterion::EcoPointsLow => a.price.cmp(&b.price),
            SortCriterion::NameAsc => by_title(a, b),
            SortCriterion::NameDesc => by_title(b, a),
            SortCriterion::Upvotes => b.upvotes.cmp(&a.upvotes),
        }
    }

    /// Total order: the criterion's key, then ascending id.
    pub fn compare(&self, a: &CatalogItem, b: &CatalogItem) -> Ordering {
        self.primary(a, b).then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortCriterion {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SortCriterion::ALL.into_iter().find(|c| c.as_str() == s).ok_or(())
    }
}

/// Case-insensitive match on title, description or any tag. A blank term keeps everything.
pub fn filter(items: &[CatalogItem], search: &str) -> Vec<CatalogItem> {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|i| {
            i.title.to_lowercase().contains(&needle)
                || i.description.to_lowercase().contains(&needle)
                || i.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

pub fn sort(items: &[CatalogItem], criterion: SortCriterion) -> Vec<CatalogItem> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| criterion.compare(a, b));
    sorted
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<CatalogItem>,
    /// 1-based page actually returned after clamping.
    pub page: usize,
    pub total_pages: usize,
}

/// `page` is clamped into `[1, total_pages]`. An empty list yields one empty page 1.
pub fn paginate(items: &[CatalogItem], page_size: usize, page: usize) -> Page {
    let page_size = page_size.max(1);
    let total_pages = items.len().div_ceil(page_size);
    let page = page.clamp(1, total_pages.max(1));
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(items.len());
    Page { items: items.get(start..end).map(<[_]>::to_vec).unwrap_or_default(), page, total_pages }
}

/// Browse-page controls. Changing the search term or sort order returns to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseState {
    search: String,
    sort: SortCriterion,
    page: usize,
    page_size: usize,
}

impl BrowseState {
    pub fn new(page_size: usize) -> Self {
        Self { search: String::new(), sort: SortCriterion::default(), page: 1, page_size: page_size.max(1) }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> SortCriterion {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.page = 1;
    }

    pub fn set_sort(&mut self, criterion: SortCriterion) {
        self.sort = criterion;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Filter, sort, then paginate. The stored page is updated to the clamped value.
    pub fn apply(&mut self, items: &[CatalogItem]) -> Page {
        let filtered = filter(items, &self.search);
        let out = paginate(&sort(&filtered, self.sort), self.page_size, self.page);
        self.page = out.page;
        out
    }
}
