use askama_actix::Template;

const PAGINATOR_LOOK_AHEAD: u64 = 2;

/// A slice of a larger ordered collection.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served.
    pub number: u64,
    pub num_pages: u64,
    /// Total items across all pages.
    pub count: u64,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}

/// Number of pages needed for `count` items. An empty collection still has one page.
pub fn page_count(count: u64, per_page: u64) -> u64 {
    if count == 0 || per_page == 0 {
        1
    } else {
        (count + per_page - 1) / per_page
    }
}

/// Resolves the `?page=` value to a page number.
///
/// Missing or non-numeric input yields the first page; a number outside
/// `1..=num_pages` yields the last page.
pub fn resolve_page(requested: Option<&str>, num_pages: u64) -> u64 {
    match requested.map(|p| p.trim().parse::<i64>()) {
        None | Some(Err(_)) => 1,
        Some(Ok(n)) if n < 1 || n as u64 > num_pages => num_pages,
        Some(Ok(n)) => n as u64,
    }
}

/// Offset of the first item on `page`.
pub fn page_offset(page: u64, per_page: u64) -> u64 {
    (page - 1) * per_page
}

/// One slot in the page navigation; `None` marks a gap.
#[derive(Debug, PartialEq, Eq)]
pub struct PageLink {
    pub number: Option<u64>,
    pub current: bool,
}

/// [1] 2 3 ... 13
/// 1 2 [3] 4 5 ... 13
/// 1 ... 4 5 [6] 7 8 ... 13
/// 1 ... 11 12 [13]
#[derive(Debug)]
pub struct Paginator {
    pub base_url: String,
    pub this_page: u64,
    pub page_count: u64,
}

#[derive(Template)]
#[template(path = "util/paginator.html")]
struct PaginatorTemplate<'a> {
    paginator: &'a Paginator,
    links: Vec<PageLink>,
}

impl Paginator {
    pub fn new(base_url: impl Into<String>, page: &Page<impl Sized>) -> Self {
        Self {
            base_url: base_url.into(),
            this_page: page.number,
            page_count: page.num_pages,
        }
    }

    pub fn has_pages(&self) -> bool {
        self.page_count > 1
    }

    pub fn url_for(&self, page: impl std::fmt::Display) -> String {
        format!("{}?page={}", self.base_url, page)
    }

    /// First and last page are always shown; pages within the look-ahead of
    /// the current page are shown; everything else collapses into gaps.
    pub fn links(&self) -> Vec<PageLink> {
        let low = self.this_page.saturating_sub(PAGINATOR_LOOK_AHEAD).max(1);
        let high = (self.this_page + PAGINATOR_LOOK_AHEAD).min(self.page_count);
        let mut links = Vec::new();

        for number in 1..=self.page_count {
            let shown = number == 1 || number == self.page_count || (low..=high).contains(&number);
            if shown {
                links.push(PageLink {
                    number: Some(number),
                    current: number == self.this_page,
                });
            } else if links.last().map_or(true, |l: &PageLink| l.number.is_some()) {
                links.push(PageLink {
                    number: None,
                    current: false,
                });
            }
        }

        links
    }

    pub fn as_html(&self) -> String {
        if !self.has_pages() {
            return String::new();
        }

        let template = PaginatorTemplate {
            paginator: self,
            links: self.links(),
        };
        let mut buffer = String::new();
        if template.render_into(&mut buffer).is_err() {
            "[Paginator Util Error]".to_owned()
        } else {
            buffer
        }
    }
}
