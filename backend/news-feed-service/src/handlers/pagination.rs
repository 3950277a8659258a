//! Page-number pagination shared by list endpoints.
//!
//! `?page=<n>` (1-based, or `last`) and `?page_size=<m>`. Any page that does
//! not exist is a 404 `Invalid page.`, except page 1 of an empty list.

use actix_web::HttpRequest;

use crate::error::{AppError, Result};

pub const PAGE_PARAM: &str = "page";
pub const INVALID_PAGE: &str = "Invalid page.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    Number(usize),
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: PageNumber,
    pub page_size: usize,
}

impl PageRequest {
    /// A missing page means the first one. A page size that is missing, not
    /// a positive integer or zero falls back to `default_size`; larger
    /// sizes are clamped to `max_size`.
    pub fn parse(
        page: Option<&str>,
        page_size: Option<&str>,
        default_size: usize,
        max_size: usize,
    ) -> Result<Self> {
        let page = match page.map(str::trim) {
            None | Some("") => PageNumber::Number(1),
            Some("last") => PageNumber::Last,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 1 => PageNumber::Number(n as usize),
                _ => return Err(invalid_page()),
            },
        };

        let page_size = page_size
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|size| *size > 0)
            .map(|size| (size as usize).min(max_size))
            .unwrap_or(default_size);

        Ok(Self { page, page_size })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: usize,
    pub number: usize,
    pub num_pages: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

pub fn paginate<T>(items: Vec<T>, request: &PageRequest) -> Result<Page<T>> {
    let count = items.len();
    let page_size = request.page_size.max(1);
    let num_pages = count.div_ceil(page_size).max(1);

    let number = match request.page {
        PageNumber::Number(n) => n,
        PageNumber::Last => num_pages,
    };
    if number == 0 || number > num_pages {
        return Err(invalid_page());
    }

    let start = (number - 1) * page_size;
    let items = items.into_iter().skip(start).take(page_size).collect();

    Ok(Page {
        items,
        count,
        number,
        num_pages,
    })
}

/// Absolute `next` / `previous` links for a page, keeping every other query
/// parameter. The link to page 1 carries no `page` parameter.
pub fn page_links<T>(req: &HttpRequest, page: &Page<T>) -> (Option<String>, Option<String>) {
    let next = page
        .has_next()
        .then(|| page_url(req, Some(page.number + 1)));

    let previous = page.has_previous().then(|| {
        let target = page.number - 1;
        page_url(req, (target > 1).then_some(target))
    });

    (next, previous)
}

fn page_url(req: &HttpRequest, page: Option<usize>) -> String {
    let info = req.connection_info();
    let mut params: Vec<String> = req
        .query_string()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(PAGE_PARAM))
        .map(str::to_string)
        .collect();

    if let Some(n) = page {
        params.push(format!("{}={}", PAGE_PARAM, n));
    }

    let base = format!("{}://{}{}", info.scheme(), info.host(), req.path());
    if params.is_empty() {
        base
    } else {
        format!("{}?{}", base, params.join("&"))
    }
}

fn invalid_page() -> AppError {
    AppError::NotFound(INVALID_PAGE.to_string())
}
