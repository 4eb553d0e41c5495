//! Page-number pagination: `{count, next, previous, results}`.

use crate::config::MAX_PAGE_SIZE;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{header::HOST, request::Parts},
};
use serde::Serialize;
use std::convert::Infallible;
use url::form_urlencoded;

const INVALID_PAGE: &str = "Invalid page.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// `page` is 1-based; `limit` falls back to `default_size` and is capped.
    pub fn new(page: Option<u32>, limit: Option<u32>, default_size: u32) -> ApiResult<Self> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(ApiError::not_found(INVALID_PAGE));
        }
        let size = limit
            .filter(|&limit| limit > 0)
            .unwrap_or(default_size)
            .min(MAX_PAGE_SIZE);
        Ok(Self { page, size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.size)
    }

    /// The first page always exists; later pages must start before `total`.
    pub fn ensure_in_range(&self, total: i64) -> ApiResult<()> {
        if self.page > 1 && self.offset() >= total {
            return Err(ApiError::not_found(INVALID_PAGE));
        }
        Ok(())
    }

    pub fn has_next(&self, total: i64) -> bool {
        self.offset() + self.limit() < total
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, request: PageRequest, url: &RequestUrl) -> Self {
        let next = request
            .has_next(count)
            .then(|| url.with_page(request.page() + 1));
        let previous = (request.page() > 1).then(|| url.with_page(request.page() - 1));
        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// Absolute URL of the current request, used for `next` / `previous` links.
#[derive(Debug, Clone)]
pub struct RequestUrl {
    base: String,
    query: Vec<(String, String)>,
}

impl RequestUrl {
    pub fn new(scheme: &str, host: &str, path: &str, query: Option<&str>) -> Self {
        let query = form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();
        Self {
            base: format!("{scheme}://{host}{path}"),
            query,
        }
    }

    /// Same URL with `page` replaced; page 1 drops the parameter.
    pub fn with_page(&self, page: u32) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.query.iter().filter(|(key, _)| key != "page") {
            serializer.append_pair(key, value);
        }
        if page > 1 {
            serializer.append_pair("page", &page.to_string());
        }
        let query = serializer.finish();
        if query.is_empty() {
            self.base.clone()
        } else {
            format!("{}?{query}", self.base)
        }
    }
}

impl<S> FromRequestParts<S> for RequestUrl
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Nested routers strip their prefix from `parts.uri`
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.clone(), |original| original.0.clone());
        let host = parts
            .headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| uri.authority().map(|authority| authority.as_str()))
            .unwrap_or("localhost");
        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("http");

        Ok(Self::new(scheme, host, uri.path(), uri.query()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_caps() {
        let request = PageRequest::new(None, None, 6).unwrap();
        assert_eq!((request.page(), request.limit(), request.offset()), (1, 6, 0));

        let request = PageRequest::new(Some(3), Some(500), 6).unwrap();
        assert_eq!(request.limit(), i64::from(MAX_PAGE_SIZE));
        assert_eq!(request.offset(), 200);
    }

    #[test]
    fn page_zero_is_invalid() {
        assert!(matches!(
            PageRequest::new(Some(0), None, 6),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn pages_past_the_end_are_not_found() {
        let first = PageRequest::new(Some(1), Some(6), 6).unwrap();
        assert!(first.ensure_in_range(0).is_ok());

        let second = PageRequest::new(Some(2), Some(6), 6).unwrap();
        assert!(second.ensure_in_range(7).is_ok());
        assert!(second.ensure_in_range(6).is_err());
    }

    #[test]
    fn next_and_previous_links_keep_filters() {
        let url = RequestUrl::new(
            "http",
            "example.com",
            "/api/recipes/",
            Some("tags=lunch&tags=dinner&page=2&limit=2"),
        );
        let request = PageRequest::new(Some(2), Some(2), 6).unwrap();
        let page = Page::new(vec![1, 2], 5, request, &url);

        assert_eq!(page.count, 5);
        assert_eq!(
            page.next.as_deref(),
            Some("http://example.com/api/recipes/?tags=lunch&tags=dinner&limit=2&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://example.com/api/recipes/?tags=lunch&tags=dinner&limit=2")
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let url = RequestUrl::new("http", "example.com", "/api/users/", None);
        let request = PageRequest::new(None, None, 6).unwrap();
        let page = Page::new(vec!["a"], 1, request, &url);
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }
}
