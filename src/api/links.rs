//! `next` / `previous` links for paginated list responses

use axum::http::{HeaderMap, Uri, header::HOST};
use serde::Serialize;
use url::form_urlencoded;

use crate::query::Page;

/// Builds links back to the current list URL with a different `page`
#[derive(Debug, Clone)]
pub struct PageLinks {
    /// Scheme and authority, e.g. `https://books.example.com`; empty for path-only links
    origin: String,
    path: String,
    /// Every query pair except `page`, sorted by key
    params: Vec<(String, String)>,
}

impl PageLinks {
    /// `public_url` wins over the `Host` header; with neither, links are paths
    pub fn new(public_url: Option<&str>, headers: &HeaderMap, uri: &Uri) -> Self {
        let origin = match public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => headers
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .map(|host| {
                    let scheme = headers
                        .get("x-forwarded-proto")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("http");
                    format!("{}://{}", scheme, host)
                })
                .unwrap_or_default(),
        };

        let mut params: Vec<(String, String)> = form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
            .filter(|(k, _)| k != "page")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            origin,
            path: uri.path().to_string(),
            params,
        }
    }

    /// Link to `page`; page 1 carries no `page` parameter
    pub fn link(&self, page: u32) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let mut pairs: Vec<(&str, String)> = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        if page > 1 {
            pairs.push(("page", page.to_string()));
            pairs.sort_by(|a, b| a.0.cmp(b.0));
        }
        serializer.extend_pairs(pairs);
        let query = serializer.finish();

        if query.is_empty() {
            format!("{}{}", self.origin, self.path)
        } else {
            format!("{}{}?{}", self.origin, self.path, query)
        }
    }

    pub fn next<T>(&self, page: &Page<T>) -> Option<String> {
        page.next_page().map(|p| self.link(p))
    }

    pub fn previous<T>(&self, page: &Page<T>) -> Option<String> {
        page.previous_page().map(|p| self.link(p))
    }
}

/// List envelope: `{count, next, previous, results}`
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T: Serialize> Paginated<T> {
    pub fn new<R>(page: Page<R>, links: &PageLinks, f: impl FnMut(R) -> T) -> Self {
        let next = links.next(&page);
        let previous = links.previous(&page);
        let count = page.count;
        Self {
            count,
            next,
            previous,
            results: page.items.into_iter().map(f).collect(),
        }
    }
}
