//! Listing options and cursor pagination.
//!
//! Listings default to `createdAt` descending. Pages are keyed by the id of
//! the last document seen, so a walk can be resumed from any [`PageToken`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use models::Document;

use crate::backend::Query;

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filter and ordering applied to a listing.
#[derive(Clone, Debug, PartialEq)]
pub struct ListOptions {
    pub filters: Vec<(String, Value)>,
    pub order_by: String,
    pub descending: bool,
    /// items per page
    pub page_size: u32,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self { filters: Vec::new(), order_by: "createdAt".into(), descending: true, page_size: DEFAULT_PAGE_SIZE }
    }
}

impl ListOptions {
    /// Only documents whose `attribute` equals `value`.
    pub fn filter(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((attribute.into(), value.into()));
        self
    }

    pub fn order_by(mut self, attribute: impl Into<String>, descending: bool) -> Self {
        self.order_by = attribute.into();
        self.descending = descending;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Clamp to sane bounds
    pub fn normalized_page_size(&self) -> u32 { self.page_size.clamp(1, MAX_PAGE_SIZE) }

    pub fn to_queries(&self, after: Option<&PageToken>) -> Vec<Query> {
        let mut queries: Vec<Query> = self
            .filters
            .iter()
            .map(|(attribute, value)| Query::equal(attribute.clone(), value.clone()))
            .collect();
        queries.push(if self.descending {
            Query::order_desc(self.order_by.clone())
        } else {
            Query::order_asc(self.order_by.clone())
        });
        queries.push(Query::Limit(self.normalized_page_size()));
        if let Some(token) = after {
            queries.push(Query::CursorAfter(token.0.clone()));
        }
        queries
    }
}

/// Resume point: the id of the last document of the previous page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageToken(String);

impl PageToken {
    pub fn after(document_id: impl Into<String>) -> Self { Self(document_id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<Document<T>>,
    /// Matching documents across all pages.
    pub total: u64,
    /// Present while the page came back full.
    pub next: Option<PageToken>,
}

impl<T> Page<T> {
    pub(crate) fn from_items(items: Vec<Document<T>>, total: u64, page_size: u32) -> Self {
        let next = if items.len() as u32 >= page_size {
            items.last().map(|d| PageToken::after(d.id.clone()))
        } else {
            None
        };
        Self { items, total, next }
    }

    pub fn is_last(&self) -> bool { self.next.is_none() }
}
