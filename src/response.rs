//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

/// Page-number pagination metadata. `next`/`previous` are page numbers.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct MetaPage {
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub next: Option<u32>,
    pub previous: Option<u32>,
}

impl MetaPage {
    pub fn new(count: u64, page: u32, page_size: u32) -> Self {
        let last = last_page(count, page_size);
        MetaPage {
            count,
            page,
            page_size,
            next: (page < last).then_some(page + 1),
            previous: (page > 1).then(|| page - 1),
        }
    }
}

/// Number of the last page; an empty result still has page 1.
pub fn last_page(count: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = count.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[derive(Serialize)]
pub struct SuccessPage<T> {
    pub data: Vec<T>,
    pub meta: MetaPage,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::CREATED,
        Json(SuccessOne {
            data,
            meta: None,
        }),
    )
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::OK,
        Json(SuccessOne {
            data,
            meta: None,
        }),
    )
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count },
        }),
    )
}

pub fn success_page<T: Serialize>(data: Vec<T>, meta: MetaPage) -> (StatusCode, Json<SuccessPage<T>>) {
    (StatusCode::OK, Json(SuccessPage { data, meta }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_of_three_pages() {
        let meta = MetaPage::new(25, 1, 10);
        assert_eq!(meta.next, Some(2));
        assert_eq!(meta.previous, None);
    }

    #[test]
    fn last_page_has_no_next() {
        let meta = MetaPage::new(25, 3, 10);
        assert_eq!(meta.next, None);
        assert_eq!(meta.previous, Some(2));
    }

    #[test]
    fn empty_result_is_single_page() {
        assert_eq!(last_page(0, 10), 1);
        assert_eq!(last_page(10, 10), 1);
        assert_eq!(last_page(11, 10), 2);
        let meta = MetaPage::new(0, 1, 10);
        assert_eq!((meta.next, meta.previous), (None, None));
    }
}
