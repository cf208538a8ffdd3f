//! Query-string parsing for the product list: filters, search, ordering, page.

use crate::error::AppError;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProductOrdering {
    #[default]
    Id,
    UnitPriceAsc,
    UnitPriceDesc,
    LastUpdateAsc,
    LastUpdateDesc,
    TitleAsc,
    TitleDesc,
}

impl ProductOrdering {
    /// Parse `unit_price`, `-unit_price`, `last_update`, `-last_update`, `title`, `-title`.
    /// Anything else is ignored and falls back to id order.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "unit_price" => ProductOrdering::UnitPriceAsc,
            "-unit_price" => ProductOrdering::UnitPriceDesc,
            "last_update" => ProductOrdering::LastUpdateAsc,
            "-last_update" => ProductOrdering::LastUpdateDesc,
            "title" => ProductOrdering::TitleAsc,
            "-title" => ProductOrdering::TitleDesc,
            _ => ProductOrdering::Id,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProductFilter {
    pub collection_id: Option<i64>,
    pub unit_price_gt: Option<Decimal>,
    pub unit_price_lt: Option<Decimal>,
    pub search: Option<String>,
    pub ordering: ProductOrdering,
    /// 1-based.
    pub page: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        ProductFilter {
            collection_id: None,
            unit_price_gt: None,
            unit_price_lt: None,
            search: None,
            ordering: ProductOrdering::Id,
            page: 1,
        }
    }
}

impl ProductFilter {
    /// Build from raw query parameters. Unknown keys are ignored.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let mut filter = ProductFilter::default();
        for (k, v) in params {
            let v = v.trim();
            if v.is_empty() {
                continue;
            }
            match k.as_str() {
                "collection_id" => {
                    let id = v
                        .parse()
                        .map_err(|_| AppError::Validation("collection_id must be an integer".into()))?;
                    filter.collection_id = Some(id);
                }
                "unit_price__gt" => filter.unit_price_gt = Some(parse_price(k, v)?),
                "unit_price__lt" => filter.unit_price_lt = Some(parse_price(k, v)?),
                "search" => filter.search = Some(v.to_string()),
                "ordering" => filter.ordering = ProductOrdering::parse(v),
                "page" => {
                    filter.page = v
                        .parse::<u32>()
                        .ok()
                        .filter(|p| *p >= 1)
                        .ok_or_else(|| AppError::NotFound("invalid page".into()))?;
                }
                _ => {}
            }
        }
        Ok(filter)
    }

    pub fn offset(&self, page_size: u32) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(page_size)
    }
}

fn parse_price(key: &str, v: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(v).map_err(|_| AppError::Validation(format!("{} must be a decimal number", key)))
}
