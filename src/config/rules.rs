//! Rule tables for each writable resource.

use crate::config::types::{RuleSet, ValidationRule};

const SLUG_PATTERN: &str = r"^[a-z0-9]+(?:-[a-z0-9]+)*$";

fn set(entries: Vec<(&str, ValidationRule)>) -> RuleSet {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

pub fn collection() -> RuleSet {
    set(vec![("title", ValidationRule::required().length(1, 255))])
}

pub fn product() -> RuleSet {
    set(vec![
        ("title", ValidationRule::required().length(1, 255)),
        ("slug", ValidationRule::optional().non_null().length(1, 255).pattern(SLUG_PATTERN)),
        ("description", ValidationRule::optional().max_len(10_000)),
        ("unit_price", ValidationRule::required().range(Some(1.0), Some(9999.99))),
        ("inventory", ValidationRule::required().range(Some(0.0), Some(f64::from(i32::MAX)))),
        ("collection_ids", ValidationRule::required()),
    ])
}

pub fn review() -> RuleSet {
    set(vec![
        ("rating", ValidationRule::required().range(Some(1.0), Some(5.0))),
        ("name", ValidationRule::optional().non_null().length(1, 255)),
        ("description", ValidationRule::required().length(1, 5_000)),
    ])
}

pub fn cart_item_add() -> RuleSet {
    set(vec![
        ("product_id", ValidationRule::required().range(Some(1.0), None)),
        ("quantity", ValidationRule::required().range(Some(1.0), Some(f64::from(i16::MAX)))),
    ])
}

pub fn cart_item_update() -> RuleSet {
    set(vec![(
        "quantity",
        ValidationRule::required().range(Some(1.0), Some(f64::from(i16::MAX))),
    )])
}

pub fn register() -> RuleSet {
    set(vec![
        ("email", ValidationRule::required().format("email").length(3, 254)),
        ("password", ValidationRule::required().length(1, 128)),
        ("first_name", ValidationRule::optional().length(0, 255)),
        ("last_name", ValidationRule::optional().length(0, 255)),
    ])
}

pub fn login() -> RuleSet {
    set(vec![
        ("email", ValidationRule::required()),
        ("password", ValidationRule::required()),
    ])
}

pub fn role_update() -> RuleSet {
    set(vec![("role", ValidationRule::required().allowed(&["customer", "admin"]))])
}

pub fn order_create() -> RuleSet {
    set(vec![("cart_id", ValidationRule::required().format("uuid"))])
}

pub fn order_update() -> RuleSet {
    set(vec![(
        "payment_status",
        ValidationRule::required().allowed(&["pending", "complete", "failed"]),
    )])
}
