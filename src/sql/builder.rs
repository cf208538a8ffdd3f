//! Builds the parameterized product list and count queries from a parsed filter.

use crate::service::filters::{ProductFilter, ProductOrdering};
use crate::store::table;
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from code).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Escape `%`, `_` and `\` so user text matches literally inside ILIKE.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    pub fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Push a value and return its cast placeholder, e.g. `$2::numeric`.
    fn placeholder(&mut self, v: Value, pg_type: &str) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, pg_type)
    }
}

impl Default for QueryBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// SELECT list and FROM clause shared by product list and product read. The
/// products table is aliased `p`; collection ids and review aggregates are scalar
/// subqueries so one row comes back per product.
pub fn product_select() -> String {
    let links = table("product_collections");
    let reviews = table("reviews");
    format!(
        "SELECT p.id, p.title, p.slug, p.description, p.unit_price, p.inventory, p.last_update, \
         COALESCE((SELECT array_agg(pc.collection_id ORDER BY pc.collection_id) FROM {links} pc WHERE pc.product_id = p.id), '{{}}'::bigint[]) AS collection_ids, \
         (SELECT COUNT(*) FROM {reviews} r WHERE r.product_id = p.id) AS reviews_count, \
         (SELECT ROUND(AVG(r.rating), 2) FROM {reviews} r WHERE r.product_id = p.id) AS average_rating \
         FROM {products} p",
        links = links,
        reviews = reviews,
        products = table("products"),
    )
}

fn product_where(q: &mut QueryBuf, filter: &ProductFilter) -> String {
    let mut where_parts = Vec::new();
    if let Some(collection_id) = filter.collection_id {
        let ph = q.placeholder(Value::from(collection_id), "bigint");
        where_parts.push(format!(
            "EXISTS (SELECT 1 FROM {} pc WHERE pc.product_id = p.id AND pc.collection_id = {})",
            table("product_collections"),
            ph
        ));
    }
    if let Some(gt) = filter.unit_price_gt {
        let ph = q.placeholder(Value::String(gt.to_string()), "numeric");
        where_parts.push(format!("p.unit_price > {}", ph));
    }
    if let Some(lt) = filter.unit_price_lt {
        let ph = q.placeholder(Value::String(lt.to_string()), "numeric");
        where_parts.push(format!("p.unit_price < {}", ph));
    }
    if let Some(ref term) = filter.search {
        let ph = q.placeholder(Value::String(format!("%{}%", escape_like(term))), "text");
        where_parts.push(format!("(p.title ILIKE {ph} OR p.description ILIKE {ph})", ph = ph));
    }
    if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    }
}

fn order_clause(ordering: ProductOrdering) -> &'static str {
    match ordering {
        ProductOrdering::Id => " ORDER BY p.id",
        ProductOrdering::UnitPriceAsc => " ORDER BY p.unit_price ASC, p.id",
        ProductOrdering::UnitPriceDesc => " ORDER BY p.unit_price DESC, p.id",
        ProductOrdering::LastUpdateAsc => " ORDER BY p.last_update ASC, p.id",
        ProductOrdering::LastUpdateDesc => " ORDER BY p.last_update DESC, p.id",
        ProductOrdering::TitleAsc => " ORDER BY p.title ASC, p.id",
        ProductOrdering::TitleDesc => " ORDER BY p.title DESC, p.id",
    }
}

/// One page of products matching `filter`.
pub fn select_products(filter: &ProductFilter, limit: u32, offset: u64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = product_where(&mut q, filter);
    q.sql = format!(
        "{}{}{} LIMIT {} OFFSET {}",
        product_select(),
        where_clause,
        order_clause(filter.ordering),
        limit.min(1000),
        offset
    );
    q
}

/// Total number of products matching `filter` (ignores ordering and page).
pub fn count_products(filter: &ProductFilter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = product_where(&mut q, filter);
    q.sql = format!("SELECT COUNT(*) FROM {} p{}", table("products"), where_clause);
    q
}
