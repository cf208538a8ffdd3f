//! URL slugs for products: lowercase ASCII words joined by single hyphens.

/// Derive a slug from a title, e.g. "Earl Grey (Loose Leaf)" -> "earl-grey-loose-leaf".
/// Non-ASCII letters are dropped; returns an empty string when nothing usable remains.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' || c.is_ascii_punctuation() {
            pending_dash = true;
        }
    }
    out.truncate(255);
    while out.ends_with('-') {
        out.pop();
    }
    out
}
