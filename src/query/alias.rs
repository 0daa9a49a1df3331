//! Identifier naming shared by table aliases and column aliases.
//!
//! Several supported engines cap identifiers at 30 characters. Every alias the
//! compiler emits goes through [`alias`], which keeps short names as they are and
//! replaces long ones by a deterministic surrogate, so the name used in SELECT
//! is the same one looked up later when reading result rows.

use sha2::{Digest, Sha256};

/// Longest identifier accepted by every supported engine.
pub const MAX_IDENTIFIER_LEN: usize = 30;

/// Bound `name` to [`MAX_IDENTIFIER_LEN`] characters.
///
/// # Examples
/// ```
/// use dbquery::query::alias::{alias, MAX_IDENTIFIER_LEN};
///
/// assert_eq!(alias("T1_CUSTOMER_ID"), "T1_CUSTOMER_ID");
///
/// let long = "T12_CUSTOMER_PREFERRED_DELIVERY_ADDRESS_LINE";
/// let short = alias(long);
/// assert!(short.len() <= MAX_IDENTIFIER_LEN);
/// assert_eq!(short, alias(long));
/// assert!(short.starts_with("T12_"));
/// ```
pub fn alias(name: &str) -> String {
    if name.len() <= MAX_IDENTIFIER_LEN {
        return name.to_string();
    }
    let digits = name_hash(name).to_string();
    if digits.len() >= MAX_IDENTIFIER_LEN {
        let tail = &digits[digits.len() - (MAX_IDENTIFIER_LEN - 1)..];
        return format!("A{}", tail);
    }
    let keep = floor_char_boundary(name, MAX_IDENTIFIER_LEN - digits.len() - 1);
    format!("{}{}", &name[..keep], digits)
}

/// Column alias of a field read from a table: `<tableAlias>_<name>`, bounded.
pub fn column_alias(table_alias: &str, name: &str) -> String {
    alias(&format!("{}_{}", table_alias, name))
}

/// Column name of a field: camelCase words upper-cased and joined by `_`.
///
/// # Examples
/// ```
/// use dbquery::query::alias::db_name;
///
/// assert_eq!(db_name("customerId"), "CUSTOMER_ID");
/// assert_eq!(db_name("status"), "STATUS");
/// assert_eq!(db_name("ORDER_DATE"), "ORDER_DATE");
/// ```
pub fn db_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower_or_digit {
            out.push('_');
        }
        prev_lower_or_digit = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_uppercase());
    }
    out
}

/// First eight bytes of the SHA-256 digest, read as an unsigned integer.
fn name_hash(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
