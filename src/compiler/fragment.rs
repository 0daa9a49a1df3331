use crate::query::BindValue;

/// A piece of SQL text together with the values bound to its placeholders,
/// in placeholder order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    /// A single `?` placeholder.
    pub fn bind(value: BindValue) -> Self {
        Self {
            sql: "?".to_string(),
            binds: vec![value],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }

    pub fn push_str(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub fn append(&mut self, other: Fragment) -> &mut Self {
        self.sql.push_str(&other.sql);
        self.binds.extend(other.binds);
        self
    }

    /// Rewrite the text, keeping the binds.
    pub fn map_sql(self, f: impl FnOnce(String) -> String) -> Self {
        Self {
            sql: f(self.sql),
            binds: self.binds,
        }
    }

    /// True when the next predicate must be preceded by a connector: there
    /// is already a predicate and the text does not end with `(` or AND/OR.
    pub fn needs_connector(&self) -> bool {
        let sql = self.sql.trim_end();
        !sql.is_empty() && !sql.ends_with('(') && !sql.ends_with(" AND") && !sql.ends_with(" OR")
    }

    /// Append `part`, joined with AND when needed.
    pub fn and_then(&mut self, part: Fragment) -> &mut Self {
        if part.is_empty() {
            return self;
        }
        if self.needs_connector() {
            self.push_str(" AND ");
        }
        self.append(part)
    }

    /// Join non-empty fragments with `separator`.
    pub fn join(parts: impl IntoIterator<Item = Fragment>, separator: &str) -> Fragment {
        let mut joined = Fragment::new();
        for part in parts.into_iter().filter(|p| !p.is_empty()) {
            if !joined.is_empty() {
                joined.push_str(separator);
            }
            joined.append(part);
        }
        joined
    }
}
