use super::{Dialect, DialectKind};
use crate::catalog::FieldModel;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServer;

impl Dialect for SqlServer {
    fn kind(&self) -> DialectKind {
        DialectKind::SqlServer
    }

    fn if_null_function(&self) -> &'static str {
        "ISNULL"
    }

    fn to_text(&self, expr: &str, _field: &FieldModel) -> String {
        format!("CONVERT(varchar(MAX), {})", expr)
    }

    fn current_date(&self) -> &'static str {
        "CAST(CURRENT_TIMESTAMP AS DATE)"
    }

    fn current_time(&self) -> &'static str {
        "CAST(CURRENT_TIMESTAMP AS TIME)"
    }

    fn sorts_inside_window(&self) -> bool {
        true
    }

    // ROW_NUMBER() requires an ORDER BY; `(SELECT NULL)` keeps the source order.
    fn wrap_window(&self, inner: &str, order_by: Option<&str>, min: i64, max: i64) -> String {
        let order_by = order_by.unwrap_or("(SELECT NULL)");
        format!(
            "SELECT * FROM (SELECT sub.*, ROW_NUMBER() OVER (ORDER BY {}) AS ROWNUM FROM ({}) sub ) rows WHERE rows.ROWNUM > {} AND rows.ROWNUM <= {}",
            order_by, inner, min, max
        )
    }
}
