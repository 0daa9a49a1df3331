use super::{Dialect, DialectKind};
use crate::catalog::{FieldModel, SqlType};

#[derive(Debug, Clone, Copy, Default)]
pub struct Db2;

impl Dialect for Db2 {
    fn kind(&self) -> DialectKind {
        DialectKind::Db2
    }

    fn to_text(&self, expr: &str, field: &FieldModel) -> String {
        match field.sql_type {
            SqlType::Integer => format!("CHAR({})", expr),
            SqlType::Decimal => format!("CHAR({}, ',')", expr),
            SqlType::Date | SqlType::Time => format!(
                "VARCHAR_FORMAT(TIMESTAMP_ISO({}), 'DD/MM/YYYY HH24:MI:SS')",
                expr
            ),
            SqlType::Timestamp => format!("VARCHAR_FORMAT({}, 'DD/MM/YYYY HH24:MI:SS')", expr),
            _ => expr.to_string(),
        }
    }

    fn sorts_inside_window(&self) -> bool {
        true
    }

    fn wrap_window(&self, inner: &str, order_by: Option<&str>, min: i64, max: i64) -> String {
        let over = order_by
            .map(|ob| format!("ORDER BY {}", ob))
            .unwrap_or_default();
        format!(
            "SELECT internal$1.* FROM (SELECT internal$2.*, ROW_NUMBER() OVER ({}) AS internal$rownum FROM ({}) internal$2) internal$1 WHERE internal$1.internal$rownum > {} AND internal$1.internal$rownum <= {}",
            over,
            inner,
            min,
            min.saturating_add(max)
        )
    }
}
