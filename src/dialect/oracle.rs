use super::{Dialect, DialectKind};
use crate::catalog::FieldModel;

#[derive(Debug, Clone, Copy, Default)]
pub struct Oracle;

impl Dialect for Oracle {
    fn kind(&self) -> DialectKind {
        DialectKind::Oracle
    }

    fn if_null_function(&self) -> &'static str {
        "nvl"
    }

    fn to_text(&self, expr: &str, _field: &FieldModel) -> String {
        format!("TO_CHAR({})", expr)
    }

    fn current_date(&self) -> &'static str {
        "SYSDATE"
    }

    fn current_time(&self) -> &'static str {
        "SYSDATE"
    }

    fn decode(&self, expr: &str, arms: &[(String, String)], default: Option<&str>) -> String {
        let mut sql = format!("decode({}", expr);
        for (search, result) in arms {
            sql.push_str(&format!(", {}, {}", search, result));
        }
        if let Some(default) = default {
            sql.push_str(&format!(", {}", default));
        }
        sql.push(')');
        sql
    }

    fn relocates_outer_joins(&self) -> bool {
        true
    }

    // ROWNUM_ROWNUM bounds the start while the outer ROWNUM bounds the page
    // size, which Oracle turns into a stop-key.
    fn wrap_window(&self, inner: &str, _order_by: Option<&str>, min: i64, max: i64) -> String {
        format!(
            "SELECT * FROM (SELECT sub.*, rownum as ROWNUM_ROWNUM FROM ({}) sub ) WHERE ROWNUM_ROWNUM > {} AND ROWNUM <= {}",
            inner, min, max
        )
    }

    fn count_alias(&self) -> Option<&'static str> {
        None
    }
}
