use super::{Dialect, DialectKind};
use crate::catalog::FieldModel;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn to_text(&self, expr: &str, _field: &FieldModel) -> String {
        format!("CAST({} AS CHAR)", expr)
    }

    fn wrap_window(&self, inner: &str, _order_by: Option<&str>, min: i64, max: i64) -> String {
        format!("{} LIMIT {}, {}", inner, min, max)
    }
}
