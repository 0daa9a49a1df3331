use super::{Dialect, DialectKind};
use crate::catalog::FieldModel;

/// Digits used for numeric `to_char` masks when the field declares no size.
const DEFAULT_NUMERIC_WIDTH: u32 = 15;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgreSql;

impl PostgreSql {
    /// `S999D99`-style mask: sign, integer digits, decimal separator, fraction digits.
    fn numeric_mask(field: &FieldModel) -> String {
        let size = if field.size == 0 {
            DEFAULT_NUMERIC_WIDTH
        } else {
            field.size
        };
        let fraction = field.precision.min(size);
        let integer = size - fraction;
        let mut mask = String::from("S");
        mask.push_str(&"9".repeat(integer as usize));
        if fraction > 0 {
            mask.push('D');
            mask.push_str(&"9".repeat(fraction as usize));
        }
        mask
    }
}

impl Dialect for PostgreSql {
    fn kind(&self) -> DialectKind {
        DialectKind::PostgreSql
    }

    fn if_null_function(&self) -> &'static str {
        "COALESCE"
    }

    fn to_text(&self, expr: &str, field: &FieldModel) -> String {
        let mask = if field.sql_type.is_numeric() {
            Self::numeric_mask(field)
        } else if field.sql_type.is_temporal() {
            "day DD/MM/YYYY HH:MI:SS".to_string()
        } else {
            return expr.to_string();
        };
        format!("to_char({}, '{}')", expr, mask)
    }

    fn current_date(&self) -> &'static str {
        "current_date"
    }

    fn current_time(&self) -> &'static str {
        "current_time"
    }

    fn current_timestamp(&self) -> &'static str {
        "clock_timestamp()"
    }

    fn wrap_window(&self, inner: &str, _order_by: Option<&str>, min: i64, max: i64) -> String {
        format!("{} LIMIT {} OFFSET {}", inner, max, min)
    }
}
