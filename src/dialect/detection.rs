//! Database dialect detection from driver names
//!
//! The application reports the name of the live database driver once at
//! startup; this module maps it to a [`DialectKind`] and records it as the
//! process-wide dialect read by every compiler built afterwards.

use lazy_static::lazy_static;
use log::{debug, info};
use std::sync::RwLock;

use super::errors::DialectError;
use super::DialectKind;

lazy_static! {
    static ref PROCESS_DIALECT: RwLock<Option<DialectKind>> = RwLock::new(None);
}

impl DialectKind {
    /// Detect the dialect from a driver or product name.
    ///
    /// # Example
    /// ```
    /// use dbquery::dialect::DialectKind;
    ///
    /// assert_eq!(DialectKind::from_driver_name("Oracle JDBC driver").unwrap(), DialectKind::Oracle);
    /// assert_eq!(DialectKind::from_driver_name("jTDS Type 4").unwrap(), DialectKind::SqlServer);
    /// assert!(DialectKind::from_driver_name("SQLite").is_err());
    /// ```
    pub fn from_driver_name(driver: &str) -> Result<Self, DialectError> {
        let upper = driver.to_uppercase();
        let kind = if upper.contains("ORACLE") {
            DialectKind::Oracle
        } else if upper.contains("MYSQL") {
            DialectKind::MySql
        } else if upper.contains("POSTGRESQL") {
            DialectKind::PostgreSql
        } else if upper.contains("DB2") || upper.contains("IBM") || upper.contains("AS/400") {
            DialectKind::Db2
        } else if upper.contains("MICROSOFT") || upper.contains("JTDS") {
            DialectKind::SqlServer
        } else {
            return Err(DialectError::UnsupportedDriver(driver.to_string()));
        };
        debug!("Driver `{}` detected as {}", driver, kind);
        Ok(kind)
    }
}

/// Record the process-wide dialect. Setting the same value twice is accepted;
/// switching to another dialect is refused.
pub fn init_process_dialect(kind: DialectKind) -> Result<(), DialectError> {
    let mut slot = PROCESS_DIALECT.write().unwrap_or_else(|e| e.into_inner());
    match *slot {
        Some(current) if current != kind => Err(DialectError::AlreadyInitialised {
            current,
            requested: kind,
        }),
        Some(_) => Ok(()),
        None => {
            info!("Process dialect set to {}", kind);
            *slot = Some(kind);
            Ok(())
        }
    }
}

/// Detect the dialect from a driver name and record it for the process.
pub fn init_from_driver_name(driver: &str) -> Result<DialectKind, DialectError> {
    let kind = DialectKind::from_driver_name(driver)?;
    init_process_dialect(kind)?;
    Ok(kind)
}

pub fn process_dialect() -> Result<DialectKind, DialectError> {
    let current = *PROCESS_DIALECT.read().unwrap_or_else(|e| e.into_inner());
    current.ok_or(DialectError::NotInitialised)
}

#[doc(hidden)]
pub fn reset_process_dialect() {
    *PROCESS_DIALECT.write().unwrap_or_else(|e| e.into_inner()) = None;
}
