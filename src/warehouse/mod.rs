//! Warehouse SQL execution interface.
//!
//! All DDL, DML, and status queries flow through the [`Warehouse`] trait as
//! plain SQL text built by the `sql` module. The production implementation
//! is a thin SQL REST API client ([`rest::RestConnector`]); tests script a
//! mock.
//!
//! A connection is acquired once per synchronization run through
//! [`WarehouseConnector::connect`] and released exactly once through
//! [`Warehouse::close`], on every exit path.

pub mod rest;

pub use rest::RestConnector;

use async_trait::async_trait;

use crate::error::CatalogError;

/// A single result row: column values rendered as text.
pub type Row = Vec<String>;

/// Handle to an established warehouse session.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute one SQL statement and return its rows.
    async fn execute(&self, statement: &str) -> Result<Vec<Row>, CatalogError>;

    /// Release the session.
    async fn close(&self) -> Result<(), CatalogError>;
}

/// Factory for per-run warehouse sessions.
#[async_trait]
pub trait WarehouseConnector: Send + Sync {
    /// Establish a session. Failure here is fatal for the whole run.
    async fn connect(&self) -> Result<Box<dyn Warehouse>, CatalogError>;
}
