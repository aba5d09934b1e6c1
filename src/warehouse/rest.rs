//! Warehouse client over the SQL REST API.
//!
//! Submits one synchronous statement per request and renders every result
//! cell as text, which is all the synchronizer needs from its catalog
//! queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WarehouseConfig;
use crate::error::CatalogError;

use super::{Row, Warehouse, WarehouseConnector};

/// Connector that establishes REST sessions from the configured account.
pub struct RestConnector {
    config: WarehouseConfig,
}

impl RestConnector {
    pub fn new(config: WarehouseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl WarehouseConnector for RestConnector {
    async fn connect(&self) -> Result<Box<dyn Warehouse>, CatalogError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CatalogError::Connection {
                message: e.to_string(),
            })?;

        let warehouse = RestWarehouse {
            statements_url: format!(
                "https://{}.snowflakecomputing.com/api/v2/statements",
                self.config.account
            ),
            client,
            config: self.config.clone(),
        };

        // Probe the session so a bad account or token fails the run up
        // front instead of on the first table
        warehouse
            .execute("SELECT 1")
            .await
            .map_err(|e| CatalogError::Connection {
                message: e.to_string(),
            })?;

        debug!(account = %self.config.account, "Warehouse session established");

        Ok(Box::new(warehouse))
    }
}

struct RestWarehouse {
    statements_url: String,
    client: reqwest::Client,
    config: WarehouseConfig,
}

#[derive(Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    database: &'a str,
    schema: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

#[derive(Deserialize)]
struct StatementResponse {
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[async_trait]
impl Warehouse for RestWarehouse {
    async fn execute(&self, statement: &str) -> Result<Vec<Row>, CatalogError> {
        let request = StatementRequest {
            statement,
            database: &self.config.database,
            schema: &self.config.schema,
            warehouse: self.config.warehouse.as_deref(),
            role: self.config.role.as_deref(),
        };

        let response = self
            .client
            .post(&self.statements_url)
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| CatalogError::Statement {
                statement: statement.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CatalogError::Statement {
            statement: statement.to_string(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(CatalogError::Statement {
                statement: statement.to_string(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: StatementResponse = serde_json::from_str(&body)
            .map_err(|source| CatalogError::ResponseDecode { source })?;

        let rows = parsed
            .data
            .into_iter()
            .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
            .collect();

        Ok(rows)
    }

    async fn close(&self) -> Result<(), CatalogError> {
        // Statement requests are independent; there is no server-side
        // session to tear down for token auth
        debug!("Warehouse session released");
        Ok(())
    }
}
