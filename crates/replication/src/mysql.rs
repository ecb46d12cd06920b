//! MySQL replica status via sqlx

use crate::{validate_log_file_name, PositionProvider, ReplicationError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection, Executor, Row};
use std::fmt;
use std::str::FromStr;

/// Default MySQL port
pub const DEFAULT_PORT: u16 = 3306;

/// Which replica status statement the server understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusDialect {
    /// `SHOW SLAVE STATUS` / `Relay_Master_Log_File`
    #[default]
    Legacy,
    /// `SHOW REPLICA STATUS` / `Relay_Source_Log_File` (8.0.22+)
    Modern,
}

impl StatusDialect {
    pub fn query(&self) -> &'static str {
        match self {
            StatusDialect::Legacy => "SHOW SLAVE STATUS",
            StatusDialect::Modern => "SHOW REPLICA STATUS",
        }
    }

    /// Column holding the source binlog the SQL thread is replaying
    pub fn position_column(&self) -> &'static str {
        match self {
            StatusDialect::Legacy => "Relay_Master_Log_File",
            StatusDialect::Modern => "Relay_Source_Log_File",
        }
    }
}

impl FromStr for StatusDialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "slave" => Ok(StatusDialect::Legacy),
            "modern" | "replica" => Ok(StatusDialect::Modern),
            other => Err(format!(
                "unknown status dialect '{}' (expected 'legacy' or 'modern')",
                other
            )),
        }
    }
}

/// Password that never shows up in `Debug` output
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Where and how to reach the replica
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Password,
}

impl ConnectionParams {
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: Password) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            user: user.into(),
            password,
        }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose())
    }
}

/// Reads the replaying position from a MySQL replica
pub struct MySqlPositionProvider {
    params: ConnectionParams,
    dialect: StatusDialect,
}

impl MySqlPositionProvider {
    pub fn new(params: ConnectionParams, dialect: StatusDialect) -> Self {
        Self { params, dialect }
    }

    async fn connect(&self) -> Result<MySqlConnection> {
        self.params
            .connect_options()
            .connect()
            .await
            .map_err(|source| {
                tracing::error!("Failed to connect to {}: {}", self.describe(), source);
                ReplicationError::Connection {
                    host: self.params.host.clone(),
                    source,
                }
            })
    }
}

#[async_trait]
impl PositionProvider for MySqlPositionProvider {
    fn describe(&self) -> String {
        format!(
            "mysql://{}@{}:{}",
            self.params.user, self.params.host, self.params.port
        )
    }

    async fn current_log_file(&self) -> Result<String> {
        let mut conn = self.connect().await?;
        tracing::debug!("Connected to {}, running {}", self.describe(), self.dialect.query());

        // Plain &str runs over the text protocol; SHOW statements need not be preparable
        let row = (&mut conn)
            .fetch_optional(self.dialect.query())
            .await
            .map_err(ReplicationError::QueryFailed);

        if let Err(e) = conn.close().await {
            tracing::debug!("Error closing connection to {}: {}", self.params.host, e);
        }

        let not_configured = || ReplicationError::NotConfigured {
            host: self.params.host.clone(),
        };

        let row = row?.ok_or_else(not_configured)?;
        // Bytes rather than String: some servers report SHOW columns with a binary charset
        let file: Option<Vec<u8>> = row
            .try_get(self.dialect.position_column())
            .map_err(ReplicationError::QueryFailed)?;
        let file = file
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();

        if file.trim().is_empty() {
            return Err(not_configured());
        }
        validate_log_file_name(&file)
    }
}
