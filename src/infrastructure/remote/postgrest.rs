use crate::application::ports::{ReachabilityProbe, RemoteError, RemoteTable, RemoteTables};
use crate::domain::entities::{known_tables, TableSpec};
use crate::domain::value_objects::{EntityKey, TableName};
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const REST_PREFIX: &str = "rest/v1";

/// Connection to a PostgREST (Supabase-compatible) endpoint.
#[derive(Clone)]
pub struct PostgrestRemote {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl PostgrestRemote {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|err| AppError::ConfigurationError(format!("Invalid api key: {err}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|err| AppError::ConfigurationError(format!("Invalid api key: {err}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &RemoteConfig, timeout: Duration) -> Result<Option<Self>, AppError> {
        match (&config.base_url, &config.api_key) {
            (Some(url), Some(key)) => Self::new(url, key, timeout).map(Some),
            _ => Ok(None),
        }
    }

    pub fn table(&self, spec: TableSpec) -> PostgrestTable {
        PostgrestTable {
            remote: self.clone(),
            table: spec.name,
            key_column: spec.key_column,
        }
    }

    /// Registers a handler for every table of the field-ops schema.
    pub fn register_known_tables(&self, tables: &mut RemoteTables) {
        for spec in known_tables() {
            let name = spec.name.clone();
            tables.register(name, Arc::new(self.table(spec)));
        }
    }

    fn table_url(&self, table: &TableName) -> String {
        format!("{}/{}/{}", self.base_url, REST_PREFIX, table)
    }

    fn map_transport(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.timeout)
        } else if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Network(err.to_string())
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(|err| self.map_transport(err))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn rows(&self, request: RequestBuilder) -> Result<Vec<Value>, RemoteError> {
        let response = self.send(request).await?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }
}

#[async_trait]
impl ReachabilityProbe for PostgrestRemote {
    async fn is_reachable(&self) -> bool {
        let url = format!("{}/{}/", self.base_url, REST_PREFIX);
        match self.client.head(url).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(err) => {
                debug!(error = %err, "Remote unreachable");
                false
            }
        }
    }
}

/// One remote table addressed through PostgREST filters on its key column.
pub struct PostgrestTable {
    remote: PostgrestRemote,
    table: TableName,
    key_column: &'static str,
}

impl PostgrestTable {
    fn key_filter(&self, key: &EntityKey) -> [(&'static str, String); 1] {
        [(self.key_column, format!("eq.{key}"))]
    }
}

#[async_trait]
impl RemoteTable for PostgrestTable {
    async fn insert(&self, record: &Value) -> Result<Value, RemoteError> {
        let request = self
            .remote
            .client
            .post(self.remote.table_url(&self.table))
            .header("Prefer", "return=representation")
            .json(&[record]);

        self.remote
            .rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Decode("insert returned no representation".into()))
    }

    async fn update(&self, key: &EntityKey, partial: &Value) -> Result<Value, RemoteError> {
        let request = self
            .remote
            .client
            .patch(self.remote.table_url(&self.table))
            .query(&self.key_filter(key))
            .header("Prefer", "return=representation")
            .json(partial);

        self.remote
            .rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound(format!("{}/{}", self.table, key)))
    }

    async fn delete(&self, key: &EntityKey) -> Result<(), RemoteError> {
        let request = self
            .remote
            .client
            .delete(self.remote.table_url(&self.table))
            .query(&self.key_filter(key))
            .header("Prefer", "return=minimal");

        self.remote.send(request).await.map(|_| ())
    }

    async fn select_all(&self) -> Result<Vec<Value>, RemoteError> {
        let request = self
            .remote
            .client
            .get(self.remote.table_url(&self.table))
            .query(&[("select", "*")]);

        self.remote.rows(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Deployment, SyncEntity};

    fn remote() -> PostgrestRemote {
        PostgrestRemote::new("https://field.example.test/", "anon-key", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn table_url_strips_trailing_slash() {
        let url = remote().table_url(&TableName::new("deployments").unwrap());
        assert_eq!(url, "https://field.example.test/rest/v1/deployments");
    }

    #[test]
    fn key_filter_targets_the_table_key_column() {
        let table = remote().table(Deployment::spec());
        let filter = table.key_filter(&EntityKey::new("d-42").unwrap());
        assert_eq!(filter, [("deployment_id", "eq.d-42".to_string())]);
    }

    #[test]
    fn registers_every_known_table() {
        let mut tables = RemoteTables::new(Duration::from_secs(5));
        remote().register_known_tables(&mut tables);
        for spec in known_tables() {
            assert!(tables.is_registered(&spec.name));
        }
    }

    #[test]
    fn missing_credentials_yield_no_remote() {
        let config = RemoteConfig {
            base_url: None,
            api_key: None,
        };
        let remote = PostgrestRemote::from_config(&config, Duration::from_secs(1)).unwrap();
        assert!(remote.is_none());
    }
}
