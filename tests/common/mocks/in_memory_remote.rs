use async_trait::async_trait;
use fieldsync::application::ports::{RemoteError, RemoteTable, RemoteTables};
use fieldsync::domain::entities::{known_tables, TableSpec};
use fieldsync::domain::value_objects::{EntityKey, MutationAction, TableName};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub table: String,
    pub action: MutationAction,
    pub key: String,
}

/// PostgREST stand-in keeping rows in memory, keyed by the table's key column.
pub struct InMemoryTable {
    spec: TableSpec,
    rows: Mutex<BTreeMap<String, Value>>,
    failing: Arc<AtomicBool>,
    lose_next_reply: Arc<AtomicBool>,
    insert_delay_ms: Arc<AtomicU64>,
    calls: Arc<Mutex<Vec<RemoteCall>>>,
}

impl InMemoryTable {
    pub fn row(&self, key: &str) -> Option<Value> {
        self.rows.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn seed(&self, row: Value) {
        let key = row[self.spec.key_column]
            .as_str()
            .expect("seed row needs a key")
            .to_string();
        self.rows.lock().unwrap().insert(key, row);
    }

    fn check(&self, action: MutationAction, key: &str) -> Result<(), RemoteError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("simulated outage".into()));
        }
        self.calls.lock().unwrap().push(RemoteCall {
            table: self.spec.name.to_string(),
            action,
            key: key.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl RemoteTable for InMemoryTable {
    async fn insert(&self, record: &Value) -> Result<Value, RemoteError> {
        let key = record[self.spec.key_column]
            .as_str()
            .ok_or_else(|| RemoteError::Rejected {
                status: 400,
                message: format!("missing {}", self.spec.key_column),
            })?
            .to_string();
        self.check(MutationAction::Create, &key)?;

        {
            let mut rows = self.rows.lock().unwrap();
            if rows.contains_key(&key) {
                return Err(RemoteError::Rejected {
                    status: 409,
                    message: format!("duplicate key {key}"),
                });
            }
            rows.insert(key, record.clone());
        }

        let delay = self.insert_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.lose_next_reply.swap(false, Ordering::SeqCst) {
            return Err(RemoteError::Timeout(Duration::from_secs(5)));
        }
        Ok(record.clone())
    }

    async fn update(&self, key: &EntityKey, partial: &Value) -> Result<Value, RemoteError> {
        self.check(MutationAction::Update, key.as_str())?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(key.as_str())
            .ok_or_else(|| RemoteError::NotFound(key.to_string()))?;
        if let (Value::Object(target), Value::Object(fields)) = (&mut *row, partial) {
            for (field, value) in fields {
                target.insert(field.clone(), value.clone());
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, key: &EntityKey) -> Result<(), RemoteError> {
        self.check(MutationAction::Delete, key.as_str())?;
        self.rows.lock().unwrap().remove(key.as_str());
        Ok(())
    }

    async fn select_all(&self) -> Result<Vec<Value>, RemoteError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("simulated outage".into()));
        }
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }
}

/// One in-memory table per known field-ops table, sharing an outage switch
/// and a call log.
pub struct InMemoryRemote {
    tables: Vec<Arc<InMemoryTable>>,
    failing: Arc<AtomicBool>,
    lose_next_reply: Arc<AtomicBool>,
    insert_delay_ms: Arc<AtomicU64>,
    calls: Arc<Mutex<Vec<RemoteCall>>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        let failing = Arc::new(AtomicBool::new(false));
        let lose_next_reply = Arc::new(AtomicBool::new(false));
        let insert_delay_ms = Arc::new(AtomicU64::new(0));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let tables = known_tables()
            .into_iter()
            .map(|spec| {
                Arc::new(InMemoryTable {
                    spec,
                    rows: Mutex::new(BTreeMap::new()),
                    failing: failing.clone(),
                    lose_next_reply: lose_next_reply.clone(),
                    insert_delay_ms: insert_delay_ms.clone(),
                    calls: calls.clone(),
                })
            })
            .collect();
        Self {
            tables,
            failing,
            lose_next_reply,
            insert_delay_ms,
            calls,
        }
    }

    pub fn remote_tables(&self) -> RemoteTables {
        let mut remote = RemoteTables::new(Duration::from_secs(5));
        for table in &self.tables {
            remote.register(table.spec.name.clone(), table.clone());
        }
        remote
    }

    pub fn table(&self, name: &TableName) -> Arc<InMemoryTable> {
        self.tables
            .iter()
            .find(|table| &table.spec.name == name)
            .cloned()
            .expect("known table")
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The next insert commits its row but the caller sees a timeout.
    pub fn lose_next_reply(&self) {
        self.lose_next_reply.store(true, Ordering::SeqCst);
    }

    /// Holds every insert for `delay` after it commits.
    pub fn set_insert_delay(&self, delay: Duration) {
        self.insert_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }
}
