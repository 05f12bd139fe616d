use rillcore::{NodeError, NodeExecutor};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available node executors, keyed by type.
///
/// Built once at startup and shared immutably across runs. Adding a
/// new node type means registering one more executor here.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, executor: Arc<dyn NodeExecutor>) {
        let type_key = executor.type_key().to_string();
        tracing::debug!("registering node type: {}", type_key);
        self.executors.insert(type_key, executor);
    }

    /// Resolve the executor for a type key. Unknown types are a hard
    /// failure surfaced to the engine.
    pub fn get(&self, type_key: &str) -> Result<Arc<dyn NodeExecutor>, NodeError> {
        self.executors
            .get(type_key)
            .cloned()
            .ok_or_else(|| NodeError::UnknownType(type_key.to_string()))
    }

    /// All registered type keys, sorted.
    pub fn type_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.executors.keys().cloned().collect();
        keys.sort();
        keys
    }
}
