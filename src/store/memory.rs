//! In-memory binding store.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::{Binding, BindingState};
use crate::store::{BindingStore, BindingStoreError};

/// Keeps the binding in process memory and remembers every saved state.
#[derive(Default)]
pub struct MemoryBindingStore {
    current: Mutex<Option<Binding>>,
    history: Mutex<Vec<BindingState>>,
}

impl MemoryBindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binding(binding: Binding) -> Self {
        Self {
            current: Mutex::new(Some(binding)),
            history: Mutex::new(Vec::new()),
        }
    }

    pub async fn snapshot(&self) -> Option<Binding> {
        self.current.lock().await.clone()
    }

    /// States passed to [`BindingStore::save`], oldest first.
    pub async fn saved_states(&self) -> Vec<BindingState> {
        self.history.lock().await.clone()
    }
}

#[async_trait]
impl BindingStore for MemoryBindingStore {
    async fn load(&self) -> Result<Option<Binding>, BindingStoreError> {
        Ok(self.current.lock().await.clone())
    }

    async fn save(&self, binding: &Binding) -> Result<(), BindingStoreError> {
        *self.current.lock().await = Some(binding.clone());
        self.history.lock().await.push(binding.state);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
