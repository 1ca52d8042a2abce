//! Type-keyed service registry handed to commands through their context.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared services, one instance per type.
///
/// # Examples
///
/// ```rust
/// use nucleus_framework::services::Services;
/// use std::sync::Arc;
///
/// struct Economy { currency: &'static str }
///
/// let mut services = Services::new();
/// services.insert(Arc::new(Economy { currency: "gold" }));
///
/// assert_eq!(services.get::<Economy>().map(|e| e.currency), Some("gold"));
/// assert!(services.get::<String>().is_none());
/// ```
#[derive(Default, Clone)]
pub struct Services {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `service`, returning the instance it replaced.
    pub fn insert<T: Any + Send + Sync>(&mut self, service: Arc<T>) -> Option<Arc<T>> {
        self.entries
            .insert(TypeId::of::<T>(), service)
            .and_then(|previous| previous.downcast::<T>().ok())
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").field("count", &self.entries.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_previous() {
        let mut services = Services::new();
        assert!(services.insert(Arc::new(1u32)).is_none());
        assert_eq!(services.insert(Arc::new(2u32)).as_deref(), Some(&1));
        assert_eq!(services.get::<u32>().as_deref(), Some(&2));
        assert_eq!(services.len(), 1);
    }
}
