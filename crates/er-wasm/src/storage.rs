use er_core::{KeyStore, StoreError};

/// Key store backed by the window's `localStorage`.
pub struct LocalStore {
    storage: web_sys::Storage,
}

impl LocalStore {
    pub fn open() -> Result<Self, StoreError> {
        let window = web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StoreError::Unavailable("localStorage disabled".to_string()))?;
        Ok(Self { storage })
    }
}

impl KeyStore for LocalStore {
    fn load(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.storage.get_item(name).map_err(|e| StoreError::Read {
            name: name.to_string(),
            reason: format!("{:?}", e),
        })
    }

    fn save(&mut self, name: &str, value: &str) -> Result<(), StoreError> {
        self.storage.set_item(name, value).map_err(|e| StoreError::Write {
            name: name.to_string(),
            reason: format!("{:?}", e),
        })
    }
}
