use thiserror::Error;

use crate::retriever::{RetrievalError, SecretRoute};
use crate::search::{filter_entries, DEFAULT_MATCH_THRESHOLD};
use crate::store::{Entry, PasswordStore, StoreLocation};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("invalid navigation target: {target}")]
    InvalidTarget { target: String },
}

#[derive(Debug)]
pub struct NavigationState {
    store: PasswordStore,
    current: StoreLocation,
    match_threshold: usize,
}

impl NavigationState {
    pub fn new(store: PasswordStore) -> Self {
        Self {
            store,
            current: StoreLocation::root(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }

    pub fn with_match_threshold(mut self, threshold: usize) -> Self {
        self.match_threshold = threshold;
        self
    }

    pub fn store(&self) -> &PasswordStore {
        &self.store
    }

    pub fn current(&self) -> &StoreLocation {
        &self.current
    }

    // A vanished directory or a file name leaves `current` untouched.
    pub fn navigate_into(&mut self, name: &str) -> Result<(), NavigationError> {
        let Some(next) = self.current.join_dir(name) else {
            return Err(self.reject(format!("{}{}", self.current, name)));
        };
        self.navigate_to(next)
    }

    pub fn navigate_to(&mut self, location: StoreLocation) -> Result<(), NavigationError> {
        if !self.store.is_directory(&location) {
            return Err(self.reject(location.to_string()));
        }
        tracing::debug!(from = %self.current, to = %location, "changed directory");
        self.current = location;
        Ok(())
    }

    pub fn navigate_up(&mut self) {
        self.current = self.current.parent();
    }

    pub fn current_entries(&self, query: &str) -> Vec<Entry> {
        let entries = self.store.list_entries(&self.current);
        filter_entries(&entries, query, self.match_threshold)
    }

    pub fn secret_route(&self, entry: &Entry) -> Result<SecretRoute, RetrievalError> {
        SecretRoute::new(&self.current, entry)
    }

    fn reject(&self, target: String) -> NavigationError {
        tracing::debug!(%target, "not a valid directory");
        NavigationError::InvalidTarget { target }
    }
}
