use std::collections::{BTreeMap, btree_map};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::OffsetDateTime;

use crate::error::{SessionError, SessionResult};

/// Key-value state round-tripped through the session cookie.
///
/// A `Session` is owned by the request that loaded it. Changes are only persisted when the
/// handler passes it to [`SessionStore::save`](crate::SessionStore::save).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    data: BTreeMap<String, Value>,
    issued_at: Option<OffsetDateTime>,
    expiry: Option<OffsetDateTime>,
    modified: bool,
}

impl Session {
    /// An empty session that has never been issued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        data: BTreeMap<String, Value>,
        issued_at: OffsetDateTime,
        expiry: Option<OffsetDateTime>,
    ) -> Self {
        Self {
            data,
            issued_at: Some(issued_at),
            expiry,
            modified: false,
        }
    }

    /// Get a value and deserialize it as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encoding`] if the stored value does not deserialize as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> SessionResult<Option<T>> {
        self.data
            .get(key)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|err| SessionError::Encoding(err.to_string()))
    }

    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Serialize `value` and store it under `key`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encoding`] if `value` cannot be represented as JSON.
    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> SessionResult<Option<Value>> {
        let value =
            serde_json::to_value(value).map_err(|err| SessionError::Encoding(err.to_string()))?;
        Ok(self.insert_value(key, value))
    }

    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.modified = true;
        self.data.insert(key.into(), value)
    }

    /// Remove a value and deserialize it as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encoding`] if the removed value does not deserialize as `T`.
    /// The value is removed either way.
    pub fn remove<T: DeserializeOwned>(&mut self, key: &str) -> SessionResult<Option<T>> {
        self.remove_value(key)
            .map(serde_json::from_value)
            .transpose()
            .map_err(|err| SessionError::Encoding(err.to_string()))
    }

    pub fn remove_value(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// Remove every value. The expiry is kept.
    pub fn clear(&mut self) {
        if !self.data.is_empty() {
            self.modified = true;
        }
        self.data.clear();
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.data.iter()
    }

    /// When the token this session was decoded from was issued. `None` for a fresh session.
    #[must_use]
    pub fn issued_at(&self) -> Option<OffsetDateTime> {
        self.issued_at
    }

    /// Absolute deadline after which the session no longer decodes.
    #[must_use]
    pub fn expiry(&self) -> Option<OffsetDateTime> {
        self.expiry
    }

    /// Set or clear the absolute deadline. It is stored with whole-second precision.
    pub fn set_expiry(&mut self, expiry: Option<OffsetDateTime>) {
        self.modified = true;
        self.expiry = expiry;
    }

    /// Whether any value or the expiry changed since the session was created or loaded.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }
}

impl<'a> IntoIterator for &'a Session {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
