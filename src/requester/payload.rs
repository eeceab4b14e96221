use std::collections::btree_map;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum PayloadError {
    #[error("Name {0} has already been used")]
    DuplicateName(String),
}

/// Query parameters appended to the request URL.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ParameterMap(BTreeMap<String, String>);

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value.
    pub fn add_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn add_int(&mut self, key: impl Into<String>, value: i64) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A file attached to a [MultipartPayload].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FormFile {
    /// The file name sent to the server.
    pub name: String,
    pub data: Vec<u8>,
}

/// Values and files for a `multipart/form-data` request body.
///
/// Every field name is unique across values and files.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MultipartPayload {
    values: BTreeMap<String, String>,
    files: BTreeMap<String, FormFile>,
}

impl MultipartPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a simple string value.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), PayloadError> {
        let name = self.unused(name.into())?;
        self.values.insert(name, value.into());
        Ok(())
    }

    pub fn add_file(&mut self, name: impl Into<String>, file: FormFile) -> Result<(), PayloadError> {
        let name = self.unused(name.into())?;
        self.files.insert(name, file);
        Ok(())
    }

    pub fn values(&self) -> btree_map::Iter<'_, String, String> {
        self.values.iter()
    }

    pub fn files(&self) -> btree_map::Iter<'_, String, FormFile> {
        self.files.iter()
    }

    fn unused(&self, name: String) -> Result<String, PayloadError> {
        if self.values.contains_key(&name) || self.files.contains_key(&name) {
            return Err(PayloadError::DuplicateName(name));
        }
        Ok(name)
    }
}
