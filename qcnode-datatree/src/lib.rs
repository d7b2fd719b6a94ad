//! Hierarchical, dotted-path configuration tree.
//!
//! `DataTree` wraps a [`toml::Value`] and exposes typed, dotted-path get/set
//! accessors. Lookups that fail to find the path, or find it but can't
//! coerce it to the requested type, never propagate an error across the
//! API: they log at `warn` and return the caller-supplied default. This
//! mirrors the source implementation's `Get<T>` catching the underlying
//! JSON library's type-mismatch exception internally.

mod enums;

pub use enums::{ImageFormat, ProcessorType, TensorType};

use std::fmt;

use thiserror::Error;
use toml::Value;

/// Errors that can occur while parsing the text passed to [`DataTree::load`].
///
/// This is the only place an error crosses the API boundary; every other
/// method is infallible by design (see the module docs).
#[derive(Debug, Error)]
pub enum DataTreeError {
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A node in the configuration tree, or the tree root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTree {
    root: Value,
}

/// Anything that can be read from or written to a single TOML leaf value.
pub trait Leaf: Sized {
    fn from_value(value: &Value) -> Option<Self>;
    fn into_value(self) -> Value;
}

macro_rules! impl_leaf_int {
    ($($t:ty),*) => {
        $(
            impl Leaf for $t {
                fn from_value(value: &Value) -> Option<Self> {
                    value.as_integer().and_then(|v| <$t>::try_from(v).ok())
                }
                fn into_value(self) -> Value {
                    Value::Integer(self as i64)
                }
            }
        )*
    };
}

impl_leaf_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl Leaf for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl Leaf for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_float().map(|v| v as f32)
    }
    fn into_value(self) -> Value {
        Value::Float(self as f64)
    }
}

impl Leaf for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl Leaf for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

/// Splits `"a.b.c"` into `["a", "b", "c"]`, matching the source's
/// `istringstream` + `getline(ss, token, '.')` tokenization (empty segments
/// from a leading/trailing/doubled dot are dropped rather than producing a
/// zero-length path element).
fn split_path(key: &str) -> Vec<&str> {
    key.split('.').filter(|s| !s.is_empty()).collect()
}

impl DataTree {
    pub fn new() -> Self {
        Self {
            root: Value::Table(Default::default()),
        }
    }

    fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Parses `context` as TOML and replaces this tree's contents.
    ///
    /// On parse failure the tree is left untouched and the error is
    /// returned; this is the one fallible entry point into the tree.
    pub fn load(&mut self, context: &str) -> Result<(), DataTreeError> {
        let value: Value = toml::from_str(context)?;
        self.root = value;
        Ok(())
    }

    /// Parses `context` as TOML into a fresh tree.
    pub fn from_str(context: &str) -> Result<Self, DataTreeError> {
        let mut tree = Self::new();
        tree.load(context)?;
        Ok(tree)
    }

    /// Serializes the tree back to TOML text.
    pub fn dump(&self) -> String {
        toml::to_string(&self.root).unwrap_or_default()
    }

    /// True if `key` resolves to some value in the tree.
    pub fn exists(&self, key: &str) -> bool {
        self.resolve(key).is_some()
    }

    fn resolve(&self, key: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in split_path(key) {
            current = match current {
                Value::Table(table) => table.get(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn resolve_mut_creating(&mut self, key: &str) -> &mut Value {
        let segments = split_path(key);
        let mut current = &mut self.root;
        for segment in segments {
            if !matches!(current, Value::Table(_)) {
                *current = Value::Table(Default::default());
            }
            let Value::Table(table) = current else {
                unreachable!()
            };
            current = table
                .entry(segment.to_owned())
                .or_insert_with(|| Value::Table(Default::default()));
        }
        current
    }

    /// Reads a scalar leaf, or `dv` if the path is missing or of the wrong
    /// shape. Mismatches are logged, never propagated.
    pub fn get<T: Leaf>(&self, key: &str, dv: T) -> T {
        match self.resolve(key) {
            Some(value) => T::from_value(value).unwrap_or_else(|| {
                tracing::warn!(key, "DataTree::get: value present but wrong type, using default");
                dv
            }),
            None => dv,
        }
    }

    /// Reads a sequence leaf, or `dv` if the path is missing or isn't an
    /// array, or any element fails to coerce.
    pub fn get_vec<T: Leaf>(&self, key: &str, dv: Vec<T>) -> Vec<T> {
        let Some(value) = self.resolve(key) else {
            return dv;
        };
        let Value::Array(items) = value else {
            tracing::warn!(key, "DataTree::get_vec: value present but not an array, using default");
            return dv;
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match T::from_value(item) {
                Some(v) => out.push(v),
                None => {
                    tracing::warn!(key, "DataTree::get_vec: element failed to coerce, using default");
                    return dv;
                }
            }
        }
        out
    }

    /// Reads the sub-tree rooted at `key` into `dt`. Returns `false` (and
    /// leaves `dt` untouched) if the path does not resolve to a table.
    pub fn get_subtree(&self, key: &str, dt: &mut DataTree) -> bool {
        match self.resolve(key) {
            Some(value @ Value::Table(_)) => {
                *dt = DataTree::from_value(value.clone());
                true
            }
            _ => false,
        }
    }

    /// Reads an array-of-tables at `key` into `dts`. Returns `false` (and
    /// leaves `dts` untouched) if the path does not resolve to an array of
    /// tables.
    pub fn get_subtree_list(&self, key: &str, dts: &mut Vec<DataTree>) -> bool {
        match self.resolve(key) {
            Some(Value::Array(items)) if items.iter().all(|v| matches!(v, Value::Table(_))) => {
                *dts = items.iter().cloned().map(DataTree::from_value).collect();
                true
            }
            _ => false,
        }
    }

    /// Writes a scalar leaf at `key`, creating any missing intermediate
    /// tables along the way.
    pub fn set<T: Leaf>(&mut self, key: &str, kv: T) {
        let slot = self.resolve_mut_creating(key);
        *slot = kv.into_value();
    }

    /// Writes a sequence leaf at `key`.
    pub fn set_vec<T: Leaf>(&mut self, key: &str, kv: Vec<T>) {
        let slot = self.resolve_mut_creating(key);
        *slot = Value::Array(kv.into_iter().map(Leaf::into_value).collect());
    }

    /// Writes the sub-tree `dt` at `key`.
    pub fn set_subtree(&mut self, key: &str, dt: &DataTree) {
        let slot = self.resolve_mut_creating(key);
        *slot = dt.root.clone();
    }

    pub fn get_image_format(&self, key: &str, dv: ImageFormat) -> ImageFormat {
        match self.resolve(key).and_then(Value::as_str) {
            Some(s) => ImageFormat::parse(s).unwrap_or(dv),
            None => dv,
        }
    }

    pub fn set_image_format(&mut self, key: &str, kv: ImageFormat) {
        self.set(key, kv.as_str().to_owned());
    }

    pub fn get_tensor_type(&self, key: &str, dv: TensorType) -> TensorType {
        match self.resolve(key).and_then(Value::as_str) {
            Some(s) => TensorType::parse(s).unwrap_or(dv),
            None => dv,
        }
    }

    pub fn set_tensor_type(&mut self, key: &str, kv: TensorType) {
        self.set(key, kv.as_str().to_owned());
    }

    pub fn get_processor_type(&self, key: &str, dv: ProcessorType) -> ProcessorType {
        match self.resolve(key).and_then(Value::as_str) {
            Some(s) => ProcessorType::parse(s).unwrap_or(dv),
            None => dv,
        }
    }

    pub fn set_processor_type(&mut self, key: &str, kv: ProcessorType) {
        self.set(key, kv.as_str().to_owned());
    }
}

impl fmt::Display for DataTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_default_when_missing() {
        let dt = DataTree::new();
        assert_eq!(dt.get("config.a", 7u32), 7);
    }

    #[test]
    fn round_trips_scalar_through_dotted_path() {
        let text = "[config]\nA = \"This is A\"\n";
        let dt = DataTree::from_str(text).unwrap();
        assert_eq!(dt.get("config.A", String::new()), "This is A");
    }

    #[test]
    fn get_vec_reads_array() {
        let text = "[config]\nA = [0, 1, 2, 3]\n";
        let dt = DataTree::from_str(text).unwrap();
        assert_eq!(dt.get_vec::<u32>("config.A", vec![]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn get_vec_falls_back_on_type_mismatch() {
        let text = "[config]\nA = \"not an array\"\n";
        let dt = DataTree::from_str(text).unwrap();
        assert_eq!(dt.get_vec::<u32>("config.A", vec![9]), vec![9]);
    }

    #[test]
    fn set_creates_intermediate_tables() {
        let mut dt = DataTree::new();
        dt.set("config.A", "This is A".to_owned());
        assert_eq!(dt.get("config.A", String::new()), "This is A");
    }

    #[test]
    fn get_subtree_list_reads_array_of_tables() {
        let text = "[[config]]\nname = \"A\"\n[[config]]\nname = \"B\"\n";
        let dt = DataTree::from_str(text).unwrap();
        let mut subs = Vec::new();
        assert!(dt.get_subtree_list("config", &mut subs));
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].get("name", String::new()), "A");
        assert_eq!(subs[1].get("name", String::new()), "B");
    }

    #[test]
    fn exists_distinguishes_missing_from_present() {
        let dt = DataTree::from_str("[a]\nb = 1\n").unwrap();
        assert!(dt.exists("a.b"));
        assert!(!dt.exists("a.c"));
        assert!(!dt.exists("x.y"));
    }

    #[test]
    fn image_format_round_trip() {
        let mut dt = DataTree::new();
        dt.set_image_format("format", ImageFormat::Rgb);
        assert_eq!(
            dt.get_image_format("format", ImageFormat::Max),
            ImageFormat::Rgb
        );
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut dt = DataTree::new();
        let err = dt.load("not = [valid");
        assert!(err.is_err());
    }
}
