use std::fmt;

use serde::{de::Deserializer, ser::Error as _, Deserialize, Serialize, Serializer};

/// A plan or state attribute value.
///
/// Terraform distinguishes between a value that is not known until apply
/// (`Unknown`), a value that is explicitly absent (`Null`) and a concrete
/// value. Optional attributes left out of the configuration are `Null`,
/// which is why `Null` is the default.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub enum Attr<T> {
    Unknown,
    #[default]
    Null,
    Value(T),
}

impl<T> Attr<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Attr::Value(v),
            None => Attr::Null,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Attr::Unknown)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Null)
    }

    /// True only when a concrete value is present.
    pub fn is_known(&self) -> bool {
        matches!(self, Attr::Value(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Attr::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Attr<&T> {
        match self {
            Attr::Unknown => Attr::Unknown,
            Attr::Null => Attr::Null,
            Attr::Value(v) => Attr::Value(v),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Attr<U> {
        match self {
            Attr::Unknown => Attr::Unknown,
            Attr::Null => Attr::Null,
            Attr::Value(v) => Attr::Value(f(v)),
        }
    }

    /// Replaces `Unknown` with `Null`. Returns true if a replacement happened.
    pub fn settle(&mut self) -> bool {
        if self.is_unknown() {
            *self = Attr::Null;
            return true;
        }
        false
    }

    /// Like [`Attr::settle`], recording `path` when the value was unknown.
    pub fn settle_at(&mut self, path: &str, unresolved: &mut Vec<String>) {
        if self.settle() {
            unresolved.push(path.to_string());
        }
    }
}

impl<T: Clone + Default> Attr<T> {
    /// The concrete value, or the zero value for null and unknown.
    pub fn known(&self) -> T {
        self.value().cloned().unwrap_or_default()
    }
}

impl<T: fmt::Debug> fmt::Debug for Attr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attr::Unknown => write!(f, "<unknown>"),
            Attr::Null => write!(f, "<null>"),
            Attr::Value(v) => v.fmt(f),
        }
    }
}

impl<T> From<T> for Attr<T> {
    fn from(value: T) -> Self {
        Attr::Value(value)
    }
}

impl From<&str> for Attr<String> {
    fn from(value: &str) -> Self {
        Attr::Value(value.to_string())
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Attr::Value(v) => serializer.serialize_some(v),
            Attr::Null => serializer.serialize_none(),
            Attr::Unknown => Err(S::Error::custom(
                "unknown attribute values cannot be persisted",
            )),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Attr::from_option(Option::<T>::deserialize(deserializer)?))
    }
}

/// Models that can have unknown attributes left over after mapping.
pub trait Settle {
    /// Replaces every remaining unknown attribute with null and appends the
    /// attribute paths that were unknown to `unresolved`.
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>);
}

/// Settles a list of nested objects, the list itself first.
pub fn settle_list<T: Settle>(attr: &mut Attr<Vec<T>>, path: &str, unresolved: &mut Vec<String>) {
    attr.settle_at(path, unresolved);
    if let Attr::Value(items) = attr {
        for (i, item) in items.iter_mut().enumerate() {
            item.settle(&format!("{path}[{i}]"), unresolved);
        }
    }
}

/// Settles a single nested object.
pub fn settle_object<T: Settle>(attr: &mut Attr<T>, path: &str, unresolved: &mut Vec<String>) {
    attr.settle_at(path, unresolved);
    if let Attr::Value(item) = attr {
        item.settle(path, unresolved);
    }
}

pub(crate) fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_default() {
        let attr: Attr<String> = Attr::default();
        assert!(attr.is_null());
        assert_eq!(attr.known(), "");
    }

    #[test]
    fn test_serialize_never_persists_unknown() {
        let unknown: Attr<String> = Attr::Unknown;
        assert!(serde_json::to_string(&unknown).is_err());

        let null: Attr<String> = Attr::Null;
        assert_eq!(serde_json::to_string(&null).unwrap(), "null");

        let value: Attr<i32> = 8080.into();
        assert_eq!(serde_json::to_string(&value).unwrap(), "8080");
    }

    #[test]
    fn test_deserialize_maps_null() {
        let attr: Attr<String> = serde_json::from_str("null").unwrap();
        assert!(attr.is_null());
        let attr: Attr<String> = serde_json::from_str("\"bridge\"").unwrap();
        assert_eq!(attr.value().map(String::as_str), Some("bridge"));
    }

    #[test]
    fn test_settle_records_path() {
        let mut unresolved = Vec::new();
        let mut attr: Attr<bool> = Attr::Unknown;
        attr.settle_at("tty", &mut unresolved);
        let mut known: Attr<bool> = true.into();
        known.settle_at("privileged", &mut unresolved);

        assert!(attr.is_null());
        assert_eq!(known, Attr::Value(true));
        assert_eq!(unresolved, vec!["tty".to_string()]);
    }
}
