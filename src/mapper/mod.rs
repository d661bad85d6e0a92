//! Conversion between plan/state models and Container Station wire types.
//!
//! Towards the server only known values are read; an entry of a nested list
//! that is missing a required part is skipped with a warning instead of
//! being sent half-filled. Towards state every value the server reported is
//! written back.

pub mod application;
pub mod container;
pub mod containers;
pub mod volume;

use std::collections::BTreeMap;

use data_model::{Attr, AttributePath, Diagnostics};

/// Known, non-null elements of a list attribute. Unknown and null lists are
/// empty.
pub(crate) fn known_list<T>(attr: &Attr<Vec<T>>) -> &[T] {
    attr.value().map(Vec::as_slice).unwrap_or_default()
}

/// Raw string values of a list attribute, no quoting added.
pub(crate) fn string_list(attr: &Attr<Vec<String>>) -> Vec<String> {
    known_list(attr).to_vec()
}

pub(crate) fn string_map(attr: &Attr<BTreeMap<String, String>>) -> BTreeMap<String, String> {
    attr.known()
}

/// Maps each entry with `convert`, warning about and dropping those that
/// come back `None`.
pub(crate) fn convert_entries<T, U>(
    attr: &Attr<Vec<T>>,
    block: &str,
    diags: &mut Diagnostics,
    convert: impl Fn(&T) -> Option<U>,
) -> Vec<U> {
    known_list(attr)
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let converted = convert(entry);
            if converted.is_none() {
                skip_warning(diags, AttributePath::root(block).index(index), block);
            }
            converted
        })
        .collect()
}

pub(crate) fn skip_warning(diags: &mut Diagnostics, path: AttributePath, block: &str) {
    diags.add_attribute_warning(
        path,
        format!("Incomplete {block} entry"),
        format!(
            "Skipping an entry of {block} because one or more of its attributes are unknown or null."
        ),
    );
}

/// Wraps a server-returned list, mapping an empty list to an empty value
/// rather than null.
pub(crate) fn list_value<T, U>(items: &[T], convert: impl Fn(&T) -> U) -> Attr<Vec<U>> {
    Attr::Value(items.iter().map(convert).collect())
}

/// Desired state of a running object, from the `status` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DesiredStatus {
    Running,
    Stopped,
}

impl DesiredStatus {
    pub fn from_attr(attr: &Attr<String>) -> Option<Self> {
        attr.value().and_then(|s| s.parse().ok())
    }

    /// Whether the server-reported `status` already satisfies this state.
    pub fn satisfied_by(&self, status: &str) -> bool {
        normalize_status(status) == *self
    }
}

/// Container Station reports more states than the two the configuration can
/// ask for; everything that is not running counts as stopped.
pub fn normalize_status(status: &str) -> DesiredStatus {
    if status.eq_ignore_ascii_case("running") {
        DesiredStatus::Running
    } else {
        DesiredStatus::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("running"), DesiredStatus::Running);
        assert_eq!(normalize_status("exited"), DesiredStatus::Stopped);
        assert_eq!(normalize_status("created"), DesiredStatus::Stopped);
        assert!(DesiredStatus::Stopped.satisfied_by("stopped"));
        assert!(!DesiredStatus::Running.satisfied_by("created"));
    }

    #[test]
    fn test_desired_status_from_attr() {
        assert_eq!(
            DesiredStatus::from_attr(&"running".into()),
            Some(DesiredStatus::Running)
        );
        assert_eq!(DesiredStatus::from_attr(&Attr::Unknown), None);
        assert_eq!(DesiredStatus::from_attr(&"paused".into()), None);
    }

    #[test]
    fn test_convert_entries_skips_incomplete() {
        let mut diags = Diagnostics::new();
        let attr: Attr<Vec<Attr<String>>> =
            Attr::Value(vec!["a".into(), Attr::Unknown, "c".into(), Attr::Null]);
        let out = convert_entries(&attr, "dns", &mut diags, |v| v.value().cloned());
        assert_eq!(out, vec!["a".to_string(), "c".to_string()]);
        let paths: Vec<String> = diags
            .warnings()
            .map(|w| w.attribute.as_ref().unwrap().to_string())
            .collect();
        assert_eq!(paths, vec!["dns[1]", "dns[3]"]);
        assert!(!diags.has_error());
    }
}
