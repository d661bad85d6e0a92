//! Schema declarations for the provider block, resources and data sources.
//!
//! A schema is plain data: the attribute tree with its types, presence,
//! validators and plan modifiers. The host reads it to build plans; the
//! resources use [`Schema::validate_string`] and friends to run the same
//! validators during `validate_config`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{LazyLock, PoisonError, RwLock},
};

use regex::Regex;

use crate::{
    attr::Attr,
    diagnostics::{AttributePath, Diagnostics},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Bool,
    Int32,
    Int64,
    Float32,
    StringList,
    StringMap,
    SingleNested,
    ListNested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    Computed,
    OptionalComputed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    OneOf(&'static [&'static str]),
    LengthBetween(usize, usize),
    /// Pattern and the message reported when it does not match.
    RegexMatches(&'static str, &'static str),
    Int32Between(i32, i32),
}

impl Validator {
    pub fn check_str(&self, value: &str) -> Result<(), String> {
        match self {
            Validator::OneOf(allowed) => {
                if allowed.contains(&value) {
                    return Ok(());
                }
                Err(format!(
                    "value must be one of: {}, got: \"{}\"",
                    allowed
                        .iter()
                        .map(|v| format!("\"{v}\""))
                        .collect::<Vec<_>>()
                        .join(", "),
                    value
                ))
            }
            Validator::LengthBetween(min, max) => {
                let len = value.chars().count();
                if len < *min || len > *max {
                    return Err(format!(
                        "string length must be between {min} and {max}, got: {len}"
                    ));
                }
                Ok(())
            }
            Validator::RegexMatches(pattern, message) => {
                let re = compiled(pattern)
                    .map_err(|e| format!("invalid validation pattern {pattern}: {e}"))?;
                if re.is_match(value) {
                    return Ok(());
                }
                Err(format!("{message}, got: \"{value}\""))
            }
            Validator::Int32Between(..) => Ok(()),
        }
    }

    pub fn check_i32(&self, value: i32) -> Result<(), String> {
        match self {
            Validator::Int32Between(min, max) => {
                if value < *min || value > *max {
                    return Err(format!(
                        "value must be between {min} and {max}, got: {value}"
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

// Validation patterns compiled once per process.
static COMPILED_PATTERNS: LazyLock<RwLock<HashMap<&'static str, Regex>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn compiled(pattern: &'static str) -> Result<Regex, regex::Error> {
    if let Some(re) = COMPILED_PATTERNS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(pattern)
    {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)?;
    Ok(COMPILED_PATTERNS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(pattern)
        .or_insert(re)
        .clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanModifier {
    /// A change to this attribute destroys and recreates the object.
    RequiresReplace,
    /// Keep the prior state value instead of planning an unknown.
    UseStateForUnknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub kind: AttributeType,
    pub presence: Presence,
    pub sensitive: bool,
    pub description: Option<&'static str>,
    pub validators: Vec<Validator>,
    pub plan_modifiers: Vec<PlanModifier>,
    pub nested: BTreeMap<&'static str, Attribute>,
}

impl Attribute {
    fn new(kind: AttributeType) -> Self {
        Self {
            kind,
            presence: Presence::Computed,
            sensitive: false,
            description: None,
            validators: Vec::new(),
            plan_modifiers: Vec::new(),
            nested: BTreeMap::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(AttributeType::String)
    }

    pub fn bool() -> Self {
        Self::new(AttributeType::Bool)
    }

    pub fn int32() -> Self {
        Self::new(AttributeType::Int32)
    }

    pub fn int64() -> Self {
        Self::new(AttributeType::Int64)
    }

    pub fn float32() -> Self {
        Self::new(AttributeType::Float32)
    }

    pub fn string_list() -> Self {
        Self::new(AttributeType::StringList)
    }

    pub fn string_map() -> Self {
        Self::new(AttributeType::StringMap)
    }

    pub fn single_nested(attributes: impl IntoIterator<Item = (&'static str, Attribute)>) -> Self {
        let mut attr = Self::new(AttributeType::SingleNested);
        attr.nested = attributes.into_iter().collect();
        attr
    }

    pub fn list_nested(attributes: impl IntoIterator<Item = (&'static str, Attribute)>) -> Self {
        let mut attr = Self::new(AttributeType::ListNested);
        attr.nested = attributes.into_iter().collect();
        attr
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    /// Alone this marks a server-only attribute; after
    /// [`Attribute::optional`] it lets the server fill in what the
    /// configuration leaves out.
    pub fn computed(mut self) -> Self {
        self.presence = match self.presence {
            Presence::Optional | Presence::OptionalComputed => Presence::OptionalComputed,
            _ => Presence::Computed,
        };
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn plan_modifier(mut self, modifier: PlanModifier) -> Self {
        self.plan_modifiers.push(modifier);
        self
    }

    pub fn requires_replace(&self) -> bool {
        self.plan_modifiers.contains(&PlanModifier::RequiresReplace)
    }

    pub fn use_state_for_unknown(&self) -> bool {
        self.plan_modifiers.contains(&PlanModifier::UseStateForUnknown)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub description: Option<&'static str>,
    pub attributes: BTreeMap<&'static str, Attribute>,
}

impl Schema {
    pub fn new(description: &'static str) -> Self {
        Self {
            description: Some(description),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    /// Looks an attribute up by path, ignoring list indexes.
    pub fn lookup(&self, path: &AttributePath) -> Option<&Attribute> {
        let mut names = path.names().into_iter();
        let mut current = self.attributes.get(names.next()?)?;
        for name in names {
            current = current.nested.get(name)?;
        }
        Some(current)
    }

    /// Top-level attributes whose change forces replacement.
    pub fn requires_replace(&self) -> Vec<&'static str> {
        self.attributes
            .iter()
            .filter(|(_, attr)| attr.requires_replace())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn validate_string(&self, path: &AttributePath, value: &Attr<String>, diags: &mut Diagnostics) {
        let (Some(attribute), Some(value)) = (self.lookup(path), value.value()) else {
            return;
        };
        for validator in &attribute.validators {
            if let Err(message) = validator.check_str(value) {
                diags.add_attribute_error(path.clone(), "Invalid Attribute Value", message);
            }
        }
    }

    pub fn validate_int32(&self, path: &AttributePath, value: &Attr<i32>, diags: &mut Diagnostics) {
        let (Some(attribute), Some(value)) = (self.lookup(path), value.value()) else {
            return;
        };
        for validator in &attribute.validators {
            if let Err(message) = validator.check_i32(*value) {
                diags.add_attribute_error(path.clone(), "Invalid Attribute Value", message);
            }
        }
    }
}

/// Patterns shared by several schemas.
pub mod patterns {
    pub const IPV4: &str = r"^((25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$";
    pub const ABSOLUTE_PATH: &str = r"^(/(?:[^/\x00]+/)*[^/\x00]+)?$";
    pub const HOSTNAME: &str = r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$";
    pub const CONTAINER_NAME: &str = r"^[A-Za-z0-9][A-Za-z0-9._-]{1,63}$";
    pub const IMAGE_REFERENCE: &str = r"^(?:[a-z0-9]+(?:[._-][a-z0-9]+)*/)?[a-z0-9]+(?:[._-][a-z0-9]+)*(?::[a-z0-9]+(?:[._-][a-z0-9]+)*)?$";
    pub const APP_NAME: &str = r"^[a-zA-Z0-9](?:[a-zA-Z0-9_-]{0,30}[a-zA-Z0-9])?$";
    pub const VOLUME_NAME: &str = r"^[A-Za-z0-9][A-Za-z0-9_.-]*$";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new("test")
            .attribute(
                "status",
                Attribute::string()
                    .required()
                    .validator(Validator::OneOf(&["running", "stopped"])),
            )
            .attribute(
                "portbindings",
                Attribute::list_nested([(
                    "host",
                    Attribute::int32()
                        .required()
                        .validator(Validator::Int32Between(0, 65535)),
                )])
                .optional(),
            )
            .attribute(
                "name",
                Attribute::string()
                    .required()
                    .plan_modifier(PlanModifier::RequiresReplace)
                    .validator(Validator::RegexMatches(
                        patterns::CONTAINER_NAME,
                        "invalid container name",
                    )),
            )
    }

    #[test]
    fn test_one_of() {
        let mut diags = Diagnostics::new();
        let schema = schema();
        schema.validate_string(&AttributePath::root("status"), &"running".into(), &mut diags);
        assert!(!diags.has_error());
        schema.validate_string(&AttributePath::root("status"), &"paused".into(), &mut diags);
        assert!(diags.has_error());
    }

    #[test]
    fn test_nested_int_range() {
        let mut diags = Diagnostics::new();
        let path = AttributePath::root("portbindings").index(0).attribute("host");
        schema().validate_int32(&path, &70000.into(), &mut diags);
        let error = diags.errors().next().unwrap();
        assert_eq!(error.attribute.as_ref().unwrap().to_string(), "portbindings[0].host");
    }

    #[test]
    fn test_unknown_values_are_not_validated() {
        let mut diags = Diagnostics::new();
        schema().validate_string(&AttributePath::root("name"), &Attr::Unknown, &mut diags);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_patterns() {
        let schema = schema();
        let mut diags = Diagnostics::new();
        schema.validate_string(&AttributePath::root("name"), &"test-container".into(), &mut diags);
        assert!(diags.is_empty());
        schema.validate_string(&AttributePath::root("name"), &"-bad".into(), &mut diags);
        assert!(diags.has_error());

        let ip = Validator::RegexMatches(patterns::IPV4, "invalid IPv4 address");
        assert!(ip.check_str("192.168.1.10").is_ok());
        assert!(ip.check_str("300.1.1.1").is_err());

        let path = Validator::RegexMatches(patterns::ABSOLUTE_PATH, "invalid path");
        assert!(path.check_str("/share/Container/data").is_ok());
        assert!(path.check_str("relative/path").is_err());

        let image = Validator::RegexMatches(patterns::IMAGE_REFERENCE, "invalid image");
        assert!(image.check_str("nginx:latest").is_ok());
        assert!(image.check_str("library/postgres:15").is_ok());
        assert!(image.check_str("Nginx").is_err());
    }

    #[test]
    fn test_patterns_compiled_once() {
        let first = compiled(patterns::HOSTNAME).unwrap();
        let second = compiled(patterns::HOSTNAME).unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert!(COMPILED_PATTERNS.read().unwrap().contains_key(patterns::HOSTNAME));

        let broken = Validator::RegexMatches("([a-z", "never matches");
        assert!(broken
            .check_str("abc")
            .unwrap_err()
            .starts_with("invalid validation pattern"));
        assert!(!COMPILED_PATTERNS.read().unwrap().contains_key("([a-z"));
    }

    #[test]
    fn test_requires_replace() {
        assert_eq!(schema().requires_replace(), vec!["name"]);
    }
}
