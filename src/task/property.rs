//! descriptors for the configurable fields of a task type and the property
//! map used by generic tooling to construct tasks

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

/// the type of the values a [TaskProperty] accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// [PropertyValue::String]
    String,
    /// [PropertyValue::Boolean]
    Boolean,
    /// [PropertyValue::Integer]
    Integer,
    /// [PropertyValue::Date]
    Date,
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Date => "date",
        };
        write!(f, "{}", name)
    }
}

/// a single value of a task property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// a string value, also used for enumerated properties
    String(String),
    /// a boolean value
    Boolean(bool),
    /// an integer value
    Integer(i64),
    /// a timestamp
    Date(DateTime<Utc>),
}

impl PropertyValue {
    /// the data type this value belongs to
    pub fn data_type(&self) -> DataType {
        match self {
            PropertyValue::String(_) => DataType::String,
            PropertyValue::Boolean(_) => DataType::Boolean,
            PropertyValue::Integer(_) => DataType::Integer,
            PropertyValue::Date(_) => DataType::Date,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(d: DateTime<Utc>) -> Self {
        PropertyValue::Date(d)
    }
}

/// describes one configurable field of a task type
///
/// two properties are equal if their attribute names are equal ignoring case,
/// the attribute name is unique within the property set of a task type
#[derive(Debug, Clone)]
pub struct TaskProperty {
    /// the LDAP attribute the property is stored in
    attribute_name: String,
    /// a short human readable name
    display_name: String,
    /// a longer human readable description
    description: String,
    /// the type of the values
    data_type: DataType,
    /// whether a value is required
    required: bool,
    /// whether more than one value is allowed
    multi_valued: bool,
    /// whether this is an advanced property most users will not need to change
    advanced: bool,
    /// the values allowed for an enumerated property, empty if any value is allowed
    allowed_values: Vec<String>,
    /// the values used if no value is supplied
    default_values: Vec<PropertyValue>,
}

impl TaskProperty {
    /// create a new task property
    pub fn new(
        attribute_name: &str,
        display_name: &str,
        description: &str,
        data_type: DataType,
        required: bool,
        multi_valued: bool,
    ) -> Self {
        Self {
            attribute_name: attribute_name.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            data_type,
            required,
            multi_valued,
            advanced: false,
            allowed_values: vec![],
            default_values: vec![],
        }
    }

    /// mark the property as advanced
    pub fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }

    /// restrict a string property to a fixed set of values
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// set the values used when no value is supplied
    pub fn with_default_values(mut self, values: Vec<PropertyValue>) -> Self {
        self.default_values = values;
        self
    }

    /// the LDAP attribute the property is stored in
    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    /// a short human readable name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// a longer human readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// the type of the values
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// whether a value is required
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// whether more than one value is allowed
    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued
    }

    /// whether this is an advanced property
    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    /// the allowed values of an enumerated property
    pub fn allowed_values(&self) -> &[String] {
        &self.allowed_values
    }

    /// the default values
    pub fn default_values(&self) -> &[PropertyValue] {
        &self.default_values
    }

    /// the lower-cased attribute name used for equality and hashing
    fn key(&self) -> String {
        self.attribute_name.to_ascii_lowercase()
    }
}

impl PartialEq for TaskProperty {
    fn eq(&self, other: &Self) -> bool {
        self.attribute_name
            .eq_ignore_ascii_case(&other.attribute_name)
    }
}

impl Eq for TaskProperty {}

impl Hash for TaskProperty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Display for TaskProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.attribute_name)
    }
}

/// values for a set of task properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    /// the values keyed by property
    values: HashMap<TaskProperty, Vec<PropertyValue>>,
}

impl PropertyMap {
    /// an empty property map
    pub fn new() -> Self {
        Self::default()
    }

    /// set the values of a property, replacing any earlier values
    pub fn insert(&mut self, property: &TaskProperty, values: Vec<PropertyValue>) -> &mut Self {
        self.values.insert(property.clone(), values);
        self
    }

    /// the values of a property, if the property is present at all
    pub fn get(&self, property: &TaskProperty) -> Option<&[PropertyValue]> {
        self.values.get(property).map(Vec::as_slice)
    }

    /// the values of the property stored in the given attribute
    pub fn get_by_attribute_name(&self, attribute_name: &str) -> Option<&[PropertyValue]> {
        self.values
            .iter()
            .find(|(p, _)| p.attribute_name().eq_ignore_ascii_case(attribute_name))
            .map(|(_, v)| v.as_slice())
    }

    /// whether the map contains no properties
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// the number of properties in the map
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// iterate over the properties and their values
    pub fn iter(&self) -> impl Iterator<Item = (&TaskProperty, &[PropertyValue])> {
        self.values.iter().map(|(p, v)| (p, v.as_slice()))
    }
}

impl FromIterator<(TaskProperty, Vec<PropertyValue>)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (TaskProperty, Vec<PropertyValue>)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn properties_compare_by_attribute_name() {
        let a = TaskProperty::new("ds-task-id", "Task ID", "", DataType::String, false, false);
        let b = TaskProperty::new("DS-TASK-ID", "Other", "other", DataType::Integer, true, true);
        assert_eq!(a, b);
        let mut map = PropertyMap::new();
        map.insert(&a, vec!["x".into()]);
        assert_eq!(map.get(&b), Some(&[PropertyValue::from("x")][..]));
        assert_eq!(
            map.get_by_attribute_name("Ds-Task-Id"),
            Some(&[PropertyValue::from("x")][..])
        );
    }

    #[test]
    fn values_know_their_type() {
        assert_eq!(PropertyValue::from(true).data_type(), DataType::Boolean);
        assert_eq!(PropertyValue::from(3i64).data_type(), DataType::Integer);
        assert_eq!(PropertyValue::from("s").data_type(), DataType::String);
        assert_eq!(PropertyValue::from(Utc::now()).data_type(), DataType::Date);
    }

    #[test]
    fn enumerated_properties_keep_allowed_values() {
        let p = TaskProperty::new("x", "X", "", DataType::String, false, false)
            .with_allowed_values(["a", "b"])
            .advanced();
        assert_eq!(p.allowed_values(), &["a".to_string(), "b".to_string()]);
        assert!(p.is_advanced());
        assert_eq!(p.to_string(), "X (x)");
    }
}
