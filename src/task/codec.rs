//! typed readers used by every task type to decode its fields from an entry
//! or from a property map
//!
//! all errors name the attribute or property they were raised for

use chrono::{DateTime, Utc};
use ldap3::SearchEntry;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::entry::attribute_values;
use crate::error::TaskError;
use crate::task::property::{PropertyMap, PropertyValue, TaskProperty};
use crate::time::{decode_generalized_time, parse_duration};

/// parse a boolean attribute value, only `true` and `false` are accepted
/// (ignoring case)
pub(crate) fn parse_boolean(attribute: &str, value: &str) -> Result<bool, TaskError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(TaskError::invalid_value(
            attribute,
            value,
            "expected true or false",
        ))
    }
}

/// read access to the attributes of a task entry
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntryReader<'a> {
    /// the entry being decoded
    entry: &'a SearchEntry,
}

impl<'a> EntryReader<'a> {
    /// wrap an entry
    pub(crate) fn new(entry: &'a SearchEntry) -> Self {
        Self { entry }
    }

    /// the DN of the entry
    pub(crate) fn dn(&self) -> &'a str {
        &self.entry.dn
    }

    /// all values of an attribute
    pub(crate) fn values(&self, attribute: &str) -> &'a [String] {
        attribute_values(self.entry, attribute)
    }

    /// the first value of an attribute
    pub(crate) fn string(&self, attribute: &str) -> Option<String> {
        self.values(attribute).first().cloned()
    }

    /// the first value of an attribute which must be present
    pub(crate) fn required_string(&self, attribute: &str) -> Result<String, TaskError> {
        self.string(attribute)
            .ok_or_else(|| self.missing(attribute))
    }

    /// all values of an attribute
    pub(crate) fn strings(&self, attribute: &str) -> Vec<String> {
        self.values(attribute).to_vec()
    }

    /// all values of an attribute which must have at least one value
    pub(crate) fn required_strings(&self, attribute: &str) -> Result<Vec<String>, TaskError> {
        let values = self.strings(attribute);
        if values.is_empty() {
            return Err(self.missing(attribute));
        }
        Ok(values)
    }

    /// a boolean attribute
    pub(crate) fn boolean(&self, attribute: &str) -> Result<Option<bool>, TaskError> {
        self.string(attribute)
            .map(|v| parse_boolean(attribute, &v))
            .transpose()
    }

    /// an integer attribute
    pub(crate) fn integer(&self, attribute: &str) -> Result<Option<i64>, TaskError> {
        self.string(attribute)
            .map(|v| {
                v.trim()
                    .parse::<i64>()
                    .map_err(|e| TaskError::invalid_value(attribute, &v, e.to_string()))
            })
            .transpose()
    }

    /// an integer attribute which must not be negative
    pub(crate) fn non_negative_integer(&self, attribute: &str) -> Result<Option<i64>, TaskError> {
        match self.integer(attribute)? {
            Some(i) if i < 0 => Err(TaskError::invalid_value(
                attribute,
                &i.to_string(),
                "value must not be negative",
            )),
            other => Ok(other),
        }
    }

    /// an integer attribute which must be greater than zero
    pub(crate) fn positive_integer(&self, attribute: &str) -> Result<Option<i64>, TaskError> {
        match self.integer(attribute)? {
            Some(i) if i <= 0 => Err(TaskError::invalid_value(
                attribute,
                &i.to_string(),
                "value must be greater than zero",
            )),
            other => Ok(other),
        }
    }

    /// a generalized time attribute
    pub(crate) fn timestamp(&self, attribute: &str) -> Result<Option<DateTime<Utc>>, TaskError> {
        self.string(attribute)
            .map(|v| {
                decode_generalized_time(&v)
                    .map_err(|e| TaskError::invalid_value(attribute, &v, e.to_string()))
            })
            .transpose()
    }

    /// a duration attribute like `7 days`
    pub(crate) fn duration(&self, attribute: &str) -> Result<Option<Duration>, TaskError> {
        self.string(attribute)
            .map(|v| {
                parse_duration(&v)
                    .map_err(|e| TaskError::invalid_value(attribute, &v, e.message))
            })
            .transpose()
    }

    /// an attribute parsed with [FromStr], used for enumerations
    pub(crate) fn parsed<T>(&self, attribute: &str) -> Result<Option<T>, TaskError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.string(attribute)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|e| TaskError::invalid_value(attribute, &v, e.to_string()))
            })
            .transpose()
    }

    /// the error for a missing required attribute
    pub(crate) fn missing(&self, attribute: &str) -> TaskError {
        TaskError::MissingAttribute {
            dn: self.entry.dn.clone(),
            attribute: attribute.to_string(),
        }
    }
}

/// read access to a property map, validating values against their descriptors
#[derive(Debug, Clone, Copy)]
pub(crate) struct PropertyReader<'a> {
    /// the property map being decoded
    map: &'a PropertyMap,
}

impl<'a> PropertyReader<'a> {
    /// wrap a property map
    pub(crate) fn new(map: &'a PropertyMap) -> Self {
        Self { map }
    }

    /// the values of a property after checking the required and multi-valued
    /// flags, the data type and the allowed values
    pub(crate) fn values(&self, property: &TaskProperty) -> Result<&'a [PropertyValue], TaskError> {
        let values = self.map.get(property).unwrap_or(&[]);
        let name = property.attribute_name();
        if values.is_empty() && property.is_required() {
            return Err(TaskError::MissingProperty(name.to_string()));
        }
        if values.len() > 1 && !property.is_multi_valued() {
            return Err(TaskError::TooManyPropertyValues(name.to_string()));
        }
        for value in values {
            if value.data_type() != property.data_type() {
                return Err(TaskError::invalid_property(
                    name,
                    format!(
                        "expected a {} value but got a {} value",
                        property.data_type(),
                        value.data_type()
                    ),
                ));
            }
            if let PropertyValue::String(s) = value {
                let allowed = property.allowed_values();
                if !allowed.is_empty() && !allowed.iter().any(|a| a.eq_ignore_ascii_case(s)) {
                    return Err(TaskError::invalid_property(
                        name,
                        format!(
                            "{} is not one of the allowed values {}",
                            s,
                            itertools::join(allowed, ", ")
                        ),
                    ));
                }
            }
        }
        Ok(values)
    }

    /// all string values of a property
    pub(crate) fn strings(&self, property: &TaskProperty) -> Result<Vec<String>, TaskError> {
        Ok(self
            .values(property)?
            .iter()
            .filter_map(|v| match v {
                PropertyValue::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect())
    }

    /// the string value of a single-valued property
    pub(crate) fn string(&self, property: &TaskProperty) -> Result<Option<String>, TaskError> {
        Ok(self.strings(property)?.into_iter().next())
    }

    /// the string value of a required single-valued property
    pub(crate) fn required_string(&self, property: &TaskProperty) -> Result<String, TaskError> {
        self.string(property)?
            .ok_or_else(|| TaskError::MissingProperty(property.attribute_name().to_string()))
    }

    /// the boolean value of a single-valued property
    pub(crate) fn boolean(&self, property: &TaskProperty) -> Result<Option<bool>, TaskError> {
        Ok(self.values(property)?.iter().find_map(|v| match v {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }))
    }

    /// the integer value of a single-valued property
    pub(crate) fn integer(&self, property: &TaskProperty) -> Result<Option<i64>, TaskError> {
        Ok(self.values(property)?.iter().find_map(|v| match v {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }))
    }

    /// the integer value of a single-valued property which must not be negative
    pub(crate) fn non_negative_integer(
        &self,
        property: &TaskProperty,
    ) -> Result<Option<i64>, TaskError> {
        match self.integer(property)? {
            Some(i) if i < 0 => Err(TaskError::invalid_property(
                property.attribute_name(),
                "value must not be negative",
            )),
            other => Ok(other),
        }
    }

    /// the integer value of a single-valued property which must be greater than zero
    pub(crate) fn positive_integer(
        &self,
        property: &TaskProperty,
    ) -> Result<Option<i64>, TaskError> {
        match self.integer(property)? {
            Some(i) if i <= 0 => Err(TaskError::invalid_property(
                property.attribute_name(),
                "value must be greater than zero",
            )),
            other => Ok(other),
        }
    }

    /// the date value of a single-valued property
    pub(crate) fn date(&self, property: &TaskProperty) -> Result<Option<DateTime<Utc>>, TaskError> {
        Ok(self.values(property)?.iter().find_map(|v| match v {
            PropertyValue::Date(d) => Some(*d),
            _ => None,
        }))
    }

    /// a string property parsed with [FromStr], used for enumerations
    pub(crate) fn parsed<T>(&self, property: &TaskProperty) -> Result<Option<T>, TaskError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.string(property)?
            .map(|s| {
                s.parse::<T>().map_err(|e| {
                    TaskError::invalid_property(property.attribute_name(), e.to_string())
                })
            })
            .transpose()
    }
}

/// property values for an optional single value
pub(crate) fn optional_value<T: Into<PropertyValue>>(value: Option<T>) -> Vec<PropertyValue> {
    value.into_iter().map(Into::into).collect()
}

/// property values for a list of strings
pub(crate) fn string_values(values: &[String]) -> Vec<PropertyValue> {
    values.iter().cloned().map(PropertyValue::String).collect()
}

/// checks the values of a property map against the property descriptors,
/// used by the tests of the individual task types
#[cfg(test)]
pub(crate) fn assert_property_types(map: &PropertyMap) {
    use crate::task::property::DataType;
    for (property, values) in map.iter() {
        assert!(
            !property.is_required() || !values.is_empty(),
            "{} is required but has no values",
            property
        );
        assert!(
            property.is_multi_valued() || values.len() <= 1,
            "{} is single-valued but has {} values",
            property,
            values.len()
        );
        for value in values {
            assert_eq!(value.data_type(), property.data_type(), "{}", property);
        }
        if property.data_type() != DataType::String {
            assert!(property.allowed_values().is_empty(), "{}", property);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::property::DataType;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    fn entry(attrs: &[(&str, &str)]) -> SearchEntry {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in attrs {
            map.entry(k.to_string()).or_default().push(v.to_string());
        }
        SearchEntry {
            dn: "ds-task-id=x,cn=Scheduled Tasks,cn=tasks".to_string(),
            attrs: map,
            bin_attrs: HashMap::new(),
        }
    }

    #[rstest]
    #[case("true", Some(true))]
    #[case("TRUE", Some(true))]
    #[case("False", Some(false))]
    fn booleans_accept_only_true_and_false(#[case] value: &str, #[case] expected: Option<bool>) {
        let e = entry(&[("flag", value)]);
        assert_eq!(EntryReader::new(&e).boolean("flag"), Ok(expected));
    }

    #[rstest]
    #[case("yes")]
    #[case("1")]
    #[case("")]
    fn booleans_reject_other_literals(#[case] value: &str) {
        let e = entry(&[("flag", value)]);
        assert!(matches!(
            EntryReader::new(&e).boolean("flag"),
            Err(TaskError::InvalidAttributeValue { attribute, .. }) if attribute == "flag"
        ));
    }

    #[test]
    fn integers_check_sign() {
        let e = entry(&[("a", "-1"), ("b", "0"), ("c", "x")]);
        let reader = EntryReader::new(&e);
        assert_eq!(reader.integer("a"), Ok(Some(-1)));
        assert!(reader.non_negative_integer("a").is_err());
        assert_eq!(reader.non_negative_integer("b"), Ok(Some(0)));
        assert!(reader.positive_integer("b").is_err());
        assert!(reader.integer("c").is_err());
        assert_eq!(reader.integer("missing"), Ok(None));
    }

    #[test]
    fn missing_required_attribute_names_the_attribute() {
        let e = entry(&[]);
        assert_eq!(
            EntryReader::new(&e).required_strings("ds-task-rebuild-index"),
            Err(TaskError::MissingAttribute {
                dn: e.dn.clone(),
                attribute: "ds-task-rebuild-index".to_string()
            })
        );
    }

    #[test]
    fn property_reader_checks_descriptor() {
        let single = TaskProperty::new("s", "S", "", DataType::String, true, false);
        let flag = TaskProperty::new("f", "F", "", DataType::Boolean, false, false);
        let level = TaskProperty::new("l", "L", "", DataType::String, false, false)
            .with_allowed_values(["low", "high"]);

        let empty = PropertyMap::new();
        assert_eq!(
            PropertyReader::new(&empty).required_string(&single),
            Err(TaskError::MissingProperty("s".to_string()))
        );

        let mut map = PropertyMap::new();
        map.insert(&single, vec!["a".into(), "b".into()]);
        map.insert(&flag, vec!["true".into()]);
        map.insert(&level, vec!["medium".into()]);
        let reader = PropertyReader::new(&map);
        assert_eq!(
            reader.string(&single),
            Err(TaskError::TooManyPropertyValues("s".to_string()))
        );
        assert!(matches!(
            reader.boolean(&flag),
            Err(TaskError::InvalidPropertyValue { property, .. }) if property == "f"
        ));
        assert!(reader.string(&level).is_err());
    }
}
