//! the two error kinds shared by all task types
//!
//! [UsageError] is returned when a typed constructor or builder is called with
//! arguments that can never describe a valid task. [TaskError] is returned when
//! data coming from a directory entry or a property map can not be decoded.

use thiserror::Error;

/// a programmer error in the arguments passed to a task constructor or builder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// a required argument was missing or empty
    #[error("missing required argument {0}")]
    MissingArgument(String),
    /// an argument had a value which is never valid for it
    #[error("invalid value for argument {argument}: {reason}")]
    InvalidArgument {
        /// the name of the argument
        argument: String,
        /// why the value was rejected
        reason: String,
    },
}

impl UsageError {
    /// shorthand for [UsageError::InvalidArgument]
    pub(crate) fn invalid(argument: &str, reason: impl Into<String>) -> Self {
        UsageError::InvalidArgument {
            argument: argument.to_string(),
            reason: reason.into(),
        }
    }

    /// reject an argument which is empty or only whitespace
    pub(crate) fn check_non_empty(argument: &str, value: &str) -> Result<(), Self> {
        if value.trim().is_empty() {
            return Err(UsageError::MissingArgument(argument.to_string()));
        }
        Ok(())
    }
}

impl From<derive_builder::UninitializedFieldError> for UsageError {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        UsageError::MissingArgument(err.field_name().to_string())
    }
}

/// an error decoding a task from a directory entry or a property map
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// the entry does not carry an object class every task entry must have
    #[error("entry {dn} is missing object class {object_class}")]
    MissingObjectClass {
        /// the DN of the entry
        dn: String,
        /// the missing object class
        object_class: String,
    },
    /// a required attribute was not present in the entry
    #[error("entry {dn} is missing required attribute {attribute}")]
    MissingAttribute {
        /// the DN of the entry
        dn: String,
        /// the attribute name
        attribute: String,
    },
    /// an attribute value could not be parsed
    #[error("invalid value {value:?} for attribute {attribute}: {reason}")]
    InvalidAttributeValue {
        /// the attribute name
        attribute: String,
        /// the offending value
        value: String,
        /// why the value was rejected
        reason: String,
    },
    /// a property map without any values was used to construct a task
    #[error("can not construct a task from an empty property map")]
    EmptyPropertyMap,
    /// a required property was missing from a property map or had no values
    #[error("missing value for required task property {0}")]
    MissingProperty(String),
    /// a single-valued property had more than one value
    #[error("task property {0} is single-valued but multiple values were given")]
    TooManyPropertyValues(String),
    /// a property value had the wrong type or was not one of the allowed values
    #[error("invalid value for task property {property}: {reason}")]
    InvalidPropertyValue {
        /// the attribute name of the property
        property: String,
        /// why the value was rejected
        reason: String,
    },
    /// the values are individually well formed but do not describe a valid task together
    #[error("invalid task {task_id}: {reason}")]
    InvalidTask {
        /// the task ID or DN of the task
        task_id: String,
        /// why the task was rejected
        reason: String,
    },
    /// no known task type matches the given class name
    #[error("unknown task class {0}")]
    UnknownTaskClass(String),
}

impl TaskError {
    /// shorthand for [TaskError::InvalidAttributeValue]
    pub(crate) fn invalid_value(attribute: &str, value: &str, reason: impl Into<String>) -> Self {
        TaskError::InvalidAttributeValue {
            attribute: attribute.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// shorthand for [TaskError::InvalidPropertyValue]
    pub(crate) fn invalid_property(property: &str, reason: impl Into<String>) -> Self {
        TaskError::InvalidPropertyValue {
            property: property.to_string(),
            reason: reason.into(),
        }
    }
}
