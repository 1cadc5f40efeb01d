//! running a task implemented as a Groovy script on the server

use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{string_values, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use crate::task::registry::TaskType;

/// the fully qualified name of the script class
pub const ATTR_SCRIPT_CLASS: &str = "ds-scripted-task-class";
/// the arguments passed to the script in `name=value` form
pub const ATTR_SCRIPT_ARGUMENT: &str = "ds-scripted-task-argument";

lazy_static! {
    static ref PROPERTY_SCRIPT_CLASS: TaskProperty = TaskProperty::new(
        ATTR_SCRIPT_CLASS,
        "Script Class",
        "The fully qualified name of the Groovy class implementing the task",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTY_SCRIPT_ARGUMENT: TaskProperty = TaskProperty::new(
        ATTR_SCRIPT_ARGUMENT,
        "Script Argument",
        "The arguments passed to the script, each in the form name=value",
        DataType::String,
        false,
        true,
    );
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_SCRIPT_CLASS.clone(),
        PROPERTY_SCRIPT_ARGUMENT.clone(),
    ];
}

/// split an argument in `name=value` form, the name must not be empty
fn split_argument(argument: &str) -> Option<(&str, &str)> {
    argument
        .split_once('=')
        .filter(|(name, _)| !name.trim().is_empty())
}

/// runs a Groovy scripted task extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroovyScriptedTask {
    /// the script class
    script_class: String,
    /// the arguments in `name=value` form, in the order given
    arguments: Vec<String>,
}

impl GroovyScriptedTask {
    /// run the given script class with `(name, value)` arguments
    pub fn new<I, N, V>(script_class: &str, arguments: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        UsageError::check_non_empty("script_class", script_class)?;
        let mut result = Vec::new();
        for (name, value) in arguments {
            let name = name.as_ref();
            if name.trim().is_empty() || name.contains('=') {
                return Err(UsageError::invalid(
                    "arguments",
                    format!("{:?} is not a valid argument name", name),
                ));
            }
            result.push(format!("{}={}", name, value.as_ref()));
        }
        Ok(Self {
            script_class: script_class.to_string(),
            arguments: result,
        })
    }

    /// the script class
    pub fn script_class(&self) -> &str {
        &self.script_class
    }

    /// the arguments as `(name, value)` pairs
    pub fn arguments(&self) -> Vec<(&str, &str)> {
        self.arguments
            .iter()
            .filter_map(|a| split_argument(a))
            .collect()
    }

    /// check every raw argument has the `name=value` form
    fn check_arguments(arguments: &[String]) -> Result<(), &str> {
        match arguments.iter().find(|a| split_argument(a).is_none()) {
            Some(bad) => Err(bad.as_str()),
            None => Ok(()),
        }
    }
}

impl TaskType for GroovyScriptedTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.sdk.extensions.GroovyScriptedTask";
    const OBJECT_CLASS: &'static str = "ds-groovy-scripted-task";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        let arguments = reader.strings(ATTR_SCRIPT_ARGUMENT);
        Self::check_arguments(&arguments).map_err(|bad| {
            TaskError::invalid_value(ATTR_SCRIPT_ARGUMENT, bad, "expected name=value")
        })?;
        Ok(Self {
            script_class: reader.required_string(ATTR_SCRIPT_CLASS)?,
            arguments,
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        let arguments = reader.strings(&PROPERTY_SCRIPT_ARGUMENT)?;
        Self::check_arguments(&arguments).map_err(|bad| {
            TaskError::invalid_property(
                ATTR_SCRIPT_ARGUMENT,
                format!("{:?} is not in the form name=value", bad),
            )
        })?;
        Ok(Self {
            script_class: reader.required_string(&PROPERTY_SCRIPT_CLASS)?,
            arguments,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_values(ATTR_SCRIPT_CLASS, [self.script_class.as_str()])
            .add_values(ATTR_SCRIPT_ARGUMENT, self.arguments.iter().cloned());
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(
                &PROPERTY_SCRIPT_CLASS,
                vec![PropertyValue::String(self.script_class.clone())],
            )
            .insert(&PROPERTY_SCRIPT_ARGUMENT, string_values(&self.arguments));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::{assert_round_trips, task_entry};
    use crate::task::Task;
    use pretty_assertions::assert_eq;

    #[test]
    fn arguments_keep_their_order() {
        let kind = GroovyScriptedTask::new(
            "com.example.CleanupTask",
            [("dry-run", "true"), ("filter", "(uid=a=b)")],
        )
        .unwrap();
        assert_eq!(
            kind.arguments(),
            vec![("dry-run", "true"), ("filter", "(uid=a=b)")]
        );
        assert_round_trips(&Task::new(Some("groovy"), kind));
    }

    #[test]
    fn argument_names_must_be_usable() {
        assert!(GroovyScriptedTask::new("com.example.T", [("", "x")]).is_err());
        assert!(GroovyScriptedTask::new("com.example.T", [("a=b", "x")]).is_err());
        assert!(GroovyScriptedTask::new("", Vec::<(&str, &str)>::new()).is_err());
    }

    #[test]
    fn argument_without_separator_is_a_decode_error() {
        let e = task_entry(
            GroovyScriptedTask::TASK_CLASS_NAME,
            GroovyScriptedTask::OBJECT_CLASS,
            &[
                (ATTR_SCRIPT_CLASS, &["com.example.T"]),
                (ATTR_SCRIPT_ARGUMENT, &["verbose"]),
            ],
        );
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::InvalidAttributeValue { attribute, .. }) if attribute == ATTR_SCRIPT_ARGUMENT
        ));
    }
}
