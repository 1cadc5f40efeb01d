//! tasks of classes not known to this crate

use ldap3::SearchEntry;

use crate::entry::{attribute_values, EntryWriter, ATTR_OBJECT_CLASS};
use crate::error::UsageError;
use crate::task::{COMMON_ATTRIBUTES, OC_TASK};

/// a task whose class name matches no known task type
///
/// the class name, the additional object classes and all attributes not
/// handled by [Task](crate::task::Task) are kept verbatim so the task can be
/// rendered into an equivalent entry again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericTask {
    /// the fully qualified name of the server side implementation
    task_class_name: String,
    /// object classes other than `top` and `ds-task`
    additional_object_classes: Vec<String>,
    /// the task specific attributes sorted by lower-cased name
    additional_attributes: Vec<(String, Vec<String>)>,
}

impl GenericTask {
    /// create a task for an arbitrary server side task class
    pub fn new<A>(
        task_class_name: &str,
        additional_object_classes: Vec<String>,
        additional_attributes: A,
    ) -> Result<Self, UsageError>
    where
        A: IntoIterator<Item = (String, Vec<String>)>,
    {
        UsageError::check_non_empty("task_class_name", task_class_name)?;
        let mut additional_attributes: Vec<(String, Vec<String>)> = additional_attributes
            .into_iter()
            .filter(|(name, values)| !values.is_empty() && !is_reserved_attribute(name))
            .collect();
        additional_attributes.sort_by_key(|(name, _)| name.to_lowercase());
        Ok(Self {
            task_class_name: task_class_name.to_string(),
            additional_object_classes: additional_object_classes
                .into_iter()
                .filter(|oc| !is_base_object_class(oc))
                .collect(),
            additional_attributes,
        })
    }

    /// keep everything the common task attributes do not cover
    pub(crate) fn decode_entry(entry: &SearchEntry, task_class_name: &str) -> Self {
        let additional_object_classes = attribute_values(entry, ATTR_OBJECT_CLASS)
            .iter()
            .filter(|oc| !is_base_object_class(oc))
            .cloned()
            .collect();
        let mut additional_attributes: Vec<(String, Vec<String>)> = entry
            .attrs
            .iter()
            .filter(|(name, values)| !values.is_empty() && !is_reserved_attribute(name))
            .map(|(name, values)| (name.to_owned(), values.to_owned()))
            .collect();
        additional_attributes.sort_by_key(|(name, _)| name.to_lowercase());
        Self {
            task_class_name: task_class_name.to_string(),
            additional_object_classes,
            additional_attributes,
        }
    }

    /// the fully qualified name of the server side implementation
    pub fn task_class_name(&self) -> &str {
        &self.task_class_name
    }

    /// object classes other than `top` and `ds-task`
    pub fn additional_object_classes(&self) -> &[String] {
        &self.additional_object_classes
    }

    /// the task specific attributes
    pub fn additional_attributes(&self) -> &[(String, Vec<String>)] {
        &self.additional_attributes
    }

    /// add the kept attributes to an entry being rendered
    pub(crate) fn encode_attributes(&self, writer: &mut EntryWriter) {
        for (name, values) in &self.additional_attributes {
            writer.add_values(name, values);
        }
    }
}

/// object classes every task entry has
fn is_base_object_class(object_class: &str) -> bool {
    object_class.eq_ignore_ascii_case("top") || object_class.eq_ignore_ascii_case(OC_TASK)
}

/// attributes handled by [Task](crate::task::Task) or the entry itself
fn is_reserved_attribute(name: &str) -> bool {
    name.eq_ignore_ascii_case(ATTR_OBJECT_CLASS)
        || COMMON_ATTRIBUTES
            .iter()
            .any(|common| common.eq_ignore_ascii_case(name))
}
