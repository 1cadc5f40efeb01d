//! removing an unused attribute type from the server schema

use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use crate::task::registry::TaskType;

/// the name or OID of the attribute type to remove
pub const ATTR_ATTRIBUTE_TYPE: &str = "ds-task-remove-attribute-type-attribute";

lazy_static! {
    static ref PROPERTY_ATTRIBUTE_TYPE: TaskProperty = TaskProperty::new(
        ATTR_ATTRIBUTE_TYPE,
        "Attribute Type",
        "The name or OID of the attribute type to remove from the schema",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTIES: Vec<TaskProperty> = vec![PROPERTY_ATTRIBUTE_TYPE.clone()];
}

/// removes an attribute type which is no longer referenced by any entry or
/// schema element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveAttributeTypeTask {
    /// the name or OID of the attribute type
    attribute_type: String,
}

impl RemoveAttributeTypeTask {
    /// remove the attribute type with the given name or OID
    pub fn new(attribute_type: &str) -> Result<Self, UsageError> {
        UsageError::check_non_empty("attribute_type", attribute_type)?;
        Ok(Self {
            attribute_type: attribute_type.to_string(),
        })
    }

    /// the name or OID of the attribute type
    pub fn attribute_type(&self) -> &str {
        &self.attribute_type
    }

    /// the OID of the attribute type if it was given by OID rather than by name
    pub fn attribute_type_oid(&self) -> Option<oid::ObjectIdentifier> {
        oid::ObjectIdentifier::try_from(self.attribute_type.as_str()).ok()
    }
}

impl TaskType for RemoveAttributeTypeTask {
    const TASK_CLASS_NAME: &'static str =
        "com.unboundid.directory.server.tasks.RemoveAttributeTypeTask";
    const OBJECT_CLASS: &'static str = "ds-task-remove-attribute-type";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        Ok(Self {
            attribute_type: EntryReader::new(entry).required_string(ATTR_ATTRIBUTE_TYPE)?,
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        Ok(Self {
            attribute_type: PropertyReader::new(properties)
                .required_string(&PROPERTY_ATTRIBUTE_TYPE)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer.add_values(ATTR_ATTRIBUTE_TYPE, [self.attribute_type.as_str()]);
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties.insert(
            &PROPERTY_ATTRIBUTE_TYPE,
            vec![PropertyValue::String(self.attribute_type.clone())],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::{assert_round_trips, task_entry};
    use crate::task::Task;

    #[test]
    fn by_name_and_by_oid() {
        let by_name = RemoveAttributeTypeTask::new("obsoleteAttr").unwrap();
        assert!(by_name.attribute_type_oid().is_none());
        assert_round_trips(&Task::new(Some("name"), by_name));
        let by_oid = RemoveAttributeTypeTask::new("1.3.6.1.4.1.32473.1.2.3").unwrap();
        assert!(by_oid.attribute_type_oid().is_some());
        assert_round_trips(&Task::new(Some("oid"), by_oid));
    }

    #[test]
    fn attribute_type_is_required() {
        assert!(RemoveAttributeTypeTask::new("").is_err());
        let e = task_entry(
            RemoveAttributeTypeTask::TASK_CLASS_NAME,
            RemoveAttributeTypeTask::OBJECT_CLASS,
            &[],
        );
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::MissingAttribute { attribute, .. }) if attribute == ATTR_ATTRIBUTE_TYPE
        ));
    }
}
