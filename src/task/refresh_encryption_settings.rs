//! reloading the encryption settings definitions of the server

use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::TaskError;
use crate::task::property::{PropertyMap, TaskProperty};
use crate::task::registry::TaskType;

/// makes the server reread its encryption settings database, the task has no
/// arguments of its own
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshEncryptionSettingsTask;

impl TaskType for RefreshEncryptionSettingsTask {
    const TASK_CLASS_NAME: &'static str =
        "com.unboundid.directory.server.tasks.RefreshEncryptionSettingsTask";
    const OBJECT_CLASS: &'static str = "ds-task-refresh-encryption-settings";

    fn task_properties() -> &'static [TaskProperty] {
        &[]
    }

    fn decode_entry(_entry: &SearchEntry) -> Result<Self, TaskError> {
        Ok(Self)
    }

    fn decode_properties(_properties: &PropertyMap) -> Result<Self, TaskError> {
        Ok(Self)
    }

    fn encode_attributes(&self, _writer: &mut EntryWriter) {}

    fn encode_properties(&self, _properties: &mut PropertyMap) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::assert_round_trips;
    use crate::task::Task;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_without_arguments() {
        let task = Task::new(Some("refresh"), RefreshEncryptionSettingsTask);
        assert_eq!(
            task.additional_object_classes(),
            vec!["ds-task-refresh-encryption-settings"]
        );
        assert_round_trips(&task);
    }
}
