//! entering and leaving lockdown mode, in which the server only accepts
//! requests from root users over loopback connections

use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::TaskError;
use crate::task::codec::{optional_value, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, TaskProperty};
use crate::task::registry::TaskType;

/// the reason for entering lockdown mode
pub const ATTR_ENTER_REASON: &str = "ds-task-enter-lockdown-reason";
/// the reason for leaving lockdown mode
pub const ATTR_LEAVE_REASON: &str = "ds-task-leave-lockdown-reason";

lazy_static! {
    static ref PROPERTY_ENTER_REASON: TaskProperty = TaskProperty::new(
        ATTR_ENTER_REASON,
        "Reason",
        "The reason for entering lockdown mode, written to the server log",
        DataType::String,
        false,
        false,
    );
    static ref PROPERTY_LEAVE_REASON: TaskProperty = TaskProperty::new(
        ATTR_LEAVE_REASON,
        "Reason",
        "The reason for leaving lockdown mode, written to the server log",
        DataType::String,
        false,
        false,
    );
    static ref ENTER_PROPERTIES: Vec<TaskProperty> = vec![PROPERTY_ENTER_REASON.clone()];
    static ref LEAVE_PROPERTIES: Vec<TaskProperty> = vec![PROPERTY_LEAVE_REASON.clone()];
}

/// puts the server into lockdown mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnterLockdownModeTask {
    /// the reason written to the server log
    reason: Option<String>,
}

impl EnterLockdownModeTask {
    /// enter lockdown mode, optionally logging a reason
    pub fn new(reason: Option<&str>) -> Self {
        Self {
            reason: reason.map(str::to_string),
        }
    }

    /// the reason written to the server log
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl TaskType for EnterLockdownModeTask {
    const TASK_CLASS_NAME: &'static str =
        "com.unboundid.directory.server.tasks.EnterLockdownModeTask";
    const OBJECT_CLASS: &'static str = "ds-task-enter-lockdown-mode";

    fn task_properties() -> &'static [TaskProperty] {
        &ENTER_PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        Ok(Self {
            reason: EntryReader::new(entry).string(ATTR_ENTER_REASON),
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        Ok(Self {
            reason: PropertyReader::new(properties).string(&PROPERTY_ENTER_REASON)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer.add_optional(ATTR_ENTER_REASON, self.reason());
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties.insert(&PROPERTY_ENTER_REASON, optional_value(self.reason()));
    }
}

/// takes the server out of lockdown mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaveLockdownModeTask {
    /// the reason written to the server log
    reason: Option<String>,
}

impl LeaveLockdownModeTask {
    /// leave lockdown mode, optionally logging a reason
    pub fn new(reason: Option<&str>) -> Self {
        Self {
            reason: reason.map(str::to_string),
        }
    }

    /// the reason written to the server log
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl TaskType for LeaveLockdownModeTask {
    const TASK_CLASS_NAME: &'static str =
        "com.unboundid.directory.server.tasks.LeaveLockdownModeTask";
    const OBJECT_CLASS: &'static str = "ds-task-leave-lockdown-mode";

    fn task_properties() -> &'static [TaskProperty] {
        &LEAVE_PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        Ok(Self {
            reason: EntryReader::new(entry).string(ATTR_LEAVE_REASON),
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        Ok(Self {
            reason: PropertyReader::new(properties).string(&PROPERTY_LEAVE_REASON)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer.add_optional(ATTR_LEAVE_REASON, self.reason());
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties.insert(&PROPERTY_LEAVE_REASON, optional_value(self.reason()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::registry::TaskKind;
    use crate::task::test_support::{assert_round_trips, task_entry};
    use crate::task::Task;
    use pretty_assertions::assert_eq;

    #[test]
    fn enter_and_leave_round_trip() {
        assert_round_trips(&Task::new(
            Some("enter"),
            EnterLockdownModeTask::new(Some("schema upgrade")),
        ));
        assert_round_trips(&Task::new(Some("leave"), LeaveLockdownModeTask::default()));
    }

    #[test]
    fn dispatch_distinguishes_enter_and_leave() {
        let e = task_entry(
            LeaveLockdownModeTask::TASK_CLASS_NAME,
            LeaveLockdownModeTask::OBJECT_CLASS,
            &[(ATTR_LEAVE_REASON, &["done"])],
        );
        let task = Task::decode_entry(&e).unwrap();
        assert_eq!(
            task.kind(),
            &TaskKind::LeaveLockdownMode(LeaveLockdownModeTask::new(Some("done")))
        );
    }
}
