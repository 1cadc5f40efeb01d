//! shutting down or restarting the server

use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::TaskError;
use crate::task::codec::{optional_value, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, TaskProperty};
use crate::task::registry::TaskType;

/// the message logged and sent to clients
pub const ATTR_SHUTDOWN_MESSAGE: &str = "ds-task-shutdown-message";
/// restart instead of shutting down
pub const ATTR_RESTART: &str = "ds-task-restart";

lazy_static! {
    static ref PROPERTY_SHUTDOWN_MESSAGE: TaskProperty = TaskProperty::new(
        ATTR_SHUTDOWN_MESSAGE,
        "Shutdown Message",
        "A message to log and send to connected clients",
        DataType::String,
        false,
        false,
    );
    static ref PROPERTY_RESTART: TaskProperty = TaskProperty::new(
        ATTR_RESTART,
        "Restart Server",
        "Whether to restart the server instead of shutting it down",
        DataType::Boolean,
        false,
        false,
    );
    static ref PROPERTIES: Vec<TaskProperty> =
        vec![PROPERTY_SHUTDOWN_MESSAGE.clone(), PROPERTY_RESTART.clone()];
}

/// shuts down or restarts the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownTask {
    /// the message logged and sent to clients
    shutdown_message: Option<String>,
    /// restart instead of shutting down
    restart: Option<bool>,
}

impl ShutdownTask {
    /// shut down, or restart if `restart` is true
    pub fn new(shutdown_message: Option<&str>, restart: bool) -> Self {
        Self {
            shutdown_message: shutdown_message.map(str::to_string),
            restart: Some(restart),
        }
    }

    /// the message logged and sent to clients
    pub fn shutdown_message(&self) -> Option<&str> {
        self.shutdown_message.as_deref()
    }

    /// whether the server restarts instead of shutting down
    pub fn restart(&self) -> bool {
        self.restart.unwrap_or(false)
    }
}

impl TaskType for ShutdownTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.ShutdownTask";
    const OBJECT_CLASS: &'static str = "ds-task-shutdown";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        Ok(Self {
            shutdown_message: reader.string(ATTR_SHUTDOWN_MESSAGE),
            restart: reader.boolean(ATTR_RESTART)?,
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        Ok(Self {
            shutdown_message: reader.string(&PROPERTY_SHUTDOWN_MESSAGE)?,
            restart: reader.boolean(&PROPERTY_RESTART)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_optional(ATTR_SHUTDOWN_MESSAGE, self.shutdown_message())
            .add_bool(ATTR_RESTART, self.restart);
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(&PROPERTY_SHUTDOWN_MESSAGE, optional_value(self.shutdown_message()))
            .insert(&PROPERTY_RESTART, optional_value(self.restart));
    }
}
