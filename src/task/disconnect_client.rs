//! terminating a client connection

use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{optional_value, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use crate::task::registry::TaskType;

/// the ID of the connection to terminate
pub const ATTR_CONNECTION_ID: &str = "ds-task-disconnect-connection-id";
/// the message sent to the client
pub const ATTR_DISCONNECT_MESSAGE: &str = "ds-task-disconnect-message";
/// send a notice of disconnection before closing the connection
pub const ATTR_NOTIFY_CLIENT: &str = "ds-task-disconnect-notify-client";

lazy_static! {
    static ref PROPERTY_CONNECTION_ID: TaskProperty = TaskProperty::new(
        ATTR_CONNECTION_ID,
        "Connection ID",
        "The ID of the client connection to terminate",
        DataType::Integer,
        true,
        false,
    );
    static ref PROPERTY_DISCONNECT_MESSAGE: TaskProperty = TaskProperty::new(
        ATTR_DISCONNECT_MESSAGE,
        "Disconnect Message",
        "A message to send to the client",
        DataType::String,
        false,
        false,
    );
    static ref PROPERTY_NOTIFY_CLIENT: TaskProperty = TaskProperty::new(
        ATTR_NOTIFY_CLIENT,
        "Notify Client",
        "Whether to send the client a notice of disconnection",
        DataType::Boolean,
        false,
        false,
    );
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_CONNECTION_ID.clone(),
        PROPERTY_DISCONNECT_MESSAGE.clone(),
        PROPERTY_NOTIFY_CLIENT.clone(),
    ];
}

/// terminates the client connection with the given ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectClientTask {
    /// the connection to terminate
    connection_id: i64,
    /// the message sent to the client
    disconnect_message: Option<String>,
    /// send a notice of disconnection
    notify_client: Option<bool>,
}

impl DisconnectClientTask {
    /// terminate a connection, connection IDs are never negative
    pub fn new(
        connection_id: i64,
        disconnect_message: Option<&str>,
        notify_client: Option<bool>,
    ) -> Result<Self, UsageError> {
        if connection_id < 0 {
            return Err(UsageError::invalid("connection_id", "must not be negative"));
        }
        Ok(Self {
            connection_id,
            disconnect_message: disconnect_message.map(str::to_string),
            notify_client,
        })
    }

    /// the connection to terminate
    pub fn connection_id(&self) -> i64 {
        self.connection_id
    }

    /// the message sent to the client
    pub fn disconnect_message(&self) -> Option<&str> {
        self.disconnect_message.as_deref()
    }

    /// whether a notice of disconnection is sent
    pub fn notify_client(&self) -> Option<bool> {
        self.notify_client
    }
}

impl TaskType for DisconnectClientTask {
    const TASK_CLASS_NAME: &'static str =
        "com.unboundid.directory.server.tasks.DisconnectClientTask";
    const OBJECT_CLASS: &'static str = "ds-task-disconnect";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        Ok(Self {
            connection_id: reader
                .non_negative_integer(ATTR_CONNECTION_ID)?
                .ok_or_else(|| reader.missing(ATTR_CONNECTION_ID))?,
            disconnect_message: reader.string(ATTR_DISCONNECT_MESSAGE),
            notify_client: reader.boolean(ATTR_NOTIFY_CLIENT)?,
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        Ok(Self {
            connection_id: reader
                .non_negative_integer(&PROPERTY_CONNECTION_ID)?
                .ok_or_else(|| TaskError::MissingProperty(ATTR_CONNECTION_ID.to_string()))?,
            disconnect_message: reader.string(&PROPERTY_DISCONNECT_MESSAGE)?,
            notify_client: reader.boolean(&PROPERTY_NOTIFY_CLIENT)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_integer(ATTR_CONNECTION_ID, Some(self.connection_id))
            .add_optional(ATTR_DISCONNECT_MESSAGE, self.disconnect_message())
            .add_bool(ATTR_NOTIFY_CLIENT, self.notify_client);
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(
                &PROPERTY_CONNECTION_ID,
                vec![PropertyValue::Integer(self.connection_id)],
            )
            .insert(
                &PROPERTY_DISCONNECT_MESSAGE,
                optional_value(self.disconnect_message()),
            )
            .insert(&PROPERTY_NOTIFY_CLIENT, optional_value(self.notify_client));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::{assert_round_trips, task_entry};
    use crate::task::Task;
    use rstest::rstest;

    #[test]
    fn disconnect_with_notice() {
        let kind = DisconnectClientTask::new(12345, Some("idle too long"), Some(true)).unwrap();
        assert_round_trips(&Task::new(Some("kick"), kind));
    }

    #[test]
    fn negative_connection_id_is_a_usage_error() {
        assert!(DisconnectClientTask::new(-1, None, None).is_err());
    }

    #[rstest]
    #[case::not_a_number("abc")]
    #[case::negative("-7")]
    #[case::too_large("99999999999999999999")]
    fn unparsable_connection_id_is_rejected(#[case] value: &str) {
        let e = task_entry(
            DisconnectClientTask::TASK_CLASS_NAME,
            DisconnectClientTask::OBJECT_CLASS,
            &[(ATTR_CONNECTION_ID, &[value])],
        );
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::InvalidAttributeValue { attribute, .. }) if attribute == ATTR_CONNECTION_ID
        ));
    }

    #[test]
    fn connection_id_is_required() {
        let e = task_entry(
            DisconnectClientTask::TASK_CLASS_NAME,
            DisconnectClientTask::OBJECT_CLASS,
            &[(ATTR_NOTIFY_CLIENT, &["true"])],
        );
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::MissingAttribute { attribute, .. }) if attribute == ATTR_CONNECTION_ID
        ));
    }
}
