//! restoring a backend from a backup

use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::backup::{ATTR_BACKUP_DIRECTORY, ATTR_BACKUP_ID};
use crate::task::codec::{optional_value, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use crate::task::registry::TaskType;

/// only verify the backup instead of restoring it
pub const ATTR_VERIFY_ONLY: &str = "ds-task-restore-verify-only";
/// a file containing the passphrase for an encrypted backup
pub const ATTR_ENCRYPTION_PASSPHRASE_FILE: &str = "ds-task-restore-encryption-passphrase-file";

lazy_static! {
    static ref PROPERTY_BACKUP_DIRECTORY: TaskProperty = TaskProperty::new(
        ATTR_BACKUP_DIRECTORY,
        "Backup Directory",
        "The path to the directory containing the backup to restore",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTY_BACKUP_ID: TaskProperty = TaskProperty::new(
        ATTR_BACKUP_ID,
        "Backup ID",
        "The ID of the backup to restore, the latest one if left empty",
        DataType::String,
        false,
        false,
    );
    static ref PROPERTY_VERIFY_ONLY: TaskProperty = TaskProperty::new(
        ATTR_VERIFY_ONLY,
        "Verify Only",
        "Whether to only verify the backup without restoring it",
        DataType::Boolean,
        false,
        false,
    );
    static ref PROPERTY_ENCRYPTION_PASSPHRASE_FILE: TaskProperty = TaskProperty::new(
        ATTR_ENCRYPTION_PASSPHRASE_FILE,
        "Encryption Passphrase File",
        "The path to a file containing the passphrase the backup was encrypted with",
        DataType::String,
        false,
        false,
    )
    .advanced();
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_BACKUP_DIRECTORY.clone(),
        PROPERTY_BACKUP_ID.clone(),
        PROPERTY_VERIFY_ONLY.clone(),
        PROPERTY_ENCRYPTION_PASSPHRASE_FILE.clone(),
    ];
}

/// restores a backend from a backup or verifies that the backup could be restored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreTask {
    /// the directory containing the backup
    backup_directory: String,
    /// the backup to restore
    backup_id: Option<String>,
    /// only verify the backup
    verify_only: Option<bool>,
    /// a file containing the passphrase for an encrypted backup
    encryption_passphrase_file: Option<String>,
}

impl RestoreTask {
    /// restore the given backup, or the latest one in the directory
    pub fn new(
        backup_directory: &str,
        backup_id: Option<&str>,
        verify_only: Option<bool>,
    ) -> Result<Self, UsageError> {
        UsageError::check_non_empty("backup_directory", backup_directory)?;
        Ok(Self {
            backup_directory: backup_directory.to_string(),
            backup_id: backup_id.map(str::to_string),
            verify_only,
            encryption_passphrase_file: None,
        })
    }

    /// set the file containing the passphrase for an encrypted backup
    pub fn with_encryption_passphrase_file(mut self, path: &str) -> Result<Self, UsageError> {
        UsageError::check_non_empty("encryption_passphrase_file", path)?;
        self.encryption_passphrase_file = Some(path.to_string());
        Ok(self)
    }

    /// the directory containing the backup
    pub fn backup_directory(&self) -> &str {
        &self.backup_directory
    }

    /// the backup to restore
    pub fn backup_id(&self) -> Option<&str> {
        self.backup_id.as_deref()
    }

    /// only verify the backup
    pub fn verify_only(&self) -> Option<bool> {
        self.verify_only
    }

    /// a file containing the passphrase for an encrypted backup
    pub fn encryption_passphrase_file(&self) -> Option<&str> {
        self.encryption_passphrase_file.as_deref()
    }
}

impl TaskType for RestoreTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.RestoreTask";
    const OBJECT_CLASS: &'static str = "ds-task-restore";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        Ok(Self {
            backup_directory: reader.required_string(ATTR_BACKUP_DIRECTORY)?,
            backup_id: reader.string(ATTR_BACKUP_ID),
            verify_only: reader.boolean(ATTR_VERIFY_ONLY)?,
            encryption_passphrase_file: reader.string(ATTR_ENCRYPTION_PASSPHRASE_FILE),
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        Ok(Self {
            backup_directory: reader.required_string(&PROPERTY_BACKUP_DIRECTORY)?,
            backup_id: reader.string(&PROPERTY_BACKUP_ID)?,
            verify_only: reader.boolean(&PROPERTY_VERIFY_ONLY)?,
            encryption_passphrase_file: reader.string(&PROPERTY_ENCRYPTION_PASSPHRASE_FILE)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_values(ATTR_BACKUP_DIRECTORY, [self.backup_directory.as_str()])
            .add_optional(ATTR_BACKUP_ID, self.backup_id())
            .add_bool(ATTR_VERIFY_ONLY, self.verify_only)
            .add_optional(
                ATTR_ENCRYPTION_PASSPHRASE_FILE,
                self.encryption_passphrase_file(),
            );
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(
                &PROPERTY_BACKUP_DIRECTORY,
                vec![PropertyValue::String(self.backup_directory.clone())],
            )
            .insert(&PROPERTY_BACKUP_ID, optional_value(self.backup_id()))
            .insert(&PROPERTY_VERIFY_ONLY, optional_value(self.verify_only))
            .insert(
                &PROPERTY_ENCRYPTION_PASSPHRASE_FILE,
                optional_value(self.encryption_passphrase_file()),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::{assert_round_trips, task_entry};
    use crate::task::Task;

    #[test]
    fn minimal_restore() {
        assert_round_trips(&Task::new(
            Some("restore"),
            RestoreTask::new("bak/userRoot", None, None).unwrap(),
        ));
    }

    #[test]
    fn verify_encrypted_backup() {
        let kind = RestoreTask::new("bak/userRoot", Some("20240101"), Some(true))
            .unwrap()
            .with_encryption_passphrase_file("config/backup.pin")
            .unwrap();
        assert_eq!(kind.backup_id(), Some("20240101"));
        assert_round_trips(&Task::new(Some("verify"), kind));
    }

    #[test]
    fn directory_is_required() {
        assert!(RestoreTask::new(" ", None, None).is_err());
        let e = task_entry(RestoreTask::TASK_CLASS_NAME, RestoreTask::OBJECT_CLASS, &[]);
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::MissingAttribute { attribute, .. }) if attribute == ATTR_BACKUP_DIRECTORY
        ));
    }

    #[test]
    fn verify_only_is_strict() {
        let e = task_entry(
            RestoreTask::TASK_CLASS_NAME,
            RestoreTask::OBJECT_CLASS,
            &[(ATTR_BACKUP_DIRECTORY, &["bak"]), (ATTR_VERIFY_ONLY, &["maybe"])],
        );
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::InvalidAttributeValue { attribute, .. }) if attribute == ATTR_VERIFY_ONLY
        ));
    }
}
