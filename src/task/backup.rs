//! backing up one or more backends

use derive_builder::Builder;
use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{optional_value, string_values, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use crate::task::registry::TaskType;

/// the directory the backup is written to, shared with the restore task
pub const ATTR_BACKUP_DIRECTORY: &str = "ds-backup-directory-path";
/// the backends to back up
pub const ATTR_BACKEND_ID: &str = "ds-task-backup-backend-id";
/// back up every backend which supports it
pub const ATTR_BACKUP_ALL: &str = "ds-task-backup-all";
/// the ID of the backup, shared with the restore task
pub const ATTR_BACKUP_ID: &str = "ds-backup-id";
/// create an incremental backup
pub const ATTR_INCREMENTAL: &str = "ds-task-backup-incremental";
/// the ID of the backup an incremental backup is based on
pub const ATTR_INCREMENTAL_BASE_ID: &str = "ds-task-backup-incremental-base-id";
/// compress the backup
pub const ATTR_COMPRESS: &str = "ds-task-backup-compress";
/// encrypt the backup
pub const ATTR_ENCRYPT: &str = "ds-task-backup-encrypt";
/// hash the backup contents
pub const ATTR_HASH: &str = "ds-task-backup-hash";
/// sign the hash
pub const ATTR_SIGN_HASH: &str = "ds-task-backup-sign-hash";
/// the maximum write rate
pub const ATTR_MAX_MEGABYTES_PER_SECOND: &str = "ds-task-backup-max-megabytes-per-second";
/// the number of earlier full backups to keep
pub const ATTR_RETAIN_PREVIOUS_FULL_BACKUP_COUNT: &str =
    "ds-task-backup-retain-previous-full-backup-count";

lazy_static! {
    static ref PROPERTY_BACKUP_DIRECTORY: TaskProperty = TaskProperty::new(
        ATTR_BACKUP_DIRECTORY,
        "Backup Directory",
        "The path to the directory the backup is written to",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTY_BACKEND_ID: TaskProperty = TaskProperty::new(
        ATTR_BACKEND_ID,
        "Backend ID",
        "The IDs of the backends to back up",
        DataType::String,
        false,
        true,
    );
    static ref PROPERTY_BACKUP_ALL: TaskProperty = TaskProperty::new(
        ATTR_BACKUP_ALL,
        "Back Up All Backends",
        "Whether to back up every backend which supports backups",
        DataType::Boolean,
        false,
        false,
    )
    .with_default_values(vec![PropertyValue::Boolean(false)]);
    static ref PROPERTY_BACKUP_ID: TaskProperty = TaskProperty::new(
        ATTR_BACKUP_ID,
        "Backup ID",
        "The ID to use for the backup, generated by the server if left empty",
        DataType::String,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_INCREMENTAL: TaskProperty = TaskProperty::new(
        ATTR_INCREMENTAL,
        "Incremental Backup",
        "Whether to only back up changes since an earlier backup",
        DataType::Boolean,
        false,
        false,
    );
    static ref PROPERTY_INCREMENTAL_BASE_ID: TaskProperty = TaskProperty::new(
        ATTR_INCREMENTAL_BASE_ID,
        "Incremental Base Backup ID",
        "The ID of the backup an incremental backup is based on, the latest one if left empty",
        DataType::String,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_COMPRESS: TaskProperty = TaskProperty::new(
        ATTR_COMPRESS,
        "Compress Backup",
        "Whether to compress the backup",
        DataType::Boolean,
        false,
        false,
    );
    static ref PROPERTY_ENCRYPT: TaskProperty = TaskProperty::new(
        ATTR_ENCRYPT,
        "Encrypt Backup",
        "Whether to encrypt the backup",
        DataType::Boolean,
        false,
        false,
    );
    static ref PROPERTY_HASH: TaskProperty = TaskProperty::new(
        ATTR_HASH,
        "Hash Backup",
        "Whether to generate a hash of the backup contents",
        DataType::Boolean,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_SIGN_HASH: TaskProperty = TaskProperty::new(
        ATTR_SIGN_HASH,
        "Sign Hash",
        "Whether to sign the hash of the backup contents",
        DataType::Boolean,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_MAX_MEGABYTES_PER_SECOND: TaskProperty = TaskProperty::new(
        ATTR_MAX_MEGABYTES_PER_SECOND,
        "Maximum Megabytes per Second",
        "The maximum rate at which the backup is written, unlimited if left empty",
        DataType::Integer,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_RETAIN_PREVIOUS_FULL_BACKUP_COUNT: TaskProperty = TaskProperty::new(
        ATTR_RETAIN_PREVIOUS_FULL_BACKUP_COUNT,
        "Retain Previous Full Backup Count",
        "The number of earlier full backups to keep, all of them if left empty",
        DataType::Integer,
        false,
        false,
    )
    .advanced();
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_BACKUP_DIRECTORY.clone(),
        PROPERTY_BACKEND_ID.clone(),
        PROPERTY_BACKUP_ALL.clone(),
        PROPERTY_BACKUP_ID.clone(),
        PROPERTY_INCREMENTAL.clone(),
        PROPERTY_INCREMENTAL_BASE_ID.clone(),
        PROPERTY_COMPRESS.clone(),
        PROPERTY_ENCRYPT.clone(),
        PROPERTY_HASH.clone(),
        PROPERTY_SIGN_HASH.clone(),
        PROPERTY_MAX_MEGABYTES_PER_SECOND.clone(),
        PROPERTY_RETAIN_PREVIOUS_FULL_BACKUP_COUNT.clone(),
    ];
}

/// backs up the listed backends, or all of them if none are listed
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::validate", error = "UsageError"))]
pub struct BackupTask {
    /// where the backup is written to
    #[builder(setter(into))]
    backup_directory: String,
    /// the backends to back up, empty means all backends
    #[builder(default, setter(into))]
    backend_ids: Vec<String>,
    /// the ID of the backup
    #[builder(default, setter(into, strip_option))]
    backup_id: Option<String>,
    /// create an incremental backup
    #[builder(default, setter(strip_option))]
    incremental: Option<bool>,
    /// the backup an incremental backup is based on
    #[builder(default, setter(into, strip_option))]
    incremental_base_id: Option<String>,
    /// compress the backup
    #[builder(default, setter(strip_option))]
    compress: Option<bool>,
    /// encrypt the backup
    #[builder(default, setter(strip_option))]
    encrypt: Option<bool>,
    /// hash the backup contents
    #[builder(default, setter(strip_option))]
    hash: Option<bool>,
    /// sign the hash
    #[builder(default, setter(strip_option))]
    sign_hash: Option<bool>,
    /// the maximum write rate
    #[builder(default, setter(strip_option))]
    max_megabytes_per_second: Option<i64>,
    /// the number of earlier full backups to keep
    #[builder(default, setter(strip_option))]
    retain_previous_full_backup_count: Option<i64>,
}

impl BackupTaskBuilder {
    /// checks the combinations the server would reject
    fn validate(&self) -> Result<(), UsageError> {
        if let Some(directory) = &self.backup_directory {
            UsageError::check_non_empty("backup_directory", directory)?;
        }
        if let Some(backend_ids) = &self.backend_ids {
            for backend_id in backend_ids {
                UsageError::check_non_empty("backend_ids", backend_id)?;
            }
        }
        if let Some(Some(rate)) = self.max_megabytes_per_second {
            if rate <= 0 {
                return Err(UsageError::invalid(
                    "max_megabytes_per_second",
                    "must be greater than zero",
                ));
            }
        }
        if let Some(Some(count)) = self.retain_previous_full_backup_count {
            if count < 0 {
                return Err(UsageError::invalid(
                    "retain_previous_full_backup_count",
                    "must not be negative",
                ));
            }
        }
        let incremental = matches!(self.incremental, Some(Some(true)));
        if matches!(self.incremental_base_id, Some(Some(_))) && !incremental {
            return Err(UsageError::invalid(
                "incremental_base_id",
                "only allowed for incremental backups",
            ));
        }
        if matches!(self.sign_hash, Some(Some(true))) && !matches!(self.hash, Some(Some(true))) {
            return Err(UsageError::invalid("sign_hash", "requires hash"));
        }
        Ok(())
    }
}

impl BackupTask {
    /// back up a single backend, or all backends if `backend_id` is `None`
    pub fn new(backup_directory: &str, backend_id: Option<&str>) -> Result<Self, UsageError> {
        let mut builder = BackupTaskBuilder::default();
        builder.backup_directory(backup_directory);
        if let Some(backend_id) = backend_id {
            builder.backend_ids(vec![backend_id.to_string()]);
        }
        builder.build()
    }

    /// where the backup is written to
    pub fn backup_directory(&self) -> &str {
        &self.backup_directory
    }

    /// the backends to back up, empty if all backends are backed up
    pub fn backend_ids(&self) -> &[String] {
        &self.backend_ids
    }

    /// whether all backends are backed up
    pub fn backup_all(&self) -> bool {
        self.backend_ids.is_empty()
    }

    /// the ID of the backup
    pub fn backup_id(&self) -> Option<&str> {
        self.backup_id.as_deref()
    }

    /// whether an incremental backup is created
    pub fn incremental(&self) -> Option<bool> {
        self.incremental
    }

    /// the backup an incremental backup is based on
    pub fn incremental_base_id(&self) -> Option<&str> {
        self.incremental_base_id.as_deref()
    }

    /// whether the backup is compressed
    pub fn compress(&self) -> Option<bool> {
        self.compress
    }

    /// whether the backup is encrypted
    pub fn encrypt(&self) -> Option<bool> {
        self.encrypt
    }

    /// whether a hash of the backup contents is generated
    pub fn hash(&self) -> Option<bool> {
        self.hash
    }

    /// whether the hash is signed
    pub fn sign_hash(&self) -> Option<bool> {
        self.sign_hash
    }

    /// the maximum write rate
    pub fn max_megabytes_per_second(&self) -> Option<i64> {
        self.max_megabytes_per_second
    }

    /// the number of earlier full backups to keep
    pub fn retain_previous_full_backup_count(&self) -> Option<i64> {
        self.retain_previous_full_backup_count
    }
}

impl TaskType for BackupTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.BackupTask";
    const OBJECT_CLASS: &'static str = "ds-task-backup";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        let backup_all = reader.boolean(ATTR_BACKUP_ALL)?.unwrap_or(false);
        let backend_ids = reader.strings(ATTR_BACKEND_ID);
        if backup_all && !backend_ids.is_empty() {
            return Err(TaskError::InvalidTask {
                task_id: reader.dn().to_string(),
                reason: format!(
                    "{} set to true conflicts with {} values",
                    ATTR_BACKUP_ALL, ATTR_BACKEND_ID
                ),
            });
        }
        Ok(Self {
            backup_directory: reader.required_string(ATTR_BACKUP_DIRECTORY)?,
            backend_ids,
            backup_id: reader.string(ATTR_BACKUP_ID),
            incremental: reader.boolean(ATTR_INCREMENTAL)?,
            incremental_base_id: reader.string(ATTR_INCREMENTAL_BASE_ID),
            compress: reader.boolean(ATTR_COMPRESS)?,
            encrypt: reader.boolean(ATTR_ENCRYPT)?,
            hash: reader.boolean(ATTR_HASH)?,
            sign_hash: reader.boolean(ATTR_SIGN_HASH)?,
            max_megabytes_per_second: reader.positive_integer(ATTR_MAX_MEGABYTES_PER_SECOND)?,
            retain_previous_full_backup_count: reader
                .non_negative_integer(ATTR_RETAIN_PREVIOUS_FULL_BACKUP_COUNT)?,
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        let backup_all = reader.boolean(&PROPERTY_BACKUP_ALL)?.unwrap_or(false);
        let backend_ids = reader.strings(&PROPERTY_BACKEND_ID)?;
        if backup_all && !backend_ids.is_empty() {
            return Err(TaskError::invalid_property(
                ATTR_BACKEND_ID,
                format!("backend IDs conflict with {} set to true", ATTR_BACKUP_ALL),
            ));
        }
        Ok(Self {
            backup_directory: reader.required_string(&PROPERTY_BACKUP_DIRECTORY)?,
            backend_ids,
            backup_id: reader.string(&PROPERTY_BACKUP_ID)?,
            incremental: reader.boolean(&PROPERTY_INCREMENTAL)?,
            incremental_base_id: reader.string(&PROPERTY_INCREMENTAL_BASE_ID)?,
            compress: reader.boolean(&PROPERTY_COMPRESS)?,
            encrypt: reader.boolean(&PROPERTY_ENCRYPT)?,
            hash: reader.boolean(&PROPERTY_HASH)?,
            sign_hash: reader.boolean(&PROPERTY_SIGN_HASH)?,
            max_megabytes_per_second: reader.positive_integer(&PROPERTY_MAX_MEGABYTES_PER_SECOND)?,
            retain_previous_full_backup_count: reader
                .non_negative_integer(&PROPERTY_RETAIN_PREVIOUS_FULL_BACKUP_COUNT)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_values(ATTR_BACKUP_DIRECTORY, [self.backup_directory.as_str()])
            .add_values(ATTR_BACKEND_ID, &self.backend_ids)
            .add_bool(ATTR_BACKUP_ALL, self.backup_all().then_some(true))
            .add_optional(ATTR_BACKUP_ID, self.backup_id())
            .add_bool(ATTR_INCREMENTAL, self.incremental)
            .add_optional(ATTR_INCREMENTAL_BASE_ID, self.incremental_base_id())
            .add_bool(ATTR_COMPRESS, self.compress)
            .add_bool(ATTR_ENCRYPT, self.encrypt)
            .add_bool(ATTR_HASH, self.hash)
            .add_bool(ATTR_SIGN_HASH, self.sign_hash)
            .add_integer(ATTR_MAX_MEGABYTES_PER_SECOND, self.max_megabytes_per_second)
            .add_integer(
                ATTR_RETAIN_PREVIOUS_FULL_BACKUP_COUNT,
                self.retain_previous_full_backup_count,
            );
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(
                &PROPERTY_BACKUP_DIRECTORY,
                vec![PropertyValue::String(self.backup_directory.clone())],
            )
            .insert(&PROPERTY_BACKEND_ID, string_values(&self.backend_ids))
            .insert(&PROPERTY_BACKUP_ALL, vec![PropertyValue::Boolean(self.backup_all())])
            .insert(&PROPERTY_BACKUP_ID, optional_value(self.backup_id()))
            .insert(&PROPERTY_INCREMENTAL, optional_value(self.incremental))
            .insert(
                &PROPERTY_INCREMENTAL_BASE_ID,
                optional_value(self.incremental_base_id()),
            )
            .insert(&PROPERTY_COMPRESS, optional_value(self.compress))
            .insert(&PROPERTY_ENCRYPT, optional_value(self.encrypt))
            .insert(&PROPERTY_HASH, optional_value(self.hash))
            .insert(&PROPERTY_SIGN_HASH, optional_value(self.sign_hash))
            .insert(
                &PROPERTY_MAX_MEGABYTES_PER_SECOND,
                optional_value(self.max_megabytes_per_second),
            )
            .insert(
                &PROPERTY_RETAIN_PREVIOUS_FULL_BACKUP_COUNT,
                optional_value(self.retain_previous_full_backup_count),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::registry::TaskKind;
    use crate::task::test_support::{assert_round_trips, task_entry};
    use crate::task::Task;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn backup(task: &Task) -> &BackupTask {
        match task.kind() {
            TaskKind::Backup(b) => b,
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn no_backend_means_all_backends() {
        let task = Task::new(Some("foo"), BackupTask::new("bak", None).unwrap());
        let kind = backup(&task);
        assert_eq!(kind.backup_directory(), "bak");
        assert!(kind.backup_all());
        assert!(kind.backend_ids().is_empty());
        let e = task.create_task_entry();
        assert_eq!(e.attrs[ATTR_BACKUP_ALL], vec!["true"]);
        assert!(!e.attrs.contains_key(ATTR_BACKEND_ID));
        assert_round_trips(&task);
    }

    #[test]
    fn single_backend() {
        let task = Task::new(Some("foo"), BackupTask::new("bak", Some("userRoot")).unwrap());
        let kind = backup(&task);
        assert!(!kind.backup_all());
        assert_eq!(kind.backend_ids(), &["userRoot".to_string()]);
        assert!(!task.create_task_entry().attrs.contains_key(ATTR_BACKUP_ALL));
        assert_round_trips(&task);
    }

    #[test]
    fn all_options_round_trip() {
        let kind = BackupTaskBuilder::default()
            .backup_directory("/var/backups")
            .backend_ids(vec!["userRoot".to_string(), "config".to_string()])
            .backup_id("nightly")
            .incremental(true)
            .incremental_base_id("weekly")
            .compress(true)
            .encrypt(false)
            .hash(true)
            .sign_hash(true)
            .max_megabytes_per_second(50)
            .retain_previous_full_backup_count(3)
            .build()
            .unwrap();
        assert_round_trips(&Task::new(Some("full"), kind));
    }

    #[test]
    fn builder_rejects_invalid_combinations() {
        assert_eq!(
            BackupTaskBuilder::default().build(),
            Err(UsageError::MissingArgument("backup_directory".to_string()))
        );
        assert!(BackupTask::new("", None).is_err());
        assert!(BackupTaskBuilder::default()
            .backup_directory("bak")
            .incremental_base_id("base")
            .build()
            .is_err());
        assert!(BackupTaskBuilder::default()
            .backup_directory("bak")
            .max_megabytes_per_second(0)
            .build()
            .is_err());
    }

    #[test]
    fn entry_without_backends_backs_up_all() {
        let e = task_entry(
            BackupTask::TASK_CLASS_NAME,
            BackupTask::OBJECT_CLASS,
            &[(ATTR_BACKUP_DIRECTORY, &["bak"])],
        );
        let task = Task::decode_entry(&e).unwrap();
        let kind = backup(&task);
        assert!(kind.backup_all());
        assert!(kind.backend_ids().is_empty());
        assert_eq!(kind.backup_directory(), "bak");
    }

    #[test]
    fn property_map_without_backends_backs_up_all() {
        let mut properties = PropertyMap::new();
        properties.insert(
            &PROPERTY_BACKUP_DIRECTORY,
            vec![PropertyValue::String("bak".to_string())],
        );
        let task = Task::from_property_values::<BackupTask>(&properties).unwrap();
        let kind = backup(&task);
        assert!(kind.backup_all());
        assert!(kind.backend_ids().is_empty());
    }

    #[test]
    fn backup_all_conflicts_with_backends() {
        let e = task_entry(
            BackupTask::TASK_CLASS_NAME,
            BackupTask::OBJECT_CLASS,
            &[
                (ATTR_BACKUP_DIRECTORY, &["bak"]),
                (ATTR_BACKUP_ALL, &["true"]),
                (ATTR_BACKEND_ID, &["userRoot"]),
            ],
        );
        assert!(matches!(Task::decode_entry(&e), Err(TaskError::InvalidTask { .. })));
        let mut properties = PropertyMap::new();
        properties
            .insert(
                &PROPERTY_BACKUP_DIRECTORY,
                vec![PropertyValue::String("bak".to_string())],
            )
            .insert(&PROPERTY_BACKUP_ALL, vec![PropertyValue::Boolean(true)])
            .insert(
                &PROPERTY_BACKEND_ID,
                vec![PropertyValue::String("userRoot".to_string())],
            );
        assert!(matches!(
            Task::from_property_values::<BackupTask>(&properties),
            Err(TaskError::InvalidPropertyValue { .. })
        ));
    }

    #[rstest]
    #[case::compress(ATTR_COMPRESS)]
    #[case::encrypt(ATTR_ENCRYPT)]
    #[case::incremental(ATTR_INCREMENTAL)]
    #[case::backup_all(ATTR_BACKUP_ALL)]
    fn booleans_are_strict(#[case] attribute: &str) {
        let e = task_entry(
            BackupTask::TASK_CLASS_NAME,
            BackupTask::OBJECT_CLASS,
            &[
                (ATTR_BACKUP_DIRECTORY, &["bak"]),
                (ATTR_BACKEND_ID, &["userRoot"]),
                (attribute, &["yes"]),
            ],
        );
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::InvalidAttributeValue { attribute: a, .. }) if a == attribute
        ));
    }

    #[test]
    fn entry_without_directory_is_rejected() {
        let e = task_entry(
            BackupTask::TASK_CLASS_NAME,
            BackupTask::OBJECT_CLASS,
            &[(ATTR_BACKUP_ALL, &["true"])],
        );
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::MissingAttribute { attribute, .. }) if attribute == ATTR_BACKUP_DIRECTORY
        ));
    }
}
