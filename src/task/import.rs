//! importing LDIF data into a backend

use derive_builder::Builder;
use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{optional_value, string_values, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, TaskProperty};
use crate::task::registry::TaskType;

/// the LDIF files to import
pub const ATTR_LDIF_FILE: &str = "ds-task-import-ldif-file";
/// the backend to import into
pub const ATTR_BACKEND_ID: &str = "ds-task-import-backend-id";
/// branches to include
pub const ATTR_INCLUDE_BRANCH: &str = "ds-task-import-include-branch";
/// branches to exclude
pub const ATTR_EXCLUDE_BRANCH: &str = "ds-task-import-exclude-branch";
/// filters an entry must match to be included
pub const ATTR_INCLUDE_FILTER: &str = "ds-task-import-include-filter";
/// filters excluding matching entries
pub const ATTR_EXCLUDE_FILTER: &str = "ds-task-import-exclude-filter";
/// append to the existing data instead of replacing it
pub const ATTR_APPEND: &str = "ds-task-import-append";
/// replace existing entries when appending
pub const ATTR_REPLACE_EXISTING: &str = "ds-task-import-replace-existing";
/// the file rejected entries are written to
pub const ATTR_REJECT_FILE: &str = "ds-task-import-reject-file";
/// overwrite an existing reject file
pub const ATTR_OVERWRITE_REJECTS: &str = "ds-task-import-overwrite-rejects";
/// clear the whole backend before importing
pub const ATTR_CLEAR_BACKEND: &str = "ds-task-import-clear-backend";
/// skip schema validation of imported entries
pub const ATTR_SKIP_SCHEMA_VALIDATION: &str = "ds-task-import-skip-schema-validation";
/// the LDIF files are compressed
pub const ATTR_IS_COMPRESSED: &str = "ds-task-import-is-compressed";
/// the LDIF files are encrypted
pub const ATTR_IS_ENCRYPTED: &str = "ds-task-import-is-encrypted";

/// a multi-valued string property
fn strings_property(attribute: &str, display_name: &str, description: &str) -> TaskProperty {
    TaskProperty::new(attribute, display_name, description, DataType::String, false, true)
}

/// an optional boolean property
fn flag_property(attribute: &str, display_name: &str, description: &str) -> TaskProperty {
    TaskProperty::new(attribute, display_name, description, DataType::Boolean, false, false)
}

lazy_static! {
    static ref PROPERTY_LDIF_FILE: TaskProperty = TaskProperty::new(
        ATTR_LDIF_FILE,
        "LDIF File",
        "The paths of the LDIF files to import",
        DataType::String,
        true,
        true,
    );
    static ref PROPERTY_BACKEND_ID: TaskProperty = TaskProperty::new(
        ATTR_BACKEND_ID,
        "Backend ID",
        "The ID of the backend to import into, derived from the include branches if left empty",
        DataType::String,
        false,
        false,
    );
    static ref PROPERTY_INCLUDE_BRANCH: TaskProperty = strings_property(
        ATTR_INCLUDE_BRANCH,
        "Include Branch",
        "The base DNs of branches to import",
    );
    static ref PROPERTY_EXCLUDE_BRANCH: TaskProperty = strings_property(
        ATTR_EXCLUDE_BRANCH,
        "Exclude Branch",
        "The base DNs of branches to skip",
    )
    .advanced();
    static ref PROPERTY_INCLUDE_FILTER: TaskProperty = strings_property(
        ATTR_INCLUDE_FILTER,
        "Include Filter",
        "Filters an entry must match to be imported",
    )
    .advanced();
    static ref PROPERTY_EXCLUDE_FILTER: TaskProperty = strings_property(
        ATTR_EXCLUDE_FILTER,
        "Exclude Filter",
        "Filters excluding matching entries from the import",
    )
    .advanced();
    static ref PROPERTY_APPEND: TaskProperty = flag_property(
        ATTR_APPEND,
        "Append",
        "Whether to append to the existing data instead of replacing it",
    );
    static ref PROPERTY_REPLACE_EXISTING: TaskProperty = flag_property(
        ATTR_REPLACE_EXISTING,
        "Replace Existing Entries",
        "Whether to replace existing entries when appending",
    );
    static ref PROPERTY_REJECT_FILE: TaskProperty = TaskProperty::new(
        ATTR_REJECT_FILE,
        "Reject File",
        "The path of a file rejected entries are written to",
        DataType::String,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_OVERWRITE_REJECTS: TaskProperty = flag_property(
        ATTR_OVERWRITE_REJECTS,
        "Overwrite Rejects",
        "Whether to overwrite an existing reject file instead of appending to it",
    )
    .advanced();
    static ref PROPERTY_CLEAR_BACKEND: TaskProperty = flag_property(
        ATTR_CLEAR_BACKEND,
        "Clear Backend",
        "Whether to remove all entries from the backend before the import",
    )
    .advanced();
    static ref PROPERTY_SKIP_SCHEMA_VALIDATION: TaskProperty = flag_property(
        ATTR_SKIP_SCHEMA_VALIDATION,
        "Skip Schema Validation",
        "Whether to import entries without checking them against the schema",
    )
    .advanced();
    static ref PROPERTY_IS_COMPRESSED: TaskProperty = flag_property(
        ATTR_IS_COMPRESSED,
        "Is Compressed",
        "Whether the LDIF files are compressed",
    );
    static ref PROPERTY_IS_ENCRYPTED: TaskProperty = flag_property(
        ATTR_IS_ENCRYPTED,
        "Is Encrypted",
        "Whether the LDIF files are encrypted",
    );
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_LDIF_FILE.clone(),
        PROPERTY_BACKEND_ID.clone(),
        PROPERTY_INCLUDE_BRANCH.clone(),
        PROPERTY_EXCLUDE_BRANCH.clone(),
        PROPERTY_INCLUDE_FILTER.clone(),
        PROPERTY_EXCLUDE_FILTER.clone(),
        PROPERTY_APPEND.clone(),
        PROPERTY_REPLACE_EXISTING.clone(),
        PROPERTY_REJECT_FILE.clone(),
        PROPERTY_OVERWRITE_REJECTS.clone(),
        PROPERTY_CLEAR_BACKEND.clone(),
        PROPERTY_SKIP_SCHEMA_VALIDATION.clone(),
        PROPERTY_IS_COMPRESSED.clone(),
        PROPERTY_IS_ENCRYPTED.clone(),
    ];
}

/// imports LDIF files on the server into a backend
///
/// the backend is either given by ID or derived by the server from the
/// include branches, at least one of the two is required
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::validate", error = "UsageError"))]
pub struct ImportTask {
    /// the LDIF files to import
    #[builder(setter(into))]
    ldif_files: Vec<String>,
    /// the backend to import into
    #[builder(default, setter(into, strip_option))]
    backend_id: Option<String>,
    /// branches to include
    #[builder(default, setter(into))]
    include_branches: Vec<String>,
    /// branches to exclude
    #[builder(default, setter(into))]
    exclude_branches: Vec<String>,
    /// filters an entry must match
    #[builder(default, setter(into))]
    include_filters: Vec<String>,
    /// filters excluding matching entries
    #[builder(default, setter(into))]
    exclude_filters: Vec<String>,
    /// append to the existing data
    #[builder(default, setter(strip_option))]
    append: Option<bool>,
    /// replace existing entries when appending
    #[builder(default, setter(strip_option))]
    replace_existing: Option<bool>,
    /// the file rejected entries are written to
    #[builder(default, setter(into, strip_option))]
    reject_file: Option<String>,
    /// overwrite an existing reject file
    #[builder(default, setter(strip_option))]
    overwrite_rejects: Option<bool>,
    /// clear the whole backend first
    #[builder(default, setter(strip_option))]
    clear_backend: Option<bool>,
    /// skip schema validation
    #[builder(default, setter(strip_option))]
    skip_schema_validation: Option<bool>,
    /// the LDIF files are compressed
    #[builder(default, setter(strip_option))]
    is_compressed: Option<bool>,
    /// the LDIF files are encrypted
    #[builder(default, setter(strip_option))]
    is_encrypted: Option<bool>,
}

impl ImportTaskBuilder {
    /// at least one file and a backend ID or include branch
    fn validate(&self) -> Result<(), UsageError> {
        if let Some(ldif_files) = &self.ldif_files {
            if ldif_files.is_empty() {
                return Err(UsageError::MissingArgument("ldif_files".to_string()));
            }
            for file in ldif_files {
                UsageError::check_non_empty("ldif_files", file)?;
            }
        }
        let has_backend = matches!(&self.backend_id, Some(Some(id)) if !id.trim().is_empty());
        let has_branches = matches!(&self.include_branches, Some(branches) if !branches.is_empty());
        if !has_backend && !has_branches {
            return Err(UsageError::invalid(
                "backend_id",
                "either a backend ID or at least one include branch is required",
            ));
        }
        Ok(())
    }
}

impl ImportTask {
    /// import files into a backend
    pub fn new<I, S>(ldif_files: I, backend_id: &str) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ImportTaskBuilder::default()
            .ldif_files(ldif_files.into_iter().map(Into::into).collect::<Vec<String>>())
            .backend_id(backend_id)
            .build()
    }

    /// the LDIF files to import
    pub fn ldif_files(&self) -> &[String] {
        &self.ldif_files
    }

    /// the backend to import into
    pub fn backend_id(&self) -> Option<&str> {
        self.backend_id.as_deref()
    }

    /// branches to include
    pub fn include_branches(&self) -> &[String] {
        &self.include_branches
    }

    /// branches to exclude
    pub fn exclude_branches(&self) -> &[String] {
        &self.exclude_branches
    }

    /// filters an entry must match
    pub fn include_filters(&self) -> &[String] {
        &self.include_filters
    }

    /// filters excluding matching entries
    pub fn exclude_filters(&self) -> &[String] {
        &self.exclude_filters
    }

    /// append to the existing data
    pub fn append(&self) -> Option<bool> {
        self.append
    }

    /// replace existing entries when appending
    pub fn replace_existing(&self) -> Option<bool> {
        self.replace_existing
    }

    /// the file rejected entries are written to
    pub fn reject_file(&self) -> Option<&str> {
        self.reject_file.as_deref()
    }

    /// overwrite an existing reject file
    pub fn overwrite_rejects(&self) -> Option<bool> {
        self.overwrite_rejects
    }

    /// clear the whole backend first
    pub fn clear_backend(&self) -> Option<bool> {
        self.clear_backend
    }

    /// skip schema validation
    pub fn skip_schema_validation(&self) -> Option<bool> {
        self.skip_schema_validation
    }

    /// the LDIF files are compressed
    pub fn is_compressed(&self) -> Option<bool> {
        self.is_compressed
    }

    /// the LDIF files are encrypted
    pub fn is_encrypted(&self) -> Option<bool> {
        self.is_encrypted
    }

    /// the error for a task with neither backend ID nor include branch
    fn check_target(&self, error: impl FnOnce() -> TaskError) -> Result<(), TaskError> {
        if self.backend_id.is_none() && self.include_branches.is_empty() {
            return Err(error());
        }
        Ok(())
    }
}

impl TaskType for ImportTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.ImportTask";
    const OBJECT_CLASS: &'static str = "ds-task-import";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        let task = Self {
            ldif_files: reader.required_strings(ATTR_LDIF_FILE)?,
            backend_id: reader.string(ATTR_BACKEND_ID),
            include_branches: reader.strings(ATTR_INCLUDE_BRANCH),
            exclude_branches: reader.strings(ATTR_EXCLUDE_BRANCH),
            include_filters: reader.strings(ATTR_INCLUDE_FILTER),
            exclude_filters: reader.strings(ATTR_EXCLUDE_FILTER),
            append: reader.boolean(ATTR_APPEND)?,
            replace_existing: reader.boolean(ATTR_REPLACE_EXISTING)?,
            reject_file: reader.string(ATTR_REJECT_FILE),
            overwrite_rejects: reader.boolean(ATTR_OVERWRITE_REJECTS)?,
            clear_backend: reader.boolean(ATTR_CLEAR_BACKEND)?,
            skip_schema_validation: reader.boolean(ATTR_SKIP_SCHEMA_VALIDATION)?,
            is_compressed: reader.boolean(ATTR_IS_COMPRESSED)?,
            is_encrypted: reader.boolean(ATTR_IS_ENCRYPTED)?,
        };
        task.check_target(|| TaskError::InvalidTask {
            task_id: reader.dn().to_string(),
            reason: format!(
                "either {} or {} is required",
                ATTR_BACKEND_ID, ATTR_INCLUDE_BRANCH
            ),
        })?;
        Ok(task)
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        let task = Self {
            ldif_files: reader.strings(&PROPERTY_LDIF_FILE)?,
            backend_id: reader.string(&PROPERTY_BACKEND_ID)?,
            include_branches: reader.strings(&PROPERTY_INCLUDE_BRANCH)?,
            exclude_branches: reader.strings(&PROPERTY_EXCLUDE_BRANCH)?,
            include_filters: reader.strings(&PROPERTY_INCLUDE_FILTER)?,
            exclude_filters: reader.strings(&PROPERTY_EXCLUDE_FILTER)?,
            append: reader.boolean(&PROPERTY_APPEND)?,
            replace_existing: reader.boolean(&PROPERTY_REPLACE_EXISTING)?,
            reject_file: reader.string(&PROPERTY_REJECT_FILE)?,
            overwrite_rejects: reader.boolean(&PROPERTY_OVERWRITE_REJECTS)?,
            clear_backend: reader.boolean(&PROPERTY_CLEAR_BACKEND)?,
            skip_schema_validation: reader.boolean(&PROPERTY_SKIP_SCHEMA_VALIDATION)?,
            is_compressed: reader.boolean(&PROPERTY_IS_COMPRESSED)?,
            is_encrypted: reader.boolean(&PROPERTY_IS_ENCRYPTED)?,
        };
        task.check_target(|| {
            TaskError::invalid_property(
                ATTR_BACKEND_ID,
                "either a backend ID or at least one include branch is required",
            )
        })?;
        Ok(task)
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_values(ATTR_LDIF_FILE, &self.ldif_files)
            .add_optional(ATTR_BACKEND_ID, self.backend_id())
            .add_values(ATTR_INCLUDE_BRANCH, &self.include_branches)
            .add_values(ATTR_EXCLUDE_BRANCH, &self.exclude_branches)
            .add_values(ATTR_INCLUDE_FILTER, &self.include_filters)
            .add_values(ATTR_EXCLUDE_FILTER, &self.exclude_filters)
            .add_bool(ATTR_APPEND, self.append)
            .add_bool(ATTR_REPLACE_EXISTING, self.replace_existing)
            .add_optional(ATTR_REJECT_FILE, self.reject_file())
            .add_bool(ATTR_OVERWRITE_REJECTS, self.overwrite_rejects)
            .add_bool(ATTR_CLEAR_BACKEND, self.clear_backend)
            .add_bool(ATTR_SKIP_SCHEMA_VALIDATION, self.skip_schema_validation)
            .add_bool(ATTR_IS_COMPRESSED, self.is_compressed)
            .add_bool(ATTR_IS_ENCRYPTED, self.is_encrypted);
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(&PROPERTY_LDIF_FILE, string_values(&self.ldif_files))
            .insert(&PROPERTY_BACKEND_ID, optional_value(self.backend_id()))
            .insert(&PROPERTY_INCLUDE_BRANCH, string_values(&self.include_branches))
            .insert(&PROPERTY_EXCLUDE_BRANCH, string_values(&self.exclude_branches))
            .insert(&PROPERTY_INCLUDE_FILTER, string_values(&self.include_filters))
            .insert(&PROPERTY_EXCLUDE_FILTER, string_values(&self.exclude_filters))
            .insert(&PROPERTY_APPEND, optional_value(self.append))
            .insert(&PROPERTY_REPLACE_EXISTING, optional_value(self.replace_existing))
            .insert(&PROPERTY_REJECT_FILE, optional_value(self.reject_file()))
            .insert(&PROPERTY_OVERWRITE_REJECTS, optional_value(self.overwrite_rejects))
            .insert(&PROPERTY_CLEAR_BACKEND, optional_value(self.clear_backend))
            .insert(
                &PROPERTY_SKIP_SCHEMA_VALIDATION,
                optional_value(self.skip_schema_validation),
            )
            .insert(&PROPERTY_IS_COMPRESSED, optional_value(self.is_compressed))
            .insert(&PROPERTY_IS_ENCRYPTED, optional_value(self.is_encrypted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::{assert_round_trips, task_entry};
    use crate::task::Task;

    #[test]
    fn import_into_backend() {
        let kind = ImportTask::new(["ldif/a.ldif", "ldif/b.ldif"], "userRoot").unwrap();
        assert_eq!(kind.ldif_files().len(), 2);
        assert_round_trips(&Task::new(Some("import"), kind));
    }

    #[test]
    fn import_by_branch_with_options() {
        let kind = ImportTaskBuilder::default()
            .ldif_files(vec!["ldif/people.ldif.gz".to_string()])
            .include_branches(vec!["ou=People,dc=example,dc=com".to_string()])
            .exclude_filters(vec!["(objectClass=groupOfNames)".to_string()])
            .append(true)
            .replace_existing(true)
            .reject_file("logs/rejects.ldif")
            .overwrite_rejects(true)
            .skip_schema_validation(false)
            .is_compressed(true)
            .build()
            .unwrap();
        assert_round_trips(&Task::new(Some("people"), kind));
    }

    #[test]
    fn target_is_required() {
        assert!(ImportTaskBuilder::default()
            .ldif_files(vec!["a.ldif".to_string()])
            .build()
            .is_err());
        assert!(ImportTask::new(Vec::<String>::new(), "userRoot").is_err());
        let e = task_entry(
            ImportTask::TASK_CLASS_NAME,
            ImportTask::OBJECT_CLASS,
            &[(ATTR_LDIF_FILE, &["a.ldif"])],
        );
        assert!(matches!(Task::decode_entry(&e), Err(TaskError::InvalidTask { .. })));
    }

    #[test]
    fn files_are_required() {
        let e = task_entry(
            ImportTask::TASK_CLASS_NAME,
            ImportTask::OBJECT_CLASS,
            &[(ATTR_BACKEND_ID, &["userRoot"])],
        );
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::MissingAttribute { attribute, .. }) if attribute == ATTR_LDIF_FILE
        ));
    }
}
