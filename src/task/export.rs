//! exporting the contents of a backend to LDIF

use derive_builder::Builder;
use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{optional_value, string_values, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use crate::task::registry::TaskType;

/// the backend to export
pub const ATTR_BACKEND_ID: &str = "ds-task-export-backend-id";
/// the LDIF file to write
pub const ATTR_LDIF_FILE: &str = "ds-task-export-ldif-file";
/// append to an existing file instead of replacing it
pub const ATTR_APPEND_TO_LDIF: &str = "ds-task-export-append-to-ldif";
/// branches to include
pub const ATTR_INCLUDE_BRANCH: &str = "ds-task-export-include-branch";
/// branches to exclude
pub const ATTR_EXCLUDE_BRANCH: &str = "ds-task-export-exclude-branch";
/// filters an entry must match to be included
pub const ATTR_INCLUDE_FILTER: &str = "ds-task-export-include-filter";
/// filters excluding matching entries
pub const ATTR_EXCLUDE_FILTER: &str = "ds-task-export-exclude-filter";
/// attributes to include
pub const ATTR_INCLUDE_ATTRIBUTE: &str = "ds-task-export-include-attribute";
/// attributes to exclude
pub const ATTR_EXCLUDE_ATTRIBUTE: &str = "ds-task-export-exclude-attribute";
/// the column to wrap long lines at
pub const ATTR_WRAP_COLUMN: &str = "ds-task-export-wrap-column";
/// compress the LDIF file
pub const ATTR_COMPRESS_LDIF: &str = "ds-task-export-compress-ldif";
/// encrypt the LDIF file
pub const ATTR_ENCRYPT_LDIF: &str = "ds-task-export-encrypt-ldif";
/// sign a hash of the exported data
pub const ATTR_SIGN_HASH: &str = "ds-task-export-sign-hash";

lazy_static! {
    static ref PROPERTY_BACKEND_ID: TaskProperty = TaskProperty::new(
        ATTR_BACKEND_ID,
        "Backend ID",
        "The ID of the backend to export",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTY_LDIF_FILE: TaskProperty = TaskProperty::new(
        ATTR_LDIF_FILE,
        "LDIF File",
        "The path of the LDIF file to write",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTY_APPEND_TO_LDIF: TaskProperty = TaskProperty::new(
        ATTR_APPEND_TO_LDIF,
        "Append to LDIF",
        "Whether to append to an existing LDIF file instead of replacing it",
        DataType::Boolean,
        false,
        false,
    );
    static ref PROPERTY_INCLUDE_BRANCH: TaskProperty = TaskProperty::new(
        ATTR_INCLUDE_BRANCH,
        "Include Branch",
        "The base DNs of branches to include in the export",
        DataType::String,
        false,
        true,
    )
    .advanced();
    static ref PROPERTY_EXCLUDE_BRANCH: TaskProperty = TaskProperty::new(
        ATTR_EXCLUDE_BRANCH,
        "Exclude Branch",
        "The base DNs of branches to exclude from the export",
        DataType::String,
        false,
        true,
    )
    .advanced();
    static ref PROPERTY_INCLUDE_FILTER: TaskProperty = TaskProperty::new(
        ATTR_INCLUDE_FILTER,
        "Include Filter",
        "Filters an entry must match to be exported",
        DataType::String,
        false,
        true,
    )
    .advanced();
    static ref PROPERTY_EXCLUDE_FILTER: TaskProperty = TaskProperty::new(
        ATTR_EXCLUDE_FILTER,
        "Exclude Filter",
        "Filters excluding matching entries from the export",
        DataType::String,
        false,
        true,
    )
    .advanced();
    static ref PROPERTY_INCLUDE_ATTRIBUTE: TaskProperty = TaskProperty::new(
        ATTR_INCLUDE_ATTRIBUTE,
        "Include Attribute",
        "The attributes to include in exported entries",
        DataType::String,
        false,
        true,
    )
    .advanced();
    static ref PROPERTY_EXCLUDE_ATTRIBUTE: TaskProperty = TaskProperty::new(
        ATTR_EXCLUDE_ATTRIBUTE,
        "Exclude Attribute",
        "The attributes to leave out of exported entries",
        DataType::String,
        false,
        true,
    )
    .advanced();
    static ref PROPERTY_WRAP_COLUMN: TaskProperty = TaskProperty::new(
        ATTR_WRAP_COLUMN,
        "Wrap Column",
        "The column at which long lines are wrapped, no wrapping if zero or left empty",
        DataType::Integer,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_COMPRESS_LDIF: TaskProperty = TaskProperty::new(
        ATTR_COMPRESS_LDIF,
        "Compress LDIF",
        "Whether to compress the LDIF file",
        DataType::Boolean,
        false,
        false,
    );
    static ref PROPERTY_ENCRYPT_LDIF: TaskProperty = TaskProperty::new(
        ATTR_ENCRYPT_LDIF,
        "Encrypt LDIF",
        "Whether to encrypt the LDIF file",
        DataType::Boolean,
        false,
        false,
    );
    static ref PROPERTY_SIGN_HASH: TaskProperty = TaskProperty::new(
        ATTR_SIGN_HASH,
        "Sign Hash",
        "Whether to sign a hash of the exported data",
        DataType::Boolean,
        false,
        false,
    )
    .advanced();
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_BACKEND_ID.clone(),
        PROPERTY_LDIF_FILE.clone(),
        PROPERTY_APPEND_TO_LDIF.clone(),
        PROPERTY_INCLUDE_BRANCH.clone(),
        PROPERTY_EXCLUDE_BRANCH.clone(),
        PROPERTY_INCLUDE_FILTER.clone(),
        PROPERTY_EXCLUDE_FILTER.clone(),
        PROPERTY_INCLUDE_ATTRIBUTE.clone(),
        PROPERTY_EXCLUDE_ATTRIBUTE.clone(),
        PROPERTY_WRAP_COLUMN.clone(),
        PROPERTY_COMPRESS_LDIF.clone(),
        PROPERTY_ENCRYPT_LDIF.clone(),
        PROPERTY_SIGN_HASH.clone(),
    ];
}

/// exports the entries of a backend to an LDIF file on the server
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::validate", error = "UsageError"))]
pub struct ExportTask {
    /// the backend to export
    #[builder(setter(into))]
    backend_id: String,
    /// the LDIF file to write
    #[builder(setter(into))]
    ldif_file: String,
    /// append to an existing file
    #[builder(default, setter(strip_option))]
    append_to_ldif: Option<bool>,
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
    /// attributes to include
    #[builder(default, setter(into))]
    include_attributes: Vec<String>,
    /// attributes to exclude
    #[builder(default, setter(into))]
    exclude_attributes: Vec<String>,
    /// the column to wrap long lines at
    #[builder(default, setter(strip_option))]
    wrap_column: Option<i64>,
    /// compress the file
    #[builder(default, setter(strip_option))]
    compress_ldif: Option<bool>,
    /// encrypt the file
    #[builder(default, setter(strip_option))]
    encrypt_ldif: Option<bool>,
    /// sign a hash of the data
    #[builder(default, setter(strip_option))]
    sign_hash: Option<bool>,
}

impl ExportTaskBuilder {
    /// required values must not be empty and the wrap column not negative
    fn validate(&self) -> Result<(), UsageError> {
        if let Some(backend_id) = &self.backend_id {
            UsageError::check_non_empty("backend_id", backend_id)?;
        }
        if let Some(ldif_file) = &self.ldif_file {
            UsageError::check_non_empty("ldif_file", ldif_file)?;
        }
        if let Some(Some(column)) = self.wrap_column {
            if column < 0 {
                return Err(UsageError::invalid("wrap_column", "must not be negative"));
            }
        }
        Ok(())
    }
}

impl ExportTask {
    /// export a backend with default settings
    pub fn new(backend_id: &str, ldif_file: &str) -> Result<Self, UsageError> {
        ExportTaskBuilder::default()
            .backend_id(backend_id)
            .ldif_file(ldif_file)
            .build()
    }

    /// the backend to export
    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    /// the LDIF file to write
    pub fn ldif_file(&self) -> &str {
        &self.ldif_file
    }

    /// append to an existing file
    pub fn append_to_ldif(&self) -> Option<bool> {
        self.append_to_ldif
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

    /// attributes to include
    pub fn include_attributes(&self) -> &[String] {
        &self.include_attributes
    }

    /// attributes to exclude
    pub fn exclude_attributes(&self) -> &[String] {
        &self.exclude_attributes
    }

    /// the column to wrap long lines at
    pub fn wrap_column(&self) -> Option<i64> {
        self.wrap_column
    }

    /// compress the file
    pub fn compress_ldif(&self) -> Option<bool> {
        self.compress_ldif
    }

    /// encrypt the file
    pub fn encrypt_ldif(&self) -> Option<bool> {
        self.encrypt_ldif
    }

    /// sign a hash of the data
    pub fn sign_hash(&self) -> Option<bool> {
        self.sign_hash
    }
}

impl TaskType for ExportTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.ExportTask";
    const OBJECT_CLASS: &'static str = "ds-task-export";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        Ok(Self {
            backend_id: reader.required_string(ATTR_BACKEND_ID)?,
            ldif_file: reader.required_string(ATTR_LDIF_FILE)?,
            append_to_ldif: reader.boolean(ATTR_APPEND_TO_LDIF)?,
            include_branches: reader.strings(ATTR_INCLUDE_BRANCH),
            exclude_branches: reader.strings(ATTR_EXCLUDE_BRANCH),
            include_filters: reader.strings(ATTR_INCLUDE_FILTER),
            exclude_filters: reader.strings(ATTR_EXCLUDE_FILTER),
            include_attributes: reader.strings(ATTR_INCLUDE_ATTRIBUTE),
            exclude_attributes: reader.strings(ATTR_EXCLUDE_ATTRIBUTE),
            wrap_column: reader.non_negative_integer(ATTR_WRAP_COLUMN)?,
            compress_ldif: reader.boolean(ATTR_COMPRESS_LDIF)?,
            encrypt_ldif: reader.boolean(ATTR_ENCRYPT_LDIF)?,
            sign_hash: reader.boolean(ATTR_SIGN_HASH)?,
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        Ok(Self {
            backend_id: reader.required_string(&PROPERTY_BACKEND_ID)?,
            ldif_file: reader.required_string(&PROPERTY_LDIF_FILE)?,
            append_to_ldif: reader.boolean(&PROPERTY_APPEND_TO_LDIF)?,
            include_branches: reader.strings(&PROPERTY_INCLUDE_BRANCH)?,
            exclude_branches: reader.strings(&PROPERTY_EXCLUDE_BRANCH)?,
            include_filters: reader.strings(&PROPERTY_INCLUDE_FILTER)?,
            exclude_filters: reader.strings(&PROPERTY_EXCLUDE_FILTER)?,
            include_attributes: reader.strings(&PROPERTY_INCLUDE_ATTRIBUTE)?,
            exclude_attributes: reader.strings(&PROPERTY_EXCLUDE_ATTRIBUTE)?,
            wrap_column: reader.non_negative_integer(&PROPERTY_WRAP_COLUMN)?,
            compress_ldif: reader.boolean(&PROPERTY_COMPRESS_LDIF)?,
            encrypt_ldif: reader.boolean(&PROPERTY_ENCRYPT_LDIF)?,
            sign_hash: reader.boolean(&PROPERTY_SIGN_HASH)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_values(ATTR_BACKEND_ID, [self.backend_id.as_str()])
            .add_values(ATTR_LDIF_FILE, [self.ldif_file.as_str()])
            .add_bool(ATTR_APPEND_TO_LDIF, self.append_to_ldif)
            .add_values(ATTR_INCLUDE_BRANCH, &self.include_branches)
            .add_values(ATTR_EXCLUDE_BRANCH, &self.exclude_branches)
            .add_values(ATTR_INCLUDE_FILTER, &self.include_filters)
            .add_values(ATTR_EXCLUDE_FILTER, &self.exclude_filters)
            .add_values(ATTR_INCLUDE_ATTRIBUTE, &self.include_attributes)
            .add_values(ATTR_EXCLUDE_ATTRIBUTE, &self.exclude_attributes)
            .add_integer(ATTR_WRAP_COLUMN, self.wrap_column)
            .add_bool(ATTR_COMPRESS_LDIF, self.compress_ldif)
            .add_bool(ATTR_ENCRYPT_LDIF, self.encrypt_ldif)
            .add_bool(ATTR_SIGN_HASH, self.sign_hash);
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(
                &PROPERTY_BACKEND_ID,
                vec![PropertyValue::String(self.backend_id.clone())],
            )
            .insert(
                &PROPERTY_LDIF_FILE,
                vec![PropertyValue::String(self.ldif_file.clone())],
            )
            .insert(&PROPERTY_APPEND_TO_LDIF, optional_value(self.append_to_ldif))
            .insert(&PROPERTY_INCLUDE_BRANCH, string_values(&self.include_branches))
            .insert(&PROPERTY_EXCLUDE_BRANCH, string_values(&self.exclude_branches))
            .insert(&PROPERTY_INCLUDE_FILTER, string_values(&self.include_filters))
            .insert(&PROPERTY_EXCLUDE_FILTER, string_values(&self.exclude_filters))
            .insert(
                &PROPERTY_INCLUDE_ATTRIBUTE,
                string_values(&self.include_attributes),
            )
            .insert(
                &PROPERTY_EXCLUDE_ATTRIBUTE,
                string_values(&self.exclude_attributes),
            )
            .insert(&PROPERTY_WRAP_COLUMN, optional_value(self.wrap_column))
            .insert(&PROPERTY_COMPRESS_LDIF, optional_value(self.compress_ldif))
            .insert(&PROPERTY_ENCRYPT_LDIF, optional_value(self.encrypt_ldif))
            .insert(&PROPERTY_SIGN_HASH, optional_value(self.sign_hash));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::{assert_round_trips, task_entry};
    use crate::task::Task;

    #[test]
    fn minimal_export() {
        assert_round_trips(&Task::new(
            Some("export"),
            ExportTask::new("userRoot", "ldif/export.ldif").unwrap(),
        ));
    }

    #[test]
    fn filtered_export() {
        let kind = ExportTaskBuilder::default()
            .backend_id("userRoot")
            .ldif_file("ldif/people.ldif.gz")
            .append_to_ldif(false)
            .include_branches(vec!["ou=People,dc=example,dc=com".to_string()])
            .exclude_branches(vec!["ou=Former,ou=People,dc=example,dc=com".to_string()])
            .include_filters(vec!["(objectClass=person)".to_string()])
            .exclude_filters(vec!["(nsAccountLock=true)".to_string()])
            .include_attributes(vec!["cn".to_string(), "mail".to_string()])
            .exclude_attributes(vec!["userPassword".to_string()])
            .wrap_column(76)
            .compress_ldif(true)
            .encrypt_ldif(true)
            .sign_hash(false)
            .build()
            .unwrap();
        assert_round_trips(&Task::new(Some("people"), kind));
    }

    #[test]
    fn usage_errors() {
        assert!(ExportTask::new("", "x.ldif").is_err());
        assert!(ExportTaskBuilder::default()
            .backend_id("userRoot")
            .ldif_file("x.ldif")
            .wrap_column(-1)
            .build()
            .is_err());
    }

    #[test]
    fn entry_checks_required_attributes_and_wrap_column() {
        let missing = task_entry(
            ExportTask::TASK_CLASS_NAME,
            ExportTask::OBJECT_CLASS,
            &[(ATTR_BACKEND_ID, &["userRoot"])],
        );
        assert!(matches!(
            Task::decode_entry(&missing),
            Err(TaskError::MissingAttribute { attribute, .. }) if attribute == ATTR_LDIF_FILE
        ));
        let negative = task_entry(
            ExportTask::TASK_CLASS_NAME,
            ExportTask::OBJECT_CLASS,
            &[
                (ATTR_BACKEND_ID, &["userRoot"]),
                (ATTR_LDIF_FILE, &["x.ldif"]),
                (ATTR_WRAP_COLUMN, &["-5"]),
            ],
        );
        assert!(matches!(
            Task::decode_entry(&negative),
            Err(TaskError::InvalidAttributeValue { attribute, .. }) if attribute == ATTR_WRAP_COLUMN
        ));
    }
}
