//! adding schema files to the active server schema

use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{string_values, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, TaskProperty};
use crate::task::registry::TaskType;

/// the names of the schema files to add
pub const ATTR_SCHEMA_FILE: &str = "ds-task-schema-file-name";

lazy_static! {
    static ref PROPERTY_SCHEMA_FILE: TaskProperty = TaskProperty::new(
        ATTR_SCHEMA_FILE,
        "Schema File Name",
        "The names of the files in the schema directory to add to the server schema",
        DataType::String,
        true,
        true,
    );
    static ref PROPERTIES: Vec<TaskProperty> = vec![PROPERTY_SCHEMA_FILE.clone()];
}

/// adds files which already exist in the schema configuration directory of
/// the server to the active schema without a restart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSchemaFileTask {
    /// file names relative to the schema directory
    schema_file_names: Vec<String>,
}

impl AddSchemaFileTask {
    /// at least one non-empty file name is required
    pub fn new<I, S>(schema_file_names: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema_file_names: Vec<String> =
            schema_file_names.into_iter().map(Into::into).collect();
        if schema_file_names.is_empty() {
            return Err(UsageError::MissingArgument("schema_file_names".to_string()));
        }
        for name in &schema_file_names {
            UsageError::check_non_empty("schema_file_names", name)?;
        }
        Ok(Self { schema_file_names })
    }

    /// file names relative to the schema directory
    pub fn schema_file_names(&self) -> &[String] {
        &self.schema_file_names
    }
}

impl TaskType for AddSchemaFileTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.AddSchemaFileTask";
    const OBJECT_CLASS: &'static str = "ds-task-add-schema-file";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        Ok(Self {
            schema_file_names: reader.required_strings(ATTR_SCHEMA_FILE)?,
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        Ok(Self {
            schema_file_names: reader.strings(&PROPERTY_SCHEMA_FILE)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer.add_values(ATTR_SCHEMA_FILE, &self.schema_file_names);
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties.insert(&PROPERTY_SCHEMA_FILE, string_values(&self.schema_file_names));
    }
}
