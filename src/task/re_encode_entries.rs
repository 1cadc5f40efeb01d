//! rewriting the entries of a backend with the current encoding settings

use derive_builder::Builder;
use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{optional_value, string_values, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use crate::task::registry::TaskType;

/// the backend whose entries are re-encoded
pub const ATTR_BACKEND_ID: &str = "ds-task-reencode-backend-id";
/// only re-encode entries below these branches
pub const ATTR_INCLUDE_BRANCH: &str = "ds-task-reencode-include-branch";
/// skip entries below these branches
pub const ATTR_EXCLUDE_BRANCH: &str = "ds-task-reencode-exclude-branch";
/// only re-encode entries matching these filters
pub const ATTR_INCLUDE_FILTER: &str = "ds-task-reencode-include-filter";
/// skip entries matching these filters
pub const ATTR_EXCLUDE_FILTER: &str = "ds-task-reencode-exclude-filter";
/// limit the rate of re-encoded entries
pub const ATTR_MAX_ENTRIES_PER_SECOND: &str = "ds-task-reencode-max-entries-per-second";
/// skip entries not present in the cache at all
pub const ATTR_SKIP_FULLY_UNCACHED: &str = "ds-task-reencode-skip-fully-uncached-entries";
/// skip entries only partially present in the cache
pub const ATTR_SKIP_PARTIALLY_UNCACHED: &str = "ds-task-reencode-skip-partially-uncached-entries";

lazy_static! {
    static ref PROPERTY_BACKEND_ID: TaskProperty = TaskProperty::new(
        ATTR_BACKEND_ID,
        "Backend ID",
        "The ID of the local DB backend whose entries are re-encoded",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTY_INCLUDE_BRANCH: TaskProperty = TaskProperty::new(
        ATTR_INCLUDE_BRANCH,
        "Include Branch",
        "The base DNs of branches to re-encode",
        DataType::String,
        false,
        true,
    );
    static ref PROPERTY_EXCLUDE_BRANCH: TaskProperty = TaskProperty::new(
        ATTR_EXCLUDE_BRANCH,
        "Exclude Branch",
        "The base DNs of branches to leave alone",
        DataType::String,
        false,
        true,
    );
    static ref PROPERTY_INCLUDE_FILTER: TaskProperty = TaskProperty::new(
        ATTR_INCLUDE_FILTER,
        "Include Filter",
        "Filters matching the entries to re-encode",
        DataType::String,
        false,
        true,
    );
    static ref PROPERTY_EXCLUDE_FILTER: TaskProperty = TaskProperty::new(
        ATTR_EXCLUDE_FILTER,
        "Exclude Filter",
        "Filters matching the entries to leave alone",
        DataType::String,
        false,
        true,
    );
    static ref PROPERTY_MAX_ENTRIES_PER_SECOND: TaskProperty = TaskProperty::new(
        ATTR_MAX_ENTRIES_PER_SECOND,
        "Maximum Re-Encodes per Second",
        "The maximum number of entries re-encoded per second",
        DataType::Integer,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_SKIP_FULLY_UNCACHED: TaskProperty = TaskProperty::new(
        ATTR_SKIP_FULLY_UNCACHED,
        "Skip Fully Uncached Entries",
        "Whether to skip entries which are not cached at all",
        DataType::Boolean,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_SKIP_PARTIALLY_UNCACHED: TaskProperty = TaskProperty::new(
        ATTR_SKIP_PARTIALLY_UNCACHED,
        "Skip Partially Uncached Entries",
        "Whether to skip entries which are only partially cached",
        DataType::Boolean,
        false,
        false,
    )
    .advanced();
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_BACKEND_ID.clone(),
        PROPERTY_INCLUDE_BRANCH.clone(),
        PROPERTY_EXCLUDE_BRANCH.clone(),
        PROPERTY_INCLUDE_FILTER.clone(),
        PROPERTY_EXCLUDE_FILTER.clone(),
        PROPERTY_MAX_ENTRIES_PER_SECOND.clone(),
        PROPERTY_SKIP_FULLY_UNCACHED.clone(),
        PROPERTY_SKIP_PARTIALLY_UNCACHED.clone(),
    ];
}

/// re-encodes the entries of a backend, for example after changing the
/// compression or encryption settings
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::validate", error = "UsageError"))]
pub struct ReEncodeEntriesTask {
    /// the backend whose entries are re-encoded
    #[builder(setter(into))]
    backend_id: String,
    /// only entries below these branches
    #[builder(default, setter(each(name = "include_branch", into)))]
    include_branches: Vec<String>,
    /// no entries below these branches
    #[builder(default, setter(each(name = "exclude_branch", into)))]
    exclude_branches: Vec<String>,
    /// only entries matching these filters
    #[builder(default, setter(each(name = "include_filter", into)))]
    include_filters: Vec<String>,
    /// no entries matching these filters
    #[builder(default, setter(each(name = "exclude_filter", into)))]
    exclude_filters: Vec<String>,
    /// the maximum rate
    #[builder(default, setter(strip_option))]
    max_entries_per_second: Option<i64>,
    /// skip entries which are not cached at all
    #[builder(default, setter(strip_option))]
    skip_fully_uncached_entries: Option<bool>,
    /// skip entries which are only partially cached
    #[builder(default, setter(strip_option))]
    skip_partially_uncached_entries: Option<bool>,
}

impl ReEncodeEntriesTaskBuilder {
    /// the backend ID must not be empty and the rate must be positive
    fn validate(&self) -> Result<(), UsageError> {
        if let Some(backend_id) = &self.backend_id {
            UsageError::check_non_empty("backend_id", backend_id)?;
        }
        if let Some(Some(rate)) = self.max_entries_per_second {
            if rate <= 0 {
                return Err(UsageError::invalid(
                    "max_entries_per_second",
                    "must be greater than zero",
                ));
            }
        }
        Ok(())
    }
}

impl ReEncodeEntriesTask {
    /// re-encode every entry of a backend
    pub fn new(backend_id: &str) -> Result<Self, UsageError> {
        ReEncodeEntriesTaskBuilder::default()
            .backend_id(backend_id)
            .build()
    }

    /// the backend whose entries are re-encoded
    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    /// only entries below these branches
    pub fn include_branches(&self) -> &[String] {
        &self.include_branches
    }

    /// no entries below these branches
    pub fn exclude_branches(&self) -> &[String] {
        &self.exclude_branches
    }

    /// only entries matching these filters
    pub fn include_filters(&self) -> &[String] {
        &self.include_filters
    }

    /// no entries matching these filters
    pub fn exclude_filters(&self) -> &[String] {
        &self.exclude_filters
    }

    /// the maximum number of entries per second
    pub fn max_entries_per_second(&self) -> Option<i64> {
        self.max_entries_per_second
    }

    /// whether entries which are not cached at all are skipped
    pub fn skip_fully_uncached_entries(&self) -> Option<bool> {
        self.skip_fully_uncached_entries
    }

    /// whether entries which are only partially cached are skipped
    pub fn skip_partially_uncached_entries(&self) -> Option<bool> {
        self.skip_partially_uncached_entries
    }
}

impl TaskType for ReEncodeEntriesTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.ReEncodeEntriesTask";
    const OBJECT_CLASS: &'static str = "ds-task-reencode";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        Ok(Self {
            backend_id: reader.required_string(ATTR_BACKEND_ID)?,
            include_branches: reader.strings(ATTR_INCLUDE_BRANCH),
            exclude_branches: reader.strings(ATTR_EXCLUDE_BRANCH),
            include_filters: reader.strings(ATTR_INCLUDE_FILTER),
            exclude_filters: reader.strings(ATTR_EXCLUDE_FILTER),
            max_entries_per_second: reader.positive_integer(ATTR_MAX_ENTRIES_PER_SECOND)?,
            skip_fully_uncached_entries: reader.boolean(ATTR_SKIP_FULLY_UNCACHED)?,
            skip_partially_uncached_entries: reader.boolean(ATTR_SKIP_PARTIALLY_UNCACHED)?,
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        Ok(Self {
            backend_id: reader.required_string(&PROPERTY_BACKEND_ID)?,
            include_branches: reader.strings(&PROPERTY_INCLUDE_BRANCH)?,
            exclude_branches: reader.strings(&PROPERTY_EXCLUDE_BRANCH)?,
            include_filters: reader.strings(&PROPERTY_INCLUDE_FILTER)?,
            exclude_filters: reader.strings(&PROPERTY_EXCLUDE_FILTER)?,
            max_entries_per_second: reader.positive_integer(&PROPERTY_MAX_ENTRIES_PER_SECOND)?,
            skip_fully_uncached_entries: reader.boolean(&PROPERTY_SKIP_FULLY_UNCACHED)?,
            skip_partially_uncached_entries: reader.boolean(&PROPERTY_SKIP_PARTIALLY_UNCACHED)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_values(ATTR_BACKEND_ID, [self.backend_id.as_str()])
            .add_values(ATTR_INCLUDE_BRANCH, self.include_branches.iter().cloned())
            .add_values(ATTR_EXCLUDE_BRANCH, self.exclude_branches.iter().cloned())
            .add_values(ATTR_INCLUDE_FILTER, self.include_filters.iter().cloned())
            .add_values(ATTR_EXCLUDE_FILTER, self.exclude_filters.iter().cloned())
            .add_integer(ATTR_MAX_ENTRIES_PER_SECOND, self.max_entries_per_second)
            .add_bool(ATTR_SKIP_FULLY_UNCACHED, self.skip_fully_uncached_entries)
            .add_bool(
                ATTR_SKIP_PARTIALLY_UNCACHED,
                self.skip_partially_uncached_entries,
            );
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(
                &PROPERTY_BACKEND_ID,
                vec![PropertyValue::String(self.backend_id.clone())],
            )
            .insert(
                &PROPERTY_INCLUDE_BRANCH,
                string_values(&self.include_branches),
            )
            .insert(
                &PROPERTY_EXCLUDE_BRANCH,
                string_values(&self.exclude_branches),
            )
            .insert(&PROPERTY_INCLUDE_FILTER, string_values(&self.include_filters))
            .insert(&PROPERTY_EXCLUDE_FILTER, string_values(&self.exclude_filters))
            .insert(
                &PROPERTY_MAX_ENTRIES_PER_SECOND,
                optional_value(self.max_entries_per_second),
            )
            .insert(
                &PROPERTY_SKIP_FULLY_UNCACHED,
                optional_value(self.skip_fully_uncached_entries),
            )
            .insert(
                &PROPERTY_SKIP_PARTIALLY_UNCACHED,
                optional_value(self.skip_partially_uncached_entries),
            );
    }
}
