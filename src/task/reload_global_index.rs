//! reloading the global indexes of an entry-balancing proxy

use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{optional_value, string_values, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use crate::task::registry::TaskType;

/// the base DN of the entry-balancing request processor
pub const ATTR_BASE_DN: &str = "ds-task-reload-base-dn";
/// the indexes to reload, all of them if empty
pub const ATTR_INDEX_NAME: &str = "ds-task-reload-index-name";
/// reload in the background while using the existing index
pub const ATTR_BACKGROUND: &str = "ds-task-reload-background";
/// limit the rate at which entries are read from the backends
pub const ATTR_MAX_ENTRIES_PER_SECOND: &str = "ds-task-reload-max-entries-per-second";

lazy_static! {
    static ref PROPERTY_BASE_DN: TaskProperty = TaskProperty::new(
        ATTR_BASE_DN,
        "Base DN",
        "The base DN of the entry-balancing request processor whose indexes are reloaded",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTY_INDEX_NAME: TaskProperty = TaskProperty::new(
        ATTR_INDEX_NAME,
        "Index Name",
        "The names of the global indexes to reload, all of them if left empty",
        DataType::String,
        false,
        true,
    );
    static ref PROPERTY_BACKGROUND: TaskProperty = TaskProperty::new(
        ATTR_BACKGROUND,
        "Background Reload",
        "Whether to reload in the background while the existing index stays in use",
        DataType::Boolean,
        false,
        false,
    );
    static ref PROPERTY_MAX_ENTRIES_PER_SECOND: TaskProperty = TaskProperty::new(
        ATTR_MAX_ENTRIES_PER_SECOND,
        "Maximum Reload Rate",
        "The maximum number of entries per second read from the backend servers",
        DataType::Integer,
        false,
        false,
    )
    .advanced();
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_BASE_DN.clone(),
        PROPERTY_INDEX_NAME.clone(),
        PROPERTY_BACKGROUND.clone(),
        PROPERTY_MAX_ENTRIES_PER_SECOND.clone(),
    ];
}

/// reloads global index data from the backend servers of a proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadGlobalIndexTask {
    /// the base DN of the entry-balancing request processor
    base_dn: String,
    /// the indexes to reload
    index_names: Vec<String>,
    /// reload in the background
    background: Option<bool>,
    /// the maximum read rate
    max_entries_per_second: Option<i64>,
}

impl ReloadGlobalIndexTask {
    /// reload the given indexes, all of them if the list is empty
    pub fn new<I, S>(
        base_dn: &str,
        index_names: I,
        background: Option<bool>,
        max_entries_per_second: Option<i64>,
    ) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        UsageError::check_non_empty("base_dn", base_dn)?;
        if matches!(max_entries_per_second, Some(rate) if rate <= 0) {
            return Err(UsageError::invalid(
                "max_entries_per_second",
                "must be greater than zero",
            ));
        }
        Ok(Self {
            base_dn: base_dn.to_string(),
            index_names: index_names.into_iter().map(Into::into).collect(),
            background,
            max_entries_per_second,
        })
    }

    /// the base DN of the entry-balancing request processor
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// the indexes to reload, empty for all
    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    /// whether the reload happens in the background
    pub fn background(&self) -> Option<bool> {
        self.background
    }

    /// the maximum number of entries read per second
    pub fn max_entries_per_second(&self) -> Option<i64> {
        self.max_entries_per_second
    }
}

impl TaskType for ReloadGlobalIndexTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.proxy.tasks.ReloadTask";
    const OBJECT_CLASS: &'static str = "ds-task-reload-global-index";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        Ok(Self {
            base_dn: reader.required_string(ATTR_BASE_DN)?,
            index_names: reader.strings(ATTR_INDEX_NAME),
            background: reader.boolean(ATTR_BACKGROUND)?,
            max_entries_per_second: reader.positive_integer(ATTR_MAX_ENTRIES_PER_SECOND)?,
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        Ok(Self {
            base_dn: reader.required_string(&PROPERTY_BASE_DN)?,
            index_names: reader.strings(&PROPERTY_INDEX_NAME)?,
            background: reader.boolean(&PROPERTY_BACKGROUND)?,
            max_entries_per_second: reader.positive_integer(&PROPERTY_MAX_ENTRIES_PER_SECOND)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_values(ATTR_BASE_DN, [self.base_dn.as_str()])
            .add_values(ATTR_INDEX_NAME, self.index_names.iter().cloned())
            .add_bool(ATTR_BACKGROUND, self.background)
            .add_integer(ATTR_MAX_ENTRIES_PER_SECOND, self.max_entries_per_second);
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(
                &PROPERTY_BASE_DN,
                vec![PropertyValue::String(self.base_dn.clone())],
            )
            .insert(&PROPERTY_INDEX_NAME, string_values(&self.index_names))
            .insert(&PROPERTY_BACKGROUND, optional_value(self.background))
            .insert(
                &PROPERTY_MAX_ENTRIES_PER_SECOND,
                optional_value(self.max_entries_per_second),
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

    #[test]
    fn all_indexes_in_the_background() {
        let kind =
            ReloadGlobalIndexTask::new("dc=example,dc=com", Vec::<String>::new(), Some(true), None)
                .unwrap();
        assert!(kind.index_names().is_empty());
        assert_round_trips(&Task::new(Some("reload"), kind));
    }

    #[test]
    fn selected_indexes_with_rate_limit() {
        let kind = ReloadGlobalIndexTask::new(
            "dc=example,dc=com",
            ["uid", "mail"],
            None,
            Some(5000),
        )
        .unwrap();
        assert_round_trips(&Task::new(Some("reload-some"), kind));
        assert!(ReloadGlobalIndexTask::new("dc=example,dc=com", ["uid"], None, Some(0)).is_err());
    }

    #[test]
    fn proxy_class_name_dispatches() {
        let e = task_entry(
            ReloadGlobalIndexTask::TASK_CLASS_NAME,
            ReloadGlobalIndexTask::OBJECT_CLASS,
            &[(ATTR_BASE_DN, &["dc=example,dc=com"])],
        );
        let task = Task::decode_entry(&e).unwrap();
        let TaskKind::ReloadGlobalIndex(kind) = task.kind() else {
            panic!("unexpected kind {:?}", task.kind());
        };
        assert_eq!(kind.base_dn(), "dc=example,dc=com");
    }
}
