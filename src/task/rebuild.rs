//! rebuilding indexes of a backend

use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{optional_value, string_values, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use crate::task::registry::TaskType;

/// the base DN of the backend whose indexes are rebuilt
pub const ATTR_BASE_DN: &str = "ds-task-rebuild-base-dn";
/// the indexes to rebuild
pub const ATTR_INDEX: &str = "ds-task-rebuild-index";
/// the maximum number of threads to use
pub const ATTR_MAX_THREADS: &str = "ds-task-rebuild-max-threads";

lazy_static! {
    static ref PROPERTY_BASE_DN: TaskProperty = TaskProperty::new(
        ATTR_BASE_DN,
        "Base DN",
        "The base DN of the backend containing the indexes to rebuild",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTY_INDEX: TaskProperty = TaskProperty::new(
        ATTR_INDEX,
        "Index Name",
        "The names of the indexes to rebuild",
        DataType::String,
        true,
        true,
    );
    static ref PROPERTY_MAX_THREADS: TaskProperty = TaskProperty::new(
        ATTR_MAX_THREADS,
        "Maximum Number of Threads",
        "The maximum number of threads used for the rebuild, a server chosen number if zero or left empty",
        DataType::Integer,
        false,
        false,
    )
    .advanced();
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_BASE_DN.clone(),
        PROPERTY_INDEX.clone(),
        PROPERTY_MAX_THREADS.clone(),
    ];
}

/// rebuilds one or more indexes of the backend holding a base DN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildTask {
    /// the base DN of the backend
    base_dn: String,
    /// the indexes to rebuild
    index_names: Vec<String>,
    /// the maximum number of threads to use
    max_threads: Option<i64>,
}

impl RebuildTask {
    /// rebuild the given indexes, at least one index is required
    pub fn new<I, S>(base_dn: &str, index_names: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_max_threads(base_dn, index_names, None)
    }

    /// rebuild the given indexes with a limit on the number of threads
    pub fn with_max_threads<I, S>(
        base_dn: &str,
        index_names: I,
        max_threads: Option<i64>,
    ) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        UsageError::check_non_empty("base_dn", base_dn)?;
        let index_names: Vec<String> = index_names.into_iter().map(Into::into).collect();
        if index_names.is_empty() {
            return Err(UsageError::MissingArgument("index_names".to_string()));
        }
        for name in &index_names {
            UsageError::check_non_empty("index_names", name)?;
        }
        if matches!(max_threads, Some(n) if n < 0) {
            return Err(UsageError::invalid("max_threads", "must not be negative"));
        }
        Ok(Self {
            base_dn: base_dn.to_string(),
            index_names,
            max_threads,
        })
    }

    /// the base DN of the backend
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// the indexes to rebuild
    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    /// the maximum number of threads to use
    pub fn max_threads(&self) -> Option<i64> {
        self.max_threads
    }
}

impl TaskType for RebuildTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.RebuildTask";
    const OBJECT_CLASS: &'static str = "ds-task-rebuild";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        Ok(Self {
            base_dn: reader.required_string(ATTR_BASE_DN)?,
            index_names: reader.required_strings(ATTR_INDEX)?,
            max_threads: reader.non_negative_integer(ATTR_MAX_THREADS)?,
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        Ok(Self {
            base_dn: reader.required_string(&PROPERTY_BASE_DN)?,
            index_names: reader.strings(&PROPERTY_INDEX)?,
            max_threads: reader.non_negative_integer(&PROPERTY_MAX_THREADS)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_values(ATTR_BASE_DN, [self.base_dn.as_str()])
            .add_values(ATTR_INDEX, &self.index_names)
            .add_integer(ATTR_MAX_THREADS, self.max_threads);
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(&PROPERTY_BASE_DN, vec![PropertyValue::String(self.base_dn.clone())])
            .insert(&PROPERTY_INDEX, string_values(&self.index_names))
            .insert(&PROPERTY_MAX_THREADS, optional_value(self.max_threads));
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
    fn index_names_keep_their_order() {
        let task = Task::new(
            Some("foo"),
            RebuildTask::new("dc=example,dc=com", ["uid", "cn"]).unwrap(),
        );
        let TaskKind::Rebuild(kind) = task.kind() else {
            panic!("unexpected kind {:?}", task.kind());
        };
        assert_eq!(kind.base_dn(), "dc=example,dc=com");
        assert_eq!(kind.index_names(), &["uid".to_string(), "cn".to_string()]);
        assert_eq!(kind.max_threads(), None);
        assert_round_trips(&task);
    }

    #[test]
    fn max_threads_round_trips() {
        let kind = RebuildTask::with_max_threads("dc=example,dc=com", ["mail"], Some(4)).unwrap();
        let task = Task::new(Some("threads"), kind);
        assert_eq!(task.create_task_entry().attrs[ATTR_MAX_THREADS], vec!["4"]);
        assert_round_trips(&task);
    }

    #[test]
    fn empty_index_list_is_a_usage_error() {
        assert_eq!(
            RebuildTask::new("dc=example,dc=com", Vec::<String>::new()),
            Err(UsageError::MissingArgument("index_names".to_string()))
        );
        assert!(RebuildTask::with_max_threads("dc=example,dc=com", ["uid"], Some(-1)).is_err());
    }

    #[test]
    fn entry_requires_base_dn_and_indexes() {
        let without_index = task_entry(
            RebuildTask::TASK_CLASS_NAME,
            RebuildTask::OBJECT_CLASS,
            &[(ATTR_BASE_DN, &["dc=example,dc=com"])],
        );
        assert!(matches!(
            Task::decode_entry(&without_index),
            Err(TaskError::MissingAttribute { attribute, .. }) if attribute == ATTR_INDEX
        ));
        let without_base = task_entry(
            RebuildTask::TASK_CLASS_NAME,
            RebuildTask::OBJECT_CLASS,
            &[(ATTR_INDEX, &["uid"])],
        );
        assert!(matches!(
            Task::decode_entry(&without_base),
            Err(TaskError::MissingAttribute { attribute, .. }) if attribute == ATTR_BASE_DN
        ));
    }

    #[test]
    fn negative_thread_count_is_rejected() {
        let e = task_entry(
            RebuildTask::TASK_CLASS_NAME,
            RebuildTask::OBJECT_CLASS,
            &[
                (ATTR_BASE_DN, &["dc=example,dc=com"]),
                (ATTR_INDEX, &["uid"]),
                (ATTR_MAX_THREADS, &["-2"]),
            ],
        );
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::InvalidAttributeValue { attribute, .. }) if attribute == ATTR_MAX_THREADS
        ));
    }
}
