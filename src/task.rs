//! the generic task abstraction
//!
//! a [Task] is the common part every administrative task shares (ID,
//! scheduling, dependencies, notifications and the server reported state)
//! plus a [TaskKind] holding the task type specific fields.
//!
//! a task can be constructed in three ways which all apply the same rules
//!
//! * from typed arguments, [Task::new] or [Task::with_options] with one of the
//!   task types in the submodules
//! * from a task entry read from the directory, [Task::decode_entry]
//! * from a [PropertyMap] filled in by generic tooling, [Task::from_property_values]
//!
//! and rendered back into an entry with [Task::create_task_entry] or into a
//! property map with [Task::task_property_values]

use chrono::{DateTime, SubsecRound, Utc};
use derive_builder::Builder;
use lazy_static::lazy_static;
use ldap3::SearchEntry;
use tracing::{debug, instrument, trace};

use crate::entry::{escape_rdn_value, has_object_class, leftmost_rdn, EntryWriter, ATTR_OBJECT_CLASS};
use crate::error::{TaskError, UsageError};
use crate::time::encode_generalized_time;

pub mod add_schema_file;
pub mod backup;
pub(crate) mod codec;
pub mod collect_support_data;
pub mod disconnect_client;
pub mod exec;
pub mod export;
pub mod file_retention;
pub mod generic;
pub mod groovy_scripted;
pub mod import;
pub mod lockdown;
pub mod property;
pub mod re_encode_entries;
pub mod rebuild;
pub mod refresh_encryption_settings;
pub mod registry;
pub mod reload_global_index;
pub mod remove_attribute_type;
pub mod restore;
pub mod shutdown;
pub mod state;
#[cfg(test)]
pub(crate) mod test_support;

use codec::{optional_value, string_values, EntryReader, PropertyReader};
use generic::GenericTask;
use property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use registry::{find_by_class_name, find_task_type, TaskKind, TaskType};
use state::{FailedDependencyAction, TaskState};

/// the object class every task entry carries
pub const OC_TASK: &str = "ds-task";
/// the entry below which task entries are added
pub const SCHEDULED_TASKS_BASE_DN: &str = "cn=Scheduled Tasks,cn=tasks";

/// the task ID, also used as the RDN of the task entry
pub const ATTR_TASK_ID: &str = "ds-task-id";
/// the class name of the server side implementation
pub const ATTR_TASK_CLASS: &str = "ds-task-class-name";
/// the current state
pub const ATTR_TASK_STATE: &str = "ds-task-state";
/// the time the task should start
pub const ATTR_SCHEDULED_START_TIME: &str = "ds-task-scheduled-start-time";
/// the time the task actually started
pub const ATTR_ACTUAL_START_TIME: &str = "ds-task-actual-start-time";
/// the time the task completed
pub const ATTR_COMPLETION_TIME: &str = "ds-task-completion-time";
/// the IDs of tasks which must complete first
pub const ATTR_DEPENDENCY_ID: &str = "ds-task-dependency-id";
/// what to do if a dependency fails
pub const ATTR_FAILED_DEPENDENCY_ACTION: &str = "ds-task-failed-dependency-action";
/// the log messages written by the task
pub const ATTR_LOG_MESSAGE: &str = "ds-task-log-message";
/// addresses to notify when the task starts
pub const ATTR_NOTIFY_ON_START: &str = "ds-task-notify-on-start";
/// addresses to notify when the task completes
pub const ATTR_NOTIFY_ON_COMPLETION: &str = "ds-task-notify-on-completion";
/// addresses to notify when the task completes successfully
pub const ATTR_NOTIFY_ON_SUCCESS: &str = "ds-task-notify-on-success";
/// addresses to notify when the task fails
pub const ATTR_NOTIFY_ON_ERROR: &str = "ds-task-notify-on-error";
/// whether to raise an alert when the task starts
pub const ATTR_ALERT_ON_START: &str = "ds-task-alert-on-start";
/// whether to raise an alert when the task completes successfully
pub const ATTR_ALERT_ON_SUCCESS: &str = "ds-task-alert-on-success";
/// whether to raise an alert when the task fails
pub const ATTR_ALERT_ON_ERROR: &str = "ds-task-alert-on-error";

/// every attribute handled by [Task] itself rather than by a task type
pub const COMMON_ATTRIBUTES: [&str; 16] = [
    ATTR_TASK_ID,
    ATTR_TASK_CLASS,
    ATTR_TASK_STATE,
    ATTR_SCHEDULED_START_TIME,
    ATTR_ACTUAL_START_TIME,
    ATTR_COMPLETION_TIME,
    ATTR_DEPENDENCY_ID,
    ATTR_FAILED_DEPENDENCY_ACTION,
    ATTR_LOG_MESSAGE,
    ATTR_NOTIFY_ON_START,
    ATTR_NOTIFY_ON_COMPLETION,
    ATTR_NOTIFY_ON_SUCCESS,
    ATTR_NOTIFY_ON_ERROR,
    ATTR_ALERT_ON_START,
    ATTR_ALERT_ON_SUCCESS,
    ATTR_ALERT_ON_ERROR,
];

lazy_static! {
    static ref PROPERTY_TASK_ID: TaskProperty = TaskProperty::new(
        ATTR_TASK_ID,
        "Task ID",
        "The unique identifier for the task, generated if left empty",
        DataType::String,
        false,
        false,
    );
    static ref PROPERTY_SCHEDULED_START_TIME: TaskProperty = TaskProperty::new(
        ATTR_SCHEDULED_START_TIME,
        "Scheduled Start Time",
        "The time the task should start, immediately if left empty",
        DataType::Date,
        false,
        false,
    );
    static ref PROPERTY_DEPENDENCY_ID: TaskProperty = TaskProperty::new(
        ATTR_DEPENDENCY_ID,
        "Dependency ID",
        "The IDs of tasks which must complete before this task may start",
        DataType::String,
        false,
        true,
    )
    .advanced();
    static ref PROPERTY_FAILED_DEPENDENCY_ACTION: TaskProperty = TaskProperty::new(
        ATTR_FAILED_DEPENDENCY_ACTION,
        "Failed Dependency Action",
        "What to do with this task if one of its dependencies fails",
        DataType::String,
        false,
        false,
    )
    .advanced()
    .with_allowed_values(FailedDependencyAction::ALL.iter().map(|a| a.name()));
    static ref PROPERTY_NOTIFY_ON_START: TaskProperty = TaskProperty::new(
        ATTR_NOTIFY_ON_START,
        "Start Notification Addresses",
        "E-mail addresses to notify when the task starts",
        DataType::String,
        false,
        true,
    )
    .advanced();
    static ref PROPERTY_NOTIFY_ON_COMPLETION: TaskProperty = TaskProperty::new(
        ATTR_NOTIFY_ON_COMPLETION,
        "Completion Notification Addresses",
        "E-mail addresses to notify when the task completes, successfully or not",
        DataType::String,
        false,
        true,
    )
    .advanced();
    static ref PROPERTY_NOTIFY_ON_SUCCESS: TaskProperty = TaskProperty::new(
        ATTR_NOTIFY_ON_SUCCESS,
        "Success Notification Addresses",
        "E-mail addresses to notify when the task completes successfully",
        DataType::String,
        false,
        true,
    )
    .advanced();
    static ref PROPERTY_NOTIFY_ON_ERROR: TaskProperty = TaskProperty::new(
        ATTR_NOTIFY_ON_ERROR,
        "Error Notification Addresses",
        "E-mail addresses to notify when the task fails",
        DataType::String,
        false,
        true,
    )
    .advanced();
    static ref PROPERTY_ALERT_ON_START: TaskProperty = TaskProperty::new(
        ATTR_ALERT_ON_START,
        "Generate Alert on Start",
        "Whether the server should raise an administrative alert when the task starts",
        DataType::Boolean,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_ALERT_ON_SUCCESS: TaskProperty = TaskProperty::new(
        ATTR_ALERT_ON_SUCCESS,
        "Generate Alert on Success",
        "Whether the server should raise an administrative alert when the task succeeds",
        DataType::Boolean,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_ALERT_ON_ERROR: TaskProperty = TaskProperty::new(
        ATTR_ALERT_ON_ERROR,
        "Generate Alert on Error",
        "Whether the server should raise an administrative alert when the task fails",
        DataType::Boolean,
        false,
        false,
    )
    .advanced();
    static ref COMMON_PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_TASK_ID.clone(),
        PROPERTY_SCHEDULED_START_TIME.clone(),
        PROPERTY_DEPENDENCY_ID.clone(),
        PROPERTY_FAILED_DEPENDENCY_ACTION.clone(),
        PROPERTY_NOTIFY_ON_START.clone(),
        PROPERTY_NOTIFY_ON_COMPLETION.clone(),
        PROPERTY_NOTIFY_ON_SUCCESS.clone(),
        PROPERTY_NOTIFY_ON_ERROR.clone(),
        PROPERTY_ALERT_ON_START.clone(),
        PROPERTY_ALERT_ON_SUCCESS.clone(),
        PROPERTY_ALERT_ON_ERROR.clone(),
    ];
}

/// the scheduling and notification settings a client may set on any task
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::validate", error = "UsageError"))]
pub struct TaskOptions {
    /// when the task should start, as soon as possible if unset, whole
    /// seconds only
    #[builder(default, setter(custom))]
    scheduled_start_time: Option<DateTime<Utc>>,
    /// IDs of tasks which must complete first
    #[builder(default, setter(into))]
    dependency_ids: Vec<String>,
    /// what to do if a dependency fails, server default if unset
    #[builder(default, setter(strip_option))]
    failed_dependency_action: Option<FailedDependencyAction>,
    /// addresses to notify when the task starts
    #[builder(default, setter(into))]
    notify_on_start: Vec<String>,
    /// addresses to notify when the task completes
    #[builder(default, setter(into))]
    notify_on_completion: Vec<String>,
    /// addresses to notify when the task completes successfully
    #[builder(default, setter(into))]
    notify_on_success: Vec<String>,
    /// addresses to notify when the task fails
    #[builder(default, setter(into))]
    notify_on_error: Vec<String>,
    /// whether to raise an alert when the task starts
    #[builder(default, setter(strip_option))]
    alert_on_start: Option<bool>,
    /// whether to raise an alert when the task completes successfully
    #[builder(default, setter(strip_option))]
    alert_on_success: Option<bool>,
    /// whether to raise an alert when the task fails
    #[builder(default, setter(strip_option))]
    alert_on_error: Option<bool>,
}

impl TaskOptionsBuilder {
    /// when the task should start, fractional seconds are dropped since the
    /// task entry only stores whole seconds
    pub fn scheduled_start_time<VALUE: Into<DateTime<Utc>>>(&mut self, value: VALUE) -> &mut Self {
        self.scheduled_start_time = Some(Some(value.into().trunc_subsecs(0)));
        self
    }

    /// list values must not be empty strings
    fn validate(&self) -> Result<(), UsageError> {
        let lists = [
            ("dependency_ids", &self.dependency_ids),
            ("notify_on_start", &self.notify_on_start),
            ("notify_on_completion", &self.notify_on_completion),
            ("notify_on_success", &self.notify_on_success),
            ("notify_on_error", &self.notify_on_error),
        ];
        for (argument, values) in lists {
            if let Some(values) = values {
                if values.iter().any(|v| v.trim().is_empty()) {
                    return Err(UsageError::invalid(argument, "values must not be empty"));
                }
            }
        }
        Ok(())
    }
}

impl TaskOptions {
    /// decode the options from the common attributes of a task entry
    fn decode_entry(reader: &EntryReader<'_>) -> Result<Self, TaskError> {
        Ok(Self {
            scheduled_start_time: reader.timestamp(ATTR_SCHEDULED_START_TIME)?,
            dependency_ids: reader.strings(ATTR_DEPENDENCY_ID),
            failed_dependency_action: reader.parsed(ATTR_FAILED_DEPENDENCY_ACTION)?,
            notify_on_start: reader.strings(ATTR_NOTIFY_ON_START),
            notify_on_completion: reader.strings(ATTR_NOTIFY_ON_COMPLETION),
            notify_on_success: reader.strings(ATTR_NOTIFY_ON_SUCCESS),
            notify_on_error: reader.strings(ATTR_NOTIFY_ON_ERROR),
            alert_on_start: reader.boolean(ATTR_ALERT_ON_START)?,
            alert_on_success: reader.boolean(ATTR_ALERT_ON_SUCCESS)?,
            alert_on_error: reader.boolean(ATTR_ALERT_ON_ERROR)?,
        })
    }

    /// decode the options from the common properties of a property map
    fn decode_properties(reader: &PropertyReader<'_>) -> Result<Self, TaskError> {
        Ok(Self {
            scheduled_start_time: reader
                .date(&PROPERTY_SCHEDULED_START_TIME)?
                .map(|t| t.trunc_subsecs(0)),
            dependency_ids: reader.strings(&PROPERTY_DEPENDENCY_ID)?,
            failed_dependency_action: reader.parsed(&PROPERTY_FAILED_DEPENDENCY_ACTION)?,
            notify_on_start: reader.strings(&PROPERTY_NOTIFY_ON_START)?,
            notify_on_completion: reader.strings(&PROPERTY_NOTIFY_ON_COMPLETION)?,
            notify_on_success: reader.strings(&PROPERTY_NOTIFY_ON_SUCCESS)?,
            notify_on_error: reader.strings(&PROPERTY_NOTIFY_ON_ERROR)?,
            alert_on_start: reader.boolean(&PROPERTY_ALERT_ON_START)?,
            alert_on_success: reader.boolean(&PROPERTY_ALERT_ON_SUCCESS)?,
            alert_on_error: reader.boolean(&PROPERTY_ALERT_ON_ERROR)?,
        })
    }

    /// add the populated options to an entry being rendered
    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_values(
                ATTR_SCHEDULED_START_TIME,
                self.scheduled_start_time.as_ref().map(encode_generalized_time),
            )
            .add_values(ATTR_DEPENDENCY_ID, &self.dependency_ids)
            .add_optional(
                ATTR_FAILED_DEPENDENCY_ACTION,
                self.failed_dependency_action.map(|a| a.name()),
            )
            .add_values(ATTR_NOTIFY_ON_START, &self.notify_on_start)
            .add_values(ATTR_NOTIFY_ON_COMPLETION, &self.notify_on_completion)
            .add_values(ATTR_NOTIFY_ON_SUCCESS, &self.notify_on_success)
            .add_values(ATTR_NOTIFY_ON_ERROR, &self.notify_on_error)
            .add_bool(ATTR_ALERT_ON_START, self.alert_on_start)
            .add_bool(ATTR_ALERT_ON_SUCCESS, self.alert_on_success)
            .add_bool(ATTR_ALERT_ON_ERROR, self.alert_on_error);
    }

    /// add the options to a property map
    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(
                &PROPERTY_SCHEDULED_START_TIME,
                optional_value(self.scheduled_start_time),
            )
            .insert(&PROPERTY_DEPENDENCY_ID, string_values(&self.dependency_ids))
            .insert(
                &PROPERTY_FAILED_DEPENDENCY_ACTION,
                optional_value(self.failed_dependency_action.map(|a| a.name())),
            )
            .insert(&PROPERTY_NOTIFY_ON_START, string_values(&self.notify_on_start))
            .insert(
                &PROPERTY_NOTIFY_ON_COMPLETION,
                string_values(&self.notify_on_completion),
            )
            .insert(&PROPERTY_NOTIFY_ON_SUCCESS, string_values(&self.notify_on_success))
            .insert(&PROPERTY_NOTIFY_ON_ERROR, string_values(&self.notify_on_error))
            .insert(&PROPERTY_ALERT_ON_START, optional_value(self.alert_on_start))
            .insert(&PROPERTY_ALERT_ON_SUCCESS, optional_value(self.alert_on_success))
            .insert(&PROPERTY_ALERT_ON_ERROR, optional_value(self.alert_on_error));
    }
}

/// the common fields of a task read before the task type specific part
struct CommonFields {
    /// see [Task::task_id]
    task_id: String,
    /// see [Task::state]
    state: TaskState,
    /// see [Task::options]
    options: TaskOptions,
    /// see [Task::actual_start_time]
    actual_start_time: Option<DateTime<Utc>>,
    /// see [Task::completion_time]
    completion_time: Option<DateTime<Utc>>,
    /// see [Task::log_messages]
    log_messages: Vec<String>,
}

impl CommonFields {
    /// read the common attributes of a task entry
    fn decode_entry(reader: &EntryReader<'_>) -> Result<Self, TaskError> {
        let task_id = match reader.string(ATTR_TASK_ID) {
            Some(task_id) => task_id,
            None => match leftmost_rdn(reader.dn()) {
                Some((name, value)) if name.eq_ignore_ascii_case(ATTR_TASK_ID) => value,
                _ => return Err(reader.missing(ATTR_TASK_ID)),
            },
        };
        trace!("decoding common attributes of task {}", task_id);
        Ok(Self {
            task_id,
            state: reader
                .parsed(ATTR_TASK_STATE)?
                .unwrap_or(TaskState::Unscheduled),
            options: TaskOptions::decode_entry(reader)?,
            actual_start_time: reader.timestamp(ATTR_ACTUAL_START_TIME)?,
            completion_time: reader.timestamp(ATTR_COMPLETION_TIME)?,
            log_messages: reader.strings(ATTR_LOG_MESSAGE),
        })
    }

    /// read the common properties of a property map
    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        if properties.is_empty() {
            return Err(TaskError::EmptyPropertyMap);
        }
        let reader = PropertyReader::new(properties);
        let task_id = reader
            .string(&PROPERTY_TASK_ID)?
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_task_id);
        Ok(Self {
            task_id,
            state: TaskState::Unscheduled,
            options: TaskOptions::decode_properties(&reader)?,
            actual_start_time: None,
            completion_time: None,
            log_messages: vec![],
        })
    }

    /// combine with the task type specific part
    fn with_kind(self, kind: TaskKind) -> Task {
        Task {
            task_id: self.task_id,
            state: self.state,
            options: self.options,
            actual_start_time: self.actual_start_time,
            completion_time: self.completion_time,
            log_messages: self.log_messages,
            kind,
        }
    }
}

/// a random task ID for tasks created without one
fn generate_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// check the object class every task entry must have
fn check_task_object_class(entry: &SearchEntry) -> Result<(), TaskError> {
    if has_object_class(entry, OC_TASK) {
        Ok(())
    } else {
        Err(TaskError::MissingObjectClass {
            dn: entry.dn.clone(),
            object_class: OC_TASK.to_string(),
        })
    }
}

/// an administrative task
///
/// the fields reported by the server (state, actual start and completion
/// time and log messages) are only set on tasks decoded from an entry
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// the unique ID of the task
    task_id: String,
    /// the state last reported by the server
    state: TaskState,
    /// scheduling and notification settings
    options: TaskOptions,
    /// the time the task actually started
    actual_start_time: Option<DateTime<Utc>>,
    /// the time the task completed
    completion_time: Option<DateTime<Utc>>,
    /// log messages written by the task, each prefixed with a bracketed timestamp
    log_messages: Vec<String>,
    /// the task type specific part
    kind: TaskKind,
}

impl Task {
    /// create a new task with default options
    ///
    /// a random UUID is used as the task ID if none (or an empty one) is given
    pub fn new(task_id: Option<&str>, kind: impl Into<TaskKind>) -> Self {
        Self::with_options(task_id, kind, TaskOptions::default())
    }

    /// create a new task with the given scheduling and notification options
    pub fn with_options(
        task_id: Option<&str>,
        kind: impl Into<TaskKind>,
        options: TaskOptions,
    ) -> Self {
        let task_id = task_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(generate_task_id);
        Self {
            task_id,
            state: TaskState::Unscheduled,
            options,
            actual_start_time: None,
            completion_time: None,
            log_messages: vec![],
            kind: kind.into(),
        }
    }

    /// decode a task entry into the most specific known task type
    ///
    /// the task type is found by class name, then by object class, and tasks
    /// of unknown classes are kept as a [GenericTask]
    #[instrument(skip(entry), fields(dn = %entry.dn))]
    pub fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        check_task_object_class(entry)?;
        let reader = EntryReader::new(entry);
        let class_name = reader.required_string(ATTR_TASK_CLASS)?;
        let common = CommonFields::decode_entry(&reader)?;
        let kind = match find_task_type(Some(class_name.as_str()), reader.values(ATTR_OBJECT_CLASS)) {
            Some(task_type) => {
                debug!(
                    "decoding task {} as {}",
                    common.task_id,
                    task_type.class_name()
                );
                task_type.decode_entry(entry)?
            }
            None => {
                debug!(
                    "no known task type for class {}, keeping task {} as a generic task",
                    class_name, common.task_id
                );
                GenericTask::decode_entry(entry, &class_name).into()
            }
        };
        Ok(common.with_kind(kind))
    }

    /// decode a task entry as a specific task type
    ///
    /// the class name attribute is not checked
    #[instrument(skip(entry), fields(dn = %entry.dn))]
    pub fn decode_entry_as<T: TaskType>(entry: &SearchEntry) -> Result<Self, TaskError> {
        check_task_object_class(entry)?;
        let reader = EntryReader::new(entry);
        let common = CommonFields::decode_entry(&reader)?;
        let kind = T::decode_entry(entry)?.into();
        Ok(common.with_kind(kind))
    }

    /// construct a task of a specific type from a property map
    #[instrument(skip(properties))]
    pub fn from_property_values<T: TaskType>(properties: &PropertyMap) -> Result<Self, TaskError> {
        let common = CommonFields::decode_properties(properties)?;
        let kind = T::decode_properties(properties)?.into();
        Ok(common.with_kind(kind))
    }

    /// construct a task of the type with the given class name from a property map
    #[instrument(skip(properties))]
    pub fn from_property_values_for_class(
        class_name: &str,
        properties: &PropertyMap,
    ) -> Result<Self, TaskError> {
        let task_type = find_by_class_name(class_name)
            .ok_or_else(|| TaskError::UnknownTaskClass(class_name.to_string()))?;
        let common = CommonFields::decode_properties(properties)?;
        let kind = task_type.decode_properties(properties)?;
        Ok(common.with_kind(kind))
    }

    /// the properties every task type shares
    pub fn common_task_properties() -> &'static [TaskProperty] {
        &COMMON_PROPERTIES
    }

    /// render the task as an entry suitable for adding below
    /// [SCHEDULED_TASKS_BASE_DN]
    ///
    /// the server reported fields are only included if they are set, a new
    /// task never carries them
    #[instrument(skip(self), fields(task_id = %self.task_id))]
    pub fn create_task_entry(&self) -> SearchEntry {
        let mut writer = EntryWriter::new();
        writer
            .add_values(ATTR_OBJECT_CLASS, ["top", OC_TASK])
            .add_values(ATTR_OBJECT_CLASS, self.kind.additional_object_classes())
            .add_values(ATTR_TASK_ID, [self.task_id.as_str()])
            .add_values(ATTR_TASK_CLASS, [self.kind.task_class_name()]);
        if self.state != TaskState::Unscheduled {
            writer.add_values(ATTR_TASK_STATE, [self.state.name()]);
        }
        self.options.encode_attributes(&mut writer);
        writer
            .add_values(
                ATTR_ACTUAL_START_TIME,
                self.actual_start_time.as_ref().map(encode_generalized_time),
            )
            .add_values(
                ATTR_COMPLETION_TIME,
                self.completion_time.as_ref().map(encode_generalized_time),
            )
            .add_values(ATTR_LOG_MESSAGE, &self.log_messages);
        self.kind.encode_attributes(&mut writer);
        writer.into_entry(self.task_entry_dn())
    }

    /// the values of every common and task type specific property, properties
    /// without a value map to an empty list
    pub fn task_property_values(&self) -> PropertyMap {
        let mut properties = PropertyMap::new();
        properties.insert(
            &PROPERTY_TASK_ID,
            vec![PropertyValue::String(self.task_id.clone())],
        );
        self.options.encode_properties(&mut properties);
        for property in self.kind.task_properties() {
            properties.insert(property, vec![]);
        }
        self.kind.encode_properties(&mut properties);
        properties
    }

    /// the DN of the task entry
    pub fn task_entry_dn(&self) -> String {
        format!(
            "{}={},{}",
            ATTR_TASK_ID,
            escape_rdn_value(&self.task_id),
            SCHEDULED_TASKS_BASE_DN
        )
    }

    /// the unique ID of the task
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// the fully qualified name of the server side implementation
    pub fn task_class_name(&self) -> &str {
        self.kind.task_class_name()
    }

    /// the object classes in addition to `top` and `ds-task`
    pub fn additional_object_classes(&self) -> Vec<&str> {
        self.kind.additional_object_classes()
    }

    /// the properties specific to the task type
    pub fn task_properties(&self) -> &'static [TaskProperty] {
        self.kind.task_properties()
    }

    /// the task type specific part
    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    /// the scheduling and notification options
    pub fn options(&self) -> &TaskOptions {
        &self.options
    }

    /// the state last reported by the server, [TaskState::Unscheduled] for new tasks
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// the task has not started yet
    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    /// the task is running
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// the task has reached a terminal state
    pub fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    /// when the task should start
    pub fn scheduled_start_time(&self) -> Option<DateTime<Utc>> {
        self.options.scheduled_start_time
    }

    /// when the task actually started
    pub fn actual_start_time(&self) -> Option<DateTime<Utc>> {
        self.actual_start_time
    }

    /// when the task completed
    pub fn completion_time(&self) -> Option<DateTime<Utc>> {
        self.completion_time
    }

    /// IDs of tasks which must complete first
    pub fn dependency_ids(&self) -> &[String] {
        &self.options.dependency_ids
    }

    /// what to do if a dependency fails
    pub fn failed_dependency_action(&self) -> Option<FailedDependencyAction> {
        self.options.failed_dependency_action
    }

    /// log messages written by the task
    pub fn log_messages(&self) -> &[String] {
        &self.log_messages
    }

    /// addresses to notify when the task starts
    pub fn notify_on_start(&self) -> &[String] {
        &self.options.notify_on_start
    }

    /// addresses to notify when the task completes
    pub fn notify_on_completion(&self) -> &[String] {
        &self.options.notify_on_completion
    }

    /// addresses to notify when the task completes successfully
    pub fn notify_on_success(&self) -> &[String] {
        &self.options.notify_on_success
    }

    /// addresses to notify when the task fails
    pub fn notify_on_error(&self) -> &[String] {
        &self.options.notify_on_error
    }

    /// whether to raise an alert when the task starts
    pub fn alert_on_start(&self) -> Option<bool> {
        self.options.alert_on_start
    }

    /// whether to raise an alert when the task completes successfully
    pub fn alert_on_success(&self) -> Option<bool> {
        self.options.alert_on_success
    }

    /// whether to raise an alert when the task fails
    pub fn alert_on_error(&self) -> Option<bool> {
        self.options.alert_on_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::add_schema_file::AddSchemaFileTask;
    use crate::task::shutdown::ShutdownTask;
    use crate::task::test_support::{assert_round_trips, entry, init_test_logging};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn options() -> TaskOptions {
        TaskOptionsBuilder::default()
            .scheduled_start_time(Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 1).unwrap())
            .dependency_ids(vec!["dep1".to_string(), "dep2".to_string()])
            .failed_dependency_action(FailedDependencyAction::Disable)
            .notify_on_start(vec!["start@example.com".to_string()])
            .notify_on_completion(vec!["done@example.com".to_string()])
            .notify_on_success(vec!["ok@example.com".to_string()])
            .notify_on_error(vec!["err@example.com".to_string()])
            .alert_on_start(true)
            .alert_on_success(false)
            .alert_on_error(true)
            .build()
            .unwrap()
    }

    #[test]
    fn new_task_without_id_gets_a_uuid() {
        let task = Task::new(None, ShutdownTask::default());
        assert_eq!(task.task_id().len(), 36);
        assert!(uuid::Uuid::parse_str(task.task_id()).is_ok());
        let other = Task::new(Some("  "), ShutdownTask::default());
        assert_ne!(task.task_id(), other.task_id());
    }

    #[test]
    fn new_task_is_pending() {
        let task = Task::new(Some("t"), ShutdownTask::default());
        assert_eq!(task.state(), TaskState::Unscheduled);
        assert!(task.is_pending());
        assert!(!task.is_running());
        assert!(!task.is_completed());
        assert!(task.log_messages().is_empty());
    }

    #[test]
    fn options_builder_rejects_empty_addresses() {
        let result = TaskOptionsBuilder::default()
            .notify_on_error(vec!["".to_string()])
            .build();
        assert!(matches!(
            result,
            Err(UsageError::InvalidArgument { argument, .. }) if argument == "notify_on_error"
        ));
    }

    #[test]
    fn entry_has_dn_object_classes_and_common_attributes() {
        init_test_logging();
        let kind = AddSchemaFileTask::new(["bar"]).unwrap();
        let task = Task::with_options(Some("foo,1"), kind, options());
        let e = task.create_task_entry();
        assert_eq!(e.dn, "ds-task-id=foo\\,1,cn=Scheduled Tasks,cn=tasks");
        assert_eq!(
            e.attrs["objectClass"],
            vec!["top", "ds-task", "ds-task-add-schema-file"]
        );
        assert_eq!(e.attrs[ATTR_SCHEDULED_START_TIME], vec!["20240229235901Z"]);
        assert_eq!(e.attrs[ATTR_DEPENDENCY_ID], vec!["dep1", "dep2"]);
        assert_eq!(e.attrs[ATTR_FAILED_DEPENDENCY_ACTION], vec!["disable"]);
        assert_eq!(e.attrs[ATTR_ALERT_ON_SUCCESS], vec!["false"]);
        assert!(!e.attrs.contains_key(ATTR_TASK_STATE));
        assert!(!e.attrs.contains_key(ATTR_LOG_MESSAGE));
    }

    #[test]
    fn create_task_entry_is_deterministic() {
        let task = Task::with_options(Some("x"), ShutdownTask::default(), options());
        let first = task.create_task_entry();
        let second = task.create_task_entry();
        assert_eq!(first.dn, second.dn);
        assert_eq!(first.attrs, second.attrs);
        assert_eq!(first.bin_attrs, second.bin_attrs);
    }

    #[test]
    fn fractional_start_time_is_truncated() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        let options = TaskOptionsBuilder::default()
            .scheduled_start_time(start)
            .build()
            .unwrap();
        let task = Task::with_options(Some("frac"), ShutdownTask::default(), options);
        assert_eq!(
            task.scheduled_start_time(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        let decoded = Task::decode_entry(&task.create_task_entry()).unwrap();
        assert_eq!(decoded.scheduled_start_time(), task.scheduled_start_time());
        assert_round_trips(&task);
    }

    #[test]
    fn common_fields_round_trip() {
        init_test_logging();
        let kind = AddSchemaFileTask::new(["bar"]).unwrap();
        assert_round_trips(&Task::with_options(Some("foo"), kind, options()));
    }

    #[test]
    fn server_fields_are_decoded() {
        let e = entry(
            "ds-task-id=abc,cn=Scheduled Tasks,cn=tasks",
            &[
                ("objectClass", &["top", "ds-task", "ds-task-shutdown"]),
                (ATTR_TASK_CLASS, &[ShutdownTask::TASK_CLASS_NAME]),
                (ATTR_TASK_STATE, &["completed_successfully"]),
                (ATTR_ACTUAL_START_TIME, &["20240101120000Z"]),
                (ATTR_COMPLETION_TIME, &["20240101120005.123Z"]),
                (
                    ATTR_LOG_MESSAGE,
                    &["[01/Jan/2024:12:00:00 +0000] starting", "[01/Jan/2024:12:00:05 +0000] done"],
                ),
            ],
        );
        let task = Task::decode_entry(&e).unwrap();
        assert_eq!(task.task_id(), "abc");
        assert!(task.is_completed());
        assert_eq!(
            task.actual_start_time(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
        );
        assert!(task.completion_time().is_some());
        assert_eq!(task.log_messages().len(), 2);
        let rendered = task.create_task_entry();
        assert_eq!(rendered.attrs[ATTR_TASK_STATE], vec!["completed_successfully"]);
        assert_eq!(rendered.attrs[ATTR_LOG_MESSAGE].len(), 2);
    }

    #[test]
    fn task_object_class_is_checked_first() {
        let e = entry(
            "ds-task-id=abc,cn=Scheduled Tasks,cn=tasks",
            &[
                ("objectClass", &["top", "ds-task-rebuild"]),
                (ATTR_TASK_CLASS, &["com.unboundid.directory.server.tasks.RebuildTask"]),
                (ATTR_TASK_STATE, &["no such state"]),
            ],
        );
        assert_eq!(
            Task::decode_entry(&e),
            Err(TaskError::MissingObjectClass {
                dn: e.dn.clone(),
                object_class: OC_TASK.to_string()
            })
        );
        assert!(matches!(
            Task::decode_entry_as::<ShutdownTask>(&e),
            Err(TaskError::MissingObjectClass { .. })
        ));
    }

    #[test]
    fn missing_class_name_is_rejected() {
        let e = entry(
            "ds-task-id=abc,cn=Scheduled Tasks,cn=tasks",
            &[("objectClass", &["top", "ds-task"])],
        );
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::MissingAttribute { attribute, .. }) if attribute == ATTR_TASK_CLASS
        ));
    }

    #[test]
    fn task_id_falls_back_to_the_dn() {
        let e = entry(
            "ds-task-id=from\\2Cdn,cn=Scheduled Tasks,cn=tasks",
            &[
                ("objectClass", &["top", "ds-task", "ds-task-shutdown"]),
                (ATTR_TASK_CLASS, &[ShutdownTask::TASK_CLASS_NAME]),
            ],
        );
        assert_eq!(Task::decode_entry(&e).unwrap().task_id(), "from,dn");
    }

    #[test]
    fn malformed_common_attributes_name_the_attribute() {
        for (attribute, value) in [
            (ATTR_ALERT_ON_START, "yes"),
            (ATTR_SCHEDULED_START_TIME, "tomorrow"),
            (ATTR_FAILED_DEPENDENCY_ACTION, "ignore"),
            (ATTR_TASK_STATE, "finished"),
        ] {
            let e = entry(
                "ds-task-id=abc,cn=Scheduled Tasks,cn=tasks",
                &[
                    ("objectClass", &["top", "ds-task", "ds-task-shutdown"]),
                    (ATTR_TASK_CLASS, &[ShutdownTask::TASK_CLASS_NAME]),
                    (attribute, &[value]),
                ],
            );
            assert!(
                matches!(
                    Task::decode_entry(&e),
                    Err(TaskError::InvalidAttributeValue { attribute: a, .. }) if a == attribute
                ),
                "{}",
                attribute
            );
        }
    }

    #[test]
    fn empty_property_map_is_rejected() {
        assert_eq!(
            Task::from_property_values::<ShutdownTask>(&PropertyMap::new()),
            Err(TaskError::EmptyPropertyMap)
        );
        assert_eq!(
            Task::from_property_values_for_class(
                AddSchemaFileTask::TASK_CLASS_NAME,
                &PropertyMap::new()
            ),
            Err(TaskError::EmptyPropertyMap)
        );
    }

    #[test]
    fn unknown_class_in_property_map_is_rejected() {
        let task = Task::new(Some("x"), ShutdownTask::default());
        assert_eq!(
            Task::from_property_values_for_class("com.example.Nope", &task.task_property_values()),
            Err(TaskError::UnknownTaskClass("com.example.Nope".to_string()))
        );
    }

    #[test]
    fn property_values_include_every_declared_property() {
        let kind = AddSchemaFileTask::new(["bar"]).unwrap();
        let task = Task::new(Some("foo"), kind);
        let values = task.task_property_values();
        for property in Task::common_task_properties()
            .iter()
            .chain(task.task_properties())
        {
            assert!(values.get(property).is_some(), "{}", property);
        }
        assert_eq!(
            values.get(&PROPERTY_TASK_ID),
            Some(&[PropertyValue::String("foo".to_string())][..])
        );
        assert_eq!(values.get(&PROPERTY_ALERT_ON_START), Some(&[][..]));
    }

    #[test]
    fn property_map_without_task_id_generates_one() {
        let mut properties = PropertyMap::new();
        properties.insert(&PROPERTY_ALERT_ON_ERROR, vec![PropertyValue::Boolean(true)]);
        let task = Task::from_property_values::<ShutdownTask>(&properties).unwrap();
        assert_eq!(task.task_id().len(), 36);
        assert_eq!(task.alert_on_error(), Some(true));
    }
}
