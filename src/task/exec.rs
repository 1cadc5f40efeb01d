//! running a command on the server system

use derive_builder::Builder;
use lazy_static::lazy_static;
use ldap3::SearchEntry;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{optional_value, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use crate::task::registry::TaskType;
use crate::task::state::TaskState;

/// the absolute path of the command to run
pub const ATTR_COMMAND_PATH: &str = "ds-task-exec-command-path";
/// the arguments passed to the command
pub const ATTR_COMMAND_ARGUMENTS: &str = "ds-task-exec-command-arguments";
/// the file the output of the command is written to
pub const ATTR_COMMAND_OUTPUT_FILE: &str = "ds-task-exec-command-output-file";
/// copy the command output into the task log
pub const ATTR_LOG_COMMAND_OUTPUT: &str = "ds-task-exec-log-command-output";
/// the state the task ends in if the command exits with a non-zero exit code
pub const ATTR_TASK_STATE_FOR_NONZERO_EXIT_CODE: &str =
    "ds-task-exec-task-completion-state-for-nonzero-exit-code";
/// the working directory of the command
pub const ATTR_WORKING_DIRECTORY: &str = "ds-task-exec-working-directory";

/// the task states allowed for a non-zero exit code
pub const NONZERO_EXIT_CODE_STATES: [TaskState; 3] = [
    TaskState::StoppedByError,
    TaskState::CompletedWithErrors,
    TaskState::CompletedSuccessfully,
];

lazy_static! {
    static ref PROPERTY_COMMAND_PATH: TaskProperty = TaskProperty::new(
        ATTR_COMMAND_PATH,
        "Command Path",
        "The absolute path of the command to run, the command must be allowed by the server configuration",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTY_COMMAND_ARGUMENTS: TaskProperty = TaskProperty::new(
        ATTR_COMMAND_ARGUMENTS,
        "Command Arguments",
        "The arguments passed to the command as a single string",
        DataType::String,
        false,
        false,
    );
    static ref PROPERTY_COMMAND_OUTPUT_FILE: TaskProperty = TaskProperty::new(
        ATTR_COMMAND_OUTPUT_FILE,
        "Command Output File",
        "The path of a file the output of the command is written to",
        DataType::String,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_LOG_COMMAND_OUTPUT: TaskProperty = TaskProperty::new(
        ATTR_LOG_COMMAND_OUTPUT,
        "Log Command Output",
        "Whether to copy the output of the command into the task log",
        DataType::Boolean,
        false,
        false,
    )
    .advanced();
    static ref PROPERTY_TASK_STATE_FOR_NONZERO_EXIT_CODE: TaskProperty = TaskProperty::new(
        ATTR_TASK_STATE_FOR_NONZERO_EXIT_CODE,
        "Task State for Non-Zero Exit Code",
        "The state the task ends in if the command exits with a non-zero exit code",
        DataType::String,
        false,
        false,
    )
    .advanced()
    .with_allowed_values(NONZERO_EXIT_CODE_STATES.iter().map(|s| s.name()));
    static ref PROPERTY_WORKING_DIRECTORY: TaskProperty = TaskProperty::new(
        ATTR_WORKING_DIRECTORY,
        "Working Directory",
        "The working directory of the command",
        DataType::String,
        false,
        false,
    )
    .advanced();
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_COMMAND_PATH.clone(),
        PROPERTY_COMMAND_ARGUMENTS.clone(),
        PROPERTY_COMMAND_OUTPUT_FILE.clone(),
        PROPERTY_LOG_COMMAND_OUTPUT.clone(),
        PROPERTY_TASK_STATE_FOR_NONZERO_EXIT_CODE.clone(),
        PROPERTY_WORKING_DIRECTORY.clone(),
    ];
}

/// is this one of [NONZERO_EXIT_CODE_STATES]
fn is_nonzero_exit_code_state(state: TaskState) -> bool {
    NONZERO_EXIT_CODE_STATES.contains(&state)
}

/// runs a command on the server system
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::validate", error = "UsageError"))]
pub struct ExecTask {
    /// the absolute path of the command
    #[builder(setter(into))]
    command_path: String,
    /// the arguments passed to the command
    #[builder(default, setter(into, strip_option))]
    command_arguments: Option<String>,
    /// the file the output is written to
    #[builder(default, setter(into, strip_option))]
    command_output_file: Option<String>,
    /// copy the output into the task log
    #[builder(default, setter(strip_option))]
    log_command_output: Option<bool>,
    /// the state for a non-zero exit code
    #[builder(default, setter(strip_option))]
    task_state_for_nonzero_exit_code: Option<TaskState>,
    /// the working directory of the command
    #[builder(default, setter(into, strip_option))]
    working_directory: Option<String>,
}

impl ExecTaskBuilder {
    /// the command path must be set and the exit code state terminal
    fn validate(&self) -> Result<(), UsageError> {
        if let Some(path) = &self.command_path {
            UsageError::check_non_empty("command_path", path)?;
        }
        if let Some(Some(state)) = self.task_state_for_nonzero_exit_code {
            if !is_nonzero_exit_code_state(state) {
                return Err(UsageError::invalid(
                    "task_state_for_nonzero_exit_code",
                    format!(
                        "{} is not one of {}",
                        state,
                        itertools::join(NONZERO_EXIT_CODE_STATES.iter(), ", ")
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl ExecTask {
    /// run a command with optional arguments
    pub fn new(command_path: &str, command_arguments: Option<&str>) -> Result<Self, UsageError> {
        let mut builder = ExecTaskBuilder::default();
        builder.command_path(command_path);
        if let Some(arguments) = command_arguments {
            builder.command_arguments(arguments);
        }
        builder.build()
    }

    /// the absolute path of the command
    pub fn command_path(&self) -> &str {
        &self.command_path
    }

    /// the arguments passed to the command
    pub fn command_arguments(&self) -> Option<&str> {
        self.command_arguments.as_deref()
    }

    /// the file the output is written to
    pub fn command_output_file(&self) -> Option<&str> {
        self.command_output_file.as_deref()
    }

    /// whether the output is copied into the task log
    pub fn log_command_output(&self) -> Option<bool> {
        self.log_command_output
    }

    /// the state the task ends in for a non-zero exit code
    pub fn task_state_for_nonzero_exit_code(&self) -> Option<TaskState> {
        self.task_state_for_nonzero_exit_code
    }

    /// the working directory of the command
    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }
}

impl TaskType for ExecTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.ExecTask";
    const OBJECT_CLASS: &'static str = "ds-task-exec";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        let task_state_for_nonzero_exit_code: Option<TaskState> =
            reader.parsed(ATTR_TASK_STATE_FOR_NONZERO_EXIT_CODE)?;
        if let Some(state) = task_state_for_nonzero_exit_code {
            if !is_nonzero_exit_code_state(state) {
                return Err(TaskError::invalid_value(
                    ATTR_TASK_STATE_FOR_NONZERO_EXIT_CODE,
                    state.name(),
                    "only stopped_by_error, completed_with_errors and completed_successfully are allowed",
                ));
            }
        }
        Ok(Self {
            command_path: reader.required_string(ATTR_COMMAND_PATH)?,
            command_arguments: reader.string(ATTR_COMMAND_ARGUMENTS),
            command_output_file: reader.string(ATTR_COMMAND_OUTPUT_FILE),
            log_command_output: reader.boolean(ATTR_LOG_COMMAND_OUTPUT)?,
            task_state_for_nonzero_exit_code,
            working_directory: reader.string(ATTR_WORKING_DIRECTORY),
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        Ok(Self {
            command_path: reader.required_string(&PROPERTY_COMMAND_PATH)?,
            command_arguments: reader.string(&PROPERTY_COMMAND_ARGUMENTS)?,
            command_output_file: reader.string(&PROPERTY_COMMAND_OUTPUT_FILE)?,
            log_command_output: reader.boolean(&PROPERTY_LOG_COMMAND_OUTPUT)?,
            task_state_for_nonzero_exit_code: reader
                .parsed(&PROPERTY_TASK_STATE_FOR_NONZERO_EXIT_CODE)?,
            working_directory: reader.string(&PROPERTY_WORKING_DIRECTORY)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_values(ATTR_COMMAND_PATH, [self.command_path.as_str()])
            .add_optional(ATTR_COMMAND_ARGUMENTS, self.command_arguments())
            .add_optional(ATTR_COMMAND_OUTPUT_FILE, self.command_output_file())
            .add_bool(ATTR_LOG_COMMAND_OUTPUT, self.log_command_output)
            .add_optional(
                ATTR_TASK_STATE_FOR_NONZERO_EXIT_CODE,
                self.task_state_for_nonzero_exit_code.map(|s| s.name()),
            )
            .add_optional(ATTR_WORKING_DIRECTORY, self.working_directory());
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(
                &PROPERTY_COMMAND_PATH,
                vec![PropertyValue::String(self.command_path.clone())],
            )
            .insert(
                &PROPERTY_COMMAND_ARGUMENTS,
                optional_value(self.command_arguments()),
            )
            .insert(
                &PROPERTY_COMMAND_OUTPUT_FILE,
                optional_value(self.command_output_file()),
            )
            .insert(
                &PROPERTY_LOG_COMMAND_OUTPUT,
                optional_value(self.log_command_output),
            )
            .insert(
                &PROPERTY_TASK_STATE_FOR_NONZERO_EXIT_CODE,
                optional_value(self.task_state_for_nonzero_exit_code.map(|s| s.name())),
            )
            .insert(
                &PROPERTY_WORKING_DIRECTORY,
                optional_value(self.working_directory()),
            );
    }
}
