//! default scheduling and notification settings loaded from a TOML file
//!
//! ```toml
//! failed-dependency-action = "cancel"
//! start-delay = "5 minutes"
//! notify-on-error = [ "ldap-admins@example.com" ]
//! alert-on-error = true
//! ```

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::task::state::FailedDependencyAction;
use crate::task::TaskOptionsBuilder;
use crate::time::{parse_duration, DurationParseError};

/// error which can happen while reading task defaults from a file
#[derive(Debug, Error)]
pub enum TomlConfigError {
    /// an I/O error
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),
    /// an error deserializing the TOML file
    #[error("Toml deserialization error: {0}")]
    TomlError(#[from] toml::de::Error),
    /// the start delay is not a valid duration
    #[error("invalid start delay: {0}")]
    StartDelay(#[from] DurationParseError),
    /// the start delay is too large to add to the current time
    #[error("start delay {0} is out of range")]
    StartDelayOutOfRange(String),
    /// a notification address does not look like an email address
    #[error("invalid notification address {0:?}")]
    InvalidAddress(String),
    /// an error when compiling or using a regular expression
    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),
}

/// settings applied to every new task unless the caller overrides them
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TaskDefaults {
    /// what to do if a dependency fails
    #[serde(default)]
    pub failed_dependency_action: Option<FailedDependencyAction>,
    /// how long after creation tasks are scheduled to start, a duration
    /// literal like `5 minutes`
    #[serde(default)]
    pub start_delay: Option<String>,
    /// addresses to notify when a task starts
    #[serde(default)]
    pub notify_on_start: Vec<String>,
    /// addresses to notify when a task completes
    #[serde(default)]
    pub notify_on_completion: Vec<String>,
    /// addresses to notify when a task completes successfully
    #[serde(default)]
    pub notify_on_success: Vec<String>,
    /// addresses to notify when a task fails
    #[serde(default)]
    pub notify_on_error: Vec<String>,
    /// raise an alert when a task starts
    #[serde(default)]
    pub alert_on_start: Option<bool>,
    /// raise an alert when a task completes successfully
    #[serde(default)]
    pub alert_on_success: Option<bool>,
    /// raise an alert when a task fails
    #[serde(default)]
    pub alert_on_error: Option<bool>,
}

impl TaskDefaults {
    /// parse the defaults from TOML text and check them
    pub fn from_toml_str(config: &str) -> Result<Self, TomlConfigError> {
        let result: TaskDefaults = toml::from_str(config)?;
        result.validate()?;
        Ok(result)
    }

    /// check the start delay parses and the addresses look like addresses
    fn validate(&self) -> Result<(), TomlConfigError> {
        if let Some(delay) = &self.start_delay {
            parse_duration(delay)?;
        }
        let address = Regex::new(r"^[^@\s]+@[^@\s]+$")?;
        for a in self
            .notify_on_start
            .iter()
            .chain(&self.notify_on_completion)
            .chain(&self.notify_on_success)
            .chain(&self.notify_on_error)
        {
            if !address.is_match(a) {
                return Err(TomlConfigError::InvalidAddress(a.to_string()));
            }
        }
        Ok(())
    }

    /// set the default values on a builder, call this before setting the task
    /// specific values so those take precedence
    ///
    /// the scheduled start time is `now` plus the start delay
    pub fn apply_to(
        &self,
        builder: &mut TaskOptionsBuilder,
        now: DateTime<Utc>,
    ) -> Result<(), TomlConfigError> {
        if let Some(delay) = &self.start_delay {
            let duration = parse_duration(delay)?;
            let start = chrono::Duration::from_std(duration)
                .ok()
                .and_then(|d| now.checked_add_signed(d))
                .ok_or_else(|| TomlConfigError::StartDelayOutOfRange(delay.to_string()))?;
            builder.scheduled_start_time(start);
        }
        if let Some(action) = self.failed_dependency_action {
            builder.failed_dependency_action(action);
        }
        builder
            .notify_on_start(self.notify_on_start.clone())
            .notify_on_completion(self.notify_on_completion.clone())
            .notify_on_success(self.notify_on_success.clone())
            .notify_on_error(self.notify_on_error.clone());
        if let Some(alert) = self.alert_on_start {
            builder.alert_on_start(alert);
        }
        if let Some(alert) = self.alert_on_success {
            builder.alert_on_success(alert);
        }
        if let Some(alert) = self.alert_on_error {
            builder.alert_on_error(alert);
        }
        Ok(())
    }

    /// a builder with the defaults applied for a task created now
    pub fn options_builder(&self) -> Result<TaskOptionsBuilder, TomlConfigError> {
        let mut builder = TaskOptionsBuilder::default();
        self.apply_to(&mut builder, Utc::now())?;
        Ok(builder)
    }
}

/// load task defaults from a toml file
#[instrument]
pub fn toml_task_defaults(filename: std::path::PathBuf) -> Result<TaskDefaults, TomlConfigError> {
    let config = std::fs::read_to_string(filename)?;
    TaskDefaults::from_toml_str(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::shutdown::ShutdownTask;
    use crate::task::Task;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"
failed-dependency-action = "disable"
start-delay = "5 minutes"
notify-on-error = [ "ldap-admins@example.com" ]
alert-on-error = true
"#;

    #[test]
    fn defaults_apply_to_new_tasks() {
        let defaults = TaskDefaults::from_toml_str(CONFIG).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut builder = TaskOptionsBuilder::default();
        defaults.apply_to(&mut builder, now).unwrap();
        builder.notify_on_success(vec!["ops@example.com".to_string()]);
        let task = Task::with_options(Some("t"), ShutdownTask::default(), builder.build().unwrap());
        assert_eq!(
            task.scheduled_start_time(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap())
        );
        assert_eq!(
            task.failed_dependency_action(),
            Some(FailedDependencyAction::Disable)
        );
        assert_eq!(task.notify_on_error(), ["ldap-admins@example.com".to_string()]);
        assert_eq!(task.notify_on_success(), ["ops@example.com".to_string()]);
        assert_eq!(task.alert_on_error(), Some(true));
        assert_eq!(task.alert_on_start(), None);
    }

    #[test]
    fn start_time_has_whole_seconds() {
        let defaults = TaskDefaults::from_toml_str(CONFIG).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(750);
        let mut builder = TaskOptionsBuilder::default();
        defaults.apply_to(&mut builder, now).unwrap();
        let task = Task::with_options(Some("t"), ShutdownTask::default(), builder.build().unwrap());
        assert_eq!(
            task.scheduled_start_time(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap())
        );
        let decoded = Task::decode_entry(&task.create_task_entry()).unwrap();
        assert_eq!(decoded, task);
    }

    #[test]
    fn caller_values_take_precedence() {
        let defaults = TaskDefaults::from_toml_str(CONFIG).unwrap();
        let mut builder = defaults.options_builder().unwrap();
        builder.failed_dependency_action(FailedDependencyAction::Process);
        let options = builder.build().unwrap();
        let task = Task::with_options(None, ShutdownTask::default(), options);
        assert_eq!(
            task.failed_dependency_action(),
            Some(FailedDependencyAction::Process)
        );
    }

    #[test]
    fn empty_file_changes_nothing() {
        let defaults = TaskDefaults::from_toml_str("").unwrap();
        assert_eq!(defaults, TaskDefaults::default());
        let mut builder = TaskOptionsBuilder::default();
        defaults.apply_to(&mut builder, Utc::now()).unwrap();
        assert_eq!(builder.build().unwrap(), crate::task::TaskOptions::default());
    }

    #[test]
    fn invalid_files_are_rejected() {
        assert!(matches!(
            TaskDefaults::from_toml_str("start-delay = \"soon\""),
            Err(TomlConfigError::StartDelay(_))
        ));
        assert!(matches!(
            TaskDefaults::from_toml_str("notify-on-start = [ \"nobody\" ]"),
            Err(TomlConfigError::InvalidAddress(_))
        ));
        assert!(matches!(
            TaskDefaults::from_toml_str("retry-count = 3"),
            Err(TomlConfigError::TomlError(_))
        ));
        assert!(matches!(
            TaskDefaults::from_toml_str("failed-dependency-action = \"ignore\""),
            Err(TomlConfigError::TomlError(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            toml_task_defaults("/nonexistent/ldap-tasks.toml".into()),
            Err(TomlConfigError::IOError(_))
        ));
    }
}
