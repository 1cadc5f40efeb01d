//! collecting a support data archive with server state useful for diagnosis

use derive_builder::Builder;
use lazy_static::lazy_static;
use ldap3::SearchEntry;
use std::fmt::Display;
use std::str::FromStr;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{optional_value, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, TaskProperty};
use crate::task::registry::TaskType;
use crate::task::state::ParseStateError;

/// the path the archive is written to
pub const ATTR_OUTPUT_PATH: &str = "ds-task-collect-support-data-output-path";
/// the file with the passphrase used to encrypt the archive
pub const ATTR_ENCRYPTION_PASSPHRASE_FILE: &str =
    "ds-task-collect-support-data-encryption-passphrase-file";
/// include data which is expensive to collect
pub const ATTR_INCLUDE_EXPENSIVE_DATA: &str = "ds-task-collect-support-data-include-expensive-data";
/// include a replication state dump
pub const ATTR_INCLUDE_REPLICATION_STATE_DUMP: &str =
    "ds-task-collect-support-data-include-replication-state-dump";
/// include binary files
pub const ATTR_INCLUDE_BINARY_FILES: &str = "ds-task-collect-support-data-include-binary-files";
/// include the source of server extensions
pub const ATTR_INCLUDE_EXTENSION_SOURCE: &str =
    "ds-task-collect-support-data-include-extension-source";
/// collect the data one item at a time
pub const ATTR_USE_SEQUENTIAL_MODE: &str = "ds-task-collect-support-data-use-sequential-mode";
/// how much sensitive data is redacted
pub const ATTR_SECURITY_LEVEL: &str = "ds-task-collect-support-data-security-level";
/// the number of thread dumps to take
pub const ATTR_JSTACK_COUNT: &str = "ds-task-collect-support-data-jstack-count";
/// the number of monitor reports to collect
pub const ATTR_REPORT_COUNT: &str = "ds-task-collect-support-data-report-count";
/// the interval between monitor reports in seconds
pub const ATTR_REPORT_INTERVAL_SECONDS: &str =
    "ds-task-collect-support-data-report-interval-seconds";
/// how far back log data is collected
pub const ATTR_LOG_DURATION: &str = "ds-task-collect-support-data-log-duration";
/// a comment included in the archive
pub const ATTR_COMMENT: &str = "ds-task-collect-support-data-comment";

/// how much sensitive information is removed from the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityLevel {
    /// nothing is removed
    None,
    /// secrets are obscured
    ObscureSecrets,
    /// as much potentially sensitive data as possible is removed
    Maximum,
}

impl SecurityLevel {
    /// every security level
    pub const ALL: [SecurityLevel; 3] = [
        SecurityLevel::None,
        SecurityLevel::ObscureSecrets,
        SecurityLevel::Maximum,
    ];

    /// the name used in the task entry
    pub fn name(&self) -> &'static str {
        match self {
            SecurityLevel::None => "none",
            SecurityLevel::ObscureSecrets => "obscure-secrets",
            SecurityLevel::Maximum => "maximum",
        }
    }
}

impl Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SecurityLevel {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', "-");
        SecurityLevel::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ParseStateError {
                kind: "security level",
                value: s.to_string(),
            })
    }
}

/// a single-valued optional property
fn optional_property(
    attribute: &str,
    display_name: &str,
    description: &str,
    data_type: DataType,
) -> TaskProperty {
    TaskProperty::new(attribute, display_name, description, data_type, false, false)
}

lazy_static! {
    static ref PROPERTY_OUTPUT_PATH: TaskProperty = optional_property(
        ATTR_OUTPUT_PATH,
        "Output Path",
        "The path of the archive or of the directory it is written to",
        DataType::String,
    );
    static ref PROPERTY_ENCRYPTION_PASSPHRASE_FILE: TaskProperty = optional_property(
        ATTR_ENCRYPTION_PASSPHRASE_FILE,
        "Encryption Passphrase File",
        "The path of a file with the passphrase used to encrypt the archive",
        DataType::String,
    )
    .advanced();
    static ref PROPERTY_INCLUDE_EXPENSIVE_DATA: TaskProperty = optional_property(
        ATTR_INCLUDE_EXPENSIVE_DATA,
        "Include Expensive Data",
        "Whether to include data which may take a long time to collect",
        DataType::Boolean,
    );
    static ref PROPERTY_INCLUDE_REPLICATION_STATE_DUMP: TaskProperty = optional_property(
        ATTR_INCLUDE_REPLICATION_STATE_DUMP,
        "Include Replication State Dump",
        "Whether to include a dump of the replication state",
        DataType::Boolean,
    )
    .advanced();
    static ref PROPERTY_INCLUDE_BINARY_FILES: TaskProperty = optional_property(
        ATTR_INCLUDE_BINARY_FILES,
        "Include Binary Files",
        "Whether to include binary files",
        DataType::Boolean,
    )
    .advanced();
    static ref PROPERTY_INCLUDE_EXTENSION_SOURCE: TaskProperty = optional_property(
        ATTR_INCLUDE_EXTENSION_SOURCE,
        "Include Extension Source",
        "Whether to include the source code of server extensions",
        DataType::Boolean,
    )
    .advanced();
    static ref PROPERTY_USE_SEQUENTIAL_MODE: TaskProperty = optional_property(
        ATTR_USE_SEQUENTIAL_MODE,
        "Use Sequential Mode",
        "Whether to collect one item at a time to reduce the load on the server",
        DataType::Boolean,
    )
    .advanced();
    static ref PROPERTY_SECURITY_LEVEL: TaskProperty = optional_property(
        ATTR_SECURITY_LEVEL,
        "Security Level",
        "How much potentially sensitive data is removed from the archive",
        DataType::String,
    )
    .with_allowed_values(SecurityLevel::ALL.iter().map(|l| l.name()));
    static ref PROPERTY_JSTACK_COUNT: TaskProperty = optional_property(
        ATTR_JSTACK_COUNT,
        "Thread Dump Count",
        "The number of thread dumps to include",
        DataType::Integer,
    )
    .advanced();
    static ref PROPERTY_REPORT_COUNT: TaskProperty = optional_property(
        ATTR_REPORT_COUNT,
        "Report Count",
        "The number of monitor reports to collect",
        DataType::Integer,
    )
    .advanced();
    static ref PROPERTY_REPORT_INTERVAL_SECONDS: TaskProperty = optional_property(
        ATTR_REPORT_INTERVAL_SECONDS,
        "Report Interval Seconds",
        "The number of seconds between monitor reports",
        DataType::Integer,
    )
    .advanced();
    static ref PROPERTY_LOG_DURATION: TaskProperty = optional_property(
        ATTR_LOG_DURATION,
        "Log Duration",
        "How far back log messages are collected, for example 2 hours",
        DataType::String,
    );
    static ref PROPERTY_COMMENT: TaskProperty = optional_property(
        ATTR_COMMENT,
        "Comment",
        "A comment included in the archive",
        DataType::String,
    );
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_OUTPUT_PATH.clone(),
        PROPERTY_ENCRYPTION_PASSPHRASE_FILE.clone(),
        PROPERTY_INCLUDE_EXPENSIVE_DATA.clone(),
        PROPERTY_INCLUDE_REPLICATION_STATE_DUMP.clone(),
        PROPERTY_INCLUDE_BINARY_FILES.clone(),
        PROPERTY_INCLUDE_EXTENSION_SOURCE.clone(),
        PROPERTY_USE_SEQUENTIAL_MODE.clone(),
        PROPERTY_SECURITY_LEVEL.clone(),
        PROPERTY_JSTACK_COUNT.clone(),
        PROPERTY_REPORT_COUNT.clone(),
        PROPERTY_REPORT_INTERVAL_SECONDS.clone(),
        PROPERTY_LOG_DURATION.clone(),
        PROPERTY_COMMENT.clone(),
    ];
}

/// collects a support data archive, every setting is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(
    default,
    setter(into, strip_option),
    build_fn(validate = "Self::validate", error = "UsageError")
)]
pub struct CollectSupportDataTask {
    /// where the archive is written
    output_path: Option<String>,
    /// the passphrase file for encrypting the archive
    encryption_passphrase_file: Option<String>,
    /// include data which is expensive to collect
    include_expensive_data: Option<bool>,
    /// include a replication state dump
    include_replication_state_dump: Option<bool>,
    /// include binary files
    include_binary_files: Option<bool>,
    /// include the source of server extensions
    include_extension_source: Option<bool>,
    /// collect one item at a time
    use_sequential_mode: Option<bool>,
    /// how much sensitive data is removed
    security_level: Option<SecurityLevel>,
    /// the number of thread dumps
    jstack_count: Option<i64>,
    /// the number of monitor reports
    report_count: Option<i64>,
    /// seconds between monitor reports
    report_interval_seconds: Option<i64>,
    /// how far back log data is collected, a duration literal
    log_duration: Option<String>,
    /// a comment included in the archive
    comment: Option<String>,
}

impl CollectSupportDataTaskBuilder {
    /// counts must not be negative, the interval must be positive and the log
    /// duration must parse
    fn validate(&self) -> Result<(), UsageError> {
        for (argument, value) in [
            ("jstack_count", self.jstack_count),
            ("report_count", self.report_count),
        ] {
            if matches!(value, Some(Some(i)) if i < 0) {
                return Err(UsageError::invalid(argument, "must not be negative"));
            }
        }
        if matches!(self.report_interval_seconds, Some(Some(i)) if i <= 0) {
            return Err(UsageError::invalid(
                "report_interval_seconds",
                "must be greater than zero",
            ));
        }
        if let Some(Some(duration)) = &self.log_duration {
            crate::time::parse_duration(duration)
                .map_err(|e| UsageError::invalid("log_duration", e.to_string()))?;
        }
        Ok(())
    }
}

impl CollectSupportDataTask {
    /// collect an archive with the server defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// where the archive is written
    pub fn output_path(&self) -> Option<&str> {
        self.output_path.as_deref()
    }

    /// the passphrase file for encrypting the archive
    pub fn encryption_passphrase_file(&self) -> Option<&str> {
        self.encryption_passphrase_file.as_deref()
    }

    /// whether data which is expensive to collect is included
    pub fn include_expensive_data(&self) -> Option<bool> {
        self.include_expensive_data
    }

    /// whether a replication state dump is included
    pub fn include_replication_state_dump(&self) -> Option<bool> {
        self.include_replication_state_dump
    }

    /// whether binary files are included
    pub fn include_binary_files(&self) -> Option<bool> {
        self.include_binary_files
    }

    /// whether the source of server extensions is included
    pub fn include_extension_source(&self) -> Option<bool> {
        self.include_extension_source
    }

    /// whether items are collected one at a time
    pub fn use_sequential_mode(&self) -> Option<bool> {
        self.use_sequential_mode
    }

    /// how much sensitive data is removed
    pub fn security_level(&self) -> Option<SecurityLevel> {
        self.security_level
    }

    /// the number of thread dumps
    pub fn jstack_count(&self) -> Option<i64> {
        self.jstack_count
    }

    /// the number of monitor reports
    pub fn report_count(&self) -> Option<i64> {
        self.report_count
    }

    /// seconds between monitor reports
    pub fn report_interval_seconds(&self) -> Option<i64> {
        self.report_interval_seconds
    }

    /// how far back log data is collected
    pub fn log_duration(&self) -> Option<&str> {
        self.log_duration.as_deref()
    }

    /// the comment included in the archive
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

impl TaskType for CollectSupportDataTask {
    const TASK_CLASS_NAME: &'static str =
        "com.unboundid.directory.server.tasks.CollectSupportDataTask";
    const OBJECT_CLASS: &'static str = "ds-task-collect-support-data";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        let log_duration = reader.string(ATTR_LOG_DURATION);
        if log_duration.is_some() {
            reader.duration(ATTR_LOG_DURATION)?;
        }
        Ok(Self {
            output_path: reader.string(ATTR_OUTPUT_PATH),
            encryption_passphrase_file: reader.string(ATTR_ENCRYPTION_PASSPHRASE_FILE),
            include_expensive_data: reader.boolean(ATTR_INCLUDE_EXPENSIVE_DATA)?,
            include_replication_state_dump: reader.boolean(ATTR_INCLUDE_REPLICATION_STATE_DUMP)?,
            include_binary_files: reader.boolean(ATTR_INCLUDE_BINARY_FILES)?,
            include_extension_source: reader.boolean(ATTR_INCLUDE_EXTENSION_SOURCE)?,
            use_sequential_mode: reader.boolean(ATTR_USE_SEQUENTIAL_MODE)?,
            security_level: reader.parsed(ATTR_SECURITY_LEVEL)?,
            jstack_count: reader.non_negative_integer(ATTR_JSTACK_COUNT)?,
            report_count: reader.non_negative_integer(ATTR_REPORT_COUNT)?,
            report_interval_seconds: reader.positive_integer(ATTR_REPORT_INTERVAL_SECONDS)?,
            log_duration,
            comment: reader.string(ATTR_COMMENT),
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        let log_duration = reader.string(&PROPERTY_LOG_DURATION)?;
        if let Some(duration) = &log_duration {
            crate::time::parse_duration(duration)
                .map_err(|e| TaskError::invalid_property(ATTR_LOG_DURATION, e.message))?;
        }
        Ok(Self {
            output_path: reader.string(&PROPERTY_OUTPUT_PATH)?,
            encryption_passphrase_file: reader.string(&PROPERTY_ENCRYPTION_PASSPHRASE_FILE)?,
            include_expensive_data: reader.boolean(&PROPERTY_INCLUDE_EXPENSIVE_DATA)?,
            include_replication_state_dump: reader
                .boolean(&PROPERTY_INCLUDE_REPLICATION_STATE_DUMP)?,
            include_binary_files: reader.boolean(&PROPERTY_INCLUDE_BINARY_FILES)?,
            include_extension_source: reader.boolean(&PROPERTY_INCLUDE_EXTENSION_SOURCE)?,
            use_sequential_mode: reader.boolean(&PROPERTY_USE_SEQUENTIAL_MODE)?,
            security_level: reader.parsed(&PROPERTY_SECURITY_LEVEL)?,
            jstack_count: reader.non_negative_integer(&PROPERTY_JSTACK_COUNT)?,
            report_count: reader.non_negative_integer(&PROPERTY_REPORT_COUNT)?,
            report_interval_seconds: reader.positive_integer(&PROPERTY_REPORT_INTERVAL_SECONDS)?,
            log_duration,
            comment: reader.string(&PROPERTY_COMMENT)?,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_optional(ATTR_OUTPUT_PATH, self.output_path())
            .add_optional(
                ATTR_ENCRYPTION_PASSPHRASE_FILE,
                self.encryption_passphrase_file(),
            )
            .add_bool(ATTR_INCLUDE_EXPENSIVE_DATA, self.include_expensive_data)
            .add_bool(
                ATTR_INCLUDE_REPLICATION_STATE_DUMP,
                self.include_replication_state_dump,
            )
            .add_bool(ATTR_INCLUDE_BINARY_FILES, self.include_binary_files)
            .add_bool(ATTR_INCLUDE_EXTENSION_SOURCE, self.include_extension_source)
            .add_bool(ATTR_USE_SEQUENTIAL_MODE, self.use_sequential_mode)
            .add_optional(ATTR_SECURITY_LEVEL, self.security_level.map(|l| l.name()))
            .add_integer(ATTR_JSTACK_COUNT, self.jstack_count)
            .add_integer(ATTR_REPORT_COUNT, self.report_count)
            .add_integer(ATTR_REPORT_INTERVAL_SECONDS, self.report_interval_seconds)
            .add_optional(ATTR_LOG_DURATION, self.log_duration())
            .add_optional(ATTR_COMMENT, self.comment());
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(&PROPERTY_OUTPUT_PATH, optional_value(self.output_path()))
            .insert(
                &PROPERTY_ENCRYPTION_PASSPHRASE_FILE,
                optional_value(self.encryption_passphrase_file()),
            )
            .insert(
                &PROPERTY_INCLUDE_EXPENSIVE_DATA,
                optional_value(self.include_expensive_data),
            )
            .insert(
                &PROPERTY_INCLUDE_REPLICATION_STATE_DUMP,
                optional_value(self.include_replication_state_dump),
            )
            .insert(
                &PROPERTY_INCLUDE_BINARY_FILES,
                optional_value(self.include_binary_files),
            )
            .insert(
                &PROPERTY_INCLUDE_EXTENSION_SOURCE,
                optional_value(self.include_extension_source),
            )
            .insert(
                &PROPERTY_USE_SEQUENTIAL_MODE,
                optional_value(self.use_sequential_mode),
            )
            .insert(
                &PROPERTY_SECURITY_LEVEL,
                optional_value(self.security_level.map(|l| l.name())),
            )
            .insert(&PROPERTY_JSTACK_COUNT, optional_value(self.jstack_count))
            .insert(&PROPERTY_REPORT_COUNT, optional_value(self.report_count))
            .insert(
                &PROPERTY_REPORT_INTERVAL_SECONDS,
                optional_value(self.report_interval_seconds),
            )
            .insert(&PROPERTY_LOG_DURATION, optional_value(self.log_duration()))
            .insert(&PROPERTY_COMMENT, optional_value(self.comment()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::{assert_round_trips, task_entry};
    use crate::task::Task;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn defaults_and_full_settings_round_trip() {
        assert_round_trips(&Task::new(Some("csd"), CollectSupportDataTask::new()));
        let kind = CollectSupportDataTaskBuilder::default()
            .output_path("/tmp/support.zip")
            .include_expensive_data(true)
            .include_replication_state_dump(false)
            .include_binary_files(false)
            .include_extension_source(true)
            .use_sequential_mode(true)
            .security_level(SecurityLevel::ObscureSecrets)
            .jstack_count(3)
            .report_count(5)
            .report_interval_seconds(2)
            .log_duration("2 hours")
            .comment("ticket 4711")
            .build()
            .unwrap();
        assert_round_trips(&Task::new(Some("csd-full"), kind));
    }

    #[rstest]
    #[case("none", SecurityLevel::None)]
    #[case("obscure-secrets", SecurityLevel::ObscureSecrets)]
    #[case("MAXIMUM", SecurityLevel::Maximum)]
    fn security_levels_parse(#[case] value: &str, #[case] expected: SecurityLevel) {
        assert_eq!(value.parse::<SecurityLevel>(), Ok(expected));
    }

    #[test]
    fn unknown_security_level_is_rejected() {
        let e = task_entry(
            CollectSupportDataTask::TASK_CLASS_NAME,
            CollectSupportDataTask::OBJECT_CLASS,
            &[(ATTR_SECURITY_LEVEL, &["paranoid"])],
        );
        assert!(matches!(
            Task::decode_entry(&e),
            Err(TaskError::InvalidAttributeValue { attribute, .. }) if attribute == ATTR_SECURITY_LEVEL
        ));
    }

    #[test]
    fn invalid_settings_are_usage_errors() {
        assert!(CollectSupportDataTaskBuilder::default()
            .jstack_count(-1)
            .build()
            .is_err());
        assert!(CollectSupportDataTaskBuilder::default()
            .report_interval_seconds(0)
            .build()
            .is_err());
        assert!(CollectSupportDataTaskBuilder::default()
            .log_duration("forever")
            .build()
            .is_err());
    }
}
