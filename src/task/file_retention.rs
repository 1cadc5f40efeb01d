//! deleting old files matching a pattern, typically rotated logs or backups

use derive_builder::Builder;
use lazy_static::lazy_static;
use ldap3::SearchEntry;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::entry::EntryWriter;
use crate::error::{TaskError, UsageError};
use crate::task::codec::{optional_value, EntryReader, PropertyReader};
use crate::task::property::{DataType, PropertyMap, PropertyValue, TaskProperty};
use crate::task::registry::TaskType;
use crate::task::state::ParseStateError;
use crate::time::format_duration;

/// the directory containing the files
pub const ATTR_TARGET_DIRECTORY: &str = "ds-task-file-retention-target-directory";
/// the pattern matching the file names
pub const ATTR_FILENAME_PATTERN: &str = "ds-task-file-retention-filename-pattern";
/// the format of the timestamp in the file names
pub const ATTR_TIMESTAMP_FORMAT: &str = "ds-task-file-retention-timestamp-format";
/// the number of files to keep
pub const ATTR_RETAIN_FILE_COUNT: &str = "ds-task-file-retention-retain-file-count";
/// the minimum age of files to delete
pub const ATTR_RETAIN_FILE_AGE: &str = "ds-task-file-retention-retain-file-age";
/// the total size of files to keep in bytes
pub const ATTR_RETAIN_AGGREGATE_FILE_SIZE: &str =
    "ds-task-file-retention-retain-aggregate-file-size";

/// the placeholder the filename pattern must contain
pub const TIMESTAMP_PLACEHOLDER: &str = "${timestamp}";

/// how the timestamp in the managed file names is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileTimestampFormat {
    /// generalized time in UTC with milliseconds
    GeneralizedTimeUtcWithMilliseconds,
    /// generalized time in UTC with seconds
    GeneralizedTimeUtcWithSeconds,
    /// generalized time in UTC with minutes
    GeneralizedTimeUtcWithMinutes,
    /// local time with milliseconds
    LocalTimeWithMilliseconds,
    /// local time with seconds
    LocalTimeWithSeconds,
    /// local time with minutes
    LocalTimeWithMinutes,
}

impl FileTimestampFormat {
    /// every timestamp format
    pub const ALL: [FileTimestampFormat; 6] = [
        FileTimestampFormat::GeneralizedTimeUtcWithMilliseconds,
        FileTimestampFormat::GeneralizedTimeUtcWithSeconds,
        FileTimestampFormat::GeneralizedTimeUtcWithMinutes,
        FileTimestampFormat::LocalTimeWithMilliseconds,
        FileTimestampFormat::LocalTimeWithSeconds,
        FileTimestampFormat::LocalTimeWithMinutes,
    ];

    /// the name used in the task entry
    pub fn name(&self) -> &'static str {
        match self {
            FileTimestampFormat::GeneralizedTimeUtcWithMilliseconds => {
                "generalized-time-utc-with-milliseconds"
            }
            FileTimestampFormat::GeneralizedTimeUtcWithSeconds => {
                "generalized-time-utc-with-seconds"
            }
            FileTimestampFormat::GeneralizedTimeUtcWithMinutes => {
                "generalized-time-utc-with-minutes"
            }
            FileTimestampFormat::LocalTimeWithMilliseconds => "local-time-with-milliseconds",
            FileTimestampFormat::LocalTimeWithSeconds => "local-time-with-seconds",
            FileTimestampFormat::LocalTimeWithMinutes => "local-time-with-minutes",
        }
    }
}

impl Display for FileTimestampFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FileTimestampFormat {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', "-");
        FileTimestampFormat::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ParseStateError {
                kind: "file timestamp format",
                value: s.to_string(),
            })
    }
}

lazy_static! {
    static ref PROPERTY_TARGET_DIRECTORY: TaskProperty = TaskProperty::new(
        ATTR_TARGET_DIRECTORY,
        "Target Directory",
        "The path to the directory containing the files to examine",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTY_FILENAME_PATTERN: TaskProperty = TaskProperty::new(
        ATTR_FILENAME_PATTERN,
        "Filename Pattern",
        "The pattern matching the names of the files to examine, must contain ${timestamp}",
        DataType::String,
        true,
        false,
    );
    static ref PROPERTY_TIMESTAMP_FORMAT: TaskProperty = TaskProperty::new(
        ATTR_TIMESTAMP_FORMAT,
        "Timestamp Format",
        "The format of the timestamp in the file names",
        DataType::String,
        true,
        false,
    )
    .with_allowed_values(FileTimestampFormat::ALL.iter().map(|f| f.name()));
    static ref PROPERTY_RETAIN_FILE_COUNT: TaskProperty = TaskProperty::new(
        ATTR_RETAIN_FILE_COUNT,
        "Retain File Count",
        "The number of the newest matching files to keep",
        DataType::Integer,
        false,
        false,
    );
    static ref PROPERTY_RETAIN_FILE_AGE: TaskProperty = TaskProperty::new(
        ATTR_RETAIN_FILE_AGE,
        "Retain File Age Millis",
        "Matching files younger than this number of milliseconds are kept",
        DataType::Integer,
        false,
        false,
    );
    static ref PROPERTY_RETAIN_AGGREGATE_FILE_SIZE: TaskProperty = TaskProperty::new(
        ATTR_RETAIN_AGGREGATE_FILE_SIZE,
        "Retain Aggregate File Size Bytes",
        "The newest matching files are kept up to this total size in bytes",
        DataType::Integer,
        false,
        false,
    );
    static ref PROPERTIES: Vec<TaskProperty> = vec![
        PROPERTY_TARGET_DIRECTORY.clone(),
        PROPERTY_FILENAME_PATTERN.clone(),
        PROPERTY_TIMESTAMP_FORMAT.clone(),
        PROPERTY_RETAIN_FILE_COUNT.clone(),
        PROPERTY_RETAIN_FILE_AGE.clone(),
        PROPERTY_RETAIN_AGGREGATE_FILE_SIZE.clone(),
    ];
}

/// milliseconds of a duration as stored in the property map
fn duration_millis(duration: &Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// deletes matching files which fall outside all of the given retention
/// criteria
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::validate", error = "UsageError"))]
pub struct FileRetentionTask {
    /// the directory containing the files
    #[builder(setter(into))]
    target_directory: String,
    /// the pattern matching the file names
    #[builder(setter(into))]
    filename_pattern: String,
    /// the format of the timestamp in the file names
    timestamp_format: FileTimestampFormat,
    /// the number of files to keep
    #[builder(default, setter(strip_option))]
    retain_file_count: Option<i64>,
    /// files younger than this are kept
    #[builder(default, setter(strip_option))]
    retain_file_age: Option<Duration>,
    /// files are kept up to this total size in bytes
    #[builder(default, setter(strip_option))]
    retain_aggregate_file_size: Option<i64>,
}

/// the checks shared by the builder and the decoders, reported as
/// `(argument, attribute, reason)` so builder errors name the argument and
/// decode errors name the attribute
fn check_retention(
    filename_pattern: &str,
    retain_file_count: Option<i64>,
    retain_file_age: Option<Duration>,
    retain_aggregate_file_size: Option<i64>,
) -> Result<(), (&'static str, &'static str, &'static str)> {
    if !filename_pattern.contains(TIMESTAMP_PLACEHOLDER) {
        return Err((
            "filename_pattern",
            ATTR_FILENAME_PATTERN,
            "must contain ${timestamp}",
        ));
    }
    if retain_file_count.is_none() && retain_file_age.is_none() && retain_aggregate_file_size.is_none()
    {
        return Err((
            "retain_file_count",
            ATTR_RETAIN_FILE_COUNT,
            "at least one of the file count, file age or aggregate file size must be given",
        ));
    }
    if matches!(retain_file_count, Some(c) if c < 0) {
        return Err((
            "retain_file_count",
            ATTR_RETAIN_FILE_COUNT,
            "must not be negative",
        ));
    }
    if matches!(retain_file_age, Some(age) if age.subsec_nanos() % 1_000_000 != 0) {
        return Err((
            "retain_file_age",
            ATTR_RETAIN_FILE_AGE,
            "must be a whole number of milliseconds",
        ));
    }
    if matches!(retain_aggregate_file_size, Some(s) if s <= 0) {
        return Err((
            "retain_aggregate_file_size",
            ATTR_RETAIN_AGGREGATE_FILE_SIZE,
            "must be greater than zero",
        ));
    }
    Ok(())
}

impl FileRetentionTaskBuilder {
    /// the retention criteria must be usable
    fn validate(&self) -> Result<(), UsageError> {
        if let Some(directory) = &self.target_directory {
            UsageError::check_non_empty("target_directory", directory)?;
        }
        if let Some(pattern) = &self.filename_pattern {
            check_retention(
                pattern,
                self.retain_file_count.flatten(),
                self.retain_file_age.flatten(),
                self.retain_aggregate_file_size.flatten(),
            )
            .map_err(|(argument, _, reason)| UsageError::invalid(argument, reason))?;
        }
        Ok(())
    }
}

impl FileRetentionTask {
    /// the directory containing the files
    pub fn target_directory(&self) -> &str {
        &self.target_directory
    }

    /// the pattern matching the file names
    pub fn filename_pattern(&self) -> &str {
        &self.filename_pattern
    }

    /// the format of the timestamp in the file names
    pub fn timestamp_format(&self) -> FileTimestampFormat {
        self.timestamp_format
    }

    /// the number of files to keep
    pub fn retain_file_count(&self) -> Option<i64> {
        self.retain_file_count
    }

    /// files younger than this are kept
    pub fn retain_file_age(&self) -> Option<Duration> {
        self.retain_file_age
    }

    /// files are kept up to this total size in bytes
    pub fn retain_aggregate_file_size(&self) -> Option<i64> {
        self.retain_aggregate_file_size
    }
}

impl TaskType for FileRetentionTask {
    const TASK_CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.FileRetentionTask";
    const OBJECT_CLASS: &'static str = "ds-task-file-retention";

    fn task_properties() -> &'static [TaskProperty] {
        &PROPERTIES
    }

    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError> {
        let reader = EntryReader::new(entry);
        let target_directory = reader.required_string(ATTR_TARGET_DIRECTORY)?;
        let filename_pattern = reader.required_string(ATTR_FILENAME_PATTERN)?;
        let timestamp_format = reader
            .parsed(ATTR_TIMESTAMP_FORMAT)?
            .ok_or_else(|| reader.missing(ATTR_TIMESTAMP_FORMAT))?;
        let retain_file_count = reader.non_negative_integer(ATTR_RETAIN_FILE_COUNT)?;
        let retain_file_age = reader.duration(ATTR_RETAIN_FILE_AGE)?;
        let retain_aggregate_file_size = reader.positive_integer(ATTR_RETAIN_AGGREGATE_FILE_SIZE)?;
        check_retention(
            &filename_pattern,
            retain_file_count,
            retain_file_age,
            retain_aggregate_file_size,
        )
        .map_err(|(_, _, reason)| TaskError::InvalidTask {
            task_id: reader.dn().to_string(),
            reason: reason.to_string(),
        })?;
        Ok(Self {
            target_directory,
            filename_pattern,
            timestamp_format,
            retain_file_count,
            retain_file_age,
            retain_aggregate_file_size,
        })
    }

    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError> {
        let reader = PropertyReader::new(properties);
        let target_directory = reader.required_string(&PROPERTY_TARGET_DIRECTORY)?;
        let filename_pattern = reader.required_string(&PROPERTY_FILENAME_PATTERN)?;
        let timestamp_format = reader
            .parsed(&PROPERTY_TIMESTAMP_FORMAT)?
            .ok_or_else(|| TaskError::MissingProperty(ATTR_TIMESTAMP_FORMAT.to_string()))?;
        let retain_file_count = reader.non_negative_integer(&PROPERTY_RETAIN_FILE_COUNT)?;
        let retain_file_age = reader
            .non_negative_integer(&PROPERTY_RETAIN_FILE_AGE)?
            .map(|millis| Duration::from_millis(millis.unsigned_abs()));
        let retain_aggregate_file_size =
            reader.positive_integer(&PROPERTY_RETAIN_AGGREGATE_FILE_SIZE)?;
        check_retention(
            &filename_pattern,
            retain_file_count,
            retain_file_age,
            retain_aggregate_file_size,
        )
        .map_err(|(_, attribute, reason)| TaskError::invalid_property(attribute, reason))?;
        Ok(Self {
            target_directory,
            filename_pattern,
            timestamp_format,
            retain_file_count,
            retain_file_age,
            retain_aggregate_file_size,
        })
    }

    fn encode_attributes(&self, writer: &mut EntryWriter) {
        writer
            .add_values(ATTR_TARGET_DIRECTORY, [self.target_directory.as_str()])
            .add_values(ATTR_FILENAME_PATTERN, [self.filename_pattern.as_str()])
            .add_values(ATTR_TIMESTAMP_FORMAT, [self.timestamp_format.name()])
            .add_integer(ATTR_RETAIN_FILE_COUNT, self.retain_file_count)
            .add_values(ATTR_RETAIN_FILE_AGE, self.retain_file_age.map(|d| format_duration(&d)))
            .add_integer(
                ATTR_RETAIN_AGGREGATE_FILE_SIZE,
                self.retain_aggregate_file_size,
            );
    }

    fn encode_properties(&self, properties: &mut PropertyMap) {
        properties
            .insert(
                &PROPERTY_TARGET_DIRECTORY,
                vec![PropertyValue::String(self.target_directory.clone())],
            )
            .insert(
                &PROPERTY_FILENAME_PATTERN,
                vec![PropertyValue::String(self.filename_pattern.clone())],
            )
            .insert(
                &PROPERTY_TIMESTAMP_FORMAT,
                vec![PropertyValue::from(self.timestamp_format.name())],
            )
            .insert(
                &PROPERTY_RETAIN_FILE_COUNT,
                optional_value(self.retain_file_count),
            )
            .insert(
                &PROPERTY_RETAIN_FILE_AGE,
                optional_value(self.retain_file_age.as_ref().map(duration_millis)),
            )
            .insert(
                &PROPERTY_RETAIN_AGGREGATE_FILE_SIZE,
                optional_value(self.retain_aggregate_file_size),
            );
    }
}
