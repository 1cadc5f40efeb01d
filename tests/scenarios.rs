use std::collections::HashMap;

use ldap3::SearchEntry;
use pretty_assertions::assert_eq;
use rstest::rstest;

use ldap_tasks::controls::json::JsonControl;
use ldap_tasks::controls::operation_purpose::OperationPurposeRequest;
use ldap_tasks::controls::KnownControl;
use ldap_tasks::task::add_schema_file::AddSchemaFileTask;
use ldap_tasks::task::backup::{BackupTask, ATTR_COMPRESS};
use ldap_tasks::task::file_retention::FileRetentionTask;
use ldap_tasks::task::property::PropertyMap;
use ldap_tasks::task::rebuild::RebuildTask;
use ldap_tasks::task::registry::{TaskKind, TaskType};
use ldap_tasks::task::{ATTR_TASK_CLASS, ATTR_TASK_ID, OC_TASK, SCHEDULED_TASKS_BASE_DN};
use ldap_tasks::{Task, TaskError, UsageError};

fn entry(object_classes: &[&str], attrs: &[(&str, &str)]) -> SearchEntry {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    map.insert(
        "objectClass".to_string(),
        object_classes.iter().map(|s| s.to_string()).collect(),
    );
    map.insert(ATTR_TASK_ID.to_string(), vec!["foo".to_string()]);
    for (name, value) in attrs {
        map.entry(name.to_string())
            .or_default()
            .push(value.to_string());
    }
    SearchEntry {
        dn: format!("{}=foo,{}", ATTR_TASK_ID, SCHEDULED_TASKS_BASE_DN),
        attrs: map,
        bin_attrs: HashMap::new(),
    }
}

fn retention_entry(criteria: &[(&str, &str)]) -> SearchEntry {
    let mut attrs = vec![
        (ATTR_TASK_CLASS, FileRetentionTask::TASK_CLASS_NAME),
        (
            "ds-task-file-retention-target-directory",
            "/ds/logs",
        ),
        (
            "ds-task-file-retention-filename-pattern",
            "access.${timestamp}",
        ),
        (
            "ds-task-file-retention-timestamp-format",
            "generalized-time-utc-with-seconds",
        ),
    ];
    attrs.extend_from_slice(criteria);
    entry(&["top", OC_TASK, FileRetentionTask::OBJECT_CLASS], &attrs)
}

#[test]
fn add_schema_file_task() {
    let task = Task::new(Some("foo"), AddSchemaFileTask::new(["bar"]).unwrap());
    let TaskKind::AddSchemaFile(kind) = task.kind() else {
        panic!("wrong task kind {:?}", task.kind());
    };
    assert_eq!(kind.schema_file_names(), ["bar".to_string()]);
    assert_eq!(
        task.task_class_name(),
        "com.unboundid.directory.server.tasks.AddSchemaFileTask"
    );
    assert_eq!(task.additional_object_classes(), vec!["ds-task-add-schema-file"]);
}

#[test]
fn backup_without_backend_backs_up_everything() {
    let backup = BackupTask::new("bak", None).unwrap();
    assert!(backup.backup_all());
    assert!(backup.backend_ids().is_empty());
    let task = Task::new(Some("foo"), backup);
    let decoded = Task::decode_entry(&task.create_task_entry()).unwrap();
    assert_eq!(decoded, task);
}

#[test]
fn rebuild_needs_an_index() {
    let rebuild = RebuildTask::new("dc=example,dc=com", ["uid", "cn"]).unwrap();
    assert_eq!(rebuild.index_names(), ["uid".to_string(), "cn".to_string()]);
    assert!(matches!(
        RebuildTask::new("dc=example,dc=com", Vec::<String>::new()),
        Err(UsageError::MissingArgument(_) | UsageError::InvalidArgument { .. })
    ));
}

#[test]
fn file_retention_without_criterion_is_a_decode_error() {
    assert!(matches!(
        Task::decode_entry(&retention_entry(&[])),
        Err(TaskError::InvalidTask { .. })
    ));
}

#[rstest]
#[case::count(("ds-task-file-retention-retain-file-count", "10"))]
#[case::age(("ds-task-file-retention-retain-file-age", "7 days"))]
#[case::size(("ds-task-file-retention-retain-aggregate-file-size", "1048576"))]
fn file_retention_with_one_criterion(#[case] criterion: (&str, &str)) {
    let task = Task::decode_entry(&retention_entry(&[criterion])).unwrap();
    let TaskKind::FileRetention(retention) = task.kind() else {
        panic!("wrong task kind {:?}", task.kind());
    };
    let set = [
        retention.retain_file_count().is_some(),
        retention.retain_file_age().is_some(),
        retention.retain_aggregate_file_size().is_some(),
    ];
    assert_eq!(set.iter().filter(|s| **s).count(), 1);
}

#[test]
fn missing_task_object_class_is_checked_first() {
    let e = entry(
        &["top", BackupTask::OBJECT_CLASS],
        &[
            (ATTR_TASK_CLASS, BackupTask::TASK_CLASS_NAME),
            (ATTR_COMPRESS, "maybe"),
        ],
    );
    assert!(matches!(
        Task::decode_entry(&e),
        Err(TaskError::MissingObjectClass { .. })
    ));
}

#[test]
fn boolean_literals_are_strict() {
    let e = entry(
        &["top", OC_TASK, BackupTask::OBJECT_CLASS],
        &[
            (ATTR_TASK_CLASS, BackupTask::TASK_CLASS_NAME),
            ("ds-backup-directory-path", "bak"),
            ("ds-task-backup-all", "true"),
            (ATTR_COMPRESS, "yes"),
        ],
    );
    assert!(matches!(
        Task::decode_entry(&e),
        Err(TaskError::InvalidAttributeValue { .. })
    ));
}

#[test]
fn empty_property_map_is_a_decode_error() {
    assert!(matches!(
        Task::from_property_values::<BackupTask>(&PropertyMap::new()),
        Err(TaskError::EmptyPropertyMap)
    ));
}

#[test]
fn hotp_reference_value() {
    assert_eq!(
        ldap_tasks::otp::hotp(b"12345678901234567890", 0).unwrap(),
        "755224"
    );
}

#[test]
fn control_survives_raw_and_json_forms() {
    let control = OperationPurposeRequest::new(Some("ldap-tasks"), None, None, Some("tests"))
        .unwrap();
    let known = KnownControl::from(control.clone());
    let raw = known.to_raw().unwrap();
    let KnownControl::OperationPurpose(decoded) = KnownControl::decode(&raw).unwrap() else {
        panic!("control was not recognized");
    };
    assert_eq!(decoded, control);

    let json = JsonControl::from_value(&known.to_json().unwrap().to_value().unwrap()).unwrap();
    let KnownControl::OperationPurpose(decoded) = KnownControl::from_json(&json, true).unwrap()
    else {
        panic!("control was not recognized");
    };
    assert_eq!(decoded, control);
}
