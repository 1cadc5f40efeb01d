//! helpers shared by the tests of the task types

use ldap3::SearchEntry;
use pretty_assertions::assert_eq;
use std::collections::HashMap;

use crate::task::codec::assert_property_types;
use crate::task::registry::find_by_class_name;
use crate::task::{Task, ATTR_TASK_CLASS, ATTR_TASK_ID, OC_TASK, SCHEDULED_TASKS_BASE_DN};

/// install a subscriber writing to the test output, safe to call repeatedly
pub(crate) fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// an entry with the given DN and attributes
pub(crate) fn entry(dn: &str, attrs: &[(&str, &[&str])]) -> SearchEntry {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (name, values) in attrs {
        map.entry(name.to_string())
            .or_default()
            .extend(values.iter().map(|v| v.to_string()));
    }
    SearchEntry {
        dn: dn.to_string(),
        attrs: map,
        bin_attrs: HashMap::new(),
    }
}

/// a task entry with ID `test`, the common object classes and class name and
/// the given task specific attributes
pub(crate) fn task_entry(
    class_name: &str,
    object_class: &str,
    attrs: &[(&str, &[&str])],
) -> SearchEntry {
    let mut e = entry(
        &format!("{}=test,{}", ATTR_TASK_ID, SCHEDULED_TASKS_BASE_DN),
        attrs,
    );
    e.attrs.insert(
        "objectClass".to_string(),
        vec!["top".to_string(), OC_TASK.to_string(), object_class.to_string()],
    );
    e.attrs
        .insert(ATTR_TASK_ID.to_string(), vec!["test".to_string()]);
    e.attrs
        .insert(ATTR_TASK_CLASS.to_string(), vec![class_name.to_string()]);
    e
}

/// check that a task survives the entry and the property map round trips
pub(crate) fn assert_round_trips(task: &Task) {
    init_test_logging();
    let entry = task.create_task_entry();
    let decoded = Task::decode_entry(&entry).unwrap();
    assert_eq!(&decoded, task);
    if find_by_class_name(task.task_class_name()).is_none() {
        return;
    }
    let properties = task.task_property_values();
    assert_property_types(&properties);
    let rebuilt =
        Task::from_property_values_for_class(task.task_class_name(), &properties).unwrap();
    assert_eq!(&rebuilt, task);
}
