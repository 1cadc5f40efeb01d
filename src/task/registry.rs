//! the closed set of known task types and the dispatch table used to find
//! the most specific type for a task entry or property map

use lazy_static::lazy_static;
use ldap3::SearchEntry;
use std::collections::HashMap;
use std::fmt::Debug;

use crate::entry::EntryWriter;
use crate::error::TaskError;
use crate::task::property::{PropertyMap, TaskProperty};

use crate::task::add_schema_file::AddSchemaFileTask;
use crate::task::backup::BackupTask;
use crate::task::collect_support_data::CollectSupportDataTask;
use crate::task::disconnect_client::DisconnectClientTask;
use crate::task::exec::ExecTask;
use crate::task::export::ExportTask;
use crate::task::file_retention::FileRetentionTask;
use crate::task::generic::GenericTask;
use crate::task::groovy_scripted::GroovyScriptedTask;
use crate::task::import::ImportTask;
use crate::task::lockdown::{EnterLockdownModeTask, LeaveLockdownModeTask};
use crate::task::re_encode_entries::ReEncodeEntriesTask;
use crate::task::rebuild::RebuildTask;
use crate::task::refresh_encryption_settings::RefreshEncryptionSettingsTask;
use crate::task::reload_global_index::ReloadGlobalIndexTask;
use crate::task::remove_attribute_type::RemoveAttributeTypeTask;
use crate::task::restore::RestoreTask;
use crate::task::shutdown::ShutdownTask;

/// a task type known to this crate
///
/// implementations only describe the task specific part of a task, the
/// common attributes are handled by [Task](crate::task::Task)
pub trait TaskType: Sized + Into<TaskKind> {
    /// the fully qualified name of the server side implementation
    const TASK_CLASS_NAME: &'static str;
    /// the object class which marks an entry as this task type
    const OBJECT_CLASS: &'static str;

    /// the properties specific to this task type
    fn task_properties() -> &'static [TaskProperty];

    /// decode the task specific attributes of an entry
    fn decode_entry(entry: &SearchEntry) -> Result<Self, TaskError>;

    /// decode the task specific properties of a property map
    fn decode_properties(properties: &PropertyMap) -> Result<Self, TaskError>;

    /// add the task specific attributes to an entry being rendered
    fn encode_attributes(&self, writer: &mut EntryWriter);

    /// add the task specific property values to a property map
    fn encode_properties(&self, properties: &mut PropertyMap);
}

/// generates [TaskKind] and the dispatch table from the list of task types
macro_rules! task_kinds {
    ($($(#[$meta:meta])* $variant:ident($ty:ident)),* $(,)?) => {
        /// the task type specific part of a [Task](crate::task::Task)
        #[derive(Debug, Clone, PartialEq)]
        pub enum TaskKind {
            $($(#[$meta])* $variant($ty),)*
            /// a task of a class not known to this crate
            Generic(GenericTask),
        }

        $(
            impl From<$ty> for TaskKind {
                fn from(task: $ty) -> Self {
                    TaskKind::$variant(task)
                }
            }
        )*

        impl From<GenericTask> for TaskKind {
            fn from(task: GenericTask) -> Self {
                TaskKind::Generic(task)
            }
        }

        impl TaskKind {
            /// the fully qualified name of the server side implementation
            pub fn task_class_name(&self) -> &str {
                match self {
                    $(TaskKind::$variant(_) => $ty::TASK_CLASS_NAME,)*
                    TaskKind::Generic(task) => task.task_class_name(),
                }
            }

            /// the object classes a task entry carries in addition to `top` and `ds-task`
            pub fn additional_object_classes(&self) -> Vec<&str> {
                match self {
                    $(TaskKind::$variant(_) => vec![$ty::OBJECT_CLASS],)*
                    TaskKind::Generic(task) => task
                        .additional_object_classes()
                        .iter()
                        .map(String::as_str)
                        .collect(),
                }
            }

            /// the properties specific to the task type
            pub fn task_properties(&self) -> &'static [TaskProperty] {
                match self {
                    $(TaskKind::$variant(_) => $ty::task_properties(),)*
                    TaskKind::Generic(_) => &[],
                }
            }

            /// add the task specific attributes to an entry being rendered
            pub fn encode_attributes(&self, writer: &mut EntryWriter) {
                match self {
                    $(TaskKind::$variant(task) => task.encode_attributes(writer),)*
                    TaskKind::Generic(task) => task.encode_attributes(writer),
                }
            }

            /// add the task specific property values to a property map
            pub fn encode_properties(&self, properties: &mut PropertyMap) {
                match self {
                    $(TaskKind::$variant(task) => task.encode_properties(properties),)*
                    TaskKind::Generic(_) => {}
                }
            }
        }

        lazy_static! {
            /// one entry per known task type, in declaration order
            static ref REGISTERED_TASK_TYPES: Vec<RegisteredTaskType> =
                vec![$(RegisteredTaskType::of::<$ty>(),)*];
        }
    };
}

task_kinds! {
    /// see [AddSchemaFileTask]
    AddSchemaFile(AddSchemaFileTask),
    /// see [BackupTask]
    Backup(BackupTask),
    /// see [CollectSupportDataTask]
    CollectSupportData(CollectSupportDataTask),
    /// see [DisconnectClientTask]
    DisconnectClient(DisconnectClientTask),
    /// see [EnterLockdownModeTask]
    EnterLockdownMode(EnterLockdownModeTask),
    /// see [ExecTask]
    Exec(ExecTask),
    /// see [ExportTask]
    Export(ExportTask),
    /// see [FileRetentionTask]
    FileRetention(FileRetentionTask),
    /// see [GroovyScriptedTask]
    GroovyScripted(GroovyScriptedTask),
    /// see [ImportTask]
    Import(ImportTask),
    /// see [LeaveLockdownModeTask]
    LeaveLockdownMode(LeaveLockdownModeTask),
    /// see [ReEncodeEntriesTask]
    ReEncodeEntries(ReEncodeEntriesTask),
    /// see [RebuildTask]
    Rebuild(RebuildTask),
    /// see [RefreshEncryptionSettingsTask]
    RefreshEncryptionSettings(RefreshEncryptionSettingsTask),
    /// see [ReloadGlobalIndexTask]
    ReloadGlobalIndex(ReloadGlobalIndexTask),
    /// see [RemoveAttributeTypeTask]
    RemoveAttributeType(RemoveAttributeTypeTask),
    /// see [RestoreTask]
    Restore(RestoreTask),
    /// see [ShutdownTask]
    Shutdown(ShutdownTask),
}

/// the dispatch information for one known task type
#[derive(Clone, Copy)]
pub struct RegisteredTaskType {
    /// see [TaskType::TASK_CLASS_NAME]
    class_name: &'static str,
    /// see [TaskType::OBJECT_CLASS]
    object_class: &'static str,
    /// see [TaskType::task_properties]
    properties: fn() -> &'static [TaskProperty],
    /// see [TaskType::decode_entry]
    decode_entry: fn(&SearchEntry) -> Result<TaskKind, TaskError>,
    /// see [TaskType::decode_properties]
    decode_properties: fn(&PropertyMap) -> Result<TaskKind, TaskError>,
}

impl RegisteredTaskType {
    /// the dispatch information for a task type
    fn of<T: TaskType>() -> Self {
        Self {
            class_name: T::TASK_CLASS_NAME,
            object_class: T::OBJECT_CLASS,
            properties: T::task_properties,
            decode_entry: |entry| T::decode_entry(entry).map(Into::into),
            decode_properties: |properties| T::decode_properties(properties).map(Into::into),
        }
    }

    /// the fully qualified name of the server side implementation
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// the object class which marks an entry as this task type
    pub fn object_class(&self) -> &'static str {
        self.object_class
    }

    /// the properties specific to this task type
    pub fn task_properties(&self) -> &'static [TaskProperty] {
        (self.properties)()
    }

    /// decode the task specific attributes of an entry
    pub fn decode_entry(&self, entry: &SearchEntry) -> Result<TaskKind, TaskError> {
        (self.decode_entry)(entry)
    }

    /// decode the task specific properties of a property map
    pub fn decode_properties(&self, properties: &PropertyMap) -> Result<TaskKind, TaskError> {
        (self.decode_properties)(properties)
    }
}

impl Debug for RegisteredTaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTaskType")
            .field("class_name", &self.class_name)
            .field("object_class", &self.object_class)
            .finish()
    }
}

lazy_static! {
    /// index into [REGISTERED_TASK_TYPES] by lower-cased class name
    static ref BY_CLASS_NAME: HashMap<String, usize> = REGISTERED_TASK_TYPES
        .iter()
        .enumerate()
        .map(|(i, t)| (t.class_name.to_lowercase(), i))
        .collect();
    /// index into [REGISTERED_TASK_TYPES] by lower-cased object class
    static ref BY_OBJECT_CLASS: HashMap<String, usize> = REGISTERED_TASK_TYPES
        .iter()
        .enumerate()
        .map(|(i, t)| (t.object_class.to_lowercase(), i))
        .collect();
}

/// all task types known to this crate
pub fn registered_task_types() -> &'static [RegisteredTaskType] {
    &REGISTERED_TASK_TYPES
}

/// find a known task type by its class name
pub fn find_by_class_name(class_name: &str) -> Option<&'static RegisteredTaskType> {
    BY_CLASS_NAME
        .get(&class_name.trim().to_lowercase())
        .map(|i| &REGISTERED_TASK_TYPES[*i])
}

/// find a known task type by the class name or, failing that, by one of the
/// object classes of an entry
pub fn find_task_type<'a, I>(
    class_name: Option<&str>,
    object_classes: I,
) -> Option<&'static RegisteredTaskType>
where
    I: IntoIterator<Item = &'a String>,
{
    if let Some(found) = class_name.and_then(find_by_class_name) {
        return Some(found);
    }
    object_classes
        .into_iter()
        .find_map(|oc| BY_OBJECT_CLASS.get(&oc.to_lowercase()))
        .map(|i| &REGISTERED_TASK_TYPES[*i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn class_names_and_object_classes_are_unique() {
        let types = registered_task_types();
        let class_names: HashSet<_> = types.iter().map(|t| t.class_name()).collect();
        let object_classes: HashSet<_> = types.iter().map(|t| t.object_class()).collect();
        assert_eq!(class_names.len(), types.len());
        assert_eq!(object_classes.len(), types.len());
    }

    #[test]
    fn property_attribute_names_are_unique_per_type() {
        for t in registered_task_types() {
            let names: HashSet<_> = t
                .task_properties()
                .iter()
                .map(|p| p.attribute_name().to_lowercase())
                .collect();
            assert_eq!(names.len(), t.task_properties().len(), "{:?}", t);
        }
    }

    #[test]
    fn lookup_by_class_name_ignores_case() {
        let found = find_by_class_name("COM.UNBOUNDID.DIRECTORY.SERVER.TASKS.BACKUPTASK");
        assert_eq!(found.map(|t| t.object_class()), Some("ds-task-backup"));
        assert!(find_by_class_name("com.example.UnknownTask").is_none());
    }

    #[test]
    fn lookup_falls_back_to_object_class() {
        let ocs = vec![
            "top".to_string(),
            "ds-task".to_string(),
            "DS-TASK-REBUILD".to_string(),
        ];
        let found = find_task_type(Some("com.example.Renamed"), &ocs);
        assert_eq!(found.map(|t| t.class_name()), Some(RebuildTask::TASK_CLASS_NAME));
        assert!(find_task_type(None, &vec!["top".to_string()]).is_none());
    }
}
