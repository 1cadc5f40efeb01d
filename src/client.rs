//! thin async helpers to schedule, read and cancel tasks on a directory
//! server through an existing [ldap3::Ldap] handle
//!
//! the helpers hold no state, connecting and binding is up to the caller

use std::collections::HashSet;
use std::fmt::Debug;

use ldap3::controls::RawControl;
use ldap3::{Ldap, LdapError, Mod, Scope, SearchEntry};
use thiserror::Error;
use tracing::instrument;

use crate::entry::{add_attributes, escape_rdn_value};
use crate::error::TaskError;
use crate::task::state::TaskState;
use crate::task::{Task, ATTR_TASK_ID, ATTR_TASK_STATE, OC_TASK, SCHEDULED_TASKS_BASE_DN};

/// result code returned when the base entry of an operation does not exist
const RC_NO_SUCH_OBJECT: u32 = 32;

/// page size used when listing tasks
const PAGE_SIZE: i32 = 100;

/// error which can happen while talking to the server about tasks
#[derive(Debug, Error)]
pub enum TaskClientError {
    /// an error from the ldap3 library or a non-success result code
    #[error("LDAP error: {0}")]
    Ldap(#[from] LdapError),
    /// an entry returned by the server could not be decoded as a task
    #[error("could not decode task entry: {0}")]
    Task(#[from] TaskError),
    /// a paged search finished with a non-success result code
    #[error("search below {base} failed with result code {rc}: {text}")]
    SearchFailed {
        /// the search base
        base: String,
        /// the LDAP result code
        rc: u32,
        /// the diagnostic message returned by the server
        text: String,
    },
    /// there is no task entry with the given ID
    #[error("no task with ID {0}")]
    NoSuchTask(String),
    /// the task has already completed and can not be canceled any more
    #[error("task {task_id} has already completed with state {state}")]
    AlreadyCompleted {
        /// the ID of the task
        task_id: String,
        /// the state the task completed with
        state: TaskState,
    },
}

/// the DN of the entry for the task with the given ID
pub fn task_dn(task_id: &str) -> String {
    format!(
        "{}={},{}",
        ATTR_TASK_ID,
        escape_rdn_value(task_id),
        SCHEDULED_TASKS_BASE_DN
    )
}

/// a filter matching task entries, optionally narrowed by another filter
fn task_filter(filter: Option<&str>) -> String {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) if f.starts_with('(') => format!("(&(objectClass={}){})", OC_TASK, f),
        Some(f) => format!("(&(objectClass={})({}))", OC_TASK, f),
        None => format!("(objectClass={})", OC_TASK),
    }
}

/// the state a cancel request sets for a task in the given state, [None] if
/// the task has already completed
fn cancel_state(state: TaskState) -> Option<TaskState> {
    if state.is_completed() {
        None
    } else if state.is_running() {
        Some(TaskState::StoppedByAdministrator)
    } else {
        Some(TaskState::CanceledBeforeStarting)
    }
}

/// add the entry for a new task, the server schedules it as soon as it is
/// added
#[instrument(skip(ldap, task, controls), fields(task_id = %task.task_id()))]
pub async fn schedule_task(
    ldap: &mut Ldap,
    task: &Task,
    controls: Vec<RawControl>,
) -> Result<(), TaskClientError> {
    let entry = task.create_task_entry();
    tracing::debug!("Adding task entry {} of class {}", entry.dn, task.task_class_name());
    ldap.with_controls(controls)
        .add(&entry.dn, add_attributes(&entry))
        .await?
        .success()?;
    Ok(())
}

/// read the task with the given ID, [None] if there is no such task
#[instrument(skip(ldap))]
pub async fn get_task(ldap: &mut Ldap, task_id: &str) -> Result<Option<Task>, TaskClientError> {
    let dn = task_dn(task_id);
    let result = ldap
        .search(&dn, Scope::Base, &task_filter(None), vec!["*"])
        .await?
        .success();
    let entries = match result {
        Ok((entries, _)) => entries,
        Err(LdapError::LdapResult { result }) if result.rc == RC_NO_SUCH_OBJECT => {
            tracing::debug!("No task entry {}", dn);
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    match entries.into_iter().next() {
        Some(entry) => Ok(Some(Task::decode_entry(&SearchEntry::construct(entry))?)),
        None => Ok(None),
    }
}

/// list the tasks on the server, optionally only those matching `filter`
///
/// entries which can not be decoded are logged and skipped
#[instrument(skip(ldap))]
pub async fn get_tasks(
    ldap: &mut Ldap,
    filter: Option<&str>,
) -> Result<Vec<Task>, TaskClientError> {
    let filter = task_filter(filter);
    let entries = paged_search(
        ldap,
        SCHEDULED_TASKS_BASE_DN,
        Scope::OneLevel,
        &filter,
        vec!["*".to_string()],
    )
    .await?;
    let mut tasks = Vec::with_capacity(entries.len());
    for entry in entries {
        match Task::decode_entry(&entry) {
            Ok(task) => tasks.push(task),
            Err(err) => tracing::warn!("Skipping task entry {}: {}", entry.dn, err),
        }
    }
    Ok(tasks)
}

/// cancel a task which has not started yet or stop a running one
///
/// returns the state the task was set to
#[instrument(skip(ldap))]
pub async fn cancel_task(ldap: &mut Ldap, task_id: &str) -> Result<TaskState, TaskClientError> {
    let task = get_task(ldap, task_id)
        .await?
        .ok_or_else(|| TaskClientError::NoSuchTask(task_id.to_string()))?;
    let new_state = cancel_state(task.state()).ok_or_else(|| TaskClientError::AlreadyCompleted {
        task_id: task_id.to_string(),
        state: task.state(),
    })?;
    tracing::debug!(
        "Changing state of task {} from {} to {}",
        task_id,
        task.state(),
        new_state
    );
    ldap.modify(
        &task.task_entry_dn(),
        vec![Mod::Replace(
            ATTR_TASK_STATE,
            HashSet::from([new_state.name()]),
        )],
    )
    .await?
    .success()?;
    Ok(new_state)
}

/// a paged search returning every matching entry
async fn paged_search(
    ldap: &mut Ldap,
    base: &str,
    scope: Scope,
    filter: &str,
    attrs: Vec<String>,
) -> Result<Vec<SearchEntry>, TaskClientError> {
    let adapter: ldap3::adapters::PagedResults<String, Vec<String>> =
        ldap3::adapters::PagedResults::new(PAGE_SIZE);
    let mut search_stream = ldap
        .streaming_search_with(adapter, base, scope, filter, attrs.clone())
        .await?;
    let mut rs = Vec::new();
    loop {
        match search_stream.next().await {
            Ok(Some(entry)) => rs.push(SearchEntry::construct(entry)),
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(
                    "Error {} in LDAP query after {} results\n  base: {}\n  scope: {:?}\n  filter: {}\n  attrs: {:#?}",
                    err,
                    rs.len(),
                    base,
                    scope,
                    filter,
                    attrs
                );
                log_ldapsearch_command(base, scope, filter, &attrs);
                return Err(err.into());
            }
        }
    }
    let res = search_stream.finish().await;
    if res.rc != 0 {
        tracing::debug!(
            "Non-zero return code {} in LDAP query\n  base: {}\n  scope: {:?}\n  filter: {}\n  attrs: {:#?}",
            res.rc,
            base,
            scope,
            filter,
            attrs
        );
        log_ldapsearch_command(base, scope, filter, &attrs);
        return Err(TaskClientError::SearchFailed {
            base: base.to_string(),
            rc: res.rc,
            text: res.text,
        });
    }
    Ok(rs)
}

/// log the equivalent ldapsearch command line to reproduce a failed search
fn log_ldapsearch_command<S: Debug + std::fmt::Display>(
    base: &str,
    scope: Scope,
    filter: &str,
    attrs: &[S],
) {
    tracing::debug!(
        "ldapsearch -Q -LLL -E pr={}/noprompt -o ldif-wrap=no -b '{}' -s {} '{}' {}",
        PAGE_SIZE,
        base,
        format!("{:?}", scope).to_lowercase(),
        filter,
        itertools::join(attrs.iter(), " ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn task_dn_escapes_the_id() {
        assert_eq!(
            task_dn("backup, nightly"),
            "ds-task-id=backup\\, nightly,cn=Scheduled Tasks,cn=tasks"
        );
    }

    #[rstest]
    #[case(None, "(objectClass=ds-task)")]
    #[case(Some(""), "(objectClass=ds-task)")]
    #[case(Some("(ds-task-state=running)"), "(&(objectClass=ds-task)(ds-task-state=running))")]
    #[case(Some("ds-task-state=running"), "(&(objectClass=ds-task)(ds-task-state=running))")]
    fn task_filters(#[case] filter: Option<&str>, #[case] expected: &str) {
        assert_eq!(task_filter(filter), expected);
    }

    #[rstest]
    #[case(TaskState::Unscheduled, Some(TaskState::CanceledBeforeStarting))]
    #[case(TaskState::Disabled, Some(TaskState::CanceledBeforeStarting))]
    #[case(TaskState::WaitingOnStartTime, Some(TaskState::CanceledBeforeStarting))]
    #[case(TaskState::WaitingOnDependency, Some(TaskState::CanceledBeforeStarting))]
    #[case(TaskState::Running, Some(TaskState::StoppedByAdministrator))]
    #[case(TaskState::CompletedSuccessfully, None)]
    #[case(TaskState::StoppedByError, None)]
    #[case(TaskState::CanceledBeforeStarting, None)]
    fn cancel_states(#[case] state: TaskState, #[case] expected: Option<TaskState>) {
        assert_eq!(cancel_state(state), expected);
    }
}
