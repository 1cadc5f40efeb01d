//! the lifecycle state of a task and the action taken when a dependency fails

use serde::Deserialize;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// error which can occur while parsing a [TaskState] or [FailedDependencyAction]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Could not parse {value} as a {kind}")]
pub struct ParseStateError {
    /// what was being parsed
    pub kind: &'static str,
    /// the unparsable value
    pub value: String,
}

/// the state of a task as reported by the server
///
/// transitions happen on the server only, the client merely classifies
/// the snapshot it read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// not yet scheduled
    Unscheduled,
    /// disabled by an administrator or a failed dependency
    Disabled,
    /// waiting for the scheduled start time
    WaitingOnStartTime,
    /// waiting for a dependency to complete
    WaitingOnDependency,
    /// currently running
    Running,
    /// completed without errors
    CompletedSuccessfully,
    /// completed but encountered errors
    CompletedWithErrors,
    /// stopped because the server shut down
    StoppedByShutdown,
    /// stopped because of an error
    StoppedByError,
    /// stopped by an administrator
    StoppedByAdministrator,
    /// canceled before it started
    CanceledBeforeStarting,
}

impl TaskState {
    /// every task state in lifecycle order
    pub const ALL: [TaskState; 11] = [
        TaskState::Unscheduled,
        TaskState::Disabled,
        TaskState::WaitingOnStartTime,
        TaskState::WaitingOnDependency,
        TaskState::Running,
        TaskState::CompletedSuccessfully,
        TaskState::CompletedWithErrors,
        TaskState::StoppedByShutdown,
        TaskState::StoppedByError,
        TaskState::StoppedByAdministrator,
        TaskState::CanceledBeforeStarting,
    ];

    /// the value used in the `ds-task-state` attribute
    pub fn name(&self) -> &'static str {
        match self {
            TaskState::Unscheduled => "unscheduled",
            TaskState::Disabled => "disabled",
            TaskState::WaitingOnStartTime => "waiting_on_start_time",
            TaskState::WaitingOnDependency => "waiting_on_dependency",
            TaskState::Running => "running",
            TaskState::CompletedSuccessfully => "completed_successfully",
            TaskState::CompletedWithErrors => "completed_with_errors",
            TaskState::StoppedByShutdown => "stopped_by_shutdown",
            TaskState::StoppedByError => "stopped_by_error",
            TaskState::StoppedByAdministrator => "stopped_by_administrator",
            TaskState::CanceledBeforeStarting => "canceled_before_starting",
        }
    }

    /// the task has not started yet
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            TaskState::Unscheduled
                | TaskState::Disabled
                | TaskState::WaitingOnStartTime
                | TaskState::WaitingOnDependency
        )
    }

    /// the task is running
    pub fn is_running(&self) -> bool {
        matches!(self, TaskState::Running)
    }

    /// the task has reached a terminal state
    pub fn is_completed(&self) -> bool {
        !self.is_pending() && !self.is_running()
    }
}

impl Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TaskState {
    type Err = ParseStateError;

    /// accepts the attribute value in any case, with `-` or space in place of `_`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(|c: char| c == '-' || c == ' ', "_");
        TaskState::ALL
            .into_iter()
            .find(|state| state.name() == normalized)
            .ok_or_else(|| ParseStateError {
                kind: "task state",
                value: s.to_string(),
            })
    }
}

/// what the server does with a task when one of its dependencies fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailedDependencyAction {
    /// cancel the dependent task
    Cancel,
    /// disable the dependent task
    Disable,
    /// run the dependent task anyway
    Process,
}

impl FailedDependencyAction {
    /// every action
    pub const ALL: [FailedDependencyAction; 3] = [
        FailedDependencyAction::Cancel,
        FailedDependencyAction::Disable,
        FailedDependencyAction::Process,
    ];

    /// the value used in the `ds-task-failed-dependency-action` attribute
    pub fn name(&self) -> &'static str {
        match self {
            FailedDependencyAction::Cancel => "cancel",
            FailedDependencyAction::Disable => "disable",
            FailedDependencyAction::Process => "process",
        }
    }
}

impl Display for FailedDependencyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FailedDependencyAction {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FailedDependencyAction::ALL
            .into_iter()
            .find(|action| action.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStateError {
                kind: "failed dependency action",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn every_state_is_in_exactly_one_group() {
        for state in TaskState::ALL {
            let groups = [state.is_pending(), state.is_running(), state.is_completed()];
            assert_eq!(groups.iter().filter(|g| **g).count(), 1, "{}", state);
        }
    }

    #[test]
    fn states_round_trip_through_their_names() {
        for state in TaskState::ALL {
            assert_eq!(state.name().parse::<TaskState>(), Ok(state));
        }
    }

    #[rstest]
    #[case("RUNNING", TaskState::Running)]
    #[case("completed with errors", TaskState::CompletedWithErrors)]
    #[case("waiting-on-start-time", TaskState::WaitingOnStartTime)]
    fn states_parse_leniently(#[case] value: &str, #[case] expected: TaskState) {
        assert_eq!(value.parse::<TaskState>(), Ok(expected));
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!("finished".parse::<TaskState>().is_err());
    }

    #[rstest]
    #[case("cancel", FailedDependencyAction::Cancel)]
    #[case("DISABLE", FailedDependencyAction::Disable)]
    #[case("process", FailedDependencyAction::Process)]
    fn failed_dependency_actions_parse(
        #[case] value: &str,
        #[case] expected: FailedDependencyAction,
    ) {
        assert_eq!(value.parse::<FailedDependencyAction>(), Ok(expected));
    }

    #[test]
    fn unknown_failed_dependency_action_is_rejected() {
        assert!("ignore".parse::<FailedDependencyAction>().is_err());
    }
}
