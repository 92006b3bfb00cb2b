//! Port construction and configuration errors.

use core::fmt;

use crate::frame::FrameError;
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    /// The builder and the context switch disagree on the scratch size, so
    /// a built frame could not be restored.
    ScratchMismatch { stack_init: u8, context_switch: u8 },
    /// The provider reports more scratch than the core has.
    ScratchTooLarge { requested: u8, capacity: usize },
    /// Building a frame failed.
    Frame(FrameError),
    /// No arena slot has this id.
    UnknownTask(TaskId),
    /// Every task id is in use.
    TooManyTasks,
    /// The task has run, or the scheduler has started with its frame
    /// pending, so its stack holds live context.
    TaskAlreadyStarted(TaskId),
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortError::ScratchMismatch {
                stack_init,
                context_switch,
            } => write!(
                f,
                "scratch size mismatch: stack init uses {}, context switch uses {}",
                stack_init, context_switch
            ),
            PortError::ScratchTooLarge {
                requested,
                capacity,
            } => write!(
                f,
                "scratch size {} exceeds the {} bytes of scratch RAM",
                requested, capacity
            ),
            PortError::Frame(err) => write!(f, "stack frame: {}", err),
            PortError::UnknownTask(id) => write!(f, "no task stack for {}", id),
            PortError::TooManyTasks => f.write_str("task ids exhausted"),
            PortError::TaskAlreadyStarted(id) => {
                write!(f, "{} has already been started; its frame cannot be rebuilt", id)
            }
        }
    }
}

impl From<FrameError> for PortError {
    fn from(err: FrameError) -> Self {
        PortError::Frame(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn frame_errors_convert_and_keep_their_message() {
        let err: PortError = FrameError::Truncated.into();
        assert_eq!(err, PortError::Frame(FrameError::Truncated));
        assert!(err.to_string().ends_with("runs past the top of the stack"));
    }

    #[test]
    fn mismatch_names_both_sizes() {
        let msg = PortError::ScratchMismatch {
            stack_init: 4,
            context_switch: 6,
        }
        .to_string();
        assert!(msg.contains("stack init uses 4"));
        assert!(msg.contains("context switch uses 6"));
    }

    #[test]
    fn started_task_names_the_task() {
        let msg = PortError::TaskAlreadyStarted(TaskId::new(2)).to_string();
        assert!(msg.starts_with("task#2 has already been started"));
    }
}
