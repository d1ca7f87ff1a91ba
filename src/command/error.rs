use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{id:?} is not a valid command id: {reason}")]
    MalformedCommandId { id: String, reason: &'static str },

    #[error("device of type {cmd_type:?} and subtype {sub_type:?} does not have command {cmd}")]
    UnknownCommand {
        cmd: String,
        cmd_type: Option<String>,
        sub_type: Option<String>,
    },
}
