use super::info::ParamKind;
use crate::host::SenderType;
use thiserror::Error;

/// Every way a command invocation can fail short of a bug.
///
/// The `Display` text is the chat message shown to the sender.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Command not found. Type '/{root} ?' for help.")]
    NotFound { root: String },

    #[error("Command incomplete. Type '/{root} ?' for help.")]
    Incomplete { root: String },

    #[error("Access denied.")]
    AccessDenied,

    #[error("Too many arguments. Type '{usage}' for help.")]
    TooManyArguments { usage: String },

    #[error("Missing arguments. Type '{usage}' for help.")]
    MissingArgument { parameter: String, usage: String },

    #[error("The parameter named '{name}' has a duplicate.")]
    DuplicateParameter { name: String },

    #[error("Invalid parameter detected: {name}")]
    InvalidParameterName { name: String },

    /// A value was rejected, either during coercion or by the command itself.
    #[error("{message}")]
    InvalidArgumentValue {
        parameter: String,
        message: String,
        description: Option<String>,
        expected: Option<ParamKind>,
    },

    #[error("Cannot execute command as {sender}.")]
    InvalidSenderType { sender: SenderType, reason: Option<String> },

    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    /// A value rejected by a command while it runs, e.g. an unknown player name.
    pub fn invalid_value(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        CommandError::InvalidArgumentValue {
            parameter: parameter.into(),
            message: message.into(),
            description: None,
            expected: None,
        }
    }

    pub(crate) fn wrong_kind(parameter: &str, expected: ParamKind, description: Option<&str>) -> Self {
        CommandError::InvalidArgumentValue {
            parameter: parameter.to_string(),
            message: format!("Invalid value for '{}', expected {}.", parameter, expected),
            description: description.map(str::to_string),
            expected: Some(expected),
        }
    }

    pub fn console_not_allowed() -> Self {
        CommandError::InvalidSenderType {
            sender: SenderType::Console,
            reason: Some("Console cannot use this command.".to_string()),
        }
    }

    /// Follow-up lines rendered after the main message.
    pub(crate) fn details(&self) -> Vec<(String, bool)> {
        match self {
            CommandError::InvalidArgumentValue {
                description: Some(description),
                ..
            } => vec![(format!("Parameter description: {}", description), false)],
            CommandError::InvalidSenderType {
                reason: Some(reason), ..
            } => vec![(format!("Reason: {}", reason), true)],
            _ => Vec::new(),
        }
    }
}
