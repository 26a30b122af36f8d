use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // Storage errors
    #[error("Failed to write record '{key}': {source}")]
    StorageWrite {
        key: String,
        #[source]
        source: std::io::Error,
    },

    // Input errors
    #[error("Invalid event format: {message}")]
    InvalidEventFormat { message: String },

    #[error("Invalid {field} '{value}'. Options: {options}")]
    InvalidProfile {
        field: &'static str,
        value: String,
        options: String,
    },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    #[error("Channel not found: {name}")]
    ChannelNotFound { name: String },

    #[error("Member not found: {id}")]
    MemberNotFound { id: String },

    #[error("No activity message with reactions found in '{channel}'")]
    ActivityMessageMissing { channel: String },

    // Permission errors
    #[error("Missing permission to {action}")]
    InsufficientPermission { action: String },

    #[error("Permission denied for command '{command}'")]
    AuthorizationDenied { command: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BotError {
    /// Text shown to the member who invoked the failing command
    pub fn user_message(&self) -> String {
        match self {
            BotError::InvalidEventFormat { .. } => {
                "❌ Invalid format. Use `!event DD/MM/YYYY HH:MM | Description`".to_string()
            }
            BotError::InvalidProfile {
                field,
                value,
                options,
            } => format!("❌ Invalid {} `{}`. Options: {}", field, value, options),
            BotError::InsufficientPermission { action } => {
                format!("❌ I don't have permission to {}.", action)
            }
            BotError::AuthorizationDenied { .. } => {
                "❌ You don't have permission to use this command.".to_string()
            }
            BotError::ChannelNotFound { name } => {
                format!("⚠️ Channel `{}` was not found.", name)
            }
            BotError::MemberNotFound { .. } => "❌ That member could not be found.".to_string(),
            BotError::ActivityMessageMissing { .. } => {
                "⚠️ No weekly activity message with reactions was found. Use `!set_activity <message_id>` first."
                    .to_string()
            }
            BotError::StorageWrite { .. } => {
                "❌ Could not save the data. Please try again later.".to_string()
            }
            _ => "❌ An unexpected error occurred.".to_string(),
        }
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

/// Map a failed Discord call, turning HTTP 403 into `InsufficientPermission`
pub fn discord_error(err: serenity::Error, action: &str) -> BotError {
    if let serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(response)) = &err {
        if response.status_code.as_u16() == 403 {
            return BotError::InsufficientPermission {
                action: action.to_string(),
            };
        }
    }
    BotError::from(err)
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_uniform() {
        let denied = BotError::AuthorizationDenied {
            command: "end_event".to_string(),
        };
        assert_eq!(
            denied.user_message(),
            "❌ You don't have permission to use this command."
        );

        let forbidden = BotError::InsufficientPermission {
            action: "ban this member".to_string(),
        };
        assert_eq!(
            forbidden.user_message(),
            "❌ I don't have permission to ban this member."
        );
    }
}
