// src/permissions/mod.rs
use tracing::warn;

use crate::error::BotError;
use crate::guild::Directory;
use crate::models::MemberId;
use crate::{Context, Error};

/// Whether any of `roles` is one of the `allowed` role names (case-insensitive)
pub fn is_authorized(roles: &[String], allowed: &[String]) -> bool {
    roles
        .iter()
        .any(|role| allowed.iter().any(|a| a.eq_ignore_ascii_case(role)))
}

/// Command check for privileged commands. Denials are answered by the
/// framework error handler with the uniform denial message.
pub async fn require_admin(ctx: Context<'_>) -> Result<bool, Error> {
    let data = ctx.data();
    let member = match data.gateway.member(MemberId(ctx.author().id.get())).await {
        Ok(member) => member,
        Err(e) => {
            warn!("Could not resolve roles for {}: {}", ctx.author().name, e);
            return Ok(false);
        }
    };

    let allowed = is_authorized(&member.roles, &data.config.admin_roles);
    if !allowed {
        warn!(
            "{} (ID: {}) was denied '{}'",
            ctx.author().name,
            ctx.author().id,
            ctx.command().qualified_name
        );
    }
    Ok(allowed)
}

/// Inline variant for commands that are only partly privileged
pub async fn ensure_admin(ctx: Context<'_>) -> Result<(), Error> {
    if require_admin(ctx).await? {
        Ok(())
    } else {
        Err(BotError::AuthorizationDenied {
            command: ctx.command().qualified_name.clone(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_admin_roles_are_case_insensitive() {
        let allowed = names(&["Admin", "Owner"]);
        assert!(is_authorized(&names(&["Member", "admin"]), &allowed));
        assert!(is_authorized(&names(&["OWNER"]), &allowed));
    }

    #[test]
    fn test_other_roles_are_denied() {
        let allowed = names(&["Admin", "Owner"]);
        assert!(!is_authorized(&names(&["Moderator"]), &allowed));
        assert!(!is_authorized(&[], &allowed));
    }
}
