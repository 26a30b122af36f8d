// src/messages.rs

use crate::managers::{BulkReport, Escalation, Event, RegionalTime, RegistrationOutcome, StrikeOutcome};
use crate::models::{Member, MemberId, PlayerProfile};

pub fn startup_notice() -> String {
    "✅ **ZealBot is active**.".to_string()
}

pub fn shutdown_notice() -> String {
    "🛑 ZealBot has been shut down.".to_string()
}

fn regional_lines(times: &[RegionalTime]) -> String {
    times
        .iter()
        .map(|t| format!("{}: `{}` ({})\n", t.label, t.time, t.date))
        .collect()
}

pub fn event_announcement(event: &Event, times: &[RegionalTime]) -> String {
    format!(
        "📢 **New event created**:\n\
        📆 Date: `{}`\n\
        📝 Description: {}\n\
        🕒 **Times by region:**\n{}",
        event.formatted_date(),
        event.description,
        regional_lines(times)
    )
}

pub fn current_event(event: &Event, times: &[RegionalTime]) -> String {
    format!(
        "📅 **Current event:** `{}`\n\
        📝 **Description:** {}\n\
        🕒 **Times by region:**\n{}",
        event.formatted_date(),
        event.description,
        regional_lines(times)
    )
}

pub fn reminder(minutes_remaining: i64, description: &str) -> String {
    format!(
        "⏰ **{} minutes** left until the event: **{}**",
        minutes_remaining, description
    )
}

pub fn registration(outcome: RegistrationOutcome) -> String {
    match outcome {
        RegistrationOutcome::Registered => "✅ You are registered for the event.",
        RegistrationOutcome::AlreadyRegistered => "⚠️ You are already registered.",
        RegistrationOutcome::MissingProfile => "❌ Register your player data with `!rank` first.",
        RegistrationOutcome::NoActiveEvent => "❌ There is no active event.",
    }
    .to_string()
}

pub fn registrants(names: &[String]) -> String {
    if names.is_empty() {
        return "📭 Nobody is registered.".to_string();
    }
    let lines: Vec<String> = names.iter().map(|n| format!("- {}", n)).collect();
    format!("📋 **Registered:**\n{}", lines.join("\n"))
}

pub fn profile_saved(member_name: &str, profile: &PlayerProfile) -> String {
    format!(
        "✅ Player data saved for **{}**\n\
        🆔 ID: `{}`\n\
        🔤 Alias: `{}`\n\
        🎖️ Rank: {} `{}`\n\
        📶 Level: {} `{}`\n\
        🌎 Country: {} `{}`",
        member_name,
        profile.external_id,
        profile.alias,
        profile.rank.emoji(),
        profile.rank.label(),
        profile.level.emoji(),
        profile.level.label(),
        profile.country.emoji(),
        profile.country.label()
    )
}

/// Everything known about a member, for the info command
pub struct MemberCard<'a> {
    pub member: &'a Member,
    pub nickname: Option<&'a str>,
    pub profile: &'a PlayerProfile,
    pub strikes: u32,
    pub registered: bool,
}

pub fn member_card(card: &MemberCard<'_>) -> String {
    let roles = if card.member.roles.is_empty() {
        "None".to_string()
    } else {
        card.member.roles.join(", ")
    };
    let status = if card.registered {
        "🟢 Registered"
    } else {
        "🔴 Not registered"
    };

    format!(
        "📄 **Information for {}:**\n\
        🆔 Registered ID: `{}`\n\
        🔤 Alias: `{}`\n\
        🎖️ Rank: {} `{}`\n\
        📶 Level: {} `{}`\n\
        🌎 Country: {} `{}`\n\
        🏷️ Nickname: `{}`\n\
        📛 Strikes: `{}`\n\
        🔗 Roles: {}\n\
        📌 Event status: {}",
        card.member.display_name,
        card.profile.external_id,
        card.profile.alias,
        card.profile.rank.emoji(),
        card.profile.rank.label(),
        card.profile.level.emoji(),
        card.profile.level.label(),
        card.profile.country.emoji(),
        card.profile.country.label(),
        card.nickname.unwrap_or("No nickname"),
        card.strikes,
        roles,
        status
    )
}

pub fn ban_notice(member_name: &str, threshold: u32, appeal_contact: &str) -> String {
    format!(
        "⛔ {} has been **banned** for accumulating {} strikes.\n\
        📩 *If you disagree with this decision or believe it was a mistake, contact:* {}",
        member_name, threshold, appeal_contact
    )
}

/// Reply for a single strike adjustment
pub fn strike_result(member_name: &str, outcome: &StrikeOutcome, threshold: u32, appeal_contact: &str) -> String {
    match &outcome.escalation {
        Escalation::Banned => ban_notice(member_name, threshold, appeal_contact),
        Escalation::BanFailed(e) => format!(
            "⚠️ {} now has {} strikes, but the ban failed: {}",
            member_name,
            outcome.total,
            e.user_message()
        ),
        Escalation::None => format!(
            "⚠️ {:+} strike(s) for {}. Current total: {}\n📝 Reason: {}",
            outcome.delta, member_name, outcome.total, outcome.reason
        ),
    }
}

pub fn bulk_report(label: &str, report: &BulkReport, threshold: u32, appeal_contact: &str) -> String {
    if report.outcomes.is_empty() && report.failures.is_empty() && report.interrupted.is_none() {
        return format!("✅ No member needed a strike for {}.", label);
    }

    let mut lines = vec![format!("📋 **Strikes for {}:**", label)];
    for outcome in &report.outcomes {
        lines.push(format!(
            "⚠️ Strike for {} (Total: {})",
            outcome.member.mention(),
            outcome.total
        ));
        match &outcome.escalation {
            Escalation::Banned => lines.push(ban_notice(&outcome.member.mention(), threshold, appeal_contact)),
            Escalation::BanFailed(e) => lines.push(format!(
                "❌ Could not ban {}: {}",
                outcome.member.mention(),
                e.user_message()
            )),
            Escalation::None => {}
        }
    }
    for (member, e) in &report.failures {
        lines.push(format!("❌ Strike for {} was not saved: {}", member.mention(), e));
    }
    if let Some(e) = &report.interrupted {
        lines.push(format!(
            "⚠️ The member scan stopped early after {} members: {}",
            report.scanned, e
        ));
    }
    lines.join("\n")
}

/// Mentions of listed members, or `empty` when there are none
pub fn member_list(title: &str, members: &[MemberId], empty: &str) -> String {
    if members.is_empty() {
        return empty.to_string();
    }
    let mentions: Vec<String> = members.iter().map(|m| m.mention()).collect();
    format!("{}\n{}", title, mentions.join("\n"))
}

/// Split long text into chunks that fit in one Discord message
pub fn chunk(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if !current.is_empty() && current.chars().count() + line.chars().count() + 1 > limit {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub fn help_text() -> String {
    "**📘 ZealBot commands:**\n\
    `!event [DD/MM/YYYY HH:MM | Description]` - Create or view the event\n\
    `!register` - Register for the event (requires !rank)\n\
    `!rank <ID> [Alias] <Rank> <Level> <Country>` - Save your player data\n\
    `!registrants` - List registered members\n\
    `!info [@member]` - Show a player's data\n\
    `!active_event` - Show the active event\n\
    `!end_event` - End the event and clear registrations (Admin/Owner)\n\
    `!clear_registrations` - Clear registrations only (Admin/Owner)\n\
    `!kick @member [reason]` - Kick (Admin/Owner)\n\
    `!ban @member [reason]` - Ban (Admin/Owner)\n\
    `!strike @member [amount] [reason]` - Add or remove strikes, 5 strikes = ban (Admin/Owner)\n\
    `!room @member1 @member2 ...` - Create a private room\n\
    `!set_activity <message_id>` - Set the weekly activity message (Admin/Owner)\n\
    `!inactive` - List inactive members (Admin/Owner)\n\
    `!unregistered` - List members without player data (Admin/Owner)\n\
    `!roleless` - List members without roles (Admin/Owner)\n\
    `!strike_inactive` - Strike inactive members (Admin/Owner)\n\
    `!strike_unregistered` - Strike members without player data (Admin/Owner)\n\
    `!strike_roleless` - Strike members without roles (Admin/Owner)\n\
    `!diagnostics` - Show recent warnings and errors (Admin/Owner)\n\
    `!shutdown` - Shut the bot down (Admin/Owner)\n\
    `!help` - Show this help"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;

    fn outcome(member: u64, total: u32, escalation: Escalation) -> StrikeOutcome {
        StrikeOutcome {
            member: MemberId(member),
            delta: 1,
            previous: total.saturating_sub(1),
            total,
            reason: "late".to_string(),
            escalation,
        }
    }

    #[test]
    fn test_strike_status_shows_signed_delta() {
        let text = strike_result("Pollo", &outcome(1, 2, Escalation::None), 5, "contact");
        assert!(text.contains("+1 strike(s) for Pollo"));
        assert!(text.contains("Current total: 2"));
        assert!(text.contains("Reason: late"));
    }

    #[test]
    fn test_ban_notice_includes_appeal_contact() {
        let text = strike_result("Pollo", &outcome(1, 5, Escalation::Banned), 5, "@mods");
        assert!(text.contains("**banned**"));
        assert!(text.contains("@mods"));
    }

    #[test]
    fn test_bulk_report_lists_each_member() {
        let report = BulkReport {
            scanned: 3,
            outcomes: vec![
                outcome(1, 1, Escalation::None),
                outcome(
                    2,
                    5,
                    Escalation::BanFailed(BotError::InsufficientPermission {
                        action: "ban this member".to_string(),
                    }),
                ),
            ],
            failures: vec![],
            interrupted: None,
        };
        let text = bulk_report("inactivity", &report, 5, "@mods");
        assert!(text.contains("<@1> (Total: 1)"));
        assert!(text.contains("Could not ban <@2>"));

        let empty = bulk_report("inactivity", &BulkReport::default(), 5, "@mods");
        assert_eq!(empty, "✅ No member needed a strike for inactivity.");
    }

    #[test]
    fn test_chunk_respects_limit() {
        let text = (0..50).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let chunks = chunk(&text, 100);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        assert_eq!(chunks.join("\n"), text);
    }
}
