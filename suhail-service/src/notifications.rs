use crate::db::{NotificationPriority, TeamNotification};

pub const NO_UNREAD_NOTIFICATIONS: &str =
    "No unread team notifications at the moment. How can I assist you further today?";

fn marker(priority: NotificationPriority) -> &'static str {
    match priority {
        NotificationPriority::InternalAnnouncement => "🔴",
        NotificationPriority::ExternalBroadcast => "🟡",
        NotificationPriority::GeneralNotes => "🟢",
    }
}

/// Unread notifications as a block for the client co-pilot prompt.
pub fn format_for_prompt(notifications: &[TeamNotification]) -> String {
    if notifications.is_empty() {
        return NO_UNREAD_NOTIFICATIONS.to_string();
    }

    let mut text = String::from("\n🔔 **Unread Team Messages:**\n\n");
    for notification in notifications {
        text.push_str(marker(notification.priority));
        text.push(' ');
        text.push_str(&notification.message);
        text.push('\n');
    }
    text
}
