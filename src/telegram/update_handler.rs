// Update handling - translates Bot API updates into moderation input.
//
// **Notice the pattern:**
// 1. Extract primitive data from Telegram types
// 2. Call the core service
// 3. Log the result
//
// Everything that decides whether a message is a violation lives in core.

use super::Data;
use crate::core::moderation::{ChatActions, EnforcementOutcome, IncomingMessage};
use crate::infra::telegram::telegram_models::Update;

/// Pull a moderatable text message out of an update.
///
/// Returns `None` for updates without a message, messages without text or a
/// sender, messages sent on behalf of a chat, and anything posted outside the
/// monitored chat.
pub fn to_incoming(update: &Update, group_chat_id: i64) -> Option<IncomingMessage> {
    let message = update.message.as_ref()?;

    if message.chat.id != group_chat_id {
        tracing::debug!(
            update_id = update.update_id,
            chat_id = message.chat.id,
            chat_type = %message.chat.kind,
            "Ignoring message from unmonitored chat"
        );
        return None;
    }

    if let Some(sender_chat) = &message.sender_chat {
        tracing::debug!(
            update_id = update.update_id,
            sender_chat_id = sender_chat.id,
            "Ignoring message sent on behalf of a chat"
        );
        return None;
    }

    let text = message.text.as_ref()?;
    let author = message.from.as_ref()?;

    Some(IncomingMessage {
        chat_id: message.chat.id,
        message_id: message.message_id,
        author_id: author.id,
        author_username: author.username.clone(),
        text: text.clone(),
    })
}

/// Run one update through the moderation pipeline.
pub async fn handle_update<C: ChatActions>(
    data: &Data<C>,
    update: Update,
) -> Option<EnforcementOutcome> {
    let message = to_incoming(&update, data.group_chat_id)?;
    let outcome = data.moderation.process_message(&message).await?;

    match &outcome {
        EnforcementOutcome::Enforced(report) => {
            tracing::info!(
                chat_id = message.chat_id,
                user_id = message.author_id,
                keyword = %report.keyword,
                sanction = %report.sanction,
                deleted = report.delete.is_success(),
                sanctioned = report.sanction_outcome.is_success(),
                admin_check_failed = report.admin_check_error.is_some(),
                "Violation handled"
            );
        }
        EnforcementOutcome::Exempt => {}
        EnforcementOutcome::Skipped { admin_check_error } => {
            tracing::warn!(
                chat_id = message.chat_id,
                user_id = message.author_id,
                error = %admin_check_error,
                "Violation left in place"
            );
        }
    }

    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::moderation_service::test_support::{ChatCall, RecordingChat};
    use crate::core::moderation::{KeywordSet, ModerationConfig, ModerationService};
    use std::sync::Arc;

    const GROUP: i64 = -100_555;

    fn update(json: serde_json::Value) -> Update {
        serde_json::from_value(json).unwrap()
    }

    fn text_update(chat_id: i64, text: &str) -> Update {
        update(serde_json::json!({
            "update_id": 10,
            "message": {
                "message_id": 3,
                "chat": {"id": chat_id, "type": "supergroup"},
                "from": {"id": 99, "is_bot": false, "first_name": "Mallory", "username": "mallory"},
                "text": text
            }
        }))
    }

    fn data(chat: Arc<RecordingChat>) -> Data<Arc<RecordingChat>> {
        Data {
            group_chat_id: GROUP,
            moderation: ModerationService::new(
                chat,
                KeywordSet::new(["spam"]).unwrap(),
                ModerationConfig::default(),
            ),
        }
    }

    #[test]
    fn test_text_message_converts() {
        let incoming = to_incoming(&text_update(GROUP, "hello"), GROUP).unwrap();

        assert_eq!(incoming.chat_id, GROUP);
        assert_eq!(incoming.message_id, 3);
        assert_eq!(incoming.author_id, 99);
        assert_eq!(incoming.author_username.as_deref(), Some("mallory"));
        assert_eq!(incoming.text, "hello");
    }

    #[test]
    fn test_other_chats_are_ignored() {
        assert!(to_incoming(&text_update(-1, "spam"), GROUP).is_none());
    }

    #[test]
    fn test_non_text_messages_are_ignored() {
        let photo = update(serde_json::json!({
            "update_id": 11,
            "message": {
                "message_id": 4,
                "chat": {"id": GROUP, "type": "supergroup"},
                "from": {"id": 99, "is_bot": false, "first_name": "Mallory"},
                "photo": []
            }
        }));
        assert!(to_incoming(&photo, GROUP).is_none());
    }

    #[test]
    fn test_messages_without_sender_are_ignored() {
        let anonymous = update(serde_json::json!({
            "update_id": 12,
            "message": {
                "message_id": 5,
                "chat": {"id": GROUP, "type": "supergroup"},
                "text": "spam"
            }
        }));
        assert!(to_incoming(&anonymous, GROUP).is_none());
    }

    #[test]
    fn test_messages_sent_as_a_chat_are_ignored() {
        // Anonymous admin: placeholder sender plus the group itself.
        let anonymous_admin = update(serde_json::json!({
            "update_id": 13,
            "message": {
                "message_id": 6,
                "chat": {"id": GROUP, "type": "supergroup"},
                "from": {"id": 1087968824, "is_bot": true, "first_name": "Group", "username": "GroupAnonymousBot"},
                "sender_chat": {"id": GROUP, "type": "supergroup"},
                "text": "spam"
            }
        }));
        assert!(to_incoming(&anonymous_admin, GROUP).is_none());

        // Post forwarded from the linked channel.
        let channel_post = update(serde_json::json!({
            "update_id": 14,
            "message": {
                "message_id": 7,
                "chat": {"id": GROUP, "type": "supergroup"},
                "from": {"id": 777000, "is_bot": false, "first_name": "Telegram"},
                "sender_chat": {"id": -100_999, "type": "channel"},
                "text": "spam"
            }
        }));
        assert!(to_incoming(&channel_post, GROUP).is_none());
    }

    #[tokio::test]
    async fn test_anonymous_admin_is_never_banned() {
        let chat = Arc::new(RecordingChat::new());
        let data = data(chat.clone());
        let anonymous_admin = update(serde_json::json!({
            "update_id": 15,
            "message": {
                "message_id": 8,
                "chat": {"id": GROUP, "type": "supergroup"},
                "from": {"id": 1087968824, "is_bot": true, "first_name": "Group"},
                "sender_chat": {"id": GROUP, "type": "supergroup"},
                "text": "buy spam"
            }
        }));

        let outcome = handle_update(&data, anonymous_admin).await;

        assert!(outcome.is_none());
        assert!(chat.calls().is_empty());
    }

    #[tokio::test]
    async fn test_violation_update_runs_pipeline() {
        let chat = Arc::new(RecordingChat::new());
        let data = data(chat.clone());

        let outcome = handle_update(&data, text_update(GROUP, "cheap SPAM here")).await;

        assert!(matches!(outcome, Some(EnforcementOutcome::Enforced(_))));
        assert!(chat.action_calls().contains(&ChatCall::Delete {
            chat_id: GROUP,
            message_id: 3
        }));
    }

    #[tokio::test]
    async fn test_unmonitored_chat_makes_no_calls() {
        let chat = Arc::new(RecordingChat::new());
        let data = data(chat.clone());

        let outcome = handle_update(&data, text_update(-1, "spam")).await;

        assert!(outcome.is_none());
        assert!(chat.calls().is_empty());
    }
}
