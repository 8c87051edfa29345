// Moderation service - core business logic for keyword enforcement.
//
// This service handles:
// - Running the keyword policy over each message
// - Skipping creators and administrators
// - Deleting the offending message
// - Sanctioning the author (kick or readonly)
//
// Deletion and sanction are independent: a failure in one is logged and
// recorded but never stops the other. NO Telegram dependencies here.

use super::moderation_models::{
    ActionOutcome, AdminCheckPolicy, ChatPermissions, EnforcementOutcome, EnforcementReport,
    IncomingMessage, MemberStatus, ModerationAction, ModerationConfig, Violation,
};
use super::policy::{evaluate, KeywordSet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error {code:?}: {description}")]
    Api {
        code: Option<i32>,
        description: String,
    },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

// ============================================================================
// CHAT ACTIONS TRAIT (PORT)
// ============================================================================

/// Everything the executor needs from the chat platform.
///
/// Implementations should bound every call with a timeout; the executor
/// treats any `Err` as a recorded failure and moves on.
#[async_trait]
pub trait ChatActions: Send + Sync {
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ActionError>;

    /// Apply `permissions` to a member until `until_epoch_secs` (Unix time).
    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: i64,
        permissions: &ChatPermissions,
        until_epoch_secs: i64,
    ) -> Result<(), ActionError>;

    /// Remove a member. With `revoke_messages` their recent messages go too.
    async fn ban_member(
        &self,
        chat_id: i64,
        user_id: i64,
        revoke_messages: bool,
    ) -> Result<(), ActionError>;

    async fn get_member_status(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<MemberStatus, ActionError>;
}

#[async_trait]
impl<T: ChatActions + ?Sized> ChatActions for Arc<T> {
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ActionError> {
        (**self).delete_message(chat_id, message_id).await
    }

    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: i64,
        permissions: &ChatPermissions,
        until_epoch_secs: i64,
    ) -> Result<(), ActionError> {
        (**self)
            .restrict_member(chat_id, user_id, permissions, until_epoch_secs)
            .await
    }

    async fn ban_member(
        &self,
        chat_id: i64,
        user_id: i64,
        revoke_messages: bool,
    ) -> Result<(), ActionError> {
        (**self).ban_member(chat_id, user_id, revoke_messages).await
    }

    async fn get_member_status(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<MemberStatus, ActionError> {
        (**self).get_member_status(chat_id, user_id).await
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Result of the admin gate before any action runs.
enum AdminGate {
    Exempt,
    Proceed { lookup_error: Option<String> },
    Skip { lookup_error: String },
}

/// Keyword moderation service.
///
/// Holds only immutable state, so one instance is shared by every message
/// task through an `Arc`.
pub struct ModerationService<C: ChatActions> {
    chat: C,
    keywords: KeywordSet,
    config: ModerationConfig,
}

impl<C: ChatActions> ModerationService<C> {
    pub fn new(chat: C, keywords: KeywordSet, config: ModerationConfig) -> Self {
        Self {
            chat,
            keywords,
            config,
        }
    }

    /// Run the whole pipeline for one message.
    ///
    /// Returns `None` when the message is clean; no chat call is made then.
    pub async fn process_message(&self, message: &IncomingMessage) -> Option<EnforcementOutcome> {
        let violation = evaluate(&message.text, &self.keywords).violation()?.clone();

        tracing::info!(
            chat_id = message.chat_id,
            message_id = message.message_id,
            user_id = message.author_id,
            username = %message.author_label(),
            keyword = %violation.keyword,
            "Keyword found in message"
        );

        Some(self.enforce(message, &violation).await)
    }

    /// Enforce a confirmed violation: admin gate, then delete and sanction.
    pub async fn enforce(
        &self,
        message: &IncomingMessage,
        violation: &Violation,
    ) -> EnforcementOutcome {
        let admin_check_error = match self.admin_gate(message).await {
            AdminGate::Exempt => {
                tracing::debug!(
                    user_id = message.author_id,
                    "Admin message received, ignoring"
                );
                return EnforcementOutcome::Exempt;
            }
            AdminGate::Skip { lookup_error } => {
                tracing::warn!(
                    user_id = message.author_id,
                    keyword = %violation.keyword,
                    "Admin check failed and policy is fail-closed, leaving message untouched"
                );
                return EnforcementOutcome::Skipped {
                    admin_check_error: lookup_error,
                };
            }
            AdminGate::Proceed { lookup_error } => lookup_error,
        };

        // Delete first: a kick revokes recent messages, which would leave the
        // delete nothing to find. The sanction runs whatever the delete did.
        let delete = self.delete(message, violation).await;
        let sanction_outcome = self.sanction(message, violation).await;

        let report = EnforcementReport {
            keyword: violation.keyword.clone(),
            delete,
            sanction: self.config.action,
            sanction_outcome,
            admin_check_error,
        };

        tracing::debug!(?report, "Enforcement finished");
        EnforcementOutcome::Enforced(report)
    }

    /// Ask the platform whether the author is exempt.
    async fn admin_gate(&self, message: &IncomingMessage) -> AdminGate {
        tracing::debug!(
            user_id = message.author_id,
            chat_id = message.chat_id,
            "Checking if user is admin"
        );

        match self
            .chat
            .get_member_status(message.chat_id, message.author_id)
            .await
        {
            Ok(status) if status.is_exempt() => AdminGate::Exempt,
            Ok(_) => AdminGate::Proceed { lookup_error: None },
            Err(e) => {
                tracing::warn!(
                    user_id = message.author_id,
                    chat_id = message.chat_id,
                    policy = %self.config.admin_check_policy,
                    "Failed to check admin status: {}",
                    e
                );
                match self.config.admin_check_policy {
                    AdminCheckPolicy::FailOpen => AdminGate::Proceed {
                        lookup_error: Some(e.to_string()),
                    },
                    AdminCheckPolicy::FailClosed => AdminGate::Skip {
                        lookup_error: e.to_string(),
                    },
                }
            }
        }
    }

    async fn delete(&self, message: &IncomingMessage, violation: &Violation) -> ActionOutcome {
        match self
            .chat
            .delete_message(message.chat_id, message.message_id)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    message_id = message.message_id,
                    keyword = %violation.keyword,
                    "Message containing keyword deleted"
                );
                ActionOutcome::Succeeded
            }
            Err(e) => {
                tracing::error!(
                    message_id = message.message_id,
                    keyword = %violation.keyword,
                    "Failed to delete message: {}",
                    e
                );
                ActionOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn sanction(&self, message: &IncomingMessage, violation: &Violation) -> ActionOutcome {
        match self.config.action {
            ModerationAction::Kick => self.kick(message, violation).await,
            ModerationAction::Readonly => self.restrict(message, violation, Utc::now()).await,
        }
    }

    async fn kick(&self, message: &IncomingMessage, violation: &Violation) -> ActionOutcome {
        match self
            .chat
            .ban_member(message.chat_id, message.author_id, true)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    user_id = message.author_id,
                    username = %message.author_label(),
                    keyword = %violation.keyword,
                    "User kicked for using keyword"
                );
                ActionOutcome::Succeeded
            }
            Err(e) => {
                tracing::error!(
                    user_id = message.author_id,
                    username = %message.author_label(),
                    "Failed to kick user: {}",
                    e
                );
                ActionOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn restrict(
        &self,
        message: &IncomingMessage,
        violation: &Violation,
        now: DateTime<Utc>,
    ) -> ActionOutcome {
        let until = self.restriction_deadline(now);

        match self
            .chat
            .restrict_member(
                message.chat_id,
                message.author_id,
                &ChatPermissions::read_only(),
                until,
            )
            .await
        {
            Ok(()) => {
                tracing::info!(
                    user_id = message.author_id,
                    username = %message.author_label(),
                    days = self.config.readonly_duration_days,
                    keyword = %violation.keyword,
                    "User restricted to read-only mode"
                );
                ActionOutcome::Succeeded
            }
            Err(e) => {
                tracing::error!(
                    user_id = message.author_id,
                    username = %message.author_label(),
                    "Failed to restrict user: {}",
                    e
                );
                ActionOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Absolute Unix time at which a readonly restriction issued at `now` ends.
    pub fn restriction_deadline(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp() + self.config.readonly_duration_secs()
    }
}

// ============================================================================
// TESTS
// ============================================================================
