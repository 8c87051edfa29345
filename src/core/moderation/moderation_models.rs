// Moderation domain models - data structures for the keyword policy.
//
// These are pure domain types with no Telegram dependencies.
// The Telegram layer converts Bot API updates into these and the infra layer
// turns the requested actions back into Bot API calls.

use serde::Serialize;
use std::fmt;

/// Seconds in one day, used to turn readonly days into a deadline.
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Fallback when READONLY_DAYS is missing or not a positive integer.
pub const DEFAULT_READONLY_DAYS: u32 = 7;

/// Longest restriction Telegram honors; later deadlines mean "forever".
pub const MAX_READONLY_DAYS: u32 = 366;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// What to do with the author of a violating message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModerationAction {
    /// Remove the author from the chat and revoke their recent messages.
    #[default]
    Kick,
    /// Keep the author in the chat but take away every posting permission.
    Readonly,
}

impl ModerationAction {
    /// Parse a configured action. Returns `None` for anything unrecognized so
    /// the caller decides how loudly to fall back.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "kick" => Some(ModerationAction::Kick),
            "readonly" => Some(ModerationAction::Readonly),
            _ => None,
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModerationAction::Kick => write!(f, "kick"),
            ModerationAction::Readonly => write!(f, "readonly"),
        }
    }
}

/// How to treat an author whose admin status could not be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminCheckPolicy {
    /// Treat the author as a regular member and keep enforcing.
    #[default]
    FailOpen,
    /// Leave the message alone and only log the failure.
    FailClosed,
}

impl AdminCheckPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "fail_open" | "fail-open" | "open" => Some(AdminCheckPolicy::FailOpen),
            "fail_closed" | "fail-closed" | "closed" => Some(AdminCheckPolicy::FailClosed),
            _ => None,
        }
    }
}

impl fmt::Display for AdminCheckPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminCheckPolicy::FailOpen => write!(f, "fail_open"),
            AdminCheckPolicy::FailClosed => write!(f, "fail_closed"),
        }
    }
}

/// Immutable moderation settings, validated once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationConfig {
    pub action: ModerationAction,
    /// Only read when `action` is `Readonly`. Between 1 and `MAX_READONLY_DAYS`.
    pub readonly_duration_days: u32,
    pub admin_check_policy: AdminCheckPolicy,
}

impl ModerationConfig {
    /// How long a readonly restriction lasts, in seconds.
    pub fn readonly_duration_secs(&self) -> i64 {
        i64::from(self.readonly_duration_days) * SECONDS_PER_DAY
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            action: ModerationAction::Kick,
            readonly_duration_days: DEFAULT_READONLY_DAYS,
            admin_check_policy: AdminCheckPolicy::FailOpen,
        }
    }
}

// ============================================================================
// MESSAGES AND MEMBERS
// ============================================================================

/// A text message from the monitored chat, already stripped of platform types.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub author_id: i64,
    pub author_username: Option<String>,
    /// Raw text as sent. Normalization happens in the policy evaluator.
    pub text: String,
}

impl IncomingMessage {
    /// Best human-readable handle for log lines.
    pub fn author_label(&self) -> String {
        match &self.author_username {
            Some(username) => format!("@{}", username),
            None => self.author_id.to_string(),
        }
    }
}

/// A member's role in the chat, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    Other(String),
}

impl MemberStatus {
    pub fn from_api(raw: &str) -> Self {
        match raw {
            "creator" => MemberStatus::Creator,
            "administrator" => MemberStatus::Administrator,
            "member" => MemberStatus::Member,
            "restricted" => MemberStatus::Restricted,
            "left" => MemberStatus::Left,
            "kicked" => MemberStatus::Kicked,
            other => MemberStatus::Other(other.to_string()),
        }
    }

    /// Creators and administrators are never moderated.
    pub fn is_exempt(&self) -> bool {
        matches!(self, MemberStatus::Creator | MemberStatus::Administrator)
    }
}

/// Permission set sent along with a restriction.
///
/// Field names match the Bot API so the struct serializes straight into the
/// `permissions` parameter of `restrictChatMember`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPermissions {
    pub can_send_messages: bool,
    pub can_send_audios: bool,
    pub can_send_documents: bool,
    pub can_send_photos: bool,
    pub can_send_videos: bool,
    pub can_send_video_notes: bool,
    pub can_send_voice_notes: bool,
    pub can_send_polls: bool,
    pub can_send_other_messages: bool,
    pub can_add_web_page_previews: bool,
    pub can_change_info: bool,
    pub can_invite_users: bool,
    pub can_pin_messages: bool,
    pub can_manage_topics: bool,
}

impl ChatPermissions {
    /// Nothing allowed: the member can only read.
    pub fn read_only() -> Self {
        Self {
            can_send_messages: false,
            can_send_audios: false,
            can_send_documents: false,
            can_send_photos: false,
            can_send_videos: false,
            can_send_video_notes: false,
            can_send_voice_notes: false,
            can_send_polls: false,
            can_send_other_messages: false,
            can_add_web_page_previews: false,
            can_change_info: false,
            can_invite_users: false,
            can_pin_messages: false,
            can_manage_topics: false,
        }
    }
}

// ============================================================================
// POLICY AND ENFORCEMENT RESULTS
// ============================================================================

/// A confirmed policy violation. Only the evaluator creates these, so holding
/// one proves the message matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub keyword: String,
}

/// Result of evaluating a message against the keyword set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationResult {
    NoMatch,
    Matched(Violation),
}

impl ViolationResult {
    pub fn matched(keyword: impl Into<String>) -> Self {
        ViolationResult::Matched(Violation {
            keyword: keyword.into(),
        })
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            ViolationResult::NoMatch => None,
            ViolationResult::Matched(violation) => Some(violation),
        }
    }
}

/// Result of one chat action (delete or sanction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded,
    Failed { error: String },
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded)
    }
}

/// What happened to the message and its author once both actions ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementReport {
    pub keyword: String,
    pub delete: ActionOutcome,
    pub sanction: ModerationAction,
    pub sanction_outcome: ActionOutcome,
    /// Set when the admin lookup failed and enforcement went ahead anyway.
    pub admin_check_error: Option<String>,
}

/// Final state of one pass through the executor. Used for logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcementOutcome {
    /// The author is a creator or administrator.
    Exempt,
    /// The admin lookup failed and the policy is fail-closed.
    Skipped { admin_check_error: String },
    Enforced(EnforcementReport),
}
