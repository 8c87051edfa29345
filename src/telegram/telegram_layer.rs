// Telegram layer - turns Bot API updates into moderation runs.
//
// This layer is THIN - no policy logic, just translation and task plumbing.

#[path = "poller.rs"]
pub mod poller;
#[path = "update_handler.rs"]
pub mod update_handler;

use crate::core::moderation::{ChatActions, ModerationService};

/// Shared state handed to every update task.
pub struct Data<C: ChatActions> {
    /// The only chat the bot moderates.
    pub group_chat_id: i64,
    pub moderation: ModerationService<C>,
}
