// Long-polling loop - the event source for the whole bot.
//
// Each message update gets its own task so a slow Bot API call for one
// message never holds up the next. Fetch errors are retried with backoff;
// nothing here ever ends the process.

use super::update_handler::handle_update;
use super::Data;
use crate::core::moderation::{ActionError, ChatActions};
use crate::infra::telegram::telegram_models::Update;
use crate::infra::telegram::TelegramApiClient;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Anything that can hand out batches of updates.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ActionError>;
}

#[async_trait]
impl UpdateSource for TelegramApiClient {
    async fn fetch_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ActionError> {
        self.get_updates(offset).await
    }
}

/// Exponential delay between failed fetches.
#[derive(Debug)]
struct Backoff {
    current: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            current: INITIAL_BACKOFF,
        }
    }

    /// Delay to wait now; doubles the next one up to the cap.
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_BACKOFF);
        delay
    }

    fn reset(&mut self) {
        self.current = INITIAL_BACKOFF;
    }
}

/// Offset that acknowledges every update in `updates`.
fn next_offset(updates: &[Update], current: Option<i64>) -> Option<i64> {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .max()
        .max(current)
}

/// Poll `source` until `shutdown` resolves, spawning one task per update.
///
/// Tasks already running when shutdown arrives are awaited, so a violation
/// that has started enforcement is always seen through.
pub async fn run_polling<S, C, F>(source: Arc<S>, data: Arc<Data<C>>, shutdown: F)
where
    S: UpdateSource + ?Sized,
    C: ChatActions + 'static,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut offset: Option<i64> = None;
    let mut backoff = Backoff::new();
    let mut tasks = JoinSet::new();

    tracing::info!("Polling for updates");

    loop {
        let fetched = tokio::select! {
            _ = &mut shutdown => break,
            fetched = source.fetch_updates(offset) => fetched,
        };

        match fetched {
            Ok(updates) => {
                backoff.reset();
                offset = next_offset(&updates, offset);

                if !updates.is_empty() {
                    tracing::debug!(count = updates.len(), ?offset, "Received updates");
                }

                for update in updates {
                    let data = Arc::clone(&data);
                    tasks.spawn(async move {
                        handle_update(&data, update).await;
                    });
                }
            }
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::warn!("Failed to fetch updates, retrying in {:?}: {}", delay, e);
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                tracing::error!("Update task failed: {}", e);
            }
        }
    }

    tracing::info!(in_flight = tasks.len(), "Shutting down, waiting for running tasks");
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Update task failed: {}", e);
        }
    }
}
