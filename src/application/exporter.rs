//! Export driver: walks the channel history page by page and writes every
//! message to its own document.
//!
//! One run is a loop of fetch, render, persist, advance. The cursor only moves
//! after a page is fully persisted, and cancellation is observed between pages
//! (or while waiting on the source), so a cancelled run never leaves a
//! half-handled page behind.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;

use crate::domain::{
    AppConfig, AppError, CursorStep, EntityKind, ExportConfig, ExportCursor, ExportSummary,
    RawMessage, Result, SkippedMessage,
};
use crate::infrastructure::{DocumentStore, IndexWriter, MessageSource, StatsRow, StatsWriter};

use super::entity_formatter::{user_id_link, LinkContext};
use super::renderer::render_message;
use super::retry::Backoff;

/// Which artifacts a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportPlan {
    pub documents: bool,
    pub index: bool,
    pub stats: bool,
}

impl ExportPlan {
    /// Plan taken from the `[export]` section.
    #[must_use]
    pub const fn from_config(config: &ExportConfig) -> Self {
        Self {
            documents: config.write_documents,
            index: config.write_index,
            stats: config.write_stats,
        }
    }

    /// Only the per-message documents.
    #[must_use]
    pub const fn documents_only() -> Self {
        Self {
            documents: true,
            index: false,
            stats: false,
        }
    }

    const fn is_empty(&self) -> bool {
        !self.documents && !self.index && !self.stats
    }
}

/// Progress report for one handled page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    /// 1-based page number.
    pub page: usize,
    /// Running count of the first message on this page.
    pub from: usize,
    /// Running count of the last message on this page.
    pub to: usize,
    pub newest_id: i64,
    pub oldest_id: i64,
}

/// Drives one export over an explicitly owned source.
pub struct ExportDriver<S> {
    source: S,
    config: AppConfig,
    plan: ExportPlan,
    cancel: CancellationToken,
}

impl<S: MessageSource> ExportDriver<S> {
    #[must_use]
    pub fn new(source: S, config: AppConfig, plan: ExportPlan) -> Self {
        Self {
            source,
            config,
            plan,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the export to completion, cancellation or the first fatal error.
    ///
    /// `on_page` is called after every persisted page. The source is closed on
    /// every exit path.
    ///
    /// # Errors
    /// Returns the first fatal error: a permanent source failure, exhausted
    /// retries, a stalled cursor, or an unwritable destination. Messages that
    /// fail to render are not errors; they are listed in the summary.
    pub async fn run<F>(mut self, mut on_page: F) -> Result<ExportSummary>
    where
        F: FnMut(&PageProgress) + Send,
    {
        let outcome = self.export(&mut on_page).await;
        let closed = self.source.close().await;

        match (outcome, closed) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(error = %close_err, "Failed to close message source");
                Err(e)
            }
        }
    }

    async fn export<F>(&mut self, on_page: &mut F) -> Result<ExportSummary>
    where
        F: FnMut(&PageProgress) + Send,
    {
        let channel = self.config.channel().to_string();
        if channel.is_empty() {
            return Err(AppError::Config {
                message: "No channel configured (set --channel or TELEGRAM_CHANNEL_USERNAME)"
                    .into(),
            });
        }
        if self.plan.is_empty() {
            return Err(AppError::Config {
                message: "Nothing to export: documents, index and stats are all disabled".into(),
            });
        }

        let store = if self.plan.documents {
            Some(DocumentStore::open(&self.config.export.output_dir)?)
        } else {
            None
        };
        let mut index = if self.plan.index {
            Some(IndexWriter::open(&self.config.index_path(), &channel)?)
        } else {
            None
        };
        let mut stats = if self.plan.stats {
            Some(StatsWriter::open(&self.config.stats_path())?)
        } else {
            None
        };

        let mut ctx = LinkContext::new(channel.as_str());
        let mut cursor = ExportCursor::new(self.config.export.page_size);
        let mut summary = ExportSummary::default();
        let cancel = self.cancel.clone();

        tracing::info!(
            channel = %channel,
            page_size = cursor.page_size,
            output = %self.config.export.output_dir.display(),
            "Starting export"
        );

        loop {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let page = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    summary.cancelled = true;
                    break;
                }
                page = self.fetch_page(cursor) => page?,
            };

            if page.is_empty() {
                tracing::debug!(last_id = cursor.last_id, "Empty page, history exhausted");
                break;
            }

            summary.pages += 1;
            let from = summary.processed + 1;

            for message in &page {
                summary.processed += 1;

                if !message.has_content() {
                    tracing::debug!(message_id = message.id, "Skipping message without content");
                    summary.empty += 1;
                    continue;
                }

                if let Some(stats) = stats.as_mut() {
                    stats.append(&StatsRow::from_message(message, &channel))?;
                }

                if let Some(index) = index.as_mut() {
                    index.add(message);
                }

                if let Some(store) = &store {
                    self.resolve_mentions(message, &mut ctx).await?;

                    match render_message(message, &ctx) {
                        Ok(document) => {
                            store.write(&document)?;
                            summary.documents_written += 1;
                        }
                        Err(e) => {
                            tracing::warn!(message_id = message.id, error = %e, "Skipping message");
                            summary.skipped.push(SkippedMessage {
                                message_id: message.id,
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }

            if let Some(stats) = stats.as_mut() {
                stats.flush()?;
            }

            let progress = PageProgress {
                page: summary.pages,
                from,
                to: summary.processed,
                newest_id: page.iter().map(|m| m.id).max().unwrap_or_default(),
                oldest_id: page.iter().map(|m| m.id).min().unwrap_or_default(),
            };
            tracing::info!(
                page = progress.page,
                newest_id = progress.newest_id,
                oldest_id = progress.oldest_id,
                "Processed messages {} to {}",
                progress.from,
                progress.to
            );
            on_page(&progress);

            match cursor.advance(&page) {
                Ok(CursorStep::Continue(next)) => cursor = next,
                Ok(CursorStep::Done) => break,
                Err(stalled) => {
                    return Err(AppError::Source {
                        message: format!(
                            "Source returned messages down to id {} after id {}; refusing to loop",
                            stalled.page_min_id, stalled.last_id
                        ),
                    });
                }
            }
        }

        if let Some(index) = index {
            if summary.cancelled {
                tracing::info!("Export cancelled, index not written");
            } else {
                summary.index_entries = index.finish()?;
            }
        }
        if let Some(stats) = &stats {
            summary.stats_rows = stats.rows();
        }

        tracing::info!(
            pages = summary.pages,
            processed = summary.processed,
            written = summary.documents_written,
            skipped = summary.skipped.len(),
            cancelled = summary.cancelled,
            "Export finished"
        );

        Ok(summary)
    }

    /// Fetch the page after `cursor`, retrying transient failures.
    async fn fetch_page(&mut self, cursor: ExportCursor) -> Result<Vec<RawMessage>> {
        let mut backoff = Backoff::new(&self.config.retry);
        loop {
            match self.source.fetch_page(cursor.last_id, cursor.page_size).await {
                Ok(page) => {
                    if backoff.attempts() > 0 {
                        tracing::info!(
                            last_id = cursor.last_id,
                            retries = backoff.attempts(),
                            "Fetch succeeded after retrying"
                        );
                    }
                    return Ok(page);
                }
                Err(e) => backoff.wait_after(e).await?,
            }
        }
    }

    /// Look up profile URLs for every user mentioned by id that is not cached yet.
    ///
    /// An unknown user, or one still throttled after every retry, is linked by
    /// id instead and cached so it is not looked up again. Any other failure
    /// stops the export.
    ///
    /// # Errors
    /// Returns permanent source, database or IO errors from the lookup.
    async fn resolve_mentions(&mut self, message: &RawMessage, ctx: &mut LinkContext) -> Result<()> {
        let caption_entities = message
            .media
            .as_ref()
            .and_then(|m| m.caption())
            .map(|(_, entities)| entities)
            .unwrap_or_default();

        let pending: BTreeSet<i64> = message
            .entities
            .iter()
            .chain(caption_entities)
            .filter_map(|e| match e.kind {
                EntityKind::MentionName { user_id } => Some(user_id),
                _ => None,
            })
            .filter(|id| !ctx.mention_urls.contains_key(id))
            .collect();

        for user_id in pending {
            let url = match self.resolve_user(user_id).await {
                Ok(Some(url)) => url,
                Ok(None) => {
                    tracing::debug!(user_id, "Mentioned user is unknown, linking by id");
                    user_id_link(user_id)
                }
                Err(e @ AppError::RetriesExhausted { .. }) => {
                    tracing::warn!(user_id, error = %e, "Could not resolve mentioned user");
                    user_id_link(user_id)
                }
                Err(e) => return Err(e),
            };
            ctx.mention_urls.insert(user_id, url);
        }

        Ok(())
    }

    async fn resolve_user(&mut self, user_id: i64) -> Result<Option<String>> {
        let mut backoff = Backoff::new(&self.config.retry);
        loop {
            match self.source.resolve_entity_user(user_id).await {
                Ok(url) => return Ok(url),
                Err(e) => backoff.wait_after(e).await?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::fs;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::*;
    use crate::domain::{Entity, RetryConfig};

    /// In-memory channel history with scripted failures.
    #[derive(Default)]
    struct FakeSource {
        messages: Vec<RawMessage>,
        failures: VecDeque<AppError>,
        users: HashMap<i64, String>,
        resolve_failures: VecDeque<AppError>,
        resolves: Arc<Mutex<Vec<i64>>>,
        fetches: Arc<Mutex<Vec<i64>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl FakeSource {
        fn with_ids(ids: impl IntoIterator<Item = i64>) -> Self {
            Self {
                messages: ids.into_iter().map(|id| message(id, &format!("Post {id}"))).collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl MessageSource for FakeSource {
        async fn fetch_page(&mut self, before_id: i64, limit: usize) -> Result<Vec<RawMessage>> {
            self.fetches.lock().unwrap().push(before_id);
            if let Some(err) = self.failures.pop_front() {
                return Err(err);
            }

            let mut page: Vec<_> = self
                .messages
                .iter()
                .filter(|m| before_id == 0 || m.id < before_id)
                .cloned()
                .collect();
            page.sort_by(|a, b| b.id.cmp(&a.id));
            page.truncate(limit);
            Ok(page)
        }

        async fn resolve_entity_user(&mut self, user_id: i64) -> Result<Option<String>> {
            self.resolves.lock().unwrap().push(user_id);
            if let Some(err) = self.resolve_failures.pop_front() {
                return Err(err);
            }
            Ok(self.users.get(&user_id).cloned())
        }

        async fn close(&mut self) -> Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn message(id: i64, text: &str) -> RawMessage {
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
        RawMessage::new(id, text, date)
    }

    fn config(dir: &Path, page_size: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.export.channel = "@mychannel".into();
        config.export.output_dir = dir.to_path_buf();
        config.export.page_size = page_size;
        config.retry = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
            jitter: false,
        };
        config
    }

    fn md_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".md"))
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_empty_history_writes_nothing() {
        let dir = tempdir().unwrap();
        let source = FakeSource::default();
        let closed = Arc::clone(&source.closed);

        let driver = ExportDriver::new(source, config(dir.path(), 100), ExportPlan::documents_only());
        let summary = driver.run(|_| {}).await.unwrap();

        assert_eq!(summary.pages, 0);
        assert_eq!(summary.documents_written, 0);
        assert!(md_files(dir.path()).is_empty());
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn test_full_page_with_malformed_entity_writes_every_document() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::with_ids(1..=100);
        source.messages[49].entities = vec![Entity::new(EntityKind::Bold, 3, 500)];

        let driver = ExportDriver::new(source, config(dir.path(), 100), ExportPlan::documents_only());
        let summary = driver.run(|_| {}).await.unwrap();

        assert_eq!(summary.documents_written, 100);
        assert!(summary.skipped.is_empty());
        assert_eq!(md_files(dir.path()).len(), 100);

        let content = fs::read_to_string(dir.path().join("50.md")).unwrap();
        assert!(content.starts_with("Post 50\n"));
    }

    #[tokio::test]
    async fn test_pages_walk_backward_and_report_progress() {
        let dir = tempdir().unwrap();
        let source = FakeSource::with_ids(1..=25);
        let fetches = Arc::clone(&source.fetches);

        let mut reports = Vec::new();
        let driver = ExportDriver::new(source, config(dir.path(), 10), ExportPlan::documents_only());
        let summary = driver.run(|p| reports.push(*p)).await.unwrap();

        assert_eq!(summary.pages, 3);
        assert_eq!(summary.processed, 25);
        assert_eq!(*fetches.lock().unwrap(), vec![0, 16, 6, 1]);
        assert_eq!(
            reports.iter().map(|p| (p.from, p.to)).collect::<Vec<_>>(),
            vec![(1, 10), (11, 20), (21, 25)]
        );
        assert_eq!((reports[0].newest_id, reports[0].oldest_id), (25, 16));
        assert_eq!(md_files(dir.path()).len(), 25);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::with_ids(1..=3);
        source.failures = VecDeque::from([
            AppError::transient("FLOOD_WAIT"),
            AppError::transient("FLOOD_WAIT"),
        ]);

        let driver = ExportDriver::new(source, config(dir.path(), 100), ExportPlan::documents_only());
        let summary = driver.run(|_| {}).await.unwrap();

        assert_eq!(summary.documents_written, 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_fatal_and_close_the_source() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::with_ids(1..=3);
        source.failures = (0..10).map(|_| AppError::transient("timeout")).collect();
        let closed = Arc::clone(&source.closed);

        let driver = ExportDriver::new(source, config(dir.path(), 100), ExportPlan::documents_only());
        let result = driver.run(|_| {}).await;

        assert!(matches!(result, Err(AppError::RetriesExhausted { attempts: 4, .. })));
        assert!(*closed.lock().unwrap());
        assert!(md_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_permanent_error_stops_immediately() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::with_ids(1..=3);
        source.failures = VecDeque::from([AppError::Source {
            message: "CHANNEL_PRIVATE".into(),
        }]);
        let fetches = Arc::clone(&source.fetches);
        let closed = Arc::clone(&source.closed);

        let driver = ExportDriver::new(source, config(dir.path(), 100), ExportPlan::documents_only());
        let result = driver.run(|_| {}).await;

        assert!(matches!(result, Err(AppError::Source { .. })));
        assert_eq!(fetches.lock().unwrap().len(), 1);
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn test_render_fault_is_skipped_and_reported() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::with_ids([5, 4]);
        source.messages.push(message(0, "orphan"));

        let driver = ExportDriver::new(source, config(dir.path(), 100), ExportPlan::documents_only());
        let summary = driver.run(|_| {}).await.unwrap();

        assert_eq!(summary.documents_written, 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].message_id, 0);
        assert_eq!(md_files(dir.path()), vec!["4.md", "5.md"]);
    }

    #[tokio::test]
    async fn test_messages_without_content_are_counted_not_written() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::with_ids([3, 1]);
        source.messages.push(message(2, ""));

        let driver = ExportDriver::new(source, config(dir.path(), 100), ExportPlan::documents_only());
        let summary = driver.run(|_| {}).await.unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.empty, 1);
        assert_eq!(md_files(dir.path()), vec!["1.md", "3.md"]);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_with_identical_content() {
        let dir = tempdir().unwrap();

        for _ in 0..2 {
            let driver = ExportDriver::new(
                FakeSource::with_ids(1..=5),
                config(dir.path(), 2),
                ExportPlan::documents_only(),
            );
            driver.run(|_| {}).await.unwrap();
        }

        let first = fs::read_to_string(dir.path().join("3.md")).unwrap();
        assert_eq!(md_files(dir.path()).len(), 5);
        assert_eq!(
            first,
            "Post 3\n\n---\n[Original Post](https://t.me/mychannel/3)\nDate: 2024-01-15\n"
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start_fetches_nothing() {
        let dir = tempdir().unwrap();
        let source = FakeSource::with_ids(1..=5);
        let fetches = Arc::clone(&source.fetches);
        let closed = Arc::clone(&source.closed);

        let token = CancellationToken::new();
        token.cancel();

        let driver = ExportDriver::new(source, config(dir.path(), 2), ExportPlan::documents_only())
            .with_cancellation(token);
        let summary = driver.run(|_| {}).await.unwrap();

        assert!(summary.cancelled);
        assert!(fetches.lock().unwrap().is_empty());
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn test_cancellation_between_pages_keeps_finished_pages() {
        let dir = tempdir().unwrap();
        let token = CancellationToken::new();
        let trigger = token.clone();

        let mut plan = ExportPlan::documents_only();
        plan.index = true;
        let driver = ExportDriver::new(FakeSource::with_ids(1..=10), config(dir.path(), 4), plan)
            .with_cancellation(token);
        let summary = driver.run(|_| trigger.cancel()).await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.pages, 1);
        assert_eq!(md_files(dir.path()), vec!["10.md", "7.md", "8.md", "9.md"]);
        assert_eq!(summary.index_entries, 0);
    }

    #[tokio::test]
    async fn test_stalled_source_is_fatal() {
        struct Stuck;

        #[async_trait]
        impl MessageSource for Stuck {
            async fn fetch_page(&mut self, _: i64, _: usize) -> Result<Vec<RawMessage>> {
                Ok(vec![message(9, "again")])
            }

            async fn resolve_entity_user(&mut self, _: i64) -> Result<Option<String>> {
                Ok(None)
            }
        }

        let dir = tempdir().unwrap();
        let driver = ExportDriver::new(Stuck, config(dir.path(), 10), ExportPlan::documents_only());
        let result = driver.run(|_| {}).await;

        assert!(matches!(result, Err(AppError::Source { .. })));
    }

    #[tokio::test]
    async fn test_index_and_stats_only() {
        let dir = tempdir().unwrap();
        let source = FakeSource::with_ids([2, 1]);
        let plan = ExportPlan {
            documents: false,
            index: true,
            stats: true,
        };

        let driver = ExportDriver::new(source, config(dir.path(), 100), plan);
        let summary = driver.run(|_| {}).await.unwrap();

        assert_eq!(summary.documents_written, 0);
        assert_eq!(summary.index_entries, 2);
        assert_eq!(summary.stats_rows, 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("index.md")).unwrap(),
            "# Index of Telegram Channel: mychannel\n\n- [Post 2](2.md)\n- [Post 1](1.md)\n"
        );
        let stats = fs::read_to_string(dir.path().join("channel_stats.csv")).unwrap();
        assert_eq!(stats.lines().count(), 3);
        assert_eq!(md_files(dir.path()), vec!["index.md"]);
    }

    #[tokio::test]
    async fn test_mentions_resolved_once_with_fallback() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::default();
        source.users.insert(7, "https://t.me/alice".into());
        let resolves = Arc::clone(&source.resolves);

        let mention = |user_id, offset, length| {
            Entity::new(EntityKind::MentionName { user_id }, offset, length)
        };

        let mut newer = message(3, "Alice again, Bob again");
        newer.entities = vec![mention(7, 0, 5), mention(8, 13, 3)];
        let mut older = message(2, "Alice and Bob");
        older.entities = vec![mention(7, 0, 5), mention(8, 10, 3)];
        source.messages = vec![newer, older];

        let driver = ExportDriver::new(source, config(dir.path(), 100), ExportPlan::documents_only());
        driver.run(|_| {}).await.unwrap();

        let content = fs::read_to_string(dir.path().join("2.md")).unwrap();
        assert!(content.starts_with("[Alice](https://t.me/alice) and [Bob](tg://user?id=8)\n"));
        let content = fs::read_to_string(dir.path().join("3.md")).unwrap();
        assert!(content
            .starts_with("[Alice](https://t.me/alice) again, [Bob](tg://user?id=8) again\n"));

        let mut looked_up = resolves.lock().unwrap().clone();
        looked_up.sort_unstable();
        assert_eq!(looked_up, vec![7, 8]);
    }

    #[tokio::test]
    async fn test_throttled_mention_lookup_falls_back_to_id_link() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::default();
        source.users.insert(7, "https://t.me/alice".into());
        source.resolve_failures = (0..10).map(|_| AppError::transient("FLOOD_WAIT")).collect();

        let mut msg = message(2, "Alice");
        msg.entities = vec![Entity::new(EntityKind::MentionName { user_id: 7 }, 0, 5)];
        source.messages.push(msg);

        let driver = ExportDriver::new(source, config(dir.path(), 100), ExportPlan::documents_only());
        let summary = driver.run(|_| {}).await.unwrap();

        assert_eq!(summary.documents_written, 1);
        let content = fs::read_to_string(dir.path().join("2.md")).unwrap();
        assert!(content.starts_with("[Alice](tg://user?id=7)\n"));
    }

    #[tokio::test]
    async fn test_failing_mention_lookup_stops_the_export() {
        for failure in [
            AppError::Database {
                message: "disk image is malformed".into(),
                source: None,
            },
            AppError::Source {
                message: "AUTH_KEY_UNREGISTERED".into(),
            },
        ] {
            let dir = tempdir().unwrap();
            let mut source = FakeSource::with_ids([5, 4]);
            source.resolve_failures = VecDeque::from([failure]);
            let mut msg = message(6, "Alice");
            msg.entities = vec![Entity::new(EntityKind::MentionName { user_id: 7 }, 0, 5)];
            source.messages.push(msg);
            let closed = Arc::clone(&source.closed);

            let driver =
                ExportDriver::new(source, config(dir.path(), 100), ExportPlan::documents_only());
            let result = driver.run(|_| {}).await;

            assert!(matches!(
                result,
                Err(AppError::Database { .. } | AppError::Source { .. })
            ));
            assert!(*closed.lock().unwrap());
            assert!(!dir.path().join("6.md").exists());
        }
    }

    #[tokio::test]
    async fn test_index_only_run_creates_output_directory() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("fresh");
        let plan = ExportPlan {
            documents: false,
            index: true,
            stats: false,
        };

        let driver = ExportDriver::new(FakeSource::with_ids([2, 1]), config(&output, 100), plan);
        let summary = driver.run(|_| {}).await.unwrap();

        assert_eq!(summary.index_entries, 2);
        assert_eq!(
            fs::read_to_string(output.join("index.md")).unwrap(),
            "# Index of Telegram Channel: mychannel\n\n- [Post 2](2.md)\n- [Post 1](1.md)\n"
        );
    }

    #[tokio::test]
    async fn test_missing_channel_is_config_error() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path(), 10);
        cfg.export.channel = " @ ".into();

        let result = ExportDriver::new(FakeSource::with_ids(1..=2), cfg, ExportPlan::documents_only())
            .run(|_| {})
            .await;

        assert!(matches!(result, Err(AppError::Config { .. })));
    }
}
