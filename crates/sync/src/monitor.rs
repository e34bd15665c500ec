//! Roster file change monitor.
//!
//! [`FileMonitor`] decides *when* to re-read the source file and shields
//! the pipeline from a file that another process has locked. Two triggers
//! run concurrently — a fixed-interval poll and an OS directory
//! notification — and converge on a single load task that owns the
//! snapshot state. Re-reading an unchanged file is a no-op; a locked file
//! is "busy", retried a bounded number of times and then abandoned until
//! the next trigger.
//!
//! Readers (health checks, status queries) observe lock-free published
//! copies of the snapshot and fingerprint; they never block the load path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use notify::{RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use rollcall_core::collab::{ChangeSink, ImportAuthorizer, Notifier};
use rollcall_core::diff::{diff_snapshots, ChangeEvent, PassSummary};
use rollcall_core::{FileState, Snapshot};

use crate::dispatcher::WebhookDispatcher;
use crate::error::SyncError;
use crate::locking;

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of lock probes before a cycle is abandoned.
pub const DEFAULT_LOCK_RETRY_ATTEMPTS: u32 = 5;

/// Default delay between lock probes.
pub const DEFAULT_LOCK_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Default bound on how long `stop()` waits for in-flight work.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the trigger channel; bursts beyond this coalesce.
const TRIGGER_BUFFER: usize = 8;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// The roster spreadsheet to watch.
    pub file_path: PathBuf,
    pub poll_interval: Duration,
    pub lock_retry_attempts: u32,
    pub lock_retry_delay: Duration,
    pub shutdown_timeout: Duration,
}

impl MonitorConfig {
    /// Configuration with default intervals for the given file.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            lock_retry_attempts: DEFAULT_LOCK_RETRY_ATTEMPTS,
            lock_retry_delay: DEFAULT_LOCK_RETRY_DELAY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// What woke the load task.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    Poll,
    Watch,
}

/// Point-in-time monitor status for external queries.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub record_count: usize,
    pub last_summary: Option<PassSummary>,
}

// ---------------------------------------------------------------------------
// FileMonitor
// ---------------------------------------------------------------------------

/// Watches the roster file and drives the parse → diff → dispatch pipeline.
pub struct FileMonitor {
    inner: Arc<Inner>,
    run: Mutex<Option<RunState>>,
}

struct Inner {
    config: MonitorConfig,
    dispatcher: WebhookDispatcher,
    authorizer: Arc<dyn ImportAuthorizer>,
    sink: Arc<dyn ChangeSink>,
    notifier: Arc<dyn Notifier>,
    /// Last accepted snapshot, swapped atomically after each pass.
    snapshot: ArcSwap<Snapshot>,
    /// Fingerprint of the file at the last successful parse.
    file_state: ArcSwapOption<FileState>,
    last_summary: ArcSwapOption<PassSummary>,
    running: AtomicBool,
}

/// State held only while the monitor is running.
struct RunState {
    cancel: CancellationToken,
    /// Owns the OS watch; dropping it ends the notification stream.
    watcher: notify::RecommendedWatcher,
    handles: Vec<JoinHandle<()>>,
}

impl FileMonitor {
    /// Build a monitor.
    ///
    /// Fails if the file path has no existing parent directory — there
    /// would be nothing to watch, and the path is unresolvable (a fatal
    /// configuration error rather than a transient condition).
    pub fn new(
        config: MonitorConfig,
        dispatcher: WebhookDispatcher,
        authorizer: Arc<dyn ImportAuthorizer>,
        sink: Arc<dyn ChangeSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SyncError> {
        if !watch_dir(&config.file_path).exists() {
            return Err(SyncError::UnresolvablePath(config.file_path));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                dispatcher,
                authorizer,
                sink,
                notifier,
                snapshot: ArcSwap::from_pointee(Snapshot::new()),
                file_state: ArcSwapOption::empty(),
                last_summary: ArcSwapOption::empty(),
                running: AtomicBool::new(false),
            }),
            run: Mutex::new(None),
        })
    }

    /// Start the poll ticker, the directory watch, and the load task.
    ///
    /// Idempotent: calling `start` on a running monitor is a no-op.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), SyncError> {
        let mut run = self.run.lock().expect("monitor state poisoned");
        if run.is_some() {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel::<Trigger>(TRIGGER_BUFFER);

        let watcher = self.spawn_watch(tx.clone())?;

        let ticker = {
            let cancel = cancel.clone();
            let interval = self.inner.config.poll_interval;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            let _ = tx.try_send(Trigger::Poll);
                        }
                    }
                }
            })
        };

        let loader = {
            let inner = Arc::clone(&self.inner);
            let cancel = cancel.clone();
            tokio::spawn(async move { inner.run_loop(rx, cancel).await })
        };

        self.inner.running.store(true, Ordering::SeqCst);
        *run = Some(RunState {
            cancel,
            watcher,
            handles: vec![ticker, loader],
        });

        tracing::info!(
            path = %self.inner.config.file_path.display(),
            poll_secs = self.inner.config.poll_interval.as_secs_f64(),
            "Roster monitor started"
        );
        Ok(())
    }

    /// Stop the monitor and wait (bounded) for in-flight work to finish.
    ///
    /// Idempotent and safe to call concurrently with the running tasks.
    pub async fn stop(&self) {
        let state = self.run.lock().expect("monitor state poisoned").take();
        let Some(state) = state else {
            return;
        };

        self.inner.running.store(false, Ordering::SeqCst);
        state.cancel.cancel();
        drop(state.watcher);

        for handle in state.handles {
            if tokio::time::timeout(self.inner.config.shutdown_timeout, handle)
                .await
                .is_err()
            {
                tracing::warn!("Monitor task did not finish within the shutdown timeout");
            }
        }

        tracing::info!("Roster monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Combined health: running, file present and readable, not locked.
    pub fn health(&self) -> bool {
        let path = &self.inner.config.file_path;
        self.is_running()
            && std::fs::File::open(path).is_ok()
            && !locking::is_locked(path)
    }

    /// Lock-free status query; never blocks the load path.
    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            running: self.is_running(),
            record_count: self.inner.snapshot.load().len(),
            last_summary: self.inner.last_summary.load().as_deref().copied(),
        }
    }

    /// The last accepted snapshot. Safe to hold across later passes.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.load_full()
    }

    /// Register the OS directory watch, forwarding events that touch the
    /// roster file into the trigger channel. The watcher owns its own
    /// notification thread; dropping it on `stop()` releases the watch.
    fn spawn_watch(
        &self,
        tx: mpsc::Sender<Trigger>,
    ) -> Result<notify::RecommendedWatcher, SyncError> {
        let file_name = self.inner.config.file_path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(
            move |result: Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    let relevant = file_name.as_ref().map_or(true, |name| {
                        event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(name.as_os_str()))
                    });
                    if relevant {
                        // A full channel already guarantees a pending pass.
                        let _ = tx.try_send(Trigger::Watch);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Directory watch error"),
            },
        )?;

        watcher.watch(
            &watch_dir(&self.inner.config.file_path),
            RecursiveMode::NonRecursive,
        )?;

        Ok(watcher)
    }
}

/// Directory watched for changes to the roster file.
fn watch_dir(file_path: &Path) -> PathBuf {
    match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

// ---------------------------------------------------------------------------
// Load task
// ---------------------------------------------------------------------------

impl Inner {
    /// Single-owner loop: all snapshot writes happen here.
    async fn run_loop(self: Arc<Self>, mut rx: mpsc::Receiver<Trigger>, cancel: CancellationToken) {
        loop {
            let trigger = tokio::select! {
                _ = cancel.cancelled() => break,
                trigger = rx.recv() => match trigger {
                    Some(trigger) => trigger,
                    None => break,
                },
            };

            // Coalesce bursts so concurrent triggers converge on one pass.
            while rx.try_recv().is_ok() {}

            self.run_cycle(trigger, &cancel).await;
        }
    }

    async fn run_cycle(&self, trigger: Trigger, cancel: &CancellationToken) {
        let allowed = self.authorizer.can_import();
        self.authorizer.record_attempt(allowed);
        if !allowed {
            // Silent no-op: an unauthorized actor must not learn whether
            // the file changed.
            tracing::debug!("Import not authorized, skipping cycle");
            return;
        }

        let path = &self.config.file_path;
        let current = match FileState::of(path) {
            Ok(state) => state,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Roster file unavailable");
                return;
            }
        };

        if self.file_state.load().as_deref() == Some(&current) {
            tracing::trace!(?trigger, "Fingerprint unchanged, skipping parse");
            return;
        }

        if !self.wait_until_unlocked(cancel).await {
            return;
        }

        let parse_path = path.clone();
        let parsed =
            tokio::task::spawn_blocking(move || rollcall_sheet::read_snapshot(&parse_path)).await;
        let outcome = match parsed {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Roster read failed, retrying on next trigger");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Roster parse task panicked");
                return;
            }
        };

        let previous = self.snapshot.load_full();
        let mut outcome_diff = diff_snapshots(&previous, &outcome.snapshot);
        outcome_diff.summary.duplicates += outcome.counters.duplicates;
        outcome_diff.summary.skipped_rows += outcome.counters.skipped_rows;

        // Commit the batch before publishing. A rejected batch leaves the
        // old snapshot and fingerprint in place, so the next trigger
        // re-detects and re-applies (the sink is idempotent on the
        // admission-number key).
        if !outcome_diff.events.is_empty() {
            if let Err(e) = self.sink.apply_changes(&outcome_diff.events) {
                tracing::warn!(error = %e, "Change batch rejected, retrying next cycle");
                return;
            }
        }

        for event in &outcome_diff.events {
            self.dispatcher.dispatch(event).await;
        }

        // The snapshot is replaced only after every event for the pass has
        // been handed off; readers keep seeing the old one until then.
        self.snapshot.store(Arc::new(outcome.snapshot));
        self.file_state.store(Some(Arc::new(current)));
        self.last_summary.store(Some(Arc::new(outcome_diff.summary)));

        if outcome_diff.summary.has_changes() {
            let description = outcome_diff.summary.describe();
            tracing::info!(summary = %description, "Roster changes synchronized");
            self.notifier.notify("Roster synchronized", &description);
        } else {
            tracing::debug!(?trigger, "Roster re-read produced no changes");
        }
    }

    /// Bounded wait for the file to become lock-free.
    ///
    /// Returns `false` when the cycle should be abandoned (still locked
    /// after all attempts, or the monitor is stopping). The sleep is
    /// cancellation-aware so `stop()` returns promptly.
    async fn wait_until_unlocked(&self, cancel: &CancellationToken) -> bool {
        let attempts = self.config.lock_retry_attempts;
        for attempt in 1..=attempts {
            if !locking::is_locked(&self.config.file_path) {
                return true;
            }
            if attempt == attempts {
                break;
            }
            tracing::debug!(attempt, "Roster file is busy, waiting");
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.config.lock_retry_delay) => {}
            }
        }

        tracing::warn!(
            attempts,
            "Roster file still locked, abandoning this cycle"
        );
        false
    }
}

// ---------------------------------------------------------------------------
// LogNotifier
// ---------------------------------------------------------------------------

/// Notifier that writes to the log instead of a GUI surface. Used by the
/// standalone watcher binary.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        tracing::info!(title, message, "Notification");
    }
}

/// Change sink that only logs the batch. Used by the standalone watcher
/// binary, where persistence happens on the receiving side.
pub struct LogSink;

impl ChangeSink for LogSink {
    fn apply_changes(&self, changes: &[ChangeEvent]) -> Result<(), rollcall_core::CoreError> {
        for change in changes {
            tracing::debug!(
                event_type = %change.kind,
                admission_number = %change.admission_number,
                "Change detected"
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use rust_xlsxwriter::Workbook;

    use crate::dispatcher::DispatcherConfig;
    use crate::locking::lock_marker_path;

    /// Authorizer with a switchable verdict and an audit counter.
    struct TestGate {
        allow: AtomicBool,
        attempts: AtomicUsize,
    }

    impl TestGate {
        fn new(allow: bool) -> Arc<Self> {
            Arc::new(Self {
                allow: AtomicBool::new(allow),
                attempts: AtomicUsize::new(0),
            })
        }
    }

    impl ImportAuthorizer for TestGate {
        fn can_import(&self) -> bool {
            self.allow.load(Ordering::SeqCst)
        }

        fn record_attempt(&self, _allowed: bool) {
            self.attempts.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct SilentNotifier;

    impl Notifier for SilentNotifier {
        fn notify(&self, _title: &str, _message: &str) {}
    }

    /// Sink that records every batch it is handed.
    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<ChangeEvent>>>,
    }

    impl RecordingSink {
        fn last_batch(&self) -> Vec<ChangeEvent> {
            self.batches.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    impl ChangeSink for RecordingSink {
        fn apply_changes(&self, changes: &[ChangeEvent]) -> Result<(), rollcall_core::CoreError> {
            self.batches.lock().unwrap().push(changes.to_vec());
            Ok(())
        }
    }

    fn write_roster(path: &Path, rows: &[[&str; 6]]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in ["Admission", "Name", "Grade", "Joined", "Gender", "Status"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        for (i, row) in rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                sheet.write_string(i as u32 + 1, col as u16, *value).unwrap();
            }
        }
        workbook.save(path).unwrap();
    }

    fn fast_config(path: &Path) -> MonitorConfig {
        MonitorConfig {
            file_path: path.to_path_buf(),
            poll_interval: Duration::from_millis(50),
            lock_retry_attempts: 2,
            lock_retry_delay: Duration::from_millis(20),
            shutdown_timeout: Duration::from_secs(5),
        }
    }

    fn loopback_dispatcher() -> WebhookDispatcher {
        WebhookDispatcher::new(DispatcherConfig {
            url: "http://127.0.0.1:1/webhook".into(),
            api_key: "test".into(),
            hmac_secret: None,
        })
        .unwrap()
    }

    fn monitor(path: &Path, gate: Arc<TestGate>) -> FileMonitor {
        monitor_with_sink(path, gate, Arc::new(RecordingSink::default()))
    }

    fn monitor_with_sink(
        path: &Path,
        gate: Arc<TestGate>,
        sink: Arc<RecordingSink>,
    ) -> FileMonitor {
        FileMonitor::new(
            fast_config(path),
            loopback_dispatcher(),
            gate,
            sink,
            Arc::new(SilentNotifier),
        )
        .unwrap()
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not reached within 2s");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn initial_pass_loads_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.xlsx");
        write_roster(
            &path,
            &[
                ["A1", "Jane", "Grade 1", "2022-01-01", "F", "active"],
                ["A2", "Yusuf", "Grade 2", "2022-01-01", "M", "active"],
            ],
        );

        let m = monitor(&path, TestGate::new(true));
        m.start().unwrap();

        wait_for(|| m.status().record_count == 2).await;
        let summary = m.status().last_summary.unwrap();
        assert_eq!(summary.new, 2);
        assert!(m.health());

        m.stop().await;
        assert!(!m.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unchanged_file_produces_no_second_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.xlsx");
        write_roster(&path, &[["A1", "Jane", "Grade 1", "2022-01-01", "F", "active"]]);

        let m = monitor(&path, TestGate::new(true));
        m.start().unwrap();
        wait_for(|| m.status().record_count == 1).await;

        // Let several polls elapse over the unchanged file.
        tokio::time::sleep(Duration::from_millis(300)).await;

        let summary = m.status().last_summary.unwrap();
        // Still the summary of the first pass, not a later no-change pass.
        assert_eq!(summary.new, 1);
        assert_eq!(summary.unchanged, 0);

        m.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn edit_is_picked_up_and_diffed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.xlsx");
        write_roster(&path, &[["A1", "Jane", "Grade 1", "2022-01-01", "F", "active"]]);

        let sink = Arc::new(RecordingSink::default());
        let m = monitor_with_sink(&path, TestGate::new(true), Arc::clone(&sink));
        m.start().unwrap();
        wait_for(|| m.status().record_count == 1).await;

        write_roster(
            &path,
            &[
                ["A1", "Jane Smith", "Grade 1", "2022-01-01", "F", "active"],
                ["A2", "Yusuf", "Grade 2", "2022-01-01", "M", "active"],
            ],
        );

        wait_for(|| m.status().record_count == 2).await;
        let summary = m.status().last_summary.unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.new, 1);

        // The batch reaches the sink in iteration order: update, then new.
        let batch: Vec<_> = sink
            .last_batch()
            .iter()
            .map(|e| (e.kind, e.admission_number.clone()))
            .collect();
        assert_eq!(
            batch,
            vec![
                (rollcall_core::ChangeKind::StudentUpdated, "a1".to_string()),
                (rollcall_core::ChangeKind::NewStudent, "a2".to_string()),
            ]
        );

        // Removing A1 yields a removal carrying the old record, last.
        write_roster(&path, &[["A2", "Yusuf", "Grade 2", "2022-01-01", "M", "active"]]);
        wait_for(|| m.status().record_count == 1).await;
        let batch = sink.last_batch();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind, rollcall_core::ChangeKind::StudentRemoved);
        assert_eq!(batch[0].record.full_name, "Jane Smith");

        m.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn locked_file_abandons_cycle_then_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.xlsx");
        write_roster(&path, &[["A1", "Jane", "Grade 1", "2022-01-01", "F", "active"]]);
        std::fs::write(lock_marker_path(&path), b"").unwrap();

        let m = monitor(&path, TestGate::new(true));
        m.start().unwrap();

        // Lock retries exhaust; no snapshot is accepted.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(m.status().record_count, 0);
        assert!(!m.health());

        std::fs::remove_file(lock_marker_path(&path)).unwrap();
        wait_for(|| m.status().record_count == 1).await;

        m.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn denied_authorization_is_a_silent_audited_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.xlsx");
        write_roster(&path, &[["A1", "Jane", "Grade 1", "2022-01-01", "F", "active"]]);

        let gate = TestGate::new(false);
        let m = monitor(&path, Arc::clone(&gate));
        m.start().unwrap();

        wait_for(|| gate.attempts.load(Ordering::SeqCst) >= 2).await;
        assert_eq!(m.status().record_count, 0);
        assert!(m.status().last_summary.is_none());

        m.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_and_stop_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.xlsx");
        write_roster(&path, &[["A1", "Jane", "Grade 1", "2022-01-01", "F", "active"]]);

        let m = monitor(&path, TestGate::new(true));
        m.start().unwrap();
        m.start().unwrap();
        assert!(m.is_running());

        m.stop().await;
        m.stop().await;
        assert!(!m.is_running());
    }

    #[test]
    fn missing_parent_directory_fails_construction() {
        let result = FileMonitor::new(
            MonitorConfig::new("/definitely/not/a/dir/roster.xlsx"),
            loopback_dispatcher(),
            TestGate::new(true),
            Arc::new(RecordingSink::default()),
            Arc::new(SilentNotifier),
        );
        assert!(matches!(result, Err(SyncError::UnresolvablePath(_))));
    }
}
