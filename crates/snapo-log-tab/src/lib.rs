//! Log-tab processor (§4.7): a single logical actor owning a ring buffer of
//! log entries, the regex cache, and the coalesced flush loop that turns
//! incoming entries into filtered, highlighted `TabUpdate`s.
//!
//! State transitions are serialized the way the teacher's
//! `server::ws_receiver`/`session` hold per-connection state behind a
//! message loop rather than a shared `Mutex`: callers post commands through
//! [`LogTabHandle`] and the actor task drains them one batch at a time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use snapo_log_filter::{DefaultRegexEngine, EvalOutcome, HighlightRange, RegexCache, RegexEngine};
use snapo_protocol::{Color, CoreWarning, FilterConfig, Id, LogEntry, LogField};
use snapo_ring_buffer::RingBuffer;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// Tunables for one log tab. `capacity` mirrors the spec's default of
/// 20000 entries.
#[derive(Debug, Clone, Copy)]
pub struct LogTabConfig {
    pub capacity: usize,
    pub flush_interval: Duration,
}

impl Default for LogTabConfig {
    fn default() -> Self {
        Self {
            capacity: 20_000,
            flush_interval: Duration::from_millis(50),
        }
    }
}

/// The evaluator's per-entry output, kept only for entries that survived
/// filtering -- a rejected entry never gets a `RenderedSnapshot`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSnapshot {
    pub id: Id,
    pub entry: LogEntry,
    pub row_color: Option<Color>,
    pub field_highlights: HashMap<LogField, Vec<HighlightRange>>,
}

/// One coalesced delivery to the consumer. Replaces, never accumulates:
/// while a flush is pending, a later cycle's update overwrites the earlier
/// one (§4.7 step 5).
#[derive(Debug, Clone, PartialEq)]
pub struct TabUpdate {
    pub rendered: Vec<RenderedSnapshot>,
    pub unread_delta: usize,
    pub dropped_entries: u64,
    pub warning: Option<CoreWarning>,
}

/// The async sink the actor delivers coalesced updates to. Must not block;
/// a saturated consumer should drop rather than suspend the actor loop.
pub trait TabUpdateSink: Send + Sync {
    fn send(&self, update: TabUpdate);
}

enum Command {
    Enqueue(LogEntry),
    RefreshConfiguration(FilterConfig),
    Reset,
    SetPaused(bool),
}

/// Handle used by callers to post work to the actor; all methods return as
/// soon as the command is enqueued on the actor's mailbox.
#[derive(Clone)]
pub struct LogTabHandle {
    tx: mpsc::Sender<Command>,
}

impl LogTabHandle {
    pub async fn enqueue(&self, entry: LogEntry) {
        let _ = self.tx.send(Command::Enqueue(entry)).await;
    }

    pub async fn refresh_configuration(&self, cfg: FilterConfig) {
        let _ = self.tx.send(Command::RefreshConfiguration(cfg)).await;
    }

    pub async fn reset(&self) {
        let _ = self.tx.send(Command::Reset).await;
    }

    pub async fn set_paused(&self, paused: bool) {
        let _ = self.tx.send(Command::SetPaused(paused)).await;
    }
}

/// Spawns the actor task on the current tokio runtime and returns a handle
/// to it. The task runs until every clone of the returned handle is dropped.
pub fn spawn(config: LogTabConfig, sink: Arc<dyn TabUpdateSink>) -> LogTabHandle {
    spawn_with_engine(config, DefaultRegexEngine, sink)
}

/// Same as [`spawn`] but with an injected [`RegexEngine`], for hosts that
/// route pattern compilation through a non-default engine.
pub fn spawn_with_engine<E: RegexEngine + Send + 'static>(
    config: LogTabConfig,
    engine: E,
    sink: Arc<dyn TabUpdateSink>,
) -> LogTabHandle {
    let (tx, rx) = mpsc::channel(1024);
    tokio::spawn(run(rx, config, engine, sink));
    LogTabHandle { tx }
}

async fn run<E: RegexEngine + Send + 'static>(
    mut rx: mpsc::Receiver<Command>,
    config: LogTabConfig,
    engine: E,
    sink: Arc<dyn TabUpdateSink>,
) {
    let mut actor = Actor {
        ring: RingBuffer::new(config.capacity),
        pending: Vec::new(),
        config: FilterConfig::default(),
        needs_full_recompute: false,
        paused: false,
        rendered: Vec::new(),
        cache: RegexCache::new(engine),
        pending_update: None,
    };

    let flush_interval = config.flush_interval;
    let mut flush_deadline: Option<Instant> = None;
    let mut buf = Vec::with_capacity(64);

    loop {
        tokio::select! {
            n = rx.recv_many(&mut buf, 64) => {
                if n == 0 {
                    break;
                }
                for cmd in buf.drain(..) {
                    actor.handle_command(cmd);
                }
                actor.process();
                if actor.pending_update.is_some() && flush_deadline.is_none() {
                    flush_deadline = Some(Instant::now() + flush_interval);
                }
            }
            _ = sleep_until_deadline(flush_deadline) => {
                if let Some(update) = actor.pending_update.take() {
                    sink.send(update);
                }
                flush_deadline = None;
            }
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending::<()>().await,
    }
}

struct Actor<E: RegexEngine> {
    ring: RingBuffer<LogEntry>,
    pending: Vec<LogEntry>,
    config: FilterConfig,
    needs_full_recompute: bool,
    paused: bool,
    rendered: Vec<RenderedSnapshot>,
    cache: RegexCache<E>,
    pending_update: Option<TabUpdate>,
}

impl<E: RegexEngine> Actor<E> {
    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Enqueue(entry) => {
                if !self.paused {
                    self.pending.push(entry);
                }
            }
            Command::RefreshConfiguration(cfg) => {
                self.config = cfg;
                self.needs_full_recompute = true;
            }
            Command::Reset => {
                self.ring.reset();
                self.pending.clear();
                self.rendered.clear();
                self.pending_update = None;
                self.needs_full_recompute = true;
            }
            Command::SetPaused(paused) => {
                self.paused = paused;
            }
        }
    }

    /// One iteration of the §4.7 processing loop.
    fn process(&mut self) {
        if self.pending.is_empty() && !self.needs_full_recompute {
            return;
        }

        let batch = std::mem::take(&mut self.pending);
        let batch_size = batch.len();
        let batch_ids: HashSet<Id> = batch.iter().map(|e| e.id).collect();

        let mut dropped_ids = Vec::new();
        for entry in batch {
            if let Some(evicted) = self.ring.append(entry) {
                dropped_ids.push(evicted.id);
            }
        }
        let dropped_count = self.ring.consume_drop_count();

        let mut warnings = Vec::new();

        if self.needs_full_recompute {
            self.full_recompute(&mut warnings);
        } else {
            self.incremental_render(batch_size, &mut warnings);
            self.drop_stale_rendered(&dropped_ids, &mut warnings);
        }

        if dropped_count > 100 {
            warnings.push(CoreWarning::BacklogDropped(dropped_count));
        }
        if batch_size > 10 {
            warnings.push(CoreWarning::SlowProcessing(batch_size));
        }

        let unread_delta = self
            .rendered
            .iter()
            .filter(|r| batch_ids.contains(&r.id))
            .count();

        self.pending_update = Some(TabUpdate {
            rendered: self.rendered.clone(),
            unread_delta,
            dropped_entries: dropped_count,
            warning: warnings.into_iter().last(),
        });
    }

    fn full_recompute(&mut self, warnings: &mut Vec<CoreWarning>) {
        let snapshot: Vec<LogEntry> = self.ring.all().into_iter().cloned().collect();
        self.rendered = snapshot
            .iter()
            .filter_map(|e| self.render_if_accepted(e, warnings))
            .collect();
        self.needs_full_recompute = false;
    }

    fn incremental_render(&mut self, batch_size: usize, warnings: &mut Vec<CoreWarning>) {
        let current = self.ring.all();
        let start = current.len().saturating_sub(batch_size);
        let newly: Vec<LogEntry> = current[start..].iter().map(|e| (*e).clone()).collect();
        for entry in &newly {
            if let Some(snap) = self.render_if_accepted(entry, warnings) {
                self.rendered.push(snap);
            }
        }
    }

    /// Removes entries evicted this cycle from the front of `rendered`. If
    /// they aren't there, that's a detected ordering-invariant violation:
    /// surface it and restart via a full recompute rather than leaving
    /// `rendered` inconsistent with the ring buffer.
    fn drop_stale_rendered(&mut self, dropped_ids: &[Id], warnings: &mut Vec<CoreWarning>) {
        if dropped_ids.is_empty() {
            return;
        }

        let mut prefix_len = 0;
        for id in dropped_ids {
            if prefix_len < self.rendered.len() && self.rendered[prefix_len].id == *id {
                prefix_len += 1;
            } else {
                warnings.push(CoreWarning::StateInconsistency(
                    "dropped entry id was not at the front of the rendered list".to_owned(),
                ));
                self.needs_full_recompute = true;
                break;
            }
        }

        if self.needs_full_recompute {
            self.full_recompute(warnings);
        } else {
            self.rendered.drain(0..prefix_len);
        }
    }

    fn render_if_accepted(
        &mut self,
        entry: &LogEntry,
        warnings: &mut Vec<CoreWarning>,
    ) -> Option<RenderedSnapshot> {
        let EvalOutcome {
            accepted,
            row_color,
            field_highlights,
        } = snapo_log_filter::evaluate(entry, &self.config, &mut self.cache, warnings);

        if !accepted {
            return None;
        }

        Some(RenderedSnapshot {
            id: entry.id,
            entry: entry.clone(),
            row_color,
            field_highlights,
        })
    }
}
