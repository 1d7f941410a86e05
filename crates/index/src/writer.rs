//! Segment index writer
//!
//! Buffers added documents, flushes them into untagged segments, publishes
//! segments on commit and runs the merges its policy selects. Readers take a
//! point-in-time `SegmentSet` with `snapshot()`; merges never mutate a
//! published set, they swap in a new one.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tc_core::{Document, IndexSchema};
use tracing::{debug, error, info, warn};

use crate::error::IndexError;
use crate::policy::{MergePolicy, OneMerge};
use crate::segment::{Segment, SegmentId, SegmentSet};

/// Upper bound on merge rounds per trigger; a policy that keeps proposing
/// merges past this is cut off
const MAX_MERGE_ROUNDS: usize = 64;

/// Where merges run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeScheduler {
    /// Inline on the committing thread
    #[default]
    Serial,
    /// On a background thread; `wait_for_merges` joins
    Concurrent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexWriterConfig {
    /// Flush the buffer into a staged segment once it holds this many docs
    pub max_buffered_docs: Option<usize>,
    pub scheduler: MergeScheduler,
}

#[derive(Debug)]
struct WriterState {
    pending: Vec<Document>,
    /// Flushed but not yet committed
    staged: Vec<Arc<Segment>>,
    /// Visible to readers
    committed: SegmentSet,
    next_id: SegmentId,
    closed: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<WriterState>,
    /// Serializes merge execution and replication
    merge_lock: Mutex<()>,
    policy: Arc<dyn MergePolicy>,
}

pub struct IndexWriter {
    schema: Arc<IndexSchema>,
    config: IndexWriterConfig,
    shared: Arc<Shared>,
    merge_threads: Mutex<Vec<JoinHandle<()>>>,
}

impl IndexWriter {
    pub fn new(
        schema: Arc<IndexSchema>,
        policy: Arc<dyn MergePolicy>,
        config: IndexWriterConfig,
    ) -> Self {
        info!(
            "Opening index writer: schema={}, policy={}, scheduler={:?}",
            schema.name,
            policy.name(),
            config.scheduler
        );
        Self {
            schema,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(WriterState {
                    pending: Vec::new(),
                    staged: Vec::new(),
                    committed: Arc::new(Vec::new()),
                    next_id: 0,
                    closed: false,
                }),
                merge_lock: Mutex::new(()),
                policy,
            }),
            merge_threads: Mutex::new(Vec::new()),
        }
    }

    pub fn schema(&self) -> &Arc<IndexSchema> {
        &self.schema
    }

    pub fn merge_policy(&self) -> &Arc<dyn MergePolicy> {
        &self.shared.policy
    }

    /// Buffer a document; not visible until the next commit
    pub fn add_document(&self, doc: Document) -> Result<(), IndexError> {
        self.schema.validate_document(&doc)?;
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(IndexError::Closed);
        }
        state.pending.push(doc);
        if let Some(max) = self.config.max_buffered_docs {
            if state.pending.len() >= max.max(1) {
                flush(&mut state);
            }
        }
        Ok(())
    }

    /// Publish every buffered and staged document, then run natural merges
    pub fn commit(&self) -> Result<(), IndexError> {
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(IndexError::Closed);
            }
            flush(&mut state);
            if state.staged.is_empty() {
                return Ok(());
            }
            let mut segments: Vec<Arc<Segment>> = state.committed.as_ref().clone();
            let staged = std::mem::take(&mut state.staged);
            debug!("Committing {} new segments", staged.len());
            segments.extend(staged);
            state.committed = Arc::new(segments);
        }
        self.maybe_merge();
        Ok(())
    }

    /// Commit, then merge until at most `max_segments` remain
    pub fn force_merge(&self, max_segments: usize) -> Result<(), IndexError> {
        self.commit()?;
        self.wait_for_merges()?;

        let _guard = self.shared.merge_lock.lock();
        for _ in 0..MAX_MERGE_ROUNDS {
            let snapshot = self.snapshot();
            let merges = self.shared.policy.find_forced_merges(&snapshot, max_segments);
            if merges.is_empty() {
                info!(
                    "Force merge done: {} segments, {} docs",
                    snapshot.len(),
                    snapshot.iter().map(|s| s.len()).sum::<usize>()
                );
                return Ok(());
            }
            for merge in &merges {
                self.shared.execute(merge);
            }
        }
        warn!("Force merge stopped after {} rounds", MAX_MERGE_ROUNDS);
        Ok(())
    }

    /// Point-in-time view of the committed segments
    pub fn snapshot(&self) -> SegmentSet {
        self.shared.state.lock().committed.clone()
    }

    pub fn num_docs(&self) -> usize {
        self.snapshot().iter().map(|s| s.len()).sum()
    }

    pub fn segment_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Docs added but not committed
    pub fn pending_docs(&self) -> usize {
        let state = self.shared.state.lock();
        state.pending.len() + state.staged.iter().map(|s| s.len()).sum::<usize>()
    }

    /// Join all background merges
    pub fn wait_for_merges(&self) -> Result<(), IndexError> {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.merge_threads.lock());
        let mut failure = None;
        for handle in handles {
            if let Err(e) = handle.join() {
                let message = panic_message(&*e);
                error!("Merge thread panicked: {}", message);
                failure = Some(IndexError::MergeFailed(message));
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Replace the committed segments with a copy of `source` (replica
    /// recovery). Uncommitted docs are discarded.
    pub fn replicate_from(&self, source: &SegmentSet) -> Result<(), IndexError> {
        self.wait_for_merges()?;
        let _guard = self.shared.merge_lock.lock();
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(IndexError::Closed);
        }
        state.pending.clear();
        state.staged.clear();
        state.next_id = source.iter().map(|s| s.id() + 1).max().unwrap_or(0);
        state.committed = Arc::new(source.iter().cloned().collect());
        debug!(
            "Replicated {} segments ({} docs)",
            state.committed.len(),
            state.committed.iter().map(|s| s.len()).sum::<usize>()
        );
        Ok(())
    }

    /// Wait for merges and refuse further writes
    pub fn close(&self) -> Result<(), IndexError> {
        let joined = self.wait_for_merges();
        self.shared.state.lock().closed = true;
        joined
    }

    fn maybe_merge(&self) {
        match self.config.scheduler {
            MergeScheduler::Serial => self.shared.run_natural_merges(),
            MergeScheduler::Concurrent => {
                let shared = self.shared.clone();
                let handle = std::thread::spawn(move || shared.run_natural_merges());
                self.merge_threads.lock().push(handle);
            }
        }
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        for handle in std::mem::take(&mut *self.merge_threads.lock()) {
            let _ = handle.join();
        }
    }
}

impl Shared {
    fn run_natural_merges(&self) {
        let _guard = self.merge_lock.lock();
        for _ in 0..MAX_MERGE_ROUNDS {
            let snapshot = self.state.lock().committed.clone();
            let merges = self.policy.find_merges(&snapshot);
            if merges.is_empty() {
                return;
            }
            for merge in &merges {
                self.execute(merge);
            }
        }
        warn!("Natural merges stopped after {} rounds", MAX_MERGE_ROUNDS);
    }

    /// Run one merge and swap its result in. Caller holds `merge_lock`.
    fn execute(&self, merge: &OneMerge) {
        let (inputs, id) = {
            let mut state = self.state.lock();
            let inputs: Vec<Arc<Segment>> = merge
                .segments
                .iter()
                .filter_map(|id| state.committed.iter().find(|s| s.id() == *id).cloned())
                .collect();
            if inputs.len() != merge.segments.len() {
                warn!("Skipping merge of {:?}: segments no longer present", merge.segments);
                return;
            }
            let id = state.next_id;
            state.next_id += 1;
            (inputs, id)
        };

        let merged = Arc::new(self.policy.merge_segments(id, &inputs));

        // Rebuild from the current list so segments committed meanwhile are kept
        let mut state = self.state.lock();
        let removed: HashSet<SegmentId> = merge.segments.iter().copied().collect();
        let mut segments = Vec::with_capacity(state.committed.len());
        let mut placed = false;
        for segment in state.committed.iter() {
            if removed.contains(&segment.id()) {
                if !placed {
                    segments.push(merged.clone());
                    placed = true;
                }
            } else {
                segments.push(segment.clone());
            }
        }
        debug!(
            "Merged {:?} into {} ({} docs), {} segments now",
            merge.segments,
            merged.name(),
            merged.len(),
            segments.len()
        );
        state.committed = Arc::new(segments);
    }
}

/// Move the buffer into a staged untagged segment
fn flush(state: &mut WriterState) {
    if state.pending.is_empty() {
        return;
    }
    let docs = std::mem::take(&mut state.pending);
    let id = state.next_id;
    state.next_id += 1;
    state.staged.push(Arc::new(Segment::new(id, docs)));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
