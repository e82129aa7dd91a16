mod detector;
mod queue;
mod refetch;

pub use detector::ProximityDetector;
pub use queue::GuideQueue;
pub use refetch::RefetchPolicy;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::audio::{AudioBackend, AudioHandle};
use crate::bucket::{active_keys, BucketIndex, BucketKey};
use crate::config::EngineConfig;
use crate::geo::Coordinate;
use crate::notify::{notification_channel, NotificationReceiver, Notifier};
use crate::playback::{PlaybackController, PlaybackProgress};
use crate::poi::{PoiDetail, PoiId, PointOfInterest};
use crate::position::PositionHandle;
use crate::service::{DataService, ServiceError};

/// Engine-level failures; only surfaced from explicit user-driven calls
/// ([`GuideEngine::load_pois`], [`GuideEngine::poi_detail`]). Collaborator
/// errors inside the tick and drain loops degrade silently or emit a single
/// notification instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Counts returned by a successful [`GuideEngine::load_pois`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoiLoadSummary {
    /// POIs in the fetched set
    pub total: usize,
    /// POIs inside the current 3x3 bucket window
    pub nearby: usize,
}

/// All mutable session state, behind one lock.
///
/// The bucket index is replaced wholesale on refetch, never mutated in
/// place, so readers see either the old or the new index atomically.
struct EngineState {
    /// Every POI seen this session, merged by id across refetches
    known: HashMap<PoiId, PointOfInterest>,
    index: Option<BucketIndex>,
    current_bucket: Option<BucketKey>,
    /// POIs inside the active 3x3 bucket window
    active: Vec<PointOfInterest>,
    detected: HashSet<PoiId>,
    visited: HashSet<PoiId>,
    queue: GuideQueue,
    /// Single-flight guard for the drain loop
    draining: bool,
    fetch_origin: Option<Coordinate>,
    refetch_in_flight: bool,
    /// Handle of the narration currently playing, for skip and stop
    current_audio: Option<Arc<dyn AudioHandle>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            known: HashMap::new(),
            index: None,
            current_bucket: None,
            active: Vec::new(),
            detected: HashSet::new(),
            visited: HashSet::new(),
            queue: GuideQueue::new(),
            draining: false,
            fetch_origin: None,
            refetch_in_flight: false,
            current_audio: None,
        }
    }
}

#[derive(Default)]
struct TaskHandles {
    tick: Option<JoinHandle<()>>,
    drain: Option<JoinHandle<()>>,
}

struct EngineInner {
    config: EngineConfig,
    service: Arc<dyn DataService>,
    audio: Arc<dyn AudioBackend>,
    position: PositionHandle,
    notifier: Notifier,
    progress_tx: watch::Sender<PlaybackProgress>,
    detector: ProximityDetector,
    refetch_policy: RefetchPolicy,
    playback: PlaybackController,
    state: Mutex<EngineState>,
    tasks: StdMutex<TaskHandles>,
}

impl EngineInner {
    /// One detection tick: refresh the active window, scan for proximity
    /// entries, evaluate the refetch policy. Never blocks on in-flight
    /// fetches.
    async fn tick(self: &Arc<Self>, pos: Coordinate) {
        let mut st = self.state.lock().await;

        // Refresh the active subset only when the center bucket changes
        let key = BucketKey::of(pos);
        if st.current_bucket != Some(key) {
            if let Some(active) = st.index.as_ref().map(|i| i.query(&active_keys(pos))) {
                debug!(row = key.row, col = key.col, nearby = active.len(), "entered new bucket");
                st.active = active;
                st.current_bucket = Some(key);
            }
        }

        // Detection and queue insertion are one atomic step under the state
        // lock, so a POI can never be detected twice or dropped mid-resort
        let state = &mut *st;
        let batch = self
            .detector
            .scan(pos, &state.active, &mut state.detected);
        if !batch.is_empty() {
            debug!(count = batch.len(), "POIs entered proximity");
            st.queue.push_batch(batch);
            if !st.draining {
                st.draining = true;
                let inner = Arc::clone(self);
                let handle = tokio::spawn(async move { inner.drain().await });
                self.tasks.lock().expect("task registry poisoned").drain = Some(handle);
            }
        }

        if !st.refetch_in_flight && self.refetch_policy.due(st.fetch_origin, pos) {
            st.refetch_in_flight = true;
            drop(st);
            let inner = Arc::clone(self);
            tokio::spawn(async move { inner.refetch(pos).await });
        }
    }

    /// Pull a fresh POI set and swap in a rebuilt index. Failures keep the
    /// previous index and origin: stale data beats none.
    async fn refetch(self: Arc<Self>, pos: Coordinate) {
        let result = self
            .service
            .fetch_nearby_pois(pos, &self.config.user_id, false)
            .await;

        let mut st = self.state.lock().await;
        match result {
            Ok(pois) => {
                // Merge by id so previously detected/visited POIs keep their
                // identity across refetches
                for poi in pois {
                    st.known.insert(poi.id.clone(), poi);
                }
                let all: Vec<PointOfInterest> = st.known.values().cloned().collect();
                let index = BucketIndex::build(&all);
                st.active = index.query(&active_keys(pos));
                st.current_bucket = Some(BucketKey::of(pos));
                st.index = Some(index);
                st.fetch_origin = Some(pos);
                debug!(total = all.len(), nearby = st.active.len(), "POI set refreshed");
            }
            Err(e) => {
                warn!(error = %e, "POI refetch failed, keeping cached set");
            }
        }
        st.refetch_in_flight = false;
    }

    /// Sequencer drain loop: narrate one POI at a time until the queue
    /// empties. At most one drain is ever active (guarded by `draining`).
    async fn drain(self: Arc<Self>) {
        loop {
            let next = {
                let mut st = self.state.lock().await;
                // Resort by live distance and pop as a single atomic step
                match st.queue.resort_and_pop(self.position.get()) {
                    Some(poi) => poi,
                    None => {
                        st.draining = false;
                        return;
                    }
                }
            };
            self.narrate(next).await;
        }
    }

    /// Narrate one POI: announce, fetch content, play audio to completion.
    /// The POI is marked visited whether or not the content fetch succeeds.
    async fn narrate(&self, poi: PointOfInterest) {
        self.notifier.notify(format!("Approaching {}...", poi.name));

        let coords = self.position.get().unwrap_or(Coordinate::new(0.0, 0.0));
        match self
            .service
            .fetch_guide_info(&poi.id, &poi.name, coords)
            .await
        {
            Ok(guide) => {
                self.notifier.notify(guide.transcription.clone());
                if let Some(url) = &guide.audio_url {
                    match self.audio.load(url).await {
                        Ok(handle) => {
                            self.state.lock().await.current_audio = Some(Arc::clone(&handle));
                            let outcome = self
                                .playback
                                .run(
                                    handle,
                                    &guide.breakpoints_ms,
                                    &poi.name,
                                    poi.coordinates,
                                    &self.position,
                                    &self.progress_tx,
                                    &self.notifier,
                                )
                                .await;
                            debug!(poi = %poi.id, ?outcome, "playback finished");
                            self.state.lock().await.current_audio = None;
                        }
                        Err(e) => {
                            // Narration text was already emitted; just skip playback
                            warn!(poi = %poi.id, error = %e, "audio unavailable");
                        }
                    }
                }
            }
            Err(e) => {
                warn!(poi = %poi.id, error = %e, "guide content fetch failed");
                self.notifier
                    .notify(format!("Unable to load guide info for {}.", poi.name));
            }
        }

        self.state.lock().await.visited.insert(poi.id);
    }
}

/// The location-driven audio tour engine.
///
/// A fixed-period tick reads the shared position, consults the bucket index
/// for the active POI window, pushes newly entered POIs onto the guide
/// queue, and lets a single-flight sequencer narrate them one at a time.
/// All session state is owned by the instance; independent engines never
/// share anything.
pub struct GuideEngine {
    inner: Arc<EngineInner>,
}

impl GuideEngine {
    /// Build an engine and the receiver for its notification stream.
    pub fn new(
        config: EngineConfig,
        service: Arc<dyn DataService>,
        audio: Arc<dyn AudioBackend>,
        position: PositionHandle,
    ) -> (Self, NotificationReceiver) {
        let (notifier, notifications) = notification_channel();
        let (progress_tx, _) = watch::channel(PlaybackProgress::default());
        let detector = ProximityDetector::new(config.proximity_threshold_m);
        let refetch_policy = RefetchPolicy::new(config.refetch_distance_m);
        let playback = PlaybackController::new(
            config.poll_period,
            config.proximity_threshold_m,
            config.wander_margin_m,
        );
        let inner = Arc::new(EngineInner {
            config,
            service,
            audio,
            position,
            notifier,
            progress_tx,
            detector,
            refetch_policy,
            playback,
            state: Mutex::new(EngineState::new()),
            tasks: StdMutex::new(TaskHandles::default()),
        });
        (Self { inner }, notifications)
    }

    /// Subscribe to the playback progress signal
    pub fn progress(&self) -> watch::Receiver<PlaybackProgress> {
        self.inner.progress_tx.subscribe()
    }

    /// (Re)start a session at `origin`: clear detection and visit history,
    /// force-fetch the POI set, and build a fresh bucket index.
    pub async fn load_pois(&self, origin: Coordinate) -> Result<PoiLoadSummary, EngineError> {
        {
            let mut st = self.inner.state.lock().await;
            st.detected.clear();
            st.visited.clear();
            st.queue.clear();
            st.known.clear();
            st.index = None;
            st.current_bucket = None;
            st.active.clear();
            st.fetch_origin = None;
        }

        let pois = self
            .inner
            .service
            .fetch_nearby_pois(origin, &self.inner.config.user_id, true)
            .await?;

        let mut st = self.inner.state.lock().await;
        for poi in &pois {
            st.known.insert(poi.id.clone(), poi.clone());
        }
        let index = BucketIndex::build(&pois);
        st.active = index.query(&active_keys(origin));
        st.current_bucket = Some(BucketKey::of(origin));
        st.index = Some(index);
        st.fetch_origin = Some(origin);
        Ok(PoiLoadSummary {
            total: pois.len(),
            nearby: st.active.len(),
        })
    }

    /// Start the detection tick. A second start while running is a no-op.
    pub fn start(&self) {
        let mut tasks = self.inner.tasks.lock().expect("task registry poisoned");
        if tasks.tick.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        tasks.tick = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.config.tick_period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                // Ticks with no position fix simply skip work
                if let Some(pos) = inner.position.get() {
                    inner.tick(pos).await;
                }
            }
        }));
    }

    /// Stop the engine: cancel the tick, cancel any drain/playback, release
    /// the audio handle, and clear the queue so a later [`start`] is a
    /// clean slate. Detection and visit history survive until
    /// [`load_pois`].
    ///
    /// [`start`]: GuideEngine::start
    /// [`load_pois`]: GuideEngine::load_pois
    pub async fn stop(&self) {
        let (tick, drain) = {
            let mut tasks = self.inner.tasks.lock().expect("task registry poisoned");
            (tasks.tick.take(), tasks.drain.take())
        };
        if let Some(task) = tick {
            task.abort();
        }
        if let Some(task) = drain {
            task.abort();
        }

        let mut st = self.inner.state.lock().await;
        if let Some(audio) = st.current_audio.take() {
            audio.pause();
        }
        st.queue.clear();
        st.draining = false;
        let _ = self.inner.progress_tx.send(PlaybackProgress::default());
    }

    /// Skip the narration currently playing. Safe to call at any time; a
    /// no-op when nothing is playing. The drain loop continues with the
    /// next queued POI (skip is not stop).
    pub async fn skip(&self) {
        let st = self.inner.state.lock().await;
        if let Some(audio) = &st.current_audio {
            audio.pause();
        }
    }

    /// On-demand full detail for UI display; user-interaction path only
    pub async fn poi_detail(&self, poi_id: &str) -> Result<PoiDetail, EngineError> {
        Ok(self.inner.service.fetch_poi_detail(poi_id).await?)
    }

    /// Ids whose narration has fully completed this session
    pub async fn visited_ids(&self) -> HashSet<PoiId> {
        self.inner.state.lock().await.visited.clone()
    }

    /// Ids that have triggered proximity entry this session
    pub async fn detected_ids(&self) -> HashSet<PoiId> {
        self.inner.state.lock().await.detected.clone()
    }

    /// POIs currently awaiting narration
    pub async fn queued_len(&self) -> usize {
        self.inner.state.lock().await.queue.len()
    }
}
