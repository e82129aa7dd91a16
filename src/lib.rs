//! Waypoint: a location-driven audio tour engine.
//!
//! Given a continuous (or simulated) stream of user positions, the engine
//! determines which points of interest are nearby, queues and sequentially
//! narrates the ones the user physically approaches, and gracefully
//! interrupts narration at the next safe pause point when the user wanders
//! away mid-playback.
//!
//! The moving parts, leaf first:
//!
//! - [`geo`]: great-circle distance and local-plane offset math
//! - [`bucket`]: a uniform-in-meters grid index over the POI set with a 3x3
//!   neighborhood query
//! - [`engine`]: the tick-driven proximity detector, the distance-sorted
//!   guide queue with its single-flight sequencer, and the refetch policy
//! - [`playback`]: the wander-aware playback controller
//! - [`service`]: the injected POI/content data service (HTTP or mock)
//! - [`audio`]: the playback handle abstraction (simulated implementation
//!   included)
//!
//! Rendering, permission prompts, and codec decoding live outside this
//! crate; the engine consumes a shared position slot and emits timestamped
//! notifications plus a playback progress signal.

pub mod audio;
pub mod bucket;
pub mod config;
pub mod engine;
pub mod geo;
pub mod notify;
pub mod playback;
pub mod poi;
pub mod position;
pub mod service;

pub use audio::{AudioBackend, AudioHandle, SimulatedAudio, SimulatedAudioBackend};
pub use config::EngineConfig;
pub use engine::{GuideEngine, PoiLoadSummary};
pub use geo::Coordinate;
pub use notify::{Notification, NotificationReceiver};
pub use playback::PlaybackProgress;
pub use poi::{GuideInfo, PoiDetail, PointOfInterest};
pub use position::{PositionHandle, SimulatedWalk};
pub use service::{DataService, HttpDataService, MockDataService, ServiceError};
