use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

/// Audio layer failures. Always recoverable: narration proceeds without
/// playback when an asset cannot be obtained.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to load audio asset `{url}`: {reason}")]
    Load { url: String, reason: String },
}

/// A loaded, playable narration asset.
///
/// Decoding and output routing are the platform's problem; the engine only
/// needs transport control and a position/duration readout. Implementations
/// use interior mutability so a handle can be shared between the playback
/// poll and a skip request.
pub trait AudioHandle: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn is_playing(&self) -> bool;
    /// Current playback position, saturating at the duration
    fn position(&self) -> Duration;
    /// Total track length, if known yet
    fn duration(&self) -> Option<Duration>;
}

/// Obtains playable handles from audio URLs
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn load(&self, url: &str) -> Result<Arc<dyn AudioHandle>, AudioError>;
}

#[derive(Debug)]
struct Clock {
    playing: bool,
    accumulated: Duration,
    resumed_at: Option<Instant>,
}

/// Clock-driven stand-in for a real platform player.
///
/// "Plays" for a fixed duration on the tokio clock, so paused-clock tests
/// and the demo binary get realistic transport behavior without any audio
/// device.
pub struct SimulatedAudio {
    duration: Duration,
    clock: Mutex<Clock>,
}

impl SimulatedAudio {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            clock: Mutex::new(Clock {
                playing: false,
                accumulated: Duration::ZERO,
                resumed_at: None,
            }),
        }
    }

    fn elapsed(clock: &Clock) -> Duration {
        let running = clock
            .resumed_at
            .map(|at| at.elapsed())
            .unwrap_or(Duration::ZERO);
        clock.accumulated + running
    }
}

impl AudioHandle for SimulatedAudio {
    fn play(&self) {
        let mut clock = self.clock.lock().expect("audio clock poisoned");
        if !clock.playing {
            clock.playing = true;
            clock.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&self) {
        let mut clock = self.clock.lock().expect("audio clock poisoned");
        if clock.playing {
            let elapsed = Self::elapsed(&clock);
            clock.accumulated = elapsed.min(self.duration);
            clock.playing = false;
            clock.resumed_at = None;
        }
    }

    fn is_playing(&self) -> bool {
        let clock = self.clock.lock().expect("audio clock poisoned");
        clock.playing && Self::elapsed(&clock) < self.duration
    }

    fn position(&self) -> Duration {
        let clock = self.clock.lock().expect("audio clock poisoned");
        Self::elapsed(&clock).min(self.duration)
    }

    fn duration(&self) -> Option<Duration> {
        Some(self.duration)
    }
}

/// Backend producing [`SimulatedAudio`] handles of a fixed track length
pub struct SimulatedAudioBackend {
    track_duration: Duration,
}

impl SimulatedAudioBackend {
    pub fn new(track_duration: Duration) -> Self {
        Self { track_duration }
    }
}

#[async_trait]
impl AudioBackend for SimulatedAudioBackend {
    async fn load(&self, _url: &str) -> Result<Arc<dyn AudioHandle>, AudioError> {
        Ok(Arc::new(SimulatedAudio::new(self.track_duration)))
    }
}
