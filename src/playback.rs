use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::audio::AudioHandle;
use crate::geo::{distance_meters, Coordinate};
use crate::notify::Notifier;
use crate::position::PositionHandle;

/// Continuous playback readout for UI consumption (progress bar fill plus a
/// "wandering" indicator). Output only; the engine never reads it back.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackProgress {
    /// Elapsed fraction of the current narration, in [0, 1]
    pub fraction: f64,
    /// True once a wander target has been armed for the current narration
    pub wandering: bool,
}

/// How a playback session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The narration played to its natural end
    Completed,
    /// Playback was paused early (wander stop or an explicit skip)
    Interrupted,
}

enum WanderState {
    Playing,
    /// A pause point has been armed; playback stops when elapsed reaches it
    WanderingAway { target_ms: u64 },
}

/// First breakpoint strictly greater than the current elapsed time, if any
fn next_breakpoint(breakpoints_ms: &[u64], elapsed_ms: u64) -> Option<u64> {
    breakpoints_ms.iter().copied().find(|bp| *bp > elapsed_ms)
}

/// Couples audio playback to physical proximity.
///
/// While a narration plays, the live distance from its POI is polled; once
/// the user exceeds the wander distance, playback runs on to the next safe
/// pause point and stops there instead of continuing a tour the user has
/// left.
pub struct PlaybackController {
    poll_period: Duration,
    /// proximity threshold + wander margin
    wander_distance_m: f64,
}

impl PlaybackController {
    pub fn new(poll_period: Duration, proximity_threshold_m: f64, wander_margin_m: f64) -> Self {
        Self {
            poll_period,
            wander_distance_m: proximity_threshold_m + wander_margin_m,
        }
    }

    /// Play `handle` to completion, resolving exactly once.
    ///
    /// Completion means the handle reports not-playing after having been
    /// playing, whether the end was natural, a wander stop, or a skip.
    /// Progress is reset to zero on the way out.
    pub async fn run(
        &self,
        handle: Arc<dyn AudioHandle>,
        breakpoints_ms: &[u64],
        poi_name: &str,
        poi_coord: Coordinate,
        position: &PositionHandle,
        progress: &watch::Sender<PlaybackProgress>,
        notifier: &Notifier,
    ) -> PlaybackOutcome {
        handle.play();

        let mut started = false;
        let mut state = WanderState::Playing;
        let mut interval = tokio::time::interval(self.poll_period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if handle.is_playing() {
                started = true;
            }

            if let Some(total) = handle.duration().filter(|d| !d.is_zero()) {
                let elapsed = handle.position();
                let elapsed_ms = elapsed.as_millis() as u64;
                let _ = progress.send(PlaybackProgress {
                    fraction: (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0),
                    wandering: matches!(state, WanderState::WanderingAway { .. }),
                });

                match state {
                    WanderState::WanderingAway { target_ms } => {
                        if elapsed_ms >= target_ms {
                            handle.pause();
                        }
                    }
                    WanderState::Playing => {
                        if let Some(user) = position.get() {
                            if distance_meters(user, poi_coord) > self.wander_distance_m {
                                match next_breakpoint(breakpoints_ms, elapsed_ms) {
                                    Some(target_ms) => {
                                        state = WanderState::WanderingAway { target_ms };
                                        notifier.notify(format!(
                                            "Moving away from {poi_name}... ending at next pause."
                                        ));
                                    }
                                    // No pause point left in the narration
                                    None => handle.pause(),
                                }
                            }
                        }
                    }
                }
            }

            if started && !handle.is_playing() {
                let _ = progress.send(PlaybackProgress::default());
                let completed = handle
                    .duration()
                    .is_some_and(|total| handle.position() >= total);
                return if completed {
                    PlaybackOutcome::Completed
                } else {
                    PlaybackOutcome::Interrupted
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SimulatedAudio;
    use crate::geo::offset_meters;
    use crate::notify::notification_channel;

    const POI: Coordinate = Coordinate {
        latitude: 59.3293,
        longitude: 18.0686,
    };

    fn controller() -> PlaybackController {
        PlaybackController::new(Duration::from_millis(200), 30.0, 100.0)
    }

    #[test]
    fn test_next_breakpoint_picks_first_after_elapsed() {
        let breakpoints = [5_000, 15_000, 30_000];
        assert_eq!(next_breakpoint(&breakpoints, 8_000), Some(15_000));
        assert_eq!(next_breakpoint(&breakpoints, 0), Some(5_000));
        assert_eq!(next_breakpoint(&breakpoints, 15_000), Some(30_000));
        assert_eq!(next_breakpoint(&breakpoints, 31_000), None);
        assert_eq!(next_breakpoint(&[], 0), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_to_natural_end() {
        let handle = Arc::new(SimulatedAudio::new(Duration::from_secs(3)));
        let position = PositionHandle::new();
        position.set(POI);
        let (notifier, mut rx) = notification_channel();
        let (progress_tx, progress_rx) = watch::channel(PlaybackProgress::default());

        let outcome = controller()
            .run(
                handle,
                &[1_000, 2_000],
                "Stortorget",
                POI,
                &position,
                &progress_tx,
                &notifier,
            )
            .await;

        assert_eq!(outcome, PlaybackOutcome::Completed);
        assert_eq!(*progress_rx.borrow(), PlaybackProgress::default());
        assert!(rx.drain().is_empty(), "no wander notification expected");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wander_arms_breakpoint_and_stops_there() {
        let handle = Arc::new(SimulatedAudio::new(Duration::from_secs(30)));
        let position = PositionHandle::new();
        position.set(POI);
        let (notifier, mut rx) = notification_channel();
        let (progress_tx, _progress_rx) = watch::channel(PlaybackProgress::default());

        let run_handle = Arc::clone(&handle);
        let run_position = position.clone();
        let task = tokio::spawn(async move {
            controller()
                .run(
                    run_handle,
                    &[10_000, 20_000],
                    "Stortorget",
                    POI,
                    &run_position,
                    &progress_tx,
                    &notifier,
                )
                .await
        });

        // Walk out of range at ~4 s elapsed
        tokio::time::sleep(Duration::from_millis(4_000)).await;
        position.set(offset_meters(POI, 500.0, 0.0));

        let outcome = task.await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Interrupted);
        // Stopped at the armed breakpoint, not later
        assert_eq!(handle.position(), Duration::from_millis(10_000));

        let moving_away: Vec<_> = rx
            .drain()
            .into_iter()
            .filter(|n| n.text.starts_with("Moving away"))
            .collect();
        assert_eq!(moving_away.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wander_past_last_breakpoint_stops_immediately() {
        let handle = Arc::new(SimulatedAudio::new(Duration::from_secs(40)));
        let position = PositionHandle::new();
        position.set(POI);
        let (notifier, mut rx) = notification_channel();
        let (progress_tx, _progress_rx) = watch::channel(PlaybackProgress::default());

        let run_handle = Arc::clone(&handle);
        let run_position = position.clone();
        let task = tokio::spawn(async move {
            controller()
                .run(
                    run_handle,
                    &[5_000, 15_000, 30_000],
                    "Stortorget",
                    POI,
                    &run_position,
                    &progress_tx,
                    &notifier,
                )
                .await
        });

        // All breakpoints are behind us at 31 s; wander must stop right away
        tokio::time::sleep(Duration::from_millis(31_000)).await;
        position.set(offset_meters(POI, 500.0, 0.0));

        let outcome = task.await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Interrupted);
        let stopped_at = handle.position();
        assert!(
            stopped_at < Duration::from_millis(31_600),
            "stopped late: {stopped_at:?}"
        );
        assert!(rx.drain().iter().all(|n| !n.text.starts_with("Moving away")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_breakpoints_mean_no_wander_protection() {
        let handle = Arc::new(SimulatedAudio::new(Duration::from_secs(30)));
        let position = PositionHandle::new();
        // Already out of range before playback starts
        position.set(offset_meters(POI, 500.0, 0.0));
        let (notifier, _rx) = notification_channel();
        let (progress_tx, _progress_rx) = watch::channel(PlaybackProgress::default());

        let outcome = controller()
            .run(
                Arc::clone(&handle) as Arc<dyn AudioHandle>,
                &[],
                "Stortorget",
                POI,
                &position,
                &progress_tx,
                &notifier,
            )
            .await;

        assert_eq!(outcome, PlaybackOutcome::Interrupted);
        assert!(handle.position() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_reports_wandering_flag() {
        let handle = Arc::new(SimulatedAudio::new(Duration::from_secs(30)));
        let position = PositionHandle::new();
        position.set(offset_meters(POI, 500.0, 0.0));
        let (notifier, _rx) = notification_channel();
        let (progress_tx, mut progress_rx) = watch::channel(PlaybackProgress::default());

        let task = tokio::spawn(async move {
            controller()
                .run(
                    handle,
                    &[20_000],
                    "Stortorget",
                    POI,
                    &position,
                    &progress_tx,
                    &notifier,
                )
                .await
        });

        let mut saw_wandering = false;
        while progress_rx.changed().await.is_ok() {
            if progress_rx.borrow().wandering {
                saw_wandering = true;
                break;
            }
        }
        assert!(saw_wandering);
        task.await.unwrap();
    }
}
