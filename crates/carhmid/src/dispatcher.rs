use crate::sinks::{Player, System};
use carhmi_core::bindings::{Action, Bindings};
use carhmi_core::event::{ActionKey, Event, Mode};
use carhmi_core::SHUTDOWN_GRACE;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A dispatched repeatable action, re-run once per tick until replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatHandle(Action);

impl RepeatHandle {
    pub fn action(&self) -> Action {
        self.0
    }
}

/// Ignition power tracking for the grace-period shutdown.
#[derive(Debug, Clone, Copy)]
struct PowerState {
    powered: bool,
    power_on_time: Instant,
    is_shutting_down: bool,
}

/// Maps control events to player/system actions, tracking the MODE modifier
/// and ignition power.
pub struct Dispatcher<P, S> {
    player: P,
    system: S,
    bindings: Bindings,
    mode: Mode,
    power: PowerState,
    grace: Duration,
    /// Whether the last dispatch happened in MODE and was not the mode
    /// button itself. Releasing MODE toggles the screen only when false.
    mode_was_consumed: bool,
}

impl<P: Player, S: System> Dispatcher<P, S> {
    /// Power is assumed present at startup.
    pub fn new(player: P, system: S, bindings: Bindings, now: Instant) -> Self {
        Self {
            player,
            system,
            bindings,
            mode: Mode::Neutral,
            power: PowerState {
                powered: true,
                power_on_time: now,
                is_shutting_down: false,
            },
            grace: SHUTDOWN_GRACE,
            mode_was_consumed: true,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_powered(&self) -> bool {
        self.power.powered
    }

    pub fn is_shutting_down(&self) -> bool {
        self.power.is_shutting_down
    }

    /// Resolve and run one event. Returns a handle when the action repeats.
    pub async fn dispatch(&mut self, event: &Event, now: Instant) -> Option<RepeatHandle> {
        let key = ActionKey::new(self.mode, event);
        let consumed = self.mode == Mode::Mode && event.first() != Some("mode");

        let repeat = match self.bindings.resolve(&key) {
            Some(binding) => {
                debug!(key = %key, action = ?binding.action, "dispatching");
                self.execute(binding.action, now).await;
                binding.repeatable.then_some(RepeatHandle(binding.action))
            }
            None => {
                warn!(key = %key, "no binding for event");
                None
            }
        };

        self.mode_was_consumed = consumed;
        debug!(mode_was_consumed = consumed, "updated mode suppression flag");
        repeat
    }

    /// Re-run a repeatable action's effect, skipping mode bookkeeping.
    pub async fn repeat(&mut self, handle: &RepeatHandle) {
        debug!(action = ?handle.0, "repeating last dispatched action");
        self.perform(handle.0).await;
    }

    /// True once power has been off for longer than the grace period.
    pub fn needs_shutdown(&self, now: Instant) -> bool {
        if self.power.powered || self.power.is_shutting_down {
            return false;
        }
        now.saturating_duration_since(self.power.power_on_time) > self.grace
    }

    /// Power the system off. One-way: no further shutdown is attempted.
    pub async fn shutdown(&mut self) {
        self.power.is_shutting_down = true;
        info!("shutting down the entire system");
        if let Err(e) = self.system.shutdown().await {
            error!(error = %e, "system shutdown failed; not retrying");
        }
    }

    async fn execute(&mut self, action: Action, now: Instant) {
        match action {
            Action::EnterMode => {
                self.mode = Mode::Mode;
            }
            Action::LeaveMode => {
                self.mode = Mode::Neutral;
                if !self.mode_was_consumed {
                    self.perform(Action::ToggleScreen).await;
                }
            }
            Action::PowerRestored => {
                info!("ignition power restored, system will remain active");
                self.set_power(true, now);
            }
            Action::PowerLost => {
                info!(
                    grace_secs = self.grace.as_secs_f32(),
                    "ignition power lost, shutting down unless power is restored"
                );
                self.set_power(false, now);
            }
            Action::PowerLostHeld => {
                info!("MODE held while ignition power was lost, system is NOT shutting down");
                self.set_power(true, now);
            }
            other => self.perform(other).await,
        }
    }

    /// Sink side effects only.
    async fn perform(&mut self, action: Action) {
        let result = match action {
            Action::Previous => {
                info!("switching to previous song");
                self.player.previous()
            }
            Action::Next => {
                info!("switching to next song");
                self.player.next()
            }
            Action::PlayOrPause => self.player.play_or_pause(),
            Action::VolumeShift(delta) => self.player.volume_shift(delta).map(|volume| {
                info!(volume, "volume set");
            }),
            Action::ToggleScreen => {
                info!("toggling screen");
                self.system.toggle_screen().await
            }
            Action::PowerRestored
            | Action::PowerLost
            | Action::PowerLostHeld
            | Action::EnterMode
            | Action::LeaveMode => Ok(()),
        };
        if let Err(e) = result {
            warn!(action = ?action, error = %e, "action failed");
        }
    }

    // Shutdown is terminal, so a late power event never clears it.
    fn set_power(&mut self, powered: bool, now: Instant) {
        self.power.powered = powered;
        self.power.power_on_time = now;
    }

    #[cfg(test)]
    pub(crate) fn player(&self) -> &P {
        &self.player
    }

    #[cfg(test)]
    pub(crate) fn system(&self) -> &S {
        &self.system
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }
}
