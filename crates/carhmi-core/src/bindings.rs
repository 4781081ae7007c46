use crate::event::ActionKey;
use crate::VOLUME_STEP;
use std::collections::HashMap;

/// What a resolved event does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Previous,
    Next,
    PlayOrPause,
    VolumeShift(i8),
    ToggleScreen,
    /// Ignition power present (or re-affirmed).
    PowerRestored,
    /// Ignition power dropped; starts the shutdown grace period.
    PowerLost,
    /// Ignition power dropped while MODE is held: keep the system alive.
    PowerLostHeld,
    EnterMode,
    LeaveMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub action: Action,
    /// Re-run every tick until another event is dispatched.
    pub repeatable: bool,
}

impl Binding {
    const fn once(action: Action) -> Self {
        Self { action, repeatable: false }
    }

    const fn repeat(action: Action) -> Self {
        Self { action, repeatable: true }
    }
}

/// Fixed (mode, event) → action table.
#[derive(Debug, Clone)]
pub struct Bindings {
    table: HashMap<ActionKey, Binding>,
}

impl Bindings {
    pub fn builtin() -> Self {
        use Action::*;

        let entries = [
            // Rotary knob
            ("neutral_rotary_left", Binding::once(VolumeShift(-VOLUME_STEP))),
            ("neutral_rotary_right", Binding::once(VolumeShift(VOLUME_STEP))),
            ("neutral_rotary_press", Binding::once(PlayOrPause)),
            ("mode_rotary_left", Binding::once(Previous)),
            ("mode_rotary_right", Binding::once(Next)),
            ("mode_rotary_press", Binding::once(ToggleScreen)),
            // Steering wheel
            ("neutral_volume_down_press", Binding::repeat(VolumeShift(-VOLUME_STEP))),
            ("neutral_volume_up_press", Binding::repeat(VolumeShift(VOLUME_STEP))),
            ("neutral_arrow_up_press", Binding::once(Next)),
            ("neutral_arrow_down_press", Binding::once(Previous)),
            // Ignition
            ("neutral_power_on", Binding::once(PowerRestored)),
            ("mode_power_on", Binding::once(PowerRestored)),
            ("neutral_power_off", Binding::once(PowerLost)),
            ("mode_power_off", Binding::once(PowerLostHeld)),
            // Modifier
            ("neutral_mode_press", Binding::once(EnterMode)),
            ("mode_mode_depress", Binding::once(LeaveMode)),
        ];

        Self {
            table: entries
                .into_iter()
                .map(|(key, binding)| (ActionKey::from(key), binding))
                .collect(),
        }
    }

    /// Exact lookup; `None` means the event has no binding in this mode.
    pub fn resolve(&self, key: &ActionKey) -> Option<Binding> {
        self.table.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    // Paired with `len` for clippy::len_without_is_empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for Bindings {
    fn default() -> Self {
        Self::builtin()
    }
}
