//! Copy-on-write working copy of the state tree
//!
//! A `Draft` starts as a cheap clone of the canonical tree: every slice is an
//! `Arc` shared with it. The `touch_*` accessors are the only way to get
//! mutable access. The first touch of a slice copies it and marks it in the
//! touched set; later touches return the same copy. Slices never touched stay
//! shared with the canonical tree.

use crate::state::{
    GameState, LightState, PlayerState, RuntimeState, ShadowState, Slice, SliceSet, StoryState,
};
use crate::time::Clock;
use crate::SimEvent;
use std::sync::Arc;

/// Working copy of the state tree for one simulation step
#[derive(Debug, Clone)]
pub struct Draft {
    state: GameState,
    touched: SliceSet,
    clones: u32,
    outbox: Vec<SimEvent>,
}

macro_rules! touch_accessor {
    ($(#[$meta:meta])* $touch:ident, $field:ident, $slice:expr, $ty:ty) => {
        $(#[$meta])*
        pub fn $touch(&mut self) -> &mut $ty {
            if self.touched.insert($slice) {
                self.clones += 1;
                self.state.$field = Arc::new(<$ty>::clone(&self.state.$field));
            }
            Arc::make_mut(&mut self.state.$field)
        }
    };
}

impl Draft {
    /// Open a draft over `base`
    pub fn new(base: &GameState) -> Self {
        Self {
            state: base.clone(),
            touched: SliceSet::new(),
            clones: 0,
            outbox: Vec::new(),
        }
    }

    /// Read access to the whole working tree
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn player(&self) -> &PlayerState {
        self.state.player()
    }

    pub fn runtime(&self) -> &RuntimeState {
        self.state.runtime()
    }

    pub fn time(&self) -> &Clock {
        self.state.time()
    }

    pub fn light(&self) -> &LightState {
        self.state.light()
    }

    pub fn shadows(&self) -> &ShadowState {
        self.state.shadows()
    }

    pub fn story(&self) -> &StoryState {
        self.state.story()
    }

    touch_accessor!(
        /// Mutable access to player stats
        touch_player, player, Slice::Player, PlayerState
    );
    touch_accessor!(
        /// Mutable access to map, position and mode
        touch_runtime, runtime, Slice::Runtime, RuntimeState
    );
    touch_accessor!(
        /// Mutable access to the clock
        touch_time, time, Slice::Time, Clock
    );
    touch_accessor!(
        /// Mutable access to light sources
        touch_light, light, Slice::Light, LightState
    );
    touch_accessor!(
        /// Mutable access to hazard lists
        touch_shadows, shadows, Slice::Shadows, ShadowState
    );
    touch_accessor!(
        /// Mutable access to story progress and records
        touch_story, story, Slice::Story, StoryState
    );

    /// Slices touched so far
    pub fn touched(&self) -> SliceSet {
        self.touched
    }

    /// Number of slice copies made by this draft
    pub fn clone_count(&self) -> u32 {
        self.clones
    }

    /// Buffer an event for delivery after commit
    pub fn emit(&mut self, event: SimEvent) {
        self.outbox.push(event);
    }

    /// Move the buffered events out, leaving the outbox empty
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Events buffered so far, in emission order
    pub fn events(&self) -> &[SimEvent] {
        &self.outbox
    }

    /// Consume the draft, returning the working tree and its buffered events
    pub fn into_parts(self) -> (GameState, Vec<SimEvent>) {
        (self.state, self.outbox)
    }

    /// Consume the draft, returning only the working tree
    pub fn into_state(self) -> GameState {
        self.state
    }
}
