//! Frame-based sprite animation.
//!
//! An `Animation` is an immutable frame list loaded with the level. Each
//! animated entity carries an `AnimationState` (current name, frame index and
//! elapsed-time accumulator). Timing uses integer microseconds for both the
//! frame delay and the accumulator, for the player and NPCs alike, so there is
//! exactly one unit in play.
//!
//! The accumulator is reduced by the frame delay rather than reset on every
//! advance, so a long frame carries its leftover time into the next one and
//! can advance several frames at once.

use std::collections::HashMap;

use crate::assets::{TextureId, TextureInfo};
use crate::entity::Entity;

/// A named frame sequence with a uniform per-frame delay.
#[derive(Debug, Clone)]
pub struct Animation {
    pub name: String,
    pub frames: Vec<TextureInfo>,
    pub frame_delay_us: u64,
    pub foot_size: (i32, i32),
}

impl Animation {
    pub fn first_frame(&self) -> Option<&TextureInfo> {
        self.frames.first()
    }
}

/// Runtime state for one animated entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationState {
    pub name: String,
    pub frame_index: usize,
    pub elapsed_us: u64,
}

impl AnimationState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frame_index: 0,
            elapsed_us: 0,
        }
    }

    /// Switch to `animation`, restarting at frame 0. Returns the frame to show.
    pub fn restart(&mut self, animation: &Animation) -> Option<TextureId> {
        self.name = animation.name.clone();
        self.frame_index = 0;
        self.elapsed_us = 0;
        animation.first_frame().map(|f| f.id)
    }

    /// Advance by `dt_us`. Returns the new frame's texture when the displayed
    /// frame changed during this tick.
    pub fn tick(&mut self, dt_us: u64, animation: &Animation) -> Option<TextureId> {
        if animation.frames.is_empty() || animation.frame_delay_us == 0 {
            return None;
        }

        self.elapsed_us += dt_us;
        let mut advanced = false;
        while self.elapsed_us >= animation.frame_delay_us {
            self.elapsed_us -= animation.frame_delay_us;
            self.frame_index = (self.frame_index + 1) % animation.frames.len();
            advanced = true;
        }

        if advanced {
            Some(animation.frames[self.frame_index].id)
        } else {
            None
        }
    }
}

/// Lookup table of every animation loaded for the current level.
#[derive(Debug, Default)]
pub struct AnimationLibrary {
    animations: HashMap<String, Animation>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, animation: Animation) {
        self.animations.insert(animation.name.clone(), animation);
    }

    pub fn resolve(&self, name: &str) -> Option<&Animation> {
        self.animations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Animation> {
        self.animations.values()
    }

    pub fn clear(&mut self) {
        self.animations.clear();
    }
}

/// Drive `entity` towards the animation named `desired`.
///
/// A name change restarts the new animation on frame 0 and shows that frame
/// immediately; otherwise the current animation advances by `dt_us`. A name
/// with no entry in `library` leaves the entity's image untouched.
/// Returns true when the displayed image or animation changed.
pub fn drive(entity: &mut Entity, desired: &str, dt_us: u64, library: &AnimationLibrary) -> bool {
    let Some(animation) = library.resolve(desired) else {
        log::warn!(
            "Entity '{}' requested missing animation '{}'",
            entity.name,
            desired
        );
        return false;
    };

    let state = entity
        .animation
        .get_or_insert_with(|| AnimationState::new(desired));

    if state.name != desired {
        if let Some(frame) = state.restart(animation) {
            entity.texture = Some(frame);
        }
        return true;
    }

    match state.tick(dt_us, animation) {
        Some(frame) => {
            entity.texture = Some(frame);
            true
        }
        None => false,
    }
}
