//! Autonomous NPC behavior: follow the player when near, wander otherwise.
//!
//! Each NPC instance gets an `NpcState` keyed by its `EntityId`, created the
//! first time the engine sees it. Following is re-evaluated every tick from
//! the footprint-center distance and overrides wandering while it holds.
//! Stationary NPCs run the same evaluation (so they still turn to face the
//! player) but never change position.

use std::collections::HashMap;
use std::f32::consts::TAU;
use std::time::Duration;

use glam::{IVec2, Vec2};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::animation::{self, AnimationLibrary};
use crate::config::NpcConfig;
use crate::entity::Entity;
use crate::store::{EntityId, EntityStore};

#[derive(Debug, Clone, PartialEq)]
pub struct NpcState {
    pub following: bool,
    pub wandering: bool,
    pub stationary: bool,
    /// Seconds since the wander angle last changed.
    pub wander_timer: f32,
    /// Radians.
    pub wander_angle: f32,
    /// Sub-unit movement not yet applied to the integer position.
    remainder: Vec2,
}

impl NpcState {
    pub fn new(stationary: bool, wander_angle: f32) -> Self {
        Self {
            following: false,
            wandering: !stationary,
            stationary,
            wander_timer: 0.0,
            wander_angle,
            remainder: Vec2::ZERO,
        }
    }

    /// Intended displacement for this tick, in world units. Updates the
    /// following flag and the wander timer.
    pub fn steer<R: Rng>(
        &mut self,
        to_player: Vec2,
        config: &NpcConfig,
        dt_secs: f32,
        rng: &mut R,
    ) -> Vec2 {
        if let Some(chase) = follow_vector(to_player, config, dt_secs) {
            self.following = true;
            return chase;
        }
        self.following = false;

        if !self.wandering {
            return Vec2::ZERO;
        }
        self.wander_timer += dt_secs;
        if self.wander_timer >= config.wander_change_interval {
            self.wander_angle = rng.gen_range(0.0..TAU);
            self.wander_timer = 0.0;
        }
        Vec2::from_angle(self.wander_angle) * config.speed * config.wander_speed_factor * dt_secs
    }

    /// Fold `intent` into the carried remainder and return the whole-unit
    /// step to apply now.
    fn take_step(&mut self, intent: Vec2) -> IVec2 {
        if self.stationary {
            self.remainder = Vec2::ZERO;
            return IVec2::ZERO;
        }
        let total = self.remainder + intent;
        let step = total.round();
        self.remainder = total - step;
        step.as_ivec2()
    }
}

/// Chase displacement toward the player, or `None` when the player is
/// outside the `(min_distance, detection_radius)` band. A zero distance is
/// never inside the band, so the normalization below cannot divide by zero.
pub fn follow_vector(to_player: Vec2, config: &NpcConfig, dt_secs: f32) -> Option<Vec2> {
    let distance = to_player.length();
    if !(distance > config.min_distance && distance < config.detection_radius) || distance <= 0.0 {
        return None;
    }
    let mut chase = to_player / distance * config.speed * dt_secs;
    if distance < config.brake_distance {
        chase *= config.brake_factor;
    }
    Some(chase)
}

pub struct NpcEngine {
    config: NpcConfig,
    states: HashMap<EntityId, NpcState>,
    rng: SmallRng,
}

impl NpcEngine {
    pub fn new(config: &NpcConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            config: config.clone(),
            states: HashMap::new(),
            rng,
        }
    }

    pub fn is_npc(entity: &Entity, player_name: &str) -> bool {
        entity.is_animated() && !entity.is_background() && entity.name != player_name
    }

    /// Step every NPC once. Returns how many NPCs were updated; nothing moves
    /// when the level has no player.
    pub fn update(
        &mut self,
        store: &mut EntityStore,
        animations: &AnimationLibrary,
        player_name: &str,
        dt: Duration,
        world: IVec2,
    ) -> usize {
        let Some((_, player)) = store.find(|e| e.name == player_name) else {
            return 0;
        };
        let target = player.footprint().center();
        let dt_secs = dt.as_secs_f32();
        let dt_us = dt.as_micros() as u64;

        let mut updated = 0;
        for id in store.ids_ordered() {
            let Some(entity) = store.get(id) else {
                continue;
            };
            if !Self::is_npc(entity, player_name) {
                continue;
            }
            let to_player = target - entity.footprint().center();
            let stationary = self.config.is_stationary(&entity.name);
            let animation_name = entity.animation_name().unwrap_or_default().to_string();

            let rng = &mut self.rng;
            let state = self
                .states
                .entry(id)
                .or_insert_with(|| NpcState::new(stationary, rng.gen_range(0.0..TAU)));
            let intent = state.steer(to_player, &self.config, dt_secs, rng);
            let step = state.take_step(intent);
            let deadzone = self.config.facing_deadzone;

            store.update(id, |npc| {
                if step != IVec2::ZERO {
                    npc.translate_clamped(step, world);
                }
                npc.is_moving = step != IVec2::ZERO;
                if intent.x.abs() > deadzone {
                    npc.mirrored = intent.x < 0.0;
                }
                animation::drive(npc, &animation_name, dt_us, animations);
            });
            updated += 1;
        }
        log::trace!("Updated {updated} NPCs");
        updated
    }

    pub fn state(&self, id: EntityId) -> Option<&NpcState> {
        self.states.get(&id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Forget every instance. Called when the level is unloaded.
    pub fn clear(&mut self) {
        self.states.clear();
    }
}
