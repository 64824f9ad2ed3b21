//! Keyboard-driven player movement, facing and animation selection.
//!
//! Facing is resolved from the raw key state each tick. Pure east/west input
//! has no asset of its own, so it borrows the last vertical direction the
//! player pressed to pick a diagonal. West-facing diagonals reuse the east
//! artwork mirrored.

use std::time::Duration;

use glam::IVec2;

use crate::animation::{self, AnimationLibrary};
use crate::config::PlayerConfig;
use crate::input::{InputState, Key};
use crate::store::{EntityId, EntityStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    N,
    S,
    NE,
    SE,
    NW,
    SW,
}

impl Facing {
    /// Artwork suffix and whether it is drawn mirrored.
    pub fn artwork(self) -> (&'static str, bool) {
        match self {
            Self::N => ("N", false),
            Self::S => ("S", false),
            Self::NE => ("NE", false),
            Self::SE => ("SE", false),
            Self::NW => ("NE", true),
            Self::SW => ("SE", true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vertical {
    North,
    South,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementKeys {
    pub fn from_input(input: &InputState) -> Self {
        Self {
            up: input.is_held(Key::W),
            down: input.is_held(Key::S),
            left: input.is_held(Key::A),
            right: input.is_held(Key::D),
        }
    }

    pub fn any(self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

/// Animation for `prefix` in the given state, e.g. `aaronWalkSE`, plus the
/// mirror flag. Six facings times idle/walk gives the twelve-entry table.
pub fn animation_for(prefix: &str, moving: bool, facing: Facing) -> (String, bool) {
    let (suffix, mirrored) = facing.artwork();
    let gait = if moving { "Walk" } else { "Idle" };
    (format!("{prefix}{gait}{suffix}"), mirrored)
}

#[derive(Debug, Clone)]
pub struct PlayerController {
    pub name: String,
    pub speed: f32,
    speed_min: f32,
    speed_max: f32,
    speed_step: f32,
    facing: Facing,
    last_vertical: Vertical,
}

impl PlayerController {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            name: config.name.clone(),
            speed: config.speed.clamp(config.speed_min, config.speed_max),
            speed_min: config.speed_min,
            speed_max: config.speed_max,
            speed_step: config.speed_step,
            facing: Facing::S,
            last_vertical: Vertical::South,
        }
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn last_vertical(&self) -> Vertical {
        self.last_vertical
    }

    pub fn speed_up(&mut self) {
        self.speed = (self.speed + self.speed_step).min(self.speed_max);
    }

    pub fn slow_down(&mut self) {
        self.speed = (self.speed - self.speed_step).max(self.speed_min);
    }

    /// Facing for this tick's key state. Only a moving tick updates the
    /// remembered facing; with no input the previous facing is kept.
    pub fn resolve_facing(&mut self, keys: MovementKeys) -> Facing {
        if keys.up {
            self.last_vertical = Vertical::North;
        }
        if keys.down {
            self.last_vertical = Vertical::South;
        }
        let north = self.last_vertical == Vertical::North;

        let facing = match (keys.up, keys.down, keys.left, keys.right) {
            (true, _, false, false) => Facing::N,
            (false, true, false, false) => Facing::S,
            (true, _, _, true) => Facing::NE,
            (true, _, true, false) => Facing::NW,
            (false, true, _, true) => Facing::SE,
            (false, true, true, false) => Facing::SW,
            (false, false, _, true) if north => Facing::NE,
            (false, false, _, true) => Facing::SE,
            (false, false, true, false) if north => Facing::NW,
            (false, false, true, false) => Facing::SW,
            (false, false, false, false) => self.facing,
        };

        if keys.any() {
            self.facing = facing;
        }
        facing
    }

    /// Per-axis displacement for this tick. Each held key contributes the
    /// rounded step, so opposite keys cancel.
    pub fn movement_delta(&self, keys: MovementKeys, dt: Duration) -> IVec2 {
        let step = (self.speed * dt.as_secs_f32()).round() as i32;
        let mut delta = IVec2::ZERO;
        if keys.left {
            delta.x -= step;
        }
        if keys.right {
            delta.x += step;
        }
        if keys.up {
            delta.y -= step;
        }
        if keys.down {
            delta.y += step;
        }
        delta
    }

    /// Move and animate the player entity for one tick. Returns its id, or
    /// `None` when the level has no player.
    pub fn step(
        &mut self,
        store: &mut EntityStore,
        animations: &AnimationLibrary,
        keys: MovementKeys,
        dt: Duration,
        world: IVec2,
    ) -> Option<EntityId> {
        let (id, _) = store.find(|e| e.name == self.name)?;

        let moving = keys.any();
        let facing = self.resolve_facing(keys);
        let delta = self.movement_delta(keys, dt);
        let (animation_name, mirrored) = animation_for(&self.name, moving, facing);
        let dt_us = dt.as_micros() as u64;

        store.update(id, |player| {
            if moving {
                player.translate_clamped(delta, world);
            }
            player.is_moving = moving;
            player.mirrored = mirrored;
            animation::drive(player, &animation_name, dt_us, animations);
        });

        log::trace!(
            "Player {} facing {:?} animation {}",
            id,
            facing,
            animation_name
        );
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Animation;
    use crate::assets::{TextureId, TextureInfo};
    use crate::entity::Entity;

    const WORLD: IVec2 = IVec2::new(1600, 1200);

    fn keys(up: bool, down: bool, left: bool, right: bool) -> MovementKeys {
        MovementKeys {
            up,
            down,
            left,
            right,
        }
    }

    fn controller(speed: f32) -> PlayerController {
        PlayerController::new(&PlayerConfig {
            speed,
            ..PlayerConfig::default()
        })
    }

    fn player_library() -> AnimationLibrary {
        let mut lib = AnimationLibrary::new();
        let mut next = 0;
        for gait in ["Idle", "Walk"] {
            for dir in ["N", "S", "NE", "SE"] {
                lib.insert(Animation {
                    name: format!("aaron{gait}{dir}"),
                    frames: (0..4)
                        .map(|_| {
                            next += 1;
                            TextureInfo {
                                id: TextureId(next),
                                width: 16,
                                height: 24,
                            }
                        })
                        .collect(),
                    frame_delay_us: 150_000,
                    foot_size: (8, 4),
                });
            }
        }
        lib
    }

    fn spawn_player(store: &mut EntityStore, x: i32, y: i32) -> EntityId {
        store.insert(Entity::new_animated(
            "aaron",
            "aaronIdleS",
            IVec2::new(x, y),
            (16, 24),
            (8, 4),
            TextureId(0),
        ))
    }

    #[test]
    fn facing_table() {
        let mut pc = controller(33.0);
        assert_eq!(pc.resolve_facing(keys(true, false, false, false)), Facing::N);
        assert_eq!(pc.resolve_facing(keys(false, true, false, false)), Facing::S);
        assert_eq!(pc.resolve_facing(keys(true, false, false, true)), Facing::NE);
        assert_eq!(pc.resolve_facing(keys(true, false, true, false)), Facing::NW);
        assert_eq!(pc.resolve_facing(keys(false, true, false, true)), Facing::SE);
        assert_eq!(pc.resolve_facing(keys(false, true, true, false)), Facing::SW);
    }

    #[test]
    fn horizontal_only_uses_last_vertical() {
        let mut pc = controller(33.0);
        assert_eq!(pc.last_vertical(), Vertical::South);
        assert_eq!(pc.resolve_facing(keys(false, false, false, true)), Facing::SE);

        pc.resolve_facing(keys(true, false, false, false));
        assert_eq!(pc.resolve_facing(keys(false, false, false, true)), Facing::NE);
        assert_eq!(pc.resolve_facing(keys(false, false, true, false)), Facing::NW);
    }

    #[test]
    fn no_input_keeps_previous_facing() {
        let mut pc = controller(33.0);
        pc.resolve_facing(keys(true, false, true, false));
        assert_eq!(pc.resolve_facing(MovementKeys::default()), Facing::NW);
        assert_eq!(pc.facing(), Facing::NW);
    }

    #[test]
    fn animation_table_mirrors_west_diagonals() {
        assert_eq!(
            animation_for("aaron", true, Facing::SW),
            ("aaronWalkSE".to_string(), true)
        );
        assert_eq!(
            animation_for("aaron", false, Facing::NW),
            ("aaronIdleNE".to_string(), true)
        );
        assert_eq!(
            animation_for("aaron", false, Facing::N),
            ("aaronIdleN".to_string(), false)
        );
    }

    #[test]
    fn opposite_keys_cancel_movement() {
        let pc = controller(60.0);
        let delta = pc.movement_delta(keys(true, true, true, true), Duration::from_millis(500));
        assert_eq!(delta, IVec2::ZERO);
    }

    #[test]
    fn movement_step_is_rounded_per_key() {
        let pc = controller(33.0);
        let delta = pc.movement_delta(keys(false, true, false, true), Duration::from_millis(16));
        // 33 * 0.016 = 0.528 rounds to 1 on each axis.
        assert_eq!(delta, IVec2::new(1, 1));
    }

    #[test]
    fn holding_right_for_a_second_walks_southeast() {
        let lib = player_library();
        let mut store = EntityStore::new();
        let id = spawn_player(&mut store, 100, 100);
        let mut pc = controller(30.0);

        pc.step(
            &mut store,
            &lib,
            keys(false, false, false, true),
            Duration::from_secs(1),
            WORLD,
        );

        let player = store.get(id).expect("player still present");
        assert_eq!(player.bounds().x, 130);
        assert_eq!(player.bounds().y, 100);
        assert_eq!(player.animation_name(), Some("aaronWalkSE"));
        assert!(player.is_moving);
        assert!(!player.mirrored);
        assert_eq!(player.footprint(), player.bounds().footprint(8, 4));
    }

    #[test]
    fn moving_left_at_world_edge_stays_put() {
        let lib = player_library();
        let mut store = EntityStore::new();
        let id = spawn_player(&mut store, 0, 50);
        let mut pc = controller(33.0);

        pc.step(
            &mut store,
            &lib,
            keys(false, false, true, false),
            Duration::from_millis(100),
            WORLD,
        );

        let player = store.get(id).expect("player");
        assert_eq!(player.bounds().x, 0);
        assert!(player.mirrored);
        assert_eq!(player.animation_name(), Some("aaronWalkSE"));
    }

    #[test]
    fn stopping_switches_to_idle_on_first_frame() {
        let lib = player_library();
        let mut store = EntityStore::new();
        let id = spawn_player(&mut store, 200, 200);
        let mut pc = controller(33.0);

        let up = keys(true, false, false, false);
        for _ in 0..5 {
            pc.step(&mut store, &lib, up, Duration::from_millis(100), WORLD);
        }
        pc.step(
            &mut store,
            &lib,
            MovementKeys::default(),
            Duration::from_millis(100),
            WORLD,
        );

        let player = store.get(id).expect("player");
        let state = player.animation.as_ref().expect("animated");
        assert_eq!(state.name, "aaronIdleN");
        assert_eq!(state.frame_index, 0);
        assert_eq!(state.elapsed_us, 0);
        assert!(!player.is_moving);
        assert_eq!(
            player.texture,
            lib.resolve("aaronIdleN").map(|a| a.frames[0].id)
        );
    }

    #[test]
    fn speed_tuning_is_bounded() {
        let mut pc = PlayerController::new(&PlayerConfig {
            speed: 2.0,
            speed_min: 1.0,
            speed_max: 4.0,
            ..PlayerConfig::default()
        });
        pc.slow_down();
        pc.slow_down();
        assert_eq!(pc.speed, 1.0);
        for _ in 0..10 {
            pc.speed_up();
        }
        assert_eq!(pc.speed, 4.0);
    }

    #[test]
    fn step_without_player_is_a_no_op() {
        let lib = player_library();
        let mut store = EntityStore::new();
        let mut pc = controller(33.0);
        assert!(pc
            .step(
                &mut store,
                &lib,
                keys(true, false, false, false),
                Duration::from_millis(16),
                WORLD,
            )
            .is_none());
    }
}
