use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Top-level runtime configuration. Every field has a default, so an absent
/// or partial `game.json` is fine.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GameConfig {
    pub title: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub world_width: i32,
    pub world_height: i32,
    pub asset_root: String,
    pub level: String,
    /// Relative to `asset_root`. Required at startup.
    pub cursor_texture: String,
    /// Optional list of decoration image paths, relative to `asset_root`.
    pub decorations: Option<String>,
    /// Seconds. Frame deltas above this are clamped.
    pub max_frame_dt: f32,
    pub player: PlayerConfig,
    pub camera: CameraConfig,
    pub npc: NpcConfig,
    /// Map entity base name -> animation it spawns with.
    pub spawn_animations: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PlayerConfig {
    pub name: String,
    /// World units per second.
    pub speed: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub speed_step: f32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CameraConfig {
    pub scale: f32,
    pub scale_min: f32,
    pub scale_max: f32,
    pub zoom_in_factor: f32,
    pub zoom_out_factor: f32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NpcConfig {
    pub speed: f32,
    pub detection_radius: f32,
    pub min_distance: f32,
    pub brake_distance: f32,
    pub brake_factor: f32,
    pub wander_speed_factor: f32,
    /// Seconds between wander direction changes.
    pub wander_change_interval: f32,
    pub facing_deadzone: f32,
    /// NPC names that never move.
    pub stationary: Vec<String>,
    /// Fixed seed for wander directions; entropy when absent.
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        let spawn_animations = [
            ("aaron", "aaronIdleS"),
            ("reyna", "reynaIdleSE"),
            ("mushroom", "mushroomHop"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            title: "Space Monkeys".to_string(),
            screen_width: 800,
            screen_height: 600,
            world_width: 1600,
            world_height: 1200,
            asset_root: "assets".to_string(),
            level: "level1".to_string(),
            cursor_texture: "textures/cursor.png".to_string(),
            decorations: None,
            max_frame_dt: 0.25,
            player: PlayerConfig::default(),
            camera: CameraConfig::default(),
            npc: NpcConfig::default(),
            spawn_animations,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: "aaron".to_string(),
            speed: 33.0,
            speed_min: 1.0,
            speed_max: 300.0,
            speed_step: 1.0,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            scale: 3.0,
            scale_min: 0.1,
            scale_max: 5.0,
            zoom_in_factor: 1.1,
            zoom_out_factor: 0.9,
        }
    }
}

impl Default for NpcConfig {
    fn default() -> Self {
        Self {
            speed: 55.0,
            detection_radius: 60.0,
            min_distance: 5.0,
            brake_distance: 50.0,
            brake_factor: 0.5,
            wander_speed_factor: 0.5,
            wander_change_interval: 2.0,
            facing_deadzone: 0.1,
            stationary: vec!["reyna".to_string()],
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Animation an entity named `base_name` spawns with.
    pub fn spawn_animation<'a>(&'a self, base_name: &'a str) -> &'a str {
        self.spawn_animations
            .get(base_name)
            .map(String::as_str)
            .unwrap_or(base_name)
    }
}

impl NpcConfig {
    /// Whether NPCs named `name` are pinned in place.
    pub fn is_stationary(&self, name: &str) -> bool {
        self.stationary.iter().any(|s| s == name)
    }
}

pub fn load_config_from_path(path: &Path) -> Result<GameConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
    let config: GameConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config file {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to defaults. A present but
/// invalid file is reported and ignored.
pub fn load_config_or_default(path: &Path) -> GameConfig {
    if !path.exists() {
        log::info!(
            "No config at '{}', using built-in defaults",
            path.display()
        );
        return GameConfig::default();
    }
    match load_config_from_path(path) {
        Ok(config) => {
            log::info!("Loaded config '{}'", path.display());
            config
        }
        Err(err) => {
            log::error!("{err}. Using built-in defaults.");
            GameConfig::default()
        }
    }
}

fn validate_config(config: &GameConfig) -> Result<(), String> {
    if config.screen_width == 0 || config.screen_height == 0 {
        return Err("Config validation failed: screen size must be > 0".to_string());
    }
    if config.world_width <= 0 || config.world_height <= 0 {
        return Err("Config validation failed: world size must be > 0".to_string());
    }
    if config.max_frame_dt <= 0.0 {
        return Err("Config validation failed: max_frame_dt must be > 0".to_string());
    }
    if config.player.name.is_empty() {
        return Err("Config validation failed: player name is empty".to_string());
    }

    let player = &config.player;
    if player.speed_min < 0.0 || player.speed_min > player.speed_max {
        return Err(format!(
            "Config validation failed: invalid player speed range [{}, {}]",
            player.speed_min, player.speed_max
        ));
    }
    if !(player.speed_min..=player.speed_max).contains(&player.speed) {
        return Err(format!(
            "Config validation failed: player speed {} outside [{}, {}]",
            player.speed, player.speed_min, player.speed_max
        ));
    }

    let camera = &config.camera;
    if camera.scale_min <= 0.0 || camera.scale_min > camera.scale_max {
        return Err(format!(
            "Config validation failed: invalid scale range [{}, {}]",
            camera.scale_min, camera.scale_max
        ));
    }
    if !(camera.scale_min..=camera.scale_max).contains(&camera.scale) {
        return Err(format!(
            "Config validation failed: scale {} outside [{}, {}]",
            camera.scale, camera.scale_min, camera.scale_max
        ));
    }

    let npc = &config.npc;
    if npc.wander_change_interval <= 0.0 {
        return Err("Config validation failed: npc wander_change_interval must be > 0".to_string());
    }
    if npc.min_distance < 0.0 || npc.min_distance >= npc.detection_radius {
        return Err(format!(
            "Config validation failed: npc min_distance {} must be in [0, detection_radius {})",
            npc.min_distance, npc.detection_radius
        ));
    }
    Ok(())
}
