//! `GameWorld` owns everything a running level needs and runs one frame of
//! simulation at a time: input and player, then NPCs, then the camera.

use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::IVec2;

use crate::assets::{AssetPaths, AssetTables, TextureId, TextureInfo, TextureSource};
use crate::camera::Camera;
use crate::config::GameConfig;
use crate::entity::Rect;
use crate::input::{InputState, Key, MouseBtn};
use crate::level::{self, LevelReport};
use crate::npc::NpcEngine;
use crate::player::{MovementKeys, PlayerController};
use crate::render::{self, SpriteRenderer};
use crate::store::{EntityId, EntityStore};

/// Sprite drawn at the mouse position in screen space.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub texture: TextureInfo,
    pub position: (i32, i32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub quit: bool,
    pub reload_requested: bool,
    /// Topmost entity under a left click this frame.
    pub picked: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldStats {
    pub level: String,
    pub entities: usize,
    pub npcs: usize,
    pub textures: usize,
    pub animations: usize,
    pub player_speed: f32,
    pub scale: f32,
    pub camera_offset: IVec2,
}

pub struct GameWorld {
    config: GameConfig,
    paths: AssetPaths,
    assets: AssetTables,
    store: EntityStore,
    camera: Camera,
    player: PlayerController,
    npcs: NpcEngine,
    cursor: Option<Cursor>,
    level_name: Option<String>,
    decorations: Vec<TextureId>,
}

impl GameWorld {
    pub fn new(config: GameConfig) -> Self {
        let paths = AssetPaths::new(&config.asset_root);
        let camera = Camera::new((config.screen_width, config.screen_height), &config.camera);
        let player = PlayerController::new(&config.player);
        let npcs = NpcEngine::new(&config.npc);
        Self {
            config,
            paths,
            assets: AssetTables::new(),
            store: EntityStore::new(),
            camera,
            player,
            npcs,
            cursor: None,
            level_name: None,
            decorations: Vec::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn npcs(&self) -> &NpcEngine {
        &self.npcs
    }

    pub fn assets(&self) -> &AssetTables {
        &self.assets
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn level_name(&self) -> Option<&str> {
        self.level_name.as_deref()
    }

    pub fn level_path(&self, level: &str) -> PathBuf {
        self.paths.level_file(level)
    }

    fn world_size(&self) -> IVec2 {
        IVec2::new(self.config.world_width, self.config.world_height)
    }

    /// Load the cursor image named in the config. The game cannot start
    /// without it.
    pub fn load_cursor(&mut self, source: &mut dyn TextureSource) -> Result<(), String> {
        let path = self.paths.resolve(&self.config.cursor_texture);
        let texture = source
            .load_texture(&path)
            .map_err(|e| format!("Failed to load cursor texture {}: {e}", path.display()))?;
        if let Some(previous) = self.cursor.replace(Cursor {
            texture,
            position: (0, 0),
        }) {
            source.release_texture(previous.texture.id);
        }
        Ok(())
    }

    /// Replace the current level with `level`. The level file is read before
    /// anything is torn down, so a missing file leaves the old level running.
    pub fn load_level(
        &mut self,
        level: &str,
        source: &mut dyn TextureSource,
    ) -> Result<LevelReport, String> {
        let path = self.paths.level_file(level);
        let file = level::load_level_from_path(level, &path)?;

        self.unload_level(source);

        let mut report = LevelReport::default();
        level::load_assets(&file, &self.paths, source, &mut self.assets, &mut report);
        level::spawn_entities(&file, &self.assets, &self.config, &mut self.store, &mut report);
        self.level_name = Some(level.to_string());

        if let Some(manifest) = self.config.decorations.clone() {
            let manifest = self.paths.resolve(&manifest);
            if let Err(err) = self.load_decorations(&manifest, source) {
                log::warn!("{err}");
            }
        }

        if self.store.find(|e| e.name == self.player.name).is_none() {
            log::warn!(
                "Level '{level}' has no player entity '{}'",
                self.player.name
            );
        }
        self.follow_player();

        log::info!(
            "Loaded level '{}': {} textures ({} failed), {} animations ({} failed), {} entities ({} map entries skipped, {} outside the world)",
            level,
            report.textures_loaded,
            report.textures_failed,
            report.animations_loaded,
            report.animations_failed,
            report.entities_spawned,
            report.placements_skipped,
            report.positions_outside_world
        );
        Ok(report)
    }

    pub fn reload_level(&mut self, source: &mut dyn TextureSource) -> Result<LevelReport, String> {
        let level = self
            .level_name
            .clone()
            .ok_or_else(|| "No level loaded to reload".to_string())?;
        self.load_level(&level, source)
    }

    /// Drop every entity, asset and NPC state belonging to the level. The
    /// cursor survives.
    pub fn unload_level(&mut self, source: &mut dyn TextureSource) {
        for id in self.assets.texture_ids() {
            source.release_texture(id);
        }
        for id in self.decorations.drain(..) {
            source.release_texture(id);
        }
        self.assets.clear();
        self.store.clear();
        self.npcs.clear();
        if let Some(level) = self.level_name.take() {
            log::info!("Unloaded level '{level}'");
        }
    }

    /// Add the decorations listed in `manifest` to the current level.
    pub fn load_decorations(
        &mut self,
        manifest: &Path,
        source: &mut dyn TextureSource,
    ) -> Result<usize, String> {
        let ids = level::load_decoration_manifest(manifest, &self.paths, source, &mut self.store)?;
        let count = ids.len();
        self.decorations.extend(ids);
        Ok(count)
    }

    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.camera.screen = (width.max(1), height.max(1));
        self.follow_player();
    }

    /// Run one frame of simulation.
    pub fn tick(&mut self, input: &InputState, dt: Duration) -> TickOutcome {
        let mut outcome = TickOutcome {
            quit: input.is_held(Key::Escape),
            reload_requested: input.is_just_pressed(Key::R),
            picked: None,
        };

        if input.is_just_pressed(Key::Right) {
            self.player.speed_up();
            log::info!("Player speed {}", self.player.speed);
        }
        if input.is_just_pressed(Key::Left) {
            self.player.slow_down();
            log::info!("Player speed {}", self.player.speed);
        }
        if input.is_just_pressed(Key::Up) {
            self.camera.zoom_in();
            log::info!("Scale {:.3}", self.camera.scale);
        }
        if input.is_just_pressed(Key::Down) {
            self.camera.zoom_out();
            log::info!("Scale {:.3}", self.camera.scale);
        }

        let mouse = input.mouse_pixel();
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.position = mouse;
        }
        if input.is_mouse_just_pressed(MouseBtn::Left) {
            outcome.picked = self.hit_test(mouse);
            match outcome.picked.and_then(|id| self.store.get(id)) {
                Some(entity) => {
                    let b = entity.bounds();
                    log::info!(
                        "Mouse intersects sprite '{}' rect: {{{}, {}, {}, {}}}",
                        entity.name,
                        b.x,
                        b.y,
                        b.w,
                        b.h
                    );
                }
                None => log::info!("No sprite under cursor"),
            }
        }
        if input.is_mouse_just_released(MouseBtn::Left) {
            log::debug!("Cursor released at ({}, {})", mouse.0, mouse.1);
        }

        let world = self.world_size();
        let keys = MovementKeys::from_input(input);
        self.player.step(
            &mut self.store,
            &self.assets.animations,
            keys,
            dt,
            world,
        );
        let player_name = self.player.name.clone();
        self.npcs
            .update(&mut self.store, &self.assets.animations, &player_name, dt, world);
        self.follow_player();

        outcome
    }

    fn follow_player(&mut self) {
        let world = self.world_size();
        if let Some((_, player)) = self.store.find(|e| e.name == self.player.name) {
            self.camera.follow(player.bounds(), world);
        }
    }

    /// Topmost non-background entity whose on-screen rectangle contains the
    /// screen point.
    pub fn hit_test(&self, point: (i32, i32)) -> Option<EntityId> {
        self.store
            .iter_ordered()
            .rev()
            .filter(|(_, e)| !e.is_background())
            .find(|(_, e)| {
                self.camera
                    .world_to_screen(e.bounds())
                    .contains_point(point.0, point.1)
            })
            .map(|(id, _)| id)
    }

    /// Draw the world, then the cursor unscaled on top.
    pub fn render(&self, renderer: &mut dyn SpriteRenderer) -> usize {
        let mut drawn = render::draw_world(&self.store, &self.camera, renderer);
        if let Some(cursor) = &self.cursor {
            let dest = Rect::new(
                cursor.position.0,
                cursor.position.1,
                cursor.texture.width as i32,
                cursor.texture.height as i32,
            );
            renderer.draw(cursor.texture.id, dest, false);
            drawn += 1;
        }
        drawn
    }

    pub fn stats(&self) -> WorldStats {
        let npcs = self
            .store
            .iter_ordered()
            .filter(|(_, e)| NpcEngine::is_npc(e, &self.player.name))
            .count();
        WorldStats {
            level: self.level_name.clone().unwrap_or_default(),
            entities: self.store.len(),
            npcs,
            textures: self.assets.texture_count(),
            animations: self.assets.animations.len(),
            player_speed: self.player.speed,
            scale: self.camera.scale,
            camera_offset: self.camera.offset,
        }
    }

    /// Release everything, cursor included. Call once on shutdown.
    pub fn shutdown(&mut self, source: &mut dyn TextureSource) {
        self.unload_level(source);
        if let Some(cursor) = self.cursor.take() {
            source.release_texture(cursor.texture.id);
        }
        log::info!("Final scale {:.3}", self.camera.scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::fake::FakeTextures;
    use crate::render::DrawCommand;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    const LEVEL: &str = "\
[TEXTURES]
background 0 0
rock 8 8
[ANIMATIONS]
aaronIdleS 2 100 8 4
aaronWalkSE 2 100 8 4
mushroomHop 2 100 8 4
[MAP]
background 1 0 0
rock 1 10 20
aaron 1 100 100
mushroom 1 1000 1000
";

    /// A throwaway asset root with a level file and a fake texture source
    /// that knows every image the level references.
    fn fixture(hint: &str) -> (GameConfig, FakeTextures, PathBuf) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let root = std::env::temp_dir().join(format!(
            "smk_world_test_{}_{}_{}",
            hint,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(root.join("levels")).expect("create level dir");
        fs::write(root.join("levels/level1.txt"), LEVEL).expect("write level");

        let mut source = FakeTextures::default()
            .with(root.join("textures/cursor.png"), (12, 12))
            .with(root.join("textures/level1/background.png"), (1600, 1200))
            .with(root.join("textures/level1/rock.png"), (16, 16));
        for (folder, anim) in [
            ("aaron", "aaronIdleS"),
            ("aaron", "aaronWalkSE"),
            ("mushroom", "mushroomHop"),
        ] {
            for i in 1..=2 {
                source = source.with(
                    root.join(format!("animations/{folder}/{anim}{i}.png")),
                    (16, 24),
                );
            }
        }

        let mut config = GameConfig {
            asset_root: root.to_string_lossy().into_owned(),
            ..GameConfig::default()
        };
        config.npc.rng_seed = Some(3);
        (config, source, root)
    }

    fn loaded_world(hint: &str) -> (GameWorld, FakeTextures, PathBuf) {
        let (config, mut source, root) = fixture(hint);
        let mut world = GameWorld::new(config);
        world.load_cursor(&mut source).expect("cursor loads");
        world.load_level("level1", &mut source).expect("level loads");
        (world, source, root)
    }

    fn id_of(world: &GameWorld, name: &str) -> EntityId {
        world
            .store()
            .find(|e| e.name == name)
            .map(|(id, _)| id)
            .expect("entity present")
    }

    #[test]
    fn load_level_spawns_map_and_centers_camera() {
        let (world, _source, root) = loaded_world("load");
        let stats = world.stats();
        assert_eq!(stats.level, "level1");
        assert_eq!(stats.entities, 4);
        assert_eq!(stats.npcs, 1);
        assert_eq!(stats.textures, 2);
        assert_eq!(stats.animations, 3);
        // Player center (108,112), viewport 266x200: x pins to 0.
        assert_eq!(world.camera().offset, IVec2::new(0, 12));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_level_keeps_current_one() {
        let (mut world, mut source, root) = loaded_world("missing");
        let err = world
            .load_level("level9", &mut source)
            .expect_err("no such level");
        assert!(err.contains("level9"));
        assert_eq!(world.level_name(), Some("level1"));
        assert_eq!(world.store().len(), 4);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_cursor_is_an_error() {
        let (mut config, mut source, root) = fixture("cursor");
        config.cursor_texture = "textures/none.png".to_string();
        let mut world = GameWorld::new(config);
        assert!(world.load_cursor(&mut source).is_err());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn tick_moves_player_right_and_walks_southeast() {
        let (mut world, _source, root) = loaded_world("walk");
        let player = id_of(&world, "aaron");
        let speed = world.player().speed;

        let mut input = InputState::new();
        input.key_down(Key::D);
        world.tick(&input, Duration::from_secs(1));

        let entity = world.store().get(player).expect("player");
        assert_eq!(entity.bounds().x, 100 + speed.round() as i32);
        assert_eq!(entity.animation_name(), Some("aaronWalkSE"));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn tuning_keys_are_edge_triggered_and_escape_quits() {
        let (mut world, _source, root) = loaded_world("tune");
        let speed = world.player().speed;
        let scale = world.camera().scale;

        let mut input = InputState::new();
        input.key_down(Key::Right);
        input.key_down(Key::Down);
        world.tick(&input, Duration::from_millis(16));
        input.end_frame();
        world.tick(&input, Duration::from_millis(16));

        assert_eq!(world.player().speed, speed + 1.0);
        assert!((world.camera().scale - scale * 0.9).abs() < 1e-6);

        input.key_down(Key::Escape);
        assert!(world.tick(&input, Duration::from_millis(16)).quit);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn player_and_npc_animations_share_time_unit() {
        let (mut world, _source, root) = loaded_world("timing");
        let player = id_of(&world, "aaron");
        let mushroom = id_of(&world, "mushroom");
        let input = InputState::new();

        // Both animations use a 100ms delay over two frames.
        for _ in 0..7 {
            world.tick(&input, Duration::from_millis(50));
        }

        let p = world.store().get(player).and_then(|e| e.animation.clone());
        let n = world.store().get(mushroom).and_then(|e| e.animation.clone());
        let (p, n) = (p.expect("player animated"), n.expect("npc animated"));
        assert_eq!((p.frame_index, p.elapsed_us), (1, 50_000));
        assert_eq!((n.frame_index, n.elapsed_us), (p.frame_index, p.elapsed_us));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn click_picks_topmost_non_background_sprite() {
        let (mut world, _source, root) = loaded_world("pick");
        let rock = id_of(&world, "rock");

        // Rock at world (10,20), 16x16, scale 3, offset (0,12) -> screen (30,24)..(78,72).
        assert_eq!(world.hit_test((40, 50)), Some(rock));
        assert_eq!(world.hit_test((5, 5)), None);

        let mut input = InputState::new();
        input.mouse_position = (40.0, 50.0);
        input.mouse_down(MouseBtn::Left);
        let outcome = world.tick(&input, Duration::ZERO);
        assert_eq!(outcome.picked, Some(rock));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn render_draws_world_then_unscaled_cursor() {
        let (mut world, _source, root) = loaded_world("render");
        let mut input = InputState::new();
        input.mouse_position = (200.0, 150.0);
        world.tick(&input, Duration::ZERO);

        let mut commands: Vec<DrawCommand> = Vec::new();
        assert_eq!(world.render(&mut commands), 5);
        let cursor = commands.last().expect("cursor drawn");
        assert_eq!(cursor.dest, Rect::new(200, 150, 12, 12));
        assert_eq!(commands[0].dest.w, 1600 * 3);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn unload_releases_level_textures_but_keeps_cursor() {
        let (mut world, mut source, root) = loaded_world("unload");
        let cursor = world.cursor().map(|c| c.texture.id).expect("cursor");

        world.tick(&InputState::new(), Duration::from_millis(16));
        world.unload_level(&mut source);

        assert!(world.store().is_empty());
        assert!(world.npcs().is_empty());
        assert_eq!(source.live.len(), 1);
        assert!(source.live.contains(&cursor));

        world.shutdown(&mut source);
        assert!(source.live.is_empty());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn reload_rebuilds_the_same_level() {
        let (mut world, mut source, root) = loaded_world("reload");
        let report = world.reload_level(&mut source).expect("reload");
        assert_eq!(report.entities_spawned, 4);
        assert_eq!(world.store().len(), 4);
        // Old textures were released, new ones replace them; plus the cursor.
        assert_eq!(source.live.len(), 1 + 2 + 6);
        let _ = fs::remove_dir_all(root);
    }
}
