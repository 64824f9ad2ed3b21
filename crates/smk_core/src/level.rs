//! Level files: parsing the sectioned text format, loading the assets it
//! declares, and spawning the map entities.
//!
//! ```text
//! [TEXTURES]
//! rock 8 8
//! [ANIMATIONS]
//! mushroomHop 4 120 10 6
//! [MAP]
//! rock 2 10 20 300 40
//! ```
//!
//! Parsing never fails on content: malformed lines are logged and skipped so
//! a partly broken level still loads. Only an unreadable file is an error.

use std::fs;
use std::path::Path;

use glam::IVec2;

use crate::animation::Animation;
use crate::assets::{AssetPaths, AssetTables, StaticTexture, TextureId, TextureSource};
use crate::config::GameConfig;
use crate::entity::Entity;
use crate::store::EntityStore;

/// Upper bound on frames per animation; anything above is a broken line.
pub const MAX_ANIMATION_FRAMES: u32 = 1000;

/// Footprint given to manifest decorations.
pub const DECORATION_FOOT_SIZE: (i32, i32) = (32, 32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSection {
    Textures,
    Animations,
    Map,
}

impl MapSection {
    pub fn from_header(line: &str) -> Option<Self> {
        match line {
            "[TEXTURES]" => Some(Self::Textures),
            "[ANIMATIONS]" => Some(Self::Animations),
            "[MAP]" => Some(Self::Map),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDecl {
    pub name: String,
    pub foot_size: (i32, i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationDecl {
    pub name: String,
    pub frame_count: u32,
    pub frame_delay_us: u64,
    pub foot_size: (i32, i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub base_name: String,
    pub positions: Vec<IVec2>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelFile {
    pub name: String,
    pub textures: Vec<TextureDecl>,
    pub animations: Vec<AnimationDecl>,
    pub placements: Vec<Placement>,
}

/// Counts gathered while loading a level, logged once at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelReport {
    pub textures_loaded: usize,
    pub textures_failed: usize,
    pub animations_loaded: usize,
    pub animations_failed: usize,
    pub entities_spawned: usize,
    pub placements_skipped: usize,
    pub positions_outside_world: usize,
}

pub fn load_level_from_path(level_name: &str, path: &Path) -> Result<LevelFile, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read level file {}: {e}", path.display()))?;
    Ok(parse_level(level_name, &raw))
}

pub fn parse_level(level_name: &str, source: &str) -> LevelFile {
    let mut level = LevelFile {
        name: level_name.to_string(),
        ..LevelFile::default()
    };
    let mut section: Option<MapSection> = None;

    for (index, raw_line) in source.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(header) = MapSection::from_header(line) {
            section = Some(header);
            continue;
        }

        let parsed = match section {
            None => Err("line outside any section".to_string()),
            Some(MapSection::Textures) => {
                parse_texture_line(line).map(|decl| level.textures.push(decl))
            }
            Some(MapSection::Animations) => {
                parse_animation_line(line).map(|decl| level.animations.push(decl))
            }
            Some(MapSection::Map) => {
                parse_map_line(line).map(|placement| level.placements.push(placement))
            }
        };
        if let Err(err) = parsed {
            log::warn!("Level '{level_name}' line {line_no}: {err}; skipping '{line}'");
        }
    }

    level
}

fn parse_texture_line(line: &str) -> Result<TextureDecl, String> {
    let mut fields = line.split_whitespace();
    let name = next_field(&mut fields, "texture name")?;
    let foot_w = parse_field::<u32>(&mut fields, "foot width")?;
    let foot_h = parse_field::<u32>(&mut fields, "foot height")?;
    Ok(TextureDecl {
        name: name.to_string(),
        foot_size: (foot_w as i32, foot_h as i32),
    })
}

fn parse_animation_line(line: &str) -> Result<AnimationDecl, String> {
    let mut fields = line.split_whitespace();
    let name = next_field(&mut fields, "animation name")?;
    let frame_count = parse_field::<u32>(&mut fields, "frame count")?;
    let frame_delay_ms = parse_field::<u64>(&mut fields, "frame delay")?;
    let foot_w = parse_field::<u32>(&mut fields, "foot width")?;
    let foot_h = parse_field::<u32>(&mut fields, "foot height")?;
    if frame_count == 0 {
        return Err(format!("animation '{name}' has no frames"));
    }
    if frame_count > MAX_ANIMATION_FRAMES {
        return Err(format!(
            "animation '{name}' declares {frame_count} frames (max {MAX_ANIMATION_FRAMES})"
        ));
    }
    if frame_delay_ms == 0 {
        return Err(format!("animation '{name}' has a zero frame delay"));
    }
    let frame_delay_us = frame_delay_ms
        .checked_mul(1000)
        .ok_or_else(|| format!("animation '{name}' frame delay too large"))?;
    Ok(AnimationDecl {
        name: name.to_string(),
        frame_count,
        frame_delay_us,
        foot_size: (foot_w as i32, foot_h as i32),
    })
}

fn parse_map_line(line: &str) -> Result<Placement, String> {
    let mut fields = line.split_whitespace();
    let base_name = next_field(&mut fields, "entity name")?;
    let count = parse_field::<usize>(&mut fields, "count")?;

    let mut positions = Vec::new();
    for i in 0..count {
        let pair = (fields.next(), fields.next());
        let (Some(x), Some(y)) = pair else {
            log::warn!(
                "Map entry '{base_name}' declares {count} positions but only has {i}"
            );
            break;
        };
        match (x.parse::<i32>(), y.parse::<i32>()) {
            (Ok(x), Ok(y)) => positions.push(IVec2::new(x, y)),
            _ => {
                log::warn!(
                    "Map entry '{base_name}' has bad coordinates '{x} {y}'; keeping the first {i} position(s)"
                );
                break;
            }
        }
    }
    Ok(Placement {
        base_name: base_name.to_string(),
        positions,
    })
}

fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<&'a str, String> {
    fields.next().ok_or_else(|| format!("missing {what}"))
}

fn parse_field<'a, T>(fields: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = next_field(fields, what)?;
    raw.parse::<T>()
        .map_err(|e| format!("invalid {what} '{raw}': {e}"))
}

/// Load every texture and animation `level` declares into `tables`.
/// An animation is kept only if all of its frames load; a partial set of
/// frames is released again.
pub fn load_assets(
    level: &LevelFile,
    paths: &AssetPaths,
    source: &mut dyn TextureSource,
    tables: &mut AssetTables,
    report: &mut LevelReport,
) {
    for decl in &level.textures {
        let path = paths.level_texture(&level.name, &decl.name);
        match source.load_texture(&path) {
            Ok(info) => {
                if let Some(previous) = tables.texture(&decl.name) {
                    log::warn!("Texture '{}' declared twice; keeping the last", decl.name);
                    source.release_texture(previous.info.id);
                }
                log::debug!(
                    "Loaded texture '{}' ({}x{}) from {}",
                    decl.name,
                    info.width,
                    info.height,
                    path.display()
                );
                tables.insert_texture(
                    &decl.name,
                    StaticTexture {
                        info,
                        foot_size: decl.foot_size,
                    },
                );
                report.textures_loaded += 1;
            }
            Err(err) => {
                log::error!("Failed to load texture '{}': {err}", decl.name);
                report.textures_failed += 1;
            }
        }
    }

    for decl in &level.animations {
        match load_animation(decl, paths, source) {
            Ok(animation) => {
                if let Some(previous) = tables.animations.resolve(&decl.name) {
                    log::warn!("Animation '{}' declared twice; keeping the last", decl.name);
                    for frame in &previous.frames {
                        source.release_texture(frame.id);
                    }
                }
                log::debug!(
                    "Loaded animation '{}' ({} frames, {}ms)",
                    decl.name,
                    decl.frame_count,
                    decl.frame_delay_us / 1000
                );
                tables.animations.insert(animation);
                report.animations_loaded += 1;
            }
            Err(err) => {
                log::error!("Skipping animation '{}': {err}", decl.name);
                report.animations_failed += 1;
            }
        }
    }
}

fn load_animation(
    decl: &AnimationDecl,
    paths: &AssetPaths,
    source: &mut dyn TextureSource,
) -> Result<Animation, String> {
    let mut frames = Vec::new();
    for frame_number in 1..=decl.frame_count {
        let path = paths.animation_frame(&decl.name, frame_number);
        match source.load_texture(&path) {
            Ok(info) => frames.push(info),
            Err(err) => {
                for loaded in &frames {
                    source.release_texture(loaded.id);
                }
                return Err(format!("frame {frame_number}: {err}"));
            }
        }
    }
    Ok(Animation {
        name: decl.name.clone(),
        frames,
        frame_delay_us: decl.frame_delay_us,
        foot_size: decl.foot_size,
    })
}

/// Create the map entities. An entry spawns animated when its spawn
/// animation is loaded, otherwise as a static texture with its base name.
pub fn spawn_entities(
    level: &LevelFile,
    tables: &AssetTables,
    config: &GameConfig,
    store: &mut EntityStore,
    report: &mut LevelReport,
) {
    for placement in &level.placements {
        let base = placement.base_name.as_str();
        let animation_name = config.spawn_animation(base);

        if let Some(animation) = tables.animations.resolve(animation_name) {
            let Some(first) = animation.first_frame() else {
                report.placements_skipped += 1;
                continue;
            };
            for position in positions_in_world(placement, config, report) {
                store.insert(Entity::new_animated(
                    base,
                    animation_name,
                    position,
                    (first.width, first.height),
                    animation.foot_size,
                    first.id,
                ));
                report.entities_spawned += 1;
            }
        } else if let Some(texture) = tables.texture(base) {
            for position in positions_in_world(placement, config, report) {
                store.insert(Entity::new_static(
                    base,
                    position,
                    (texture.info.width, texture.info.height),
                    texture.foot_size,
                    Some(texture.info.id),
                ));
                report.entities_spawned += 1;
            }
        } else {
            log::warn!(
                "Map entry '{base}' has no loaded animation '{animation_name}' or texture; skipping {} instance(s)",
                placement.positions.len()
            );
            report.placements_skipped += 1;
        }
    }
}

/// Map positions whose top-left corner lies inside the world. The rest are
/// logged and counted.
fn positions_in_world(
    placement: &Placement,
    config: &GameConfig,
    report: &mut LevelReport,
) -> Vec<IVec2> {
    let mut inside = Vec::new();
    for &position in &placement.positions {
        let in_world = (0..config.world_width).contains(&position.x)
            && (0..config.world_height).contains(&position.y);
        if in_world {
            inside.push(position);
        } else {
            log::warn!(
                "Map entry '{}' at ({}, {}) is outside the {}x{} world; skipping",
                placement.base_name,
                position.x,
                position.y,
                config.world_width,
                config.world_height
            );
            report.positions_outside_world += 1;
        }
    }
    inside
}

/// Spawn one static decoration per image path listed in `manifest`.
/// Returns the textures created so the caller can release them later.
pub fn load_decoration_manifest(
    manifest: &Path,
    paths: &AssetPaths,
    source: &mut dyn TextureSource,
    store: &mut EntityStore,
) -> Result<Vec<TextureId>, String> {
    let raw = fs::read_to_string(manifest).map_err(|e| {
        format!(
            "Failed to read decoration manifest {}: {e}",
            manifest.display()
        )
    })?;

    let mut loaded = Vec::new();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let path = paths.resolve(line);
        let info = match source.load_texture(&path) {
            Ok(info) => info,
            Err(err) => {
                log::error!("Unable to load decoration {}: {err}", path.display());
                continue;
            }
        };
        let name = decoration_name(line);
        store.insert(Entity::new_static(
            name,
            IVec2::ZERO,
            (info.width, info.height),
            DECORATION_FOOT_SIZE,
            Some(info.id),
        ));
        loaded.push(info.id);
    }
    log::info!(
        "Loaded {} decoration(s) from {}",
        loaded.len(),
        manifest.display()
    );
    Ok(loaded)
}

/// File name up to its first '.', so `props/crate.small.png` is `crate`.
fn decoration_name(path: &str) -> &str {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    file.split('.').next().unwrap_or(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::fake::FakeTextures;
    use crate::entity::Rect;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    const LEVEL: &str = r#"
# test level
[TEXTURES]
rock 8 8
background 0 0
[ANIMATIONS]
mushroomHop 2 120 10 6
aaronIdleS 3 150 8 4
[MAP]
background 1 0 0
rock 2 10 20 300 40
mushroom 1 50 60
"#;

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "smk_level_test_{}_{}_{}.txt",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn level_textures() -> FakeTextures {
        FakeTextures::default()
            .with("assets/textures/level1/rock.png", (16, 16))
            .with("assets/textures/level1/background.png", (1600, 1200))
            .with("assets/animations/mushroom/mushroomHop1.png", (20, 18))
            .with("assets/animations/mushroom/mushroomHop2.png", (20, 18))
    }

    #[test]
    fn parses_all_three_sections() {
        let level = parse_level("level1", LEVEL);
        assert_eq!(level.name, "level1");
        assert_eq!(
            level.textures,
            vec![
                TextureDecl {
                    name: "rock".to_string(),
                    foot_size: (8, 8)
                },
                TextureDecl {
                    name: "background".to_string(),
                    foot_size: (0, 0)
                },
            ]
        );
        assert_eq!(level.animations.len(), 2);
        assert_eq!(level.animations[0].frame_delay_us, 120_000);
        assert_eq!(level.placements[1].base_name, "rock");
        assert_eq!(
            level.placements[1].positions,
            vec![IVec2::new(10, 20), IVec2::new(300, 40)]
        );
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let source = "orphan 1 2\n[TEXTURES]\nrock eight 8\ntree 4 4\n[ANIMATIONS]\nspin 0 100 1 1\n[MAP]\ntree two\ntree 1 5 5\n";
        let level = parse_level("lvl", source);
        assert_eq!(level.textures.len(), 1);
        assert_eq!(level.textures[0].name, "tree");
        assert!(level.animations.is_empty());
        assert_eq!(level.placements.len(), 1);
        assert_eq!(level.placements[0].positions, vec![IVec2::new(5, 5)]);
    }

    #[test]
    fn short_coordinate_list_keeps_complete_pairs() {
        let level = parse_level("lvl", "[MAP]\nrock 3 1 2 3 4 5\n");
        assert_eq!(
            level.placements[0].positions,
            vec![IVec2::new(1, 2), IVec2::new(3, 4)]
        );
    }

    #[test]
    fn huge_position_count_does_not_preallocate() {
        let level = parse_level("lvl", "[MAP]\nrock 18446744073709551615 1 2\n");
        assert_eq!(level.placements[0].positions, vec![IVec2::new(1, 2)]);
    }

    #[test]
    fn bad_coordinate_keeps_earlier_pairs() {
        let level = parse_level("lvl", "[MAP]\nrock 3 1 2 x 4 5 6\n");
        assert_eq!(level.placements[0].positions, vec![IVec2::new(1, 2)]);
    }

    #[test]
    fn absurd_animation_lines_are_rejected() {
        let source = "[ANIMATIONS]\nspinA 4294967295 100 1 1\nspinB 1 18446744073709551615 1 1\nspinC 2 250 1 1\n";
        let level = parse_level("lvl", source);
        assert_eq!(level.animations.len(), 1);
        assert_eq!(level.animations[0].name, "spinC");
        assert_eq!(level.animations[0].frame_delay_us, 250_000);
    }

    #[test]
    fn section_header_recognition() {
        assert_eq!(MapSection::from_header("[MAP]"), Some(MapSection::Map));
        assert_eq!(MapSection::from_header("[map]"), None);
        assert_eq!(MapSection::from_header("MAP"), None);
    }

    #[test]
    fn rock_spawns_with_centered_footprint() {
        let level = parse_level("level1", LEVEL);
        let paths = AssetPaths::new("assets");
        let mut source = level_textures();
        let mut tables = AssetTables::new();
        let mut store = EntityStore::new();
        let mut report = LevelReport::default();

        load_assets(&level, &paths, &mut source, &mut tables, &mut report);
        spawn_entities(&level, &tables, &GameConfig::default(), &mut store, &mut report);

        let (_, rock) = store
            .find(|e| e.name == "rock" && e.bounds().x == 10)
            .expect("rock spawned");
        assert_eq!(rock.bounds(), Rect::new(10, 20, 16, 16));
        assert_eq!(rock.footprint(), Rect::new(14, 28, 8, 8));
        assert!(!rock.is_animated());
    }

    #[test]
    fn load_reports_partial_failures() {
        let level = parse_level("level1", LEVEL);
        let paths = AssetPaths::new("assets");
        let mut source = level_textures();
        let mut tables = AssetTables::new();
        let mut store = EntityStore::new();
        let mut report = LevelReport::default();

        load_assets(&level, &paths, &mut source, &mut tables, &mut report);
        spawn_entities(&level, &tables, &GameConfig::default(), &mut store, &mut report);

        assert_eq!(report.textures_loaded, 2);
        assert_eq!(report.animations_loaded, 1);
        assert_eq!(report.animations_failed, 1);
        assert_eq!(report.entities_spawned, 4);
        assert_eq!(store.len(), 4);

        let (_, mushroom) = store.find(|e| e.name == "mushroom").expect("mushroom");
        assert_eq!(mushroom.animation_name(), Some("mushroomHop"));
        assert_eq!(mushroom.bounds(), Rect::new(50, 60, 20, 18));
        assert_eq!(mushroom.foot_size(), (10, 6));

        let names: Vec<&str> = store.iter_ordered().map(|(_, e)| e.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"background"));
    }

    #[test]
    fn incomplete_animation_releases_loaded_frames() {
        let level = parse_level("level1", "[ANIMATIONS]\nmushroomHop 3 100 4 4\n");
        let mut source = level_textures();
        let mut tables = AssetTables::new();
        let mut report = LevelReport::default();

        load_assets(
            &level,
            &AssetPaths::new("assets"),
            &mut source,
            &mut tables,
            &mut report,
        );

        assert!(tables.animations.is_empty());
        assert!(source.live.is_empty());
        assert_eq!(report.animations_failed, 1);
    }

    #[test]
    fn unknown_map_entry_is_skipped() {
        let level = parse_level("level1", "[MAP]\nghost 2 1 1 2 2\n");
        let tables = AssetTables::new();
        let mut store = EntityStore::new();
        let mut report = LevelReport::default();
        spawn_entities(&level, &tables, &GameConfig::default(), &mut store, &mut report);
        assert!(store.is_empty());
        assert_eq!(report.placements_skipped, 1);
    }

    #[test]
    fn positions_outside_the_world_are_skipped() {
        let level = parse_level(
            "level1",
            "[TEXTURES]\nrock 8 8\n[MAP]\nrock 3 0 2147483647 10 20 -5 0\n",
        );
        let mut source = level_textures();
        let mut tables = AssetTables::new();
        let mut store = EntityStore::new();
        let mut report = LevelReport::default();

        load_assets(&level, &AssetPaths::new("assets"), &mut source, &mut tables, &mut report);
        spawn_entities(&level, &tables, &GameConfig::default(), &mut store, &mut report);

        assert_eq!(store.len(), 1);
        assert_eq!(report.entities_spawned, 1);
        assert_eq!(report.positions_outside_world, 2);
        let (_, rock) = store.find(|e| e.name == "rock").expect("rock spawned");
        assert_eq!(rock.bounds(), Rect::new(10, 20, 16, 16));
    }

    #[test]
    fn missing_level_file_is_an_error() {
        let err = load_level_from_path("nope", &temp_file_path("missing"))
            .expect_err("missing file should fail");
        assert!(err.contains("Failed to read level file"));
    }

    #[test]
    fn level_file_round_trips_through_disk() {
        let path = temp_file_path("disk");
        fs::write(&path, LEVEL).expect("write temp level");
        let level = load_level_from_path("level1", &path).expect("level loads");
        assert_eq!(level, parse_level("level1", LEVEL));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn decoration_manifest_spawns_named_statics() {
        let path = temp_file_path("manifest");
        fs::write(&path, "props/lamp.png\n\nprops/missing.png\nprops/crate.small.png\n")
            .expect("write manifest");
        let mut source = FakeTextures::default()
            .with("assets/props/lamp.png", (12, 40))
            .with("assets/props/crate.small.png", (24, 24));
        let mut store = EntityStore::new();

        let ids = load_decoration_manifest(&path, &AssetPaths::new("assets"), &mut source, &mut store)
            .expect("manifest loads");

        assert_eq!(ids.len(), 2);
        let (_, lamp) = store.find(|e| e.name == "lamp").expect("lamp");
        assert_eq!(lamp.bounds(), Rect::new(0, 0, 12, 40));
        assert_eq!(lamp.foot_size(), DECORATION_FOOT_SIZE);
        assert!(store.find(|e| e.name == "crate").is_some());
        let _ = fs::remove_file(path);
    }
}
