//! Per-level asset tables and the texture-loading seam.
//!
//! The world model never touches image bytes or GPU objects. It asks a
//! `TextureSource` to turn a file path into an opaque `TextureId` plus pixel
//! size, and keeps only those handles. The render crate provides the real
//! implementation; tests use an in-memory fake.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::animation::AnimationLibrary;

/// Opaque handle to a drawable owned by the texture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

/// Loads images into drawables. Failures are reported, never fatal here.
pub trait TextureSource {
    fn load_texture(&mut self, path: &Path) -> Result<TextureInfo, String>;

    /// Drop a drawable previously returned by `load_texture`.
    fn release_texture(&mut self, id: TextureId);
}

/// A single-image texture declared in a level, with its foot geometry.
#[derive(Debug, Clone, Copy)]
pub struct StaticTexture {
    pub info: TextureInfo,
    pub foot_size: (i32, i32),
}

#[derive(Debug, Default)]
pub struct AssetTables {
    textures: HashMap<String, StaticTexture>,
    pub animations: AnimationLibrary,
}

impl AssetTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_texture(&mut self, name: &str, texture: StaticTexture) {
        self.textures.insert(name.to_string(), texture);
    }

    pub fn texture(&self, name: &str) -> Option<&StaticTexture> {
        self.textures.get(name)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Every drawable referenced by the tables, for releasing on unload.
    pub fn texture_ids(&self) -> Vec<TextureId> {
        let mut ids: Vec<TextureId> = self.textures.values().map(|t| t.info.id).collect();
        for animation in self.animations.iter() {
            ids.extend(animation.frames.iter().map(|f| f.id));
        }
        ids
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.animations.clear();
    }
}

/// Conventional on-disk layout below the asset root.
#[derive(Debug, Clone)]
pub struct AssetPaths {
    root: PathBuf,
}

impl AssetPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn level_file(&self, level: &str) -> PathBuf {
        self.root.join("levels").join(format!("{level}.txt"))
    }

    pub fn level_texture(&self, level: &str, texture: &str) -> PathBuf {
        self.root
            .join("textures")
            .join(level)
            .join(format!("{texture}.png"))
    }

    /// Frame files are 1-based: `animations/<folder>/<name><index>.png`.
    pub fn animation_frame(&self, animation: &str, frame_number: u32) -> PathBuf {
        self.root
            .join("animations")
            .join(animation_folder(animation))
            .join(format!("{animation}{frame_number}.png"))
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

/// Folder holding an animation's frames: the name up to its first uppercase
/// letter, so `aaronWalkNE` lives under `aaron/`.
pub fn animation_folder(animation: &str) -> &str {
    match animation.find(|c: char| c.is_ascii_uppercase()) {
        Some(index) => &animation[..index],
        None => animation,
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::HashSet;

    /// In-memory texture source keyed by path.
    #[derive(Default)]
    pub struct FakeTextures {
        sizes: HashMap<PathBuf, (u32, u32)>,
        next_id: u32,
        pub live: HashSet<TextureId>,
        pub requested: Vec<PathBuf>,
    }

    impl FakeTextures {
        pub fn with(mut self, path: impl Into<PathBuf>, size: (u32, u32)) -> Self {
            self.sizes.insert(path.into(), size);
            self
        }
    }

    impl TextureSource for FakeTextures {
        fn load_texture(&mut self, path: &Path) -> Result<TextureInfo, String> {
            self.requested.push(path.to_path_buf());
            let (width, height) = *self
                .sizes
                .get(path)
                .ok_or_else(|| format!("No such image {}", path.display()))?;
            let id = TextureId(self.next_id);
            self.next_id += 1;
            self.live.insert(id);
            Ok(TextureInfo { id, width, height })
        }

        fn release_texture(&mut self, id: TextureId) {
            self.live.remove(&id);
        }
    }
}
