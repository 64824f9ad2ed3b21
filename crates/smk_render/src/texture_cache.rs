//! GPU-side owner of every texture the world has loaded, addressed by the
//! opaque `TextureId` handles the world model stores.

use std::collections::HashMap;
use std::path::Path;

use smk_core::{TextureId, TextureInfo, TextureSource};

use crate::sprite_pipeline::SpritePipeline;
use crate::texture::Texture;

pub struct GpuSpriteTexture {
    pub texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

#[derive(Default)]
pub struct TextureCache {
    textures: HashMap<TextureId, GpuSpriteTexture>,
    next_id: u32,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TextureId) -> Option<&GpuSpriteTexture> {
        self.textures.get(&id)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Rough GPU memory held by textures, in MiB.
    pub fn estimate_memory_mb(&self) -> f32 {
        let bytes: u64 = self
            .textures
            .values()
            .map(|t| t.texture.width as u64 * t.texture.height as u64 * 4)
            .sum();
        bytes as f32 / (1024.0 * 1024.0)
    }

    fn allocate_id(&mut self) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Borrow the cache together with the GPU handles needed to fill it.
    pub fn loader<'a>(
        &'a mut self,
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        pipeline: &'a SpritePipeline,
    ) -> TextureLoader<'a> {
        TextureLoader {
            cache: self,
            device,
            queue,
            pipeline,
        }
    }
}

/// `TextureSource` backed by the GPU: reads the file, decodes it, uploads it
/// and hands back a fresh id.
pub struct TextureLoader<'a> {
    cache: &'a mut TextureCache,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    pipeline: &'a SpritePipeline,
}

impl TextureSource for TextureLoader<'_> {
    fn load_texture(&mut self, path: &Path) -> Result<TextureInfo, String> {
        let bytes = std::fs::read(path)
            .map_err(|e| format!("Failed to read texture '{}': {e}", path.display()))?;
        let label = path.to_string_lossy();
        let texture = Texture::from_bytes(self.device, self.queue, &bytes, &label)?;
        let bind_group = self
            .pipeline
            .create_texture_bind_group(self.device, &texture);
        let info = TextureInfo {
            id: self.cache.allocate_id(),
            width: texture.width,
            height: texture.height,
        };
        self.cache.textures.insert(
            info.id,
            GpuSpriteTexture {
                texture,
                bind_group,
            },
        );
        Ok(info)
    }

    fn release_texture(&mut self, id: TextureId) {
        if self.cache.textures.remove(&id).is_none() {
            log::warn!("Release of unknown texture {:?}", id);
        }
    }
}
