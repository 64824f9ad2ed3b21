//! CPU-side sprite batching and the GPU buffers it streams into.
//!
//! The world issues one `draw` per sprite in paint order. Each becomes a quad
//! in a shared vertex/index mesh; consecutive quads with the same texture
//! collapse into a single draw call, so a run of tiles from one image costs
//! one bind-group switch.

use smk_core::{Rect, SpriteRenderer, TextureId};

use crate::texture_cache::TextureCache;
use crate::vertex::SpriteVertex;

/// A contiguous run of indices that share the same texture binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub texture: TextureId,
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Default)]
pub struct SpriteBatch {
    pub vertices: Vec<SpriteVertex>,
    pub indices: Vec<u32>,
    pub draw_calls: Vec<DrawCall>,
}

impl SpriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.draw_calls.clear();
    }

    pub fn sprite_count(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Bind-group switches the render pass will perform.
    pub fn texture_binds(&self) -> usize {
        let mut binds = 0usize;
        let mut current = None;
        for draw in &self.draw_calls {
            if current != Some(draw.texture) {
                current = Some(draw.texture);
                binds += 1;
            }
        }
        binds
    }
}

impl SpriteRenderer for SpriteBatch {
    fn draw(&mut self, texture: TextureId, dest: Rect, mirrored: bool) {
        if dest.w <= 0 || dest.h <= 0 {
            return;
        }
        let base_index = self.vertices.len() as u32;
        self.vertices
            .extend_from_slice(&SpriteVertex::quad(dest, mirrored));

        let draw_start = self.indices.len() as u32;
        self.indices.extend_from_slice(&[
            base_index,
            base_index + 1,
            base_index + 2,
            base_index,
            base_index + 2,
            base_index + 3,
        ]);
        push_draw_call(&mut self.draw_calls, texture, draw_start, 6);
    }
}

/// Append a draw call, merging with the previous one when the texture
/// matches and the indices are contiguous.
fn push_draw_call(draw_calls: &mut Vec<DrawCall>, texture: TextureId, index_start: u32, index_count: u32) {
    if let Some(last) = draw_calls.last_mut() {
        let contiguous = last.index_start + last.index_count == index_start;
        if last.texture == texture && contiguous {
            last.index_count += index_count;
            return;
        }
    }
    draw_calls.push(DrawCall {
        texture,
        index_start,
        index_count,
    });
}

/// Vertex and index buffers sized for the largest batch seen so far. They
/// grow by powers of two and never shrink.
pub struct SpriteBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    index_capacity: usize,
}

impl SpriteBuffers {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            vertex_buffer: create_vertex_buffer(device, 1),
            index_buffer: create_index_buffer(device, 1),
            vertex_capacity: 1,
            index_capacity: 1,
        }
    }

    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, batch: &SpriteBatch) {
        let needed_vertices = batch.vertices.len().max(1);
        if needed_vertices > self.vertex_capacity {
            self.vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(device, self.vertex_capacity);
        }
        let needed_indices = batch.indices.len().max(1);
        if needed_indices > self.index_capacity {
            self.index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(device, self.index_capacity);
        }

        if !batch.vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&batch.vertices));
        }
        if !batch.indices.is_empty() {
            queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&batch.indices));
        }
    }

    /// Record the batch into `render_pass`. The sprite pipeline and camera
    /// bind group must already be set. Draw calls whose texture has been
    /// released are skipped.
    pub fn draw(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        batch: &SpriteBatch,
        textures: &TextureCache,
    ) {
        if batch.draw_calls.is_empty() {
            return;
        }
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        let mut last_bound = None;
        for draw in &batch.draw_calls {
            let Some(texture) = textures.get(draw.texture) else {
                continue;
            };
            if last_bound != Some(draw.texture) {
                render_pass.set_bind_group(1, &texture.bind_group, &[]);
                last_bound = Some(draw.texture);
            }
            render_pass.draw_indexed(
                draw.index_start..(draw.index_start + draw.index_count),
                0,
                0..1,
            );
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_sprites_with_same_texture_merge() {
        let mut batch = SpriteBatch::new();
        batch.draw(TextureId(1), Rect::new(0, 0, 16, 16), false);
        batch.draw(TextureId(1), Rect::new(16, 0, 16, 16), false);
        batch.draw(TextureId(2), Rect::new(0, 16, 16, 16), true);
        batch.draw(TextureId(1), Rect::new(16, 16, 16, 16), false);

        assert_eq!(batch.sprite_count(), 4);
        assert_eq!(
            batch.draw_calls,
            vec![
                DrawCall {
                    texture: TextureId(1),
                    index_start: 0,
                    index_count: 12
                },
                DrawCall {
                    texture: TextureId(2),
                    index_start: 12,
                    index_count: 6
                },
                DrawCall {
                    texture: TextureId(1),
                    index_start: 18,
                    index_count: 6
                },
            ]
        );
        assert_eq!(batch.texture_binds(), 3);
    }

    #[test]
    fn indices_reference_their_own_quad() {
        let mut batch = SpriteBatch::new();
        batch.draw(TextureId(0), Rect::new(0, 0, 4, 4), false);
        batch.draw(TextureId(0), Rect::new(4, 0, 4, 4), false);
        assert_eq!(&batch.indices[6..], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn degenerate_rects_are_dropped() {
        let mut batch = SpriteBatch::new();
        batch.draw(TextureId(0), Rect::new(0, 0, 0, 10), false);
        assert_eq!(batch.sprite_count(), 0);
        assert!(batch.draw_calls.is_empty());
    }

    #[test]
    fn clear_resets_everything() {
        let mut batch = SpriteBatch::new();
        batch.draw(TextureId(3), Rect::new(0, 0, 4, 4), false);
        batch.clear();
        assert_eq!(batch.sprite_count(), 0);
        assert_eq!(batch.texture_binds(), 0);
    }
}
