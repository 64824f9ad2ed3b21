//! The draw seam between the world model and whatever puts pixels on screen.

use crate::assets::TextureId;
use crate::camera::Camera;
use crate::entity::Rect;
use crate::store::EntityStore;

pub trait SpriteRenderer {
    /// Queue `texture` stretched over `dest` (screen pixels), flipped
    /// horizontally when `mirrored`.
    fn draw(&mut self, texture: TextureId, dest: Rect, mirrored: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCommand {
    pub texture: TextureId,
    pub dest: Rect,
    pub mirrored: bool,
}

impl SpriteRenderer for Vec<DrawCommand> {
    fn draw(&mut self, texture: TextureId, dest: Rect, mirrored: bool) {
        self.push(DrawCommand {
            texture,
            dest,
            mirrored,
        });
    }
}

/// Draw the store back to front through `camera`. Entities without an image
/// are skipped. Returns the number of draws issued.
pub fn draw_world(store: &EntityStore, camera: &Camera, renderer: &mut dyn SpriteRenderer) -> usize {
    let mut drawn = 0;
    for (_, entity) in store.iter_ordered() {
        let Some(texture) = entity.texture else {
            continue;
        };
        renderer.draw(texture, camera.world_to_screen(entity.bounds()), entity.mirrored);
        drawn += 1;
    }
    drawn
}
