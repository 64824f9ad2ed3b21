//! Scrolling camera: a top-left world offset plus a uniform zoom scale.

use glam::IVec2;

use crate::config::CameraConfig;
use crate::entity::Rect;

#[derive(Debug, Clone)]
pub struct Camera {
    /// Top-left corner of the visible world region.
    pub offset: IVec2,
    pub scale: f32,
    pub screen: (u32, u32),
    scale_min: f32,
    scale_max: f32,
    zoom_in_factor: f32,
    zoom_out_factor: f32,
}

impl Camera {
    pub fn new(screen: (u32, u32), config: &CameraConfig) -> Self {
        Self {
            offset: IVec2::ZERO,
            scale: config.scale.clamp(config.scale_min, config.scale_max),
            screen,
            scale_min: config.scale_min,
            scale_max: config.scale_max,
            zoom_in_factor: config.zoom_in_factor,
            zoom_out_factor: config.zoom_out_factor,
        }
    }

    /// World-space size of the visible region.
    pub fn viewport(&self) -> IVec2 {
        viewport_size(self.screen, self.scale)
    }

    /// Center the view on `target`, clamped to the world.
    pub fn follow(&mut self, target: Rect, world: IVec2) {
        self.offset = clamped_offset(target, self.viewport(), world);
    }

    pub fn zoom_in(&mut self) {
        self.scale = (self.scale * self.zoom_in_factor).min(self.scale_max);
    }

    pub fn zoom_out(&mut self) {
        self.scale = (self.scale * self.zoom_out_factor).max(self.scale_min);
    }

    pub fn world_to_screen(&self, rect: Rect) -> Rect {
        Rect {
            x: ((rect.x - self.offset.x) as f32 * self.scale) as i32,
            y: ((rect.y - self.offset.y) as f32 * self.scale) as i32,
            w: (rect.w as f32 * self.scale) as i32,
            h: (rect.h as f32 * self.scale) as i32,
        }
    }
}

pub fn viewport_size(screen: (u32, u32), scale: f32) -> IVec2 {
    IVec2::new(
        (screen.0 as f32 / scale) as i32,
        (screen.1 as f32 / scale) as i32,
    )
}

/// Offset that centers `target` in a `viewport`-sized window, clamped to
/// `[0, world - viewport]`. A viewport larger than the world pins to 0.
pub fn clamped_offset(target: Rect, viewport: IVec2, world: IVec2) -> IVec2 {
    let x = target.x + target.w / 2 - viewport.x / 2;
    let y = target.y + target.h / 2 - viewport.y / 2;
    IVec2::new(
        x.min(world.x - viewport.x).max(0),
        y.min(world.y - viewport.y).max(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD: IVec2 = IVec2::new(1600, 1200);

    #[test]
    fn viewport_divides_screen_by_scale() {
        assert_eq!(viewport_size((800, 600), 2.0), IVec2::new(400, 300));
        assert_eq!(viewport_size((800, 600), 3.0), IVec2::new(266, 200));
    }

    #[test]
    fn offset_centers_target_in_open_space() {
        let target = Rect::new(800, 600, 20, 20);
        let offset = clamped_offset(target, IVec2::new(400, 300), WORLD);
        assert_eq!(offset, IVec2::new(610, 460));
    }

    #[test]
    fn offset_never_leaves_world() {
        let viewport = IVec2::new(400, 300);
        let corners = [
            Rect::new(0, 0, 16, 16),
            Rect::new(1584, 1184, 16, 16),
            Rect::new(0, 1184, 16, 16),
            Rect::new(1584, 0, 16, 16),
        ];
        for target in corners {
            let offset = clamped_offset(target, viewport, WORLD);
            assert!((0..=WORLD.x - viewport.x).contains(&offset.x));
            assert!((0..=WORLD.y - viewport.y).contains(&offset.y));
        }
    }

    #[test]
    fn oversized_viewport_pins_to_origin() {
        let offset = clamped_offset(Rect::new(800, 600, 16, 16), IVec2::new(4000, 3000), WORLD);
        assert_eq!(offset, IVec2::ZERO);
    }

    #[test]
    fn zoom_respects_bounds() {
        let mut camera = Camera::new((800, 600), &CameraConfig::default());
        for _ in 0..50 {
            camera.zoom_in();
        }
        assert_eq!(camera.scale, 5.0);
        for _ in 0..200 {
            camera.zoom_out();
        }
        assert_eq!(camera.scale, 0.1);
    }

    #[test]
    fn world_to_screen_applies_offset_then_scale() {
        let mut camera = Camera::new((800, 600), &CameraConfig::default());
        camera.offset = IVec2::new(10, 20);
        camera.scale = 2.0;
        let screen = camera.world_to_screen(Rect::new(15, 30, 16, 8));
        assert_eq!(screen, Rect::new(10, 20, 32, 16));
    }
}
