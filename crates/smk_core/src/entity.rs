//! Sprite entities and the geometry they are built from.
//!
//! Every entity carries two rectangles in integer world units: `bounds` is the
//! full visual extent of the current image, `footprint` is the ground-contact
//! strip at the bottom of it. The footprint is always derived from `bounds`
//! (centered horizontally, bottom-aligned) and is what depth sorting and
//! distance checks look at.

use glam::{IVec2, Vec2};

use crate::animation::AnimationState;
use crate::assets::TextureId;

/// Name reserved for the level backdrop. It always paints first.
pub const BACKGROUND_NAME: &str = "background";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.x as f32 + self.w as f32 / 2.0,
            self.y as f32 + self.h as f32 / 2.0,
        )
    }

    /// Half-open containment, matching how pixels are addressed on screen.
    pub fn contains_point(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Ground-contact strip of `foot_w x foot_h`, horizontally centered and
    /// sitting on the bottom edge of `self`. Saturates at the `i32` range.
    pub fn footprint(&self, foot_w: i32, foot_h: i32) -> Rect {
        Rect {
            x: self.x.saturating_add(self.w.saturating_sub(foot_w) / 2),
            y: self.bottom().saturating_sub(foot_h),
            w: foot_w,
            h: foot_h,
        }
    }
}

/// Ordering key derived from entity content. Field order is the comparison
/// order: background layer, footprint bottom, footprint left, name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    layer: u8,
    foot_bottom: i32,
    foot_left: i32,
    name: String,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    bounds: Rect,
    foot_size: (i32, i32),
    footprint: Rect,
    pub texture: Option<TextureId>,
    pub animation: Option<AnimationState>,
    pub mirrored: bool,
    pub is_moving: bool,
}

impl Entity {
    /// A non-animated decoration or prop.
    pub fn new_static(
        name: &str,
        position: IVec2,
        size: (u32, u32),
        foot_size: (i32, i32),
        texture: Option<TextureId>,
    ) -> Self {
        let bounds = Rect::new(position.x, position.y, size.0 as i32, size.1 as i32);
        Self {
            name: name.to_string(),
            bounds,
            foot_size,
            footprint: bounds.footprint(foot_size.0, foot_size.1),
            texture,
            animation: None,
            mirrored: false,
            is_moving: false,
        }
    }

    /// An entity driven by the named animation, starting on its first frame.
    pub fn new_animated(
        name: &str,
        animation_name: &str,
        position: IVec2,
        size: (u32, u32),
        foot_size: (i32, i32),
        first_frame: TextureId,
    ) -> Self {
        let mut entity = Self::new_static(name, position, size, foot_size, Some(first_frame));
        entity.animation = Some(AnimationState::new(animation_name));
        entity
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn footprint(&self) -> Rect {
        self.footprint
    }

    pub fn foot_size(&self) -> (i32, i32) {
        self.foot_size
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }

    pub fn is_background(&self) -> bool {
        self.name == BACKGROUND_NAME
    }

    pub fn animation_name(&self) -> Option<&str> {
        self.animation.as_ref().map(|a| a.name.as_str())
    }

    /// Move the top-left corner, keeping the footprint in sync.
    pub fn set_position(&mut self, position: IVec2) {
        self.bounds.x = position.x;
        self.bounds.y = position.y;
        self.footprint = self.bounds.footprint(self.foot_size.0, self.foot_size.1);
    }

    /// Translate by `delta` and clamp so the whole visual stays inside
    /// `[0, world - size]` on both axes.
    pub fn translate_clamped(&mut self, delta: IVec2, world: IVec2) {
        let x = self
            .bounds
            .x
            .saturating_add(delta.x)
            .min(world.x.saturating_sub(self.bounds.w))
            .max(0);
        let y = self
            .bounds
            .y
            .saturating_add(delta.y)
            .min(world.y.saturating_sub(self.bounds.h))
            .max(0);
        self.set_position(IVec2::new(x, y));
    }

    pub fn sort_key(&self) -> SortKey {
        SortKey {
            layer: if self.is_background() { 0 } else { 1 },
            foot_bottom: self.footprint.bottom(),
            foot_left: self.footprint.x,
            name: self.name.clone(),
        }
    }
}
