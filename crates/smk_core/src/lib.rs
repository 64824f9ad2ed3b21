pub mod animation;
pub mod assets;
pub mod camera;
pub mod config;
pub mod entity;
pub mod input;
pub mod level;
pub mod npc;
pub mod player;
pub mod render;
pub mod store;
pub mod time;
pub mod world;

pub use assets::{TextureId, TextureInfo, TextureSource};
pub use entity::Rect;
pub use render::SpriteRenderer;
pub use world::GameWorld;
