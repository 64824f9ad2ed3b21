pub mod camera;
pub mod gpu_context;
pub mod sprite_batch;
pub mod sprite_pipeline;
pub mod texture;
pub mod texture_cache;
pub mod vertex;

pub use camera::{Camera2D, CameraUniform};
pub use gpu_context::{GpuContext, GpuInitError};
pub use sprite_batch::{SpriteBatch, SpriteBuffers};
pub use sprite_pipeline::SpritePipeline;
pub use texture::Texture;
pub use texture_cache::{TextureCache, TextureLoader};
pub use vertex::SpriteVertex;
