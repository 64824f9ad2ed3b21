use smk_core::Rect;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    /// Screen pixels, origin top-left.
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl SpriteVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: std::mem::offset_of!(SpriteVertex, position) as wgpu::BufferAddress,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::offset_of!(SpriteVertex, tex_coords) as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }

    /// Corners of `dest` in top-left, top-right, bottom-right, bottom-left
    /// order. Mirroring swaps the horizontal texture coordinates.
    pub fn quad(dest: Rect, mirrored: bool) -> [SpriteVertex; 4] {
        let (x0, y0) = (dest.x as f32, dest.y as f32);
        let (x1, y1) = (dest.right() as f32, dest.bottom() as f32);
        let (u0, u1) = if mirrored { (1.0, 0.0) } else { (0.0, 1.0) };
        [
            SpriteVertex {
                position: [x0, y0],
                tex_coords: [u0, 0.0],
            },
            SpriteVertex {
                position: [x1, y0],
                tex_coords: [u1, 0.0],
            },
            SpriteVertex {
                position: [x1, y1],
                tex_coords: [u1, 1.0],
            },
            SpriteVertex {
                position: [x0, y1],
                tex_coords: [u0, 1.0],
            },
        ]
    }
}
