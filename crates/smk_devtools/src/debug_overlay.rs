//! egui overlay drawn over the sprite pass.
//!
//! `egui_wgpu::Renderer::render()` wants a `RenderPass<'static>` while
//! `begin_render_pass` borrows the encoder, so a frame goes through
//! `prepare()` (run the UI), `upload()` (textures and buffers),
//! `paint()` (inside a pass made with `forget_lifetime()`) and finally
//! `cleanup()`.
//!
//! The FPS readout in the top-left corner is always drawn. The stats panel
//! is toggled by F3.

use smk_core::time::FrameClock;
use smk_core::world::WorldStats;
use winit::window::Window;

/// Per-frame numbers shown in the F3 panel.
#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    pub world: WorldStats,
    pub draw_calls: u32,
    pub texture_binds: u32,
    pub sprite_count: u32,
    /// Estimated GPU memory usage in megabytes
    pub memory_estimate_mb: f32,
}

impl OverlayStats {
    /// Panel lines, top to bottom.
    pub fn lines(&self) -> Vec<String> {
        let world = &self.world;
        vec![
            format!("Level: {}", world.level),
            format!("Entities: {} ({} NPCs)", world.entities, world.npcs),
            format!(
                "Assets: {} textures, {} animations",
                world.textures, world.animations
            ),
            format!("Player speed: {:.0} px/s", world.player_speed),
            format!("Scale: {:.3}", world.scale),
            format!(
                "Camera: ({}, {})",
                world.camera_offset.x, world.camera_offset.y
            ),
            format!("Sprites: {}", self.sprite_count),
            format!("Draw calls: {}", self.draw_calls),
            format!("Texture binds: {}", self.texture_binds),
            format!("Memory: {:.1} MB", self.memory_estimate_mb),
        ]
    }
}

pub struct DebugOverlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
}

impl DebugOverlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            visible: false,
        }
    }

    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Debug overlay: {}", if self.visible { "ON" } else { "OFF" });
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        clock: &FrameClock,
        stats: Option<&OverlayStats>,
    ) -> (Vec<egui::ClippedPrimitive>, egui::TexturesDelta) {
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let fps_label = clock.fps_label();
        let visible = self.visible;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::Area::new(egui::Id::new("fps_counter"))
                .fixed_pos(egui::pos2(10.0, 10.0))
                .interactable(false)
                .show(ctx, |ui| {
                    ui.label(
                        egui::RichText::new(&fps_label)
                            .color(egui::Color32::WHITE)
                            .monospace(),
                    );
                });

            if visible {
                egui::Window::new("Debug")
                    .default_pos([10.0, 40.0])
                    .resizable(false)
                    .show(ctx, |ui| {
                        ui.label(format!("Frame time: {:.2} ms", clock.smoothed_frame_time_ms));
                        ui.label(format!("Frame: {}", clock.frame_count));
                        if let Some(stats) = stats {
                            ui.separator();
                            for line in stats.lines() {
                                ui.label(line);
                            }
                        }
                    });
            }
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta)
    }

    /// Upload textures and update buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    /// Render into an existing render pass. Call after `upload()`.
    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    /// Free textures that egui no longer needs. Call after rendering.
    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_lines_cover_world_and_render_stats() {
        let stats = OverlayStats {
            world: WorldStats {
                level: "level1".to_string(),
                entities: 12,
                npcs: 3,
                player_speed: 150.0,
                scale: 3.0,
                ..Default::default()
            },
            draw_calls: 7,
            ..Default::default()
        };
        let lines = stats.lines();
        assert_eq!(lines[0], "Level: level1");
        assert_eq!(lines[1], "Entities: 12 (3 NPCs)");
        assert!(lines.contains(&"Scale: 3.000".to_string()));
        assert!(lines.contains(&"Draw calls: 7".to_string()));
    }
}
