use std::sync::Arc;
use winit::dpi::LogicalSize;
use winit::error::OsError;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Draw our own cursor sprite instead of the system pointer.
    pub hide_cursor: bool,
}

impl PlatformConfig {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width: width.max(1),
            height: height.max(1),
            hide_cursor: true,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::new("Space Monkeys", 800, 600)
    }
}

/// Open the game window. The size is fixed: the world camera works in
/// whole screen pixels and level layouts assume the configured size.
pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &PlatformConfig,
) -> Result<Arc<Window>, OsError> {
    let attrs = WindowAttributes::default()
        .with_title(&config.title)
        .with_inner_size(LogicalSize::new(config.width, config.height))
        .with_resizable(false);

    let window = event_loop.create_window(attrs)?;
    if config.hide_cursor {
        window.set_cursor_visible(false);
    }
    log::info!(
        "Window '{}' created ({}x{})",
        config.title,
        config.width,
        config.height
    );
    Ok(Arc::new(window))
}
