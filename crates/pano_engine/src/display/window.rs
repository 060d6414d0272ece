//! GLFW window with an OpenGL 3.3 core context
//!
//! Owns the GLFW instance, the window and its event receiver, and
//! translates raw key events into viewer [`InputEvent`]s.

use glfw::{Action, Context, Key, WindowEvent};
use thiserror::Error;

use crate::camera::{KeyAction, MoveDirection, MoveEvent};
use crate::core::WindowConfig;

use super::backend::DisplaySurface;
use super::input::{InputEvent, LookDirection};

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// glfw could not be initialized
    #[error("GLFW initialization failed: {0}")]
    InitializationFailed(String),

    /// No window or GL context with the requested settings
    #[error("Window creation failed ({width}x{height}, OpenGL 3.3 core)")]
    CreationFailed { width: u32, height: u32 },
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper with a current GL context
pub struct ViewerWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, WindowEvent)>,
}

impl ViewerWindow {
    /// Create the window, make its context current and load GL functions
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| WindowError::InitializationFailed(format!("{e:?}")))?;

        glfw.window_hint(glfw::WindowHint::ContextVersion(3, 3));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        glfw.window_hint(glfw::WindowHint::DoubleBuffer(true));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (width, height, title) = (config.width, config.height, config.title.as_str());
        let created = if config.fullscreen {
            glfw.with_primary_monitor(|glfw, monitor| match monitor {
                Some(monitor) => {
                    let (w, h) = monitor
                        .get_video_mode()
                        .map_or((width, height), |mode| (mode.width, mode.height));
                    glfw.create_window(w, h, title, glfw::WindowMode::FullScreen(monitor))
                }
                None => {
                    log::warn!("No primary monitor, falling back to windowed mode");
                    glfw.create_window(width, height, title, glfw::WindowMode::Windowed)
                }
            })
        } else {
            glfw.create_window(width, height, title, glfw::WindowMode::Windowed)
        };
        let (mut window, events) = created.ok_or(WindowError::CreationFailed { width, height })?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);
        window.make_current();

        glfw.set_swap_interval(if config.vsync {
            glfw::SwapInterval::Sync(1)
        } else {
            glfw::SwapInterval::None
        });
        gl::load_with(|symbol| window.get_proc_address(symbol) as *const _);

        let (fb_width, fb_height) = window.get_framebuffer_size();
        log::info!("Created window '{title}' with {fb_width}x{fb_height} framebuffer");

        Ok(Self { glfw, window, events })
    }
}

impl DisplaySurface for ViewerWindow {
    fn poll_input(&mut self) -> Vec<InputEvent> {
        self.glfw.poll_events();
        glfw::flush_messages(&self.events)
            .filter_map(|(_, event)| translate_event(&event))
            .collect()
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    fn should_close(&self) -> bool {
        self.window.should_close()
    }

    fn request_close(&mut self) {
        self.window.set_should_close(true);
    }

    fn present(&mut self) {
        self.window.swap_buffers();
    }
}

/// Map a GLFW event to a viewer input event
pub fn translate_event(event: &WindowEvent) -> Option<InputEvent> {
    match *event {
        WindowEvent::Close => Some(InputEvent::Quit),
        WindowEvent::FramebufferSize(width, height) => Some(InputEvent::Resize {
            width: width.max(0) as u32,
            height: height.max(0) as u32,
        }),
        WindowEvent::Key(key, _, action, _) => translate_key(key, action),
        _ => None,
    }
}

fn translate_key(key: Key, action: Action) -> Option<InputEvent> {
    let action = match action {
        Action::Press => KeyAction::Press,
        Action::Repeat => KeyAction::Repeat,
        Action::Release => KeyAction::Release,
    };
    let look = |direction| Some(InputEvent::Look { direction, action });
    match key {
        Key::Escape if action == KeyAction::Press => Some(InputEvent::Quit),
        Key::W => Some(InputEvent::Move(MoveEvent::new(MoveDirection::Forward, action))),
        Key::S => Some(InputEvent::Move(MoveEvent::new(MoveDirection::Backward, action))),
        Key::Up => look(LookDirection::Up),
        Key::Down => look(LookDirection::Down),
        Key::Left => look(LookDirection::Left),
        Key::Right => look(LookDirection::Right),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glfw::Modifiers;

    fn key(key: Key, action: Action) -> WindowEvent {
        WindowEvent::Key(key, 0, action, Modifiers::empty())
    }

    #[test]
    fn test_escape_and_close_quit() {
        assert_eq!(translate_event(&key(Key::Escape, Action::Press)), Some(InputEvent::Quit));
        assert_eq!(translate_event(&key(Key::Escape, Action::Release)), None);
        assert_eq!(translate_event(&WindowEvent::Close), Some(InputEvent::Quit));
    }

    #[test]
    fn test_movement_keys() {
        assert_eq!(
            translate_event(&key(Key::W, Action::Repeat)),
            Some(InputEvent::Move(MoveEvent::new(MoveDirection::Forward, KeyAction::Repeat)))
        );
        assert_eq!(
            translate_event(&key(Key::S, Action::Release)),
            Some(InputEvent::Move(MoveEvent::new(MoveDirection::Backward, KeyAction::Release)))
        );
    }

    #[test]
    fn test_arrow_keys_look() {
        assert_eq!(
            translate_event(&key(Key::Left, Action::Press)),
            Some(InputEvent::Look { direction: LookDirection::Left, action: KeyAction::Press })
        );
        assert_eq!(translate_event(&key(Key::A, Action::Press)), None);
    }

    #[test]
    fn test_resize() {
        assert_eq!(
            translate_event(&WindowEvent::FramebufferSize(800, 600)),
            Some(InputEvent::Resize { width: 800, height: 600 })
        );
    }
}
