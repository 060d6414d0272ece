//! Off-screen color and depth target for one eye

use std::ptr;

use gl::types::{GLint, GLsizei, GLuint};

use crate::display::backend::{DisplayError, DisplayResult};

/// RGBA8 color texture plus 32-bit float depth texture
///
/// Owns the framebuffer object and both attachments; all three are deleted
/// on drop.
#[derive(Debug)]
pub struct EyeFramebuffer {
    fbo: GLuint,
    color: GLuint,
    depth: GLuint,
    width: u32,
    height: u32,
}

impl EyeFramebuffer {
    /// Allocate color and depth attachments of `width` x `height`
    pub fn new(width: u32, height: u32) -> DisplayResult<Self> {
        unsafe {
            let mut textures = [0; 2];
            gl::GenTextures(2, textures.as_mut_ptr());
            let [color, depth] = textures;
            for &texture in &textures {
                gl::BindTexture(gl::TEXTURE_2D, texture);
                gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as GLint);
                gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as GLint);
                gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_BORDER as GLint);
                gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_BORDER as GLint);
            }

            // The panorama is already display-encoded, so no sRGB target
            gl::BindTexture(gl::TEXTURE_2D, color);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA8 as GLint,
                width as GLsizei,
                height as GLsizei,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                ptr::null(),
            );
            gl::BindTexture(gl::TEXTURE_2D, depth);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::DEPTH_COMPONENT32F as GLint,
                width as GLsizei,
                height as GLsizei,
                0,
                gl::DEPTH_COMPONENT,
                gl::FLOAT,
                ptr::null(),
            );

            let mut fbo = 0;
            gl::GenFramebuffers(1, &mut fbo);
            let target = Self { fbo, color, depth, width, height };

            gl::BindFramebuffer(gl::FRAMEBUFFER, fbo);
            gl::FramebufferTexture2D(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT0, gl::TEXTURE_2D, color, 0);
            gl::FramebufferTexture2D(gl::FRAMEBUFFER, gl::DEPTH_ATTACHMENT, gl::TEXTURE_2D, depth, 0);
            let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);

            if status != gl::FRAMEBUFFER_COMPLETE {
                log::error!("Eye framebuffer {width}x{height} incomplete: 0x{status:04x}");
                return Err(DisplayError::IncompleteFramebuffer(status));
            }
            log::debug!("Created eye framebuffer {width}x{height}");
            Ok(target)
        }
    }

    /// Make this the draw target and set the viewport
    pub fn bind(&self) {
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, self.fbo);
            gl::Viewport(0, 0, self.width as GLsizei, self.height as GLsizei);
        }
    }

    /// Color attachment handed to the compositor
    pub fn color_texture(&self) -> GLuint {
        self.color
    }

    /// Attachment size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for EyeFramebuffer {
    fn drop(&mut self) {
        unsafe {
            gl::DeleteFramebuffers(1, &self.fbo);
            gl::DeleteTextures(2, [self.color, self.depth].as_ptr());
        }
    }
}
