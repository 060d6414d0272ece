//! OpenGL 3.3 core implementation of [`DisplayBackend`]

use std::ffi::c_void;
use std::mem;

use gl::types::{GLint, GLsizei, GLsizeiptr, GLuint};

use crate::display::backend::{DisplayBackend, DisplayError, DisplayResult, DrawTarget, Eye, TextureHandle};
use crate::display::texture_mapping::{CUBE_STRIP, CUBE_STRIP_VERTICES};
use crate::foundation::math::Mat4;
use crate::pipeline::frame::{pixel_bytes, FrameSize};

use super::framebuffer::EyeFramebuffer;
use super::shader::ShaderProgram;

const VERTEX_SHADER: &str = include_str!("../../../shaders/panorama.vert");
const FRAGMENT_SHADER: &str = include_str!("../../../shaders/panorama.frag");

/// Environment-cube renderer
///
/// Must be created and used on the thread whose GL context is current,
/// after the GL function pointers were loaded.
pub struct GlBackend {
    program: ShaderProgram,
    proj_view_location: Option<GLint>,
    vao: GLuint,
    vbo: GLuint,
    panorama: GLuint,
    panorama_size: Option<FrameSize>,
    eyes: [Option<EyeFramebuffer>; 2],
}

impl GlBackend {
    /// Compile the environment shader and build the cube; needs a current context
    pub fn new() -> DisplayResult<Self> {
        let program = ShaderProgram::from_sources(VERTEX_SHADER, FRAGMENT_SHADER)?;
        let proj_view_location = program.uniform_location("proj_view");
        if proj_view_location.is_none() {
            log::warn!("Shader program has no proj_view uniform");
        }

        let (mut vao, mut vbo, mut panorama) = (0, 0, 0);
        unsafe {
            program.bind();
            if let Some(envmap) = program.uniform_location("envmap") {
                gl::Uniform1i(envmap, 0);
            }

            gl::GenVertexArrays(1, &mut vao);
            gl::GenBuffers(1, &mut vbo);
            gl::BindVertexArray(vao);
            gl::BindBuffer(gl::ARRAY_BUFFER, vbo);
            let vertices: &[u8] = bytemuck::cast_slice(&CUBE_STRIP);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                vertices.len() as GLsizeiptr,
                vertices.as_ptr().cast::<c_void>(),
                gl::STATIC_DRAW,
            );
            gl::EnableVertexAttribArray(0);
            gl::VertexAttribPointer(0, 3, gl::FLOAT, gl::FALSE, (3 * mem::size_of::<f32>()) as GLsizei, std::ptr::null());

            gl::GenTextures(1, &mut panorama);
            gl::BindTexture(gl::TEXTURE_2D, panorama);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as GLint);
            // u spans [-0.25, 0.75), so wrap horizontally
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::REPEAT as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as GLint);

            gl::ClearColor(0.0, 0.0, 0.0, 1.0);
            gl::ClearDepth(1.0);
        }
        log::info!("OpenGL environment renderer ready");

        Ok(Self {
            program,
            proj_view_location,
            vao,
            vbo,
            panorama,
            panorama_size: None,
            eyes: [None, None],
        })
    }

    fn eye_target(&mut self, eye: Eye, width: u32, height: u32) -> DisplayResult<&EyeFramebuffer> {
        let slot = &mut self.eyes[eye_index(eye)];
        if slot.as_ref().map(EyeFramebuffer::size) != Some((width, height)) {
            *slot = Some(EyeFramebuffer::new(width, height)?);
        }
        slot.as_ref()
            .ok_or_else(|| DisplayError::Compositor("eye framebuffer missing".to_string()))
    }
}

impl DisplayBackend for GlBackend {
    fn upload_panorama(&mut self, size: FrameSize, pixels: &[u32]) -> DisplayResult<()> {
        if pixels.len() != size.pixel_count() {
            return Err(DisplayError::TextureSize { size, actual: pixels.len() });
        }
        let bytes = pixel_bytes(pixels);
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, self.panorama);
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 4);
            if self.panorama_size == Some(size) {
                gl::TexSubImage2D(
                    gl::TEXTURE_2D,
                    0,
                    0,
                    0,
                    size.width as GLsizei,
                    size.height as GLsizei,
                    gl::RGBA,
                    gl::UNSIGNED_BYTE,
                    bytes.as_ptr().cast::<c_void>(),
                );
            } else {
                log::debug!("Allocating {size} panorama texture");
                gl::TexImage2D(
                    gl::TEXTURE_2D,
                    0,
                    gl::RGBA8 as GLint,
                    size.width as GLsizei,
                    size.height as GLsizei,
                    0,
                    gl::RGBA,
                    gl::UNSIGNED_BYTE,
                    bytes.as_ptr().cast::<c_void>(),
                );
                self.panorama_size = Some(size);
            }
        }
        Ok(())
    }

    fn begin_pass(&mut self, target: DrawTarget) -> DisplayResult<()> {
        match target {
            DrawTarget::Window { width, height } => unsafe {
                gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
                gl::Viewport(0, 0, width as GLsizei, height as GLsizei);
            },
            DrawTarget::Eye { eye, width, height } => self.eye_target(eye, width, height)?.bind(),
        }
        unsafe { gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT) };
        Ok(())
    }

    fn draw_environment(&mut self, proj_view: &Mat4) -> DisplayResult<()> {
        self.program.bind();
        unsafe {
            if let Some(location) = self.proj_view_location {
                gl::UniformMatrix4fv(location, 1, gl::FALSE, proj_view.as_ptr());
            }
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.panorama);
            gl::BindVertexArray(self.vao);
            gl::DrawArrays(gl::TRIANGLE_STRIP, 0, CUBE_STRIP_VERTICES as GLsizei);
        }
        Ok(())
    }

    fn eye_texture(&self, eye: Eye) -> Option<TextureHandle> {
        self.eyes[eye_index(eye)]
            .as_ref()
            .map(|fb| TextureHandle(fb.color_texture()))
    }
}

impl Drop for GlBackend {
    fn drop(&mut self) {
        unsafe {
            gl::DeleteTextures(1, &self.panorama);
            gl::DeleteBuffers(1, &self.vbo);
            gl::DeleteVertexArrays(1, &self.vao);
        }
    }
}

fn eye_index(eye: Eye) -> usize {
    match eye {
        Eye::Left => 0,
        Eye::Right => 1,
    }
}
