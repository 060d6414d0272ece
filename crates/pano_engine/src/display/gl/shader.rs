//! GLSL program compilation with full info-log reporting

use std::ffi::CString;
use std::ptr;

use gl::types::{GLchar, GLenum, GLint, GLuint};

use crate::display::backend::{DisplayError, DisplayResult};

/// Linked shader program, deleted on drop
#[derive(Debug)]
pub struct ShaderProgram {
    id: GLuint,
}

impl ShaderProgram {
    /// Compile and link a vertex/fragment pair
    ///
    /// Requires a current GL context. Compile and link failures carry the
    /// driver's complete info log.
    pub fn from_sources(vertex_src: &str, fragment_src: &str) -> DisplayResult<Self> {
        let vs = compile(vertex_src, gl::VERTEX_SHADER, "vertex")?;
        let fs = match compile(fragment_src, gl::FRAGMENT_SHADER, "fragment") {
            Ok(fs) => fs,
            Err(e) => {
                unsafe { gl::DeleteShader(vs) };
                return Err(e);
            }
        };

        unsafe {
            let id = gl::CreateProgram();
            gl::AttachShader(id, vs);
            gl::AttachShader(id, fs);
            gl::LinkProgram(id);

            let mut status = GLint::from(gl::FALSE);
            gl::GetProgramiv(id, gl::LINK_STATUS, &mut status);

            gl::DetachShader(id, vs);
            gl::DetachShader(id, fs);
            gl::DeleteShader(vs);
            gl::DeleteShader(fs);

            if status != GLint::from(gl::TRUE) {
                let log = program_info_log(id);
                gl::DeleteProgram(id);
                log::error!("Shader link error:\n{log}");
                return Err(DisplayError::ShaderLink { log });
            }
            Ok(Self { id })
        }
    }

    /// Use this program for subsequent draws
    pub fn bind(&self) {
        unsafe { gl::UseProgram(self.id) };
    }

    /// Location of a uniform, or `None` if the program does not use it
    pub fn uniform_location(&self, name: &str) -> Option<GLint> {
        let name = CString::new(name).ok()?;
        let location = unsafe { gl::GetUniformLocation(self.id, name.as_ptr()) };
        (location >= 0).then_some(location)
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        unsafe { gl::DeleteProgram(self.id) };
    }
}

fn compile(source: &str, kind: GLenum, stage: &'static str) -> DisplayResult<GLuint> {
    let source = CString::new(source).map_err(|_| DisplayError::ShaderCompile {
        stage,
        log: "source contains a NUL byte".to_string(),
    })?;

    unsafe {
        let shader = gl::CreateShader(kind);
        gl::ShaderSource(shader, 1, &source.as_ptr(), ptr::null());
        gl::CompileShader(shader);

        let mut status = GLint::from(gl::FALSE);
        gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
        if status != GLint::from(gl::TRUE) {
            let log = shader_info_log(shader);
            gl::DeleteShader(shader);
            log::error!("Shader compilation error ({stage}):\n{log}");
            return Err(DisplayError::ShaderCompile { stage, log });
        }
        Ok(shader)
    }
}

unsafe fn shader_info_log(shader: GLuint) -> String {
    let mut len: GLint = 0;
    gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len);
    let mut buf = vec![0u8; len.max(1) as usize];
    let mut written: GLint = 0;
    gl::GetShaderInfoLog(shader, buf.len() as GLint, &mut written, buf.as_mut_ptr().cast::<GLchar>());
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}

unsafe fn program_info_log(program: GLuint) -> String {
    let mut len: GLint = 0;
    gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len);
    let mut buf = vec![0u8; len.max(1) as usize];
    let mut written: GLint = 0;
    gl::GetProgramInfoLog(program, buf.len() as GLint, &mut written, buf.as_mut_ptr().cast::<GLchar>());
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}
