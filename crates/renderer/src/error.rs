//! Renderer error types.

use thiserror::Error;

use crate::shader::{ShaderError, StageKind};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create rendering surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error("failed to read {stage} shader {path}: {source}")]
    ShaderFile {
        stage: StageKind,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("shader reads vertex attribute at location {0}, which the mesh does not provide")]
    MissingAttribute(u32),
    #[error("shader resource `{0}` has nothing bound to it")]
    UnboundResource(String),
    #[error("expected {expected} texture(s) for this pipeline, got {actual}")]
    TextureCount { expected: usize, actual: usize },
    #[error("texture {width}x{height} exceeds the device limit of {limit}")]
    TextureTooLarge { width: u32, height: u32, limit: u32 },
    #[error("texture upload failed: {0}")]
    Texture(String),
    #[error("invalid mesh: {0}")]
    Mesh(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
