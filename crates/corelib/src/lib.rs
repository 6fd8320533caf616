//! Core types: math re-exports, camera, transform state, frame clock,
//! tangent-space basis and pipeline feature selection.

pub use glam::{Mat3, Mat4, Vec2, Vec3, Vec4, vec2, vec3};

pub mod camera;
pub mod clock;
pub mod features;
pub mod tangent;
pub mod transform;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unsupported texture count {0} (expected 0, 1 or 2)")]
    TextureCount(u8),
    #[error("invalid pipeline features: {0}")]
    InvalidFeatures(&'static str),
}

pub type CoreResult<T> = Result<T, CoreError>;
