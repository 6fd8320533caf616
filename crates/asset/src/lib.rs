//! Asset loading: mesh models, per-face attribute streams and decoded images.

pub mod mesh;
pub mod model;
pub mod obj;
pub mod texture;

pub use mesh::MeshStreams;
pub use model::Model;
pub use obj::ObjModel;
pub use texture::DecodedImage;
