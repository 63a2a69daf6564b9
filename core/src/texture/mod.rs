//! Texture data model.
//!
//! Provides [`TextureFormat`] and [`TextureLevel`] for raw pixel storage,
//! mipmapped containers ([`Texture2D`], [`TextureCube`],
//! [`Texture2DArray`], [`Texture3D`]) with borrowed views, cube face
//! selection, and the texel-level sampling routines the views use.

mod cube;
mod format;
mod level;
pub mod sampling;
mod types;

pub use cube::{cube_face_coords, project_to_face, select_cube_face, CubeFace, CubeFaceCoords};
pub use format::{ChannelOrder, ChannelType, TextureFormat};
pub use level::TextureLevel;
pub use types::{
    compute_mip_pyramid_levels, mip_level_size, Texture2D, Texture2DArray, Texture2DArrayView,
    Texture2DView, Texture3D, Texture3DView, TextureCube, TextureCubeView,
};
