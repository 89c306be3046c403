pub mod eye;
pub mod lens;
pub mod mesh;
pub mod pipeline;
pub mod stereo;

pub use eye::{PerEyeArgs, StereoRig, Viewport};
pub use lens::LensCorrectedDisplay;
pub use mesh::{Mesh, Topology};
pub use stereo::{DrawCall, GpuMesh, StereoRenderer};
