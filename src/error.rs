use thiserror::Error;

/// Failure to resolve the character model or its animation data.
///
/// This is the only error that changes runtime behavior: the character
/// controller mounts in degraded mode instead of propagating it.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("server answered with HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("glTF parse error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("model has no scene graph")]
    MissingScene,

    #[error("model has no animation clips")]
    MissingClips,

    #[error("animation clip not found: {0}")]
    ClipNotFound(String),
}

/// Failure to bring up the GPU for a surface.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("could not create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("could not open device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}
