//! Model loading: progress reporting and resolution into scene graph + clips

pub mod gltf_loader;
#[cfg(target_arch = "wasm32")]
pub mod fetch;

use crate::error::AssetError;
use crate::model::animation::AnimationClip;
use crate::model::scene_graph::SceneGraph;

#[cfg(target_arch = "wasm32")]
pub use fetch::FetchProvider;
pub use gltf_loader::parse_glb;

/// A resolved model: node hierarchy plus its animation clips
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub scene: SceneGraph,
    pub clips: Vec<AnimationClip>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadProgress {
    /// 0..=100
    pub percent: f32,
    /// True while a load is in flight
    pub active: bool,
}

impl LoadProgress {
    pub const IDLE: Self = Self { percent: 0.0, active: false };

    pub fn of(done: u64, total: Option<u64>) -> Self {
        let percent = match total {
            Some(total) if total > 0 => (done as f64 / total as f64 * 100.0).min(100.0) as f32,
            _ => 0.0,
        };
        Self { percent, active: true }
    }
}

pub trait AssetProvider {
    /// Begin resolving `model_id` (a URL on the web, a path on desktop).
    fn load(&mut self, model_id: &str);

    fn progress(&self) -> LoadProgress;

    /// Drive pending work. Yields the outcome exactly once, when it resolves.
    fn take_resolved(&mut self) -> Option<Result<LoadedModel, AssetError>>;
}

/// Provider that resolves to a prepared outcome on the first poll.
pub struct StaticProvider {
    outcome: Option<Result<LoadedModel, AssetError>>,
    requested: bool,
}

impl StaticProvider {
    pub fn new(outcome: Result<LoadedModel, AssetError>) -> Self {
        Self { outcome: Some(outcome), requested: false }
    }
}

impl AssetProvider for StaticProvider {
    fn load(&mut self, model_id: &str) {
        tracing::debug!(model_id, "static model requested");
        self.requested = true;
    }

    fn progress(&self) -> LoadProgress {
        if self.requested && self.outcome.is_some() {
            LoadProgress { percent: 0.0, active: true }
        } else {
            LoadProgress::IDLE
        }
    }

    fn take_resolved(&mut self) -> Option<Result<LoadedModel, AssetError>> {
        if self.requested {
            self.outcome.take()
        } else {
            None
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::FileProvider;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs::File;
    use std::io::Read;

    use super::*;

    const CHUNK_SIZE: usize = 256 * 1024;

    enum FileLoad {
        Idle,
        Reading { file: File, total: u64, data: Vec<u8> },
        Resolved(Option<Result<LoadedModel, AssetError>>),
    }

    /// Reads a model file a chunk per frame so the loading overlay can show progress.
    pub struct FileProvider {
        state: FileLoad,
        chunk_size: usize,
    }

    impl FileProvider {
        pub fn new() -> Self {
            Self::with_chunk_size(CHUNK_SIZE)
        }

        pub fn with_chunk_size(chunk_size: usize) -> Self {
            Self { state: FileLoad::Idle, chunk_size: chunk_size.max(1) }
        }

        fn open(path: &str) -> Result<(File, u64), AssetError> {
            let file = File::open(path)?;
            let total = file.metadata()?.len();
            Ok((file, total))
        }
    }

    impl Default for FileProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AssetProvider for FileProvider {
        fn load(&mut self, model_id: &str) {
            tracing::info!(path = model_id, "loading model");
            self.state = match Self::open(model_id) {
                Ok((file, total)) => FileLoad::Reading { file, total, data: Vec::with_capacity(total as usize) },
                Err(e) => FileLoad::Resolved(Some(Err(e))),
            };
        }

        fn progress(&self) -> LoadProgress {
            match &self.state {
                FileLoad::Reading { total, data, .. } => LoadProgress::of(data.len() as u64, Some(*total)),
                FileLoad::Resolved(Some(_)) => LoadProgress { percent: 100.0, active: true },
                _ => LoadProgress::IDLE,
            }
        }

        fn take_resolved(&mut self) -> Option<Result<LoadedModel, AssetError>> {
            match &mut self.state {
                FileLoad::Idle => None,
                FileLoad::Resolved(outcome) => outcome.take(),
                FileLoad::Reading { file, data, .. } => {
                    let mut buf = vec![0u8; self.chunk_size];
                    match file.read(&mut buf) {
                        Ok(0) => {
                            let outcome = parse_glb(data);
                            self.state = FileLoad::Resolved(None);
                            Some(outcome)
                        }
                        Ok(n) => {
                            data.extend_from_slice(&buf[..n]);
                            None
                        }
                        Err(e) => {
                            self.state = FileLoad::Resolved(None);
                            Some(Err(e.into()))
                        }
                    }
                }
            }
        }
    }

}
