//! Media registry: the single source of truth for all entities.
//!
//! Every other component is a pure function plus I/O on the blob store or an
//! external model; only the registry persists. Status fields are mutated
//! exclusively through conditional writes so concurrent workers either
//! commit or observe a lost race.

pub mod error;
pub mod memory;
pub mod redis;
pub mod retry;

pub use error::{RegistryError, RegistryResult};
pub use memory::MemoryRegistry;
pub use retry::{with_retry, RetryConfig};
pub use self::redis::RedisRegistry;

use async_trait::async_trait;

use recut_models::{
    ClipCandidate, FrameIndex, Job, JobId, JobStatus, Media, MediaId, MediaStatus, Plan, PlanId,
    PlanStatus, Render, RenderId, RenderStatus, SceneCuts, SceneIndex, SilenceMap, Transcript,
};

/// Repository over all persisted entities.
///
/// `update_*_if_status` methods are the only way to mutate a status field:
/// they replace the stored record only when the current status equals
/// `expected`, returning `Ok(false)` on a lost race. Callers treat `false`
/// as a benign conflict, never as a failure.
///
/// `put_*` methods write an enrichment artefact atomically (the full value
/// or nothing); re-running a handler overwrites with an identical value.
#[async_trait]
pub trait Registry: Send + Sync {
    // Media
    async fn create_media(&self, media: &Media) -> RegistryResult<()>;
    async fn get_media(&self, id: &MediaId) -> RegistryResult<Option<Media>>;
    async fn update_media_if_status(
        &self,
        expected: MediaStatus,
        media: &Media,
    ) -> RegistryResult<bool>;
    /// Logically delete; the record and its derived entities stay on disk.
    async fn soft_delete_media(&self, id: &MediaId) -> RegistryResult<bool>;

    // Jobs
    async fn create_job(&self, job: &Job) -> RegistryResult<()>;
    async fn get_job(&self, id: &JobId) -> RegistryResult<Option<Job>>;
    async fn update_job_if_status(&self, expected: JobStatus, job: &Job) -> RegistryResult<bool>;
    async fn list_jobs_by_media(&self, media: &MediaId) -> RegistryResult<Vec<Job>>;

    // Enrichment artefacts, keyed one per media
    async fn put_transcript(&self, transcript: &Transcript) -> RegistryResult<()>;
    async fn get_transcript(&self, media: &MediaId) -> RegistryResult<Option<Transcript>>;
    async fn put_silence_map(&self, map: &SilenceMap) -> RegistryResult<()>;
    async fn get_silence_map(&self, media: &MediaId) -> RegistryResult<Option<SilenceMap>>;
    async fn put_scene_cuts(&self, cuts: &SceneCuts) -> RegistryResult<()>;
    async fn get_scene_cuts(&self, media: &MediaId) -> RegistryResult<Option<SceneCuts>>;
    async fn put_frame_index(&self, frames: &FrameIndex) -> RegistryResult<()>;
    async fn get_frame_index(&self, media: &MediaId) -> RegistryResult<Option<FrameIndex>>;
    async fn put_scene_index(&self, scenes: &SceneIndex) -> RegistryResult<()>;
    async fn get_scene_index(&self, media: &MediaId) -> RegistryResult<Option<SceneIndex>>;
    async fn put_candidates(
        &self,
        media: &MediaId,
        candidates: &[ClipCandidate],
    ) -> RegistryResult<()>;
    async fn get_candidates(&self, media: &MediaId) -> RegistryResult<Option<Vec<ClipCandidate>>>;

    // Plans
    async fn create_plan(&self, plan: &Plan) -> RegistryResult<()>;
    async fn get_plan(&self, id: &PlanId) -> RegistryResult<Option<Plan>>;
    async fn update_plan_if_status(&self, expected: PlanStatus, plan: &Plan)
        -> RegistryResult<bool>;
    async fn list_plans_by_media(&self, media: &MediaId) -> RegistryResult<Vec<Plan>>;

    // Renders
    async fn create_render(&self, render: &Render) -> RegistryResult<()>;
    async fn get_render(&self, id: &RenderId) -> RegistryResult<Option<Render>>;
    async fn update_render_if_status(
        &self,
        expected: RenderStatus,
        render: &Render,
    ) -> RegistryResult<bool>;
    async fn list_renders_by_plan(&self, plan: &PlanId) -> RegistryResult<Vec<Render>>;
}
