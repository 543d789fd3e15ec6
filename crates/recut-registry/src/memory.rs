//! In-memory registry for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use recut_models::{
    ClipCandidate, FrameIndex, Job, JobId, JobStatus, Media, MediaId, MediaStatus, Plan, PlanId,
    PlanStatus, Render, RenderId, RenderStatus, SceneCuts, SceneIndex, SilenceMap, Transcript,
};

use crate::error::{RegistryError, RegistryResult};
use crate::Registry;

#[derive(Default)]
struct Inner {
    media: HashMap<String, Media>,
    jobs: HashMap<String, Job>,
    transcripts: HashMap<String, Transcript>,
    silence_maps: HashMap<String, SilenceMap>,
    scene_cuts: HashMap<String, SceneCuts>,
    frame_indexes: HashMap<String, FrameIndex>,
    scene_indexes: HashMap<String, SceneIndex>,
    candidates: HashMap<String, Vec<ClipCandidate>>,
    plans: HashMap<String, Plan>,
    renders: HashMap<String, Render>,
}

/// Registry backed by process memory. Same conditional-update semantics as
/// the Redis implementation, linearised by a single RwLock.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn create_media(&self, media: &Media) -> RegistryResult<()> {
        let mut inner = self.inner.write().await;
        let key = media.media_id.as_str().to_string();
        if inner.media.contains_key(&key) {
            return Err(RegistryError::already_exists("media", key));
        }
        inner.media.insert(key, media.clone());
        Ok(())
    }

    async fn get_media(&self, id: &MediaId) -> RegistryResult<Option<Media>> {
        Ok(self.inner.read().await.media.get(id.as_str()).cloned())
    }

    async fn update_media_if_status(
        &self,
        expected: MediaStatus,
        media: &Media,
    ) -> RegistryResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.media.get_mut(media.media_id.as_str()) {
            Some(current) if current.status == expected => {
                *current = media.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RegistryError::not_found("media", media.media_id.as_str())),
        }
    }

    async fn soft_delete_media(&self, id: &MediaId) -> RegistryResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.media.get_mut(id.as_str()) {
            Some(current) if current.status == MediaStatus::Deleted => Ok(false),
            Some(current) => {
                current.status = MediaStatus::Deleted;
                current.updated_at = Utc::now();
                Ok(true)
            }
            None => Err(RegistryError::not_found("media", id.as_str())),
        }
    }

    async fn create_job(&self, job: &Job) -> RegistryResult<()> {
        let mut inner = self.inner.write().await;
        let key = job.job_id.as_str().to_string();
        if inner.jobs.contains_key(&key) {
            return Err(RegistryError::already_exists("job", key));
        }
        inner.jobs.insert(key, job.clone());
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> RegistryResult<Option<Job>> {
        Ok(self.inner.read().await.jobs.get(id.as_str()).cloned())
    }

    async fn update_job_if_status(&self, expected: JobStatus, job: &Job) -> RegistryResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.jobs.get_mut(job.job_id.as_str()) {
            Some(current) if current.status == expected => {
                *current = job.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RegistryError::not_found("job", job.job_id.as_str())),
        }
    }

    async fn list_jobs_by_media(&self, media: &MediaId) -> RegistryResult<Vec<Job>> {
        let inner = self.inner.read().await;
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|j| &j.media_id == media)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.enqueued_at);
        Ok(jobs)
    }

    async fn put_transcript(&self, transcript: &Transcript) -> RegistryResult<()> {
        self.inner
            .write()
            .await
            .transcripts
            .insert(transcript.media_id.as_str().to_string(), transcript.clone());
        Ok(())
    }

    async fn get_transcript(&self, media: &MediaId) -> RegistryResult<Option<Transcript>> {
        Ok(self
            .inner
            .read()
            .await
            .transcripts
            .get(media.as_str())
            .cloned())
    }

    async fn put_silence_map(&self, map: &SilenceMap) -> RegistryResult<()> {
        self.inner
            .write()
            .await
            .silence_maps
            .insert(map.media_id.as_str().to_string(), map.clone());
        Ok(())
    }

    async fn get_silence_map(&self, media: &MediaId) -> RegistryResult<Option<SilenceMap>> {
        Ok(self
            .inner
            .read()
            .await
            .silence_maps
            .get(media.as_str())
            .cloned())
    }

    async fn put_scene_cuts(&self, cuts: &SceneCuts) -> RegistryResult<()> {
        self.inner
            .write()
            .await
            .scene_cuts
            .insert(cuts.media_id.as_str().to_string(), cuts.clone());
        Ok(())
    }

    async fn get_scene_cuts(&self, media: &MediaId) -> RegistryResult<Option<SceneCuts>> {
        Ok(self
            .inner
            .read()
            .await
            .scene_cuts
            .get(media.as_str())
            .cloned())
    }

    async fn put_frame_index(&self, frames: &FrameIndex) -> RegistryResult<()> {
        self.inner
            .write()
            .await
            .frame_indexes
            .insert(frames.media_id.as_str().to_string(), frames.clone());
        Ok(())
    }

    async fn get_frame_index(&self, media: &MediaId) -> RegistryResult<Option<FrameIndex>> {
        Ok(self
            .inner
            .read()
            .await
            .frame_indexes
            .get(media.as_str())
            .cloned())
    }

    async fn put_scene_index(&self, scenes: &SceneIndex) -> RegistryResult<()> {
        self.inner
            .write()
            .await
            .scene_indexes
            .insert(scenes.media_id.as_str().to_string(), scenes.clone());
        Ok(())
    }

    async fn get_scene_index(&self, media: &MediaId) -> RegistryResult<Option<SceneIndex>> {
        Ok(self
            .inner
            .read()
            .await
            .scene_indexes
            .get(media.as_str())
            .cloned())
    }

    async fn put_candidates(
        &self,
        media: &MediaId,
        candidates: &[ClipCandidate],
    ) -> RegistryResult<()> {
        self.inner
            .write()
            .await
            .candidates
            .insert(media.as_str().to_string(), candidates.to_vec());
        Ok(())
    }

    async fn get_candidates(&self, media: &MediaId) -> RegistryResult<Option<Vec<ClipCandidate>>> {
        Ok(self
            .inner
            .read()
            .await
            .candidates
            .get(media.as_str())
            .cloned())
    }

    async fn create_plan(&self, plan: &Plan) -> RegistryResult<()> {
        let mut inner = self.inner.write().await;
        let key = plan.plan_id.as_str().to_string();
        if inner.plans.contains_key(&key) {
            return Err(RegistryError::already_exists("plan", key));
        }
        inner.plans.insert(key, plan.clone());
        Ok(())
    }

    async fn get_plan(&self, id: &PlanId) -> RegistryResult<Option<Plan>> {
        Ok(self.inner.read().await.plans.get(id.as_str()).cloned())
    }

    async fn update_plan_if_status(
        &self,
        expected: PlanStatus,
        plan: &Plan,
    ) -> RegistryResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.plans.get_mut(plan.plan_id.as_str()) {
            Some(current) if current.status == expected => {
                *current = plan.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RegistryError::not_found("plan", plan.plan_id.as_str())),
        }
    }

    async fn list_plans_by_media(&self, media: &MediaId) -> RegistryResult<Vec<Plan>> {
        let inner = self.inner.read().await;
        let mut plans: Vec<Plan> = inner
            .plans
            .values()
            .filter(|p| &p.media_id == media)
            .cloned()
            .collect();
        plans.sort_by_key(|p| p.created_at);
        Ok(plans)
    }

    async fn create_render(&self, render: &Render) -> RegistryResult<()> {
        let mut inner = self.inner.write().await;
        let key = render.render_id.as_str().to_string();
        if inner.renders.contains_key(&key) {
            return Err(RegistryError::already_exists("render", key));
        }
        inner.renders.insert(key, render.clone());
        Ok(())
    }

    async fn get_render(&self, id: &RenderId) -> RegistryResult<Option<Render>> {
        Ok(self.inner.read().await.renders.get(id.as_str()).cloned())
    }

    async fn update_render_if_status(
        &self,
        expected: RenderStatus,
        render: &Render,
    ) -> RegistryResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.renders.get_mut(render.render_id.as_str()) {
            Some(current) if current.status == expected => {
                *current = render.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RegistryError::not_found("render", render.render_id.as_str())),
        }
    }

    async fn list_renders_by_plan(&self, plan: &PlanId) -> RegistryResult<Vec<Render>> {
        let inner = self.inner.read().await;
        let mut renders: Vec<Render> = inner
            .renders
            .values()
            .filter(|r| &r.plan_id == plan)
            .cloned()
            .collect();
        renders.sort_by_key(|r| r.created_at);
        Ok(renders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recut_models::JobKind;

    #[tokio::test]
    async fn test_conditional_update_races() {
        let registry = MemoryRegistry::new();
        let job = Job::enqueue(MediaId::new(), JobKind::Probe, serde_json::json!({}));
        registry.create_job(&job).await.unwrap();

        // Two workers race to claim: only one wins.
        let running = job.clone().into_running();
        let first = registry
            .update_job_if_status(JobStatus::Queued, &running)
            .await
            .unwrap();
        let second = registry
            .update_job_if_status(JobStatus::Queued, &running)
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn test_status_sequence_is_monotonic() {
        let registry = MemoryRegistry::new();
        let job = Job::enqueue(MediaId::new(), JobKind::Transcribe, serde_json::json!({}));
        registry.create_job(&job).await.unwrap();

        let running = job.clone().into_running();
        assert!(registry
            .update_job_if_status(JobStatus::Queued, &running)
            .await
            .unwrap());

        let completed = running.clone().into_completed(serde_json::json!({"ok": true}));
        assert!(registry
            .update_job_if_status(JobStatus::Running, &completed)
            .await
            .unwrap());

        // No transitions out of terminal states.
        let resurrect = completed.clone().into_running();
        assert!(!registry
            .update_job_if_status(JobStatus::Queued, &resurrect)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_soft_delete_is_idempotent() {
        let registry = MemoryRegistry::new();
        let media = Media::register("file:///tmp/a.mp4");
        registry.create_media(&media).await.unwrap();

        assert!(registry.soft_delete_media(&media.media_id).await.unwrap());
        assert!(!registry.soft_delete_media(&media.media_id).await.unwrap());

        let stored = registry.get_media(&media.media_id).await.unwrap().unwrap();
        assert_eq!(stored.status, MediaStatus::Deleted);
    }

    #[tokio::test]
    async fn test_enrichment_put_is_idempotent() {
        let registry = MemoryRegistry::new();
        let media_id = MediaId::new();
        let transcript = Transcript::empty(media_id.clone());

        registry.put_transcript(&transcript).await.unwrap();
        registry.put_transcript(&transcript).await.unwrap();

        let stored = registry.get_transcript(&media_id).await.unwrap().unwrap();
        assert_eq!(stored, transcript);
    }
}
