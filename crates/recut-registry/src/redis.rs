//! Redis-backed registry.
//!
//! Entities are stored as JSON values under namespaced keys; per-media and
//! per-plan membership sets back the `list_by_*` queries. Conditional status
//! updates run a small Lua script so the compare-and-swap is atomic on the
//! server.

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use recut_models::{
    ClipCandidate, FrameIndex, Job, JobId, JobStatus, Media, MediaId, MediaStatus, Plan, PlanId,
    PlanStatus, Render, RenderId, RenderStatus, SceneCuts, SceneIndex, SilenceMap, Transcript,
};

use crate::error::{RegistryError, RegistryResult};
use crate::Registry;

/// Compare-and-swap on the JSON `status` field: replaces the stored value
/// only when the current status matches ARGV[1]. Returns 1 on success, 0 on
/// a lost race, -1 when the key is missing.
const CAS_STATUS_SCRIPT: &str = r#"
local cur = redis.call('GET', KEYS[1])
if not cur then return -1 end
local obj = cjson.decode(cur)
if obj['status'] ~= ARGV[1] then return 0 end
redis.call('SET', KEYS[1], ARGV[2])
return 1
"#;

/// Registry backed by Redis. All writes are awaited before returning.
#[derive(Clone)]
pub struct RedisRegistry {
    client: redis::Client,
    cas_script: redis::Script,
}

impl RedisRegistry {
    /// Connect to the registry backend.
    pub fn new(redis_url: &str) -> RegistryResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            cas_script: redis::Script::new(CAS_STATUS_SCRIPT),
        })
    }

    /// Create from the `RECUT_REDIS_URL` environment variable.
    pub fn from_env() -> RegistryResult<Self> {
        let url = std::env::var("RECUT_REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    async fn conn(&self) -> RegistryResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn media_key(id: &str) -> String {
        format!("recut:media:{}", id)
    }

    fn job_key(id: &str) -> String {
        format!("recut:job:{}", id)
    }

    fn media_jobs_key(id: &str) -> String {
        format!("recut:media:{}:jobs", id)
    }

    fn artefact_key(media: &str, kind: &str) -> String {
        format!("recut:media:{}:{}", media, kind)
    }

    fn plan_key(id: &str) -> String {
        format!("recut:plan:{}", id)
    }

    fn media_plans_key(id: &str) -> String {
        format!("recut:media:{}:plans", id)
    }

    fn render_key(id: &str) -> String {
        format!("recut:render:{}", id)
    }

    fn plan_renders_key(id: &str) -> String {
        format!("recut:plan:{}:renders", id)
    }

    async fn create_value<T: Serialize>(
        &self,
        entity: &'static str,
        key: &str,
        id: &str,
        value: &T,
    ) -> RegistryResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(value)?;
        let created: bool = redis::cmd("SET")
            .arg(key)
            .arg(&payload)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map(|v: Option<String>| v.is_some())?;
        if !created {
            return Err(RegistryError::already_exists(entity, id));
        }
        debug!(entity, id, "Created registry record");
        Ok(())
    }

    async fn get_value<T: DeserializeOwned>(&self, key: &str) -> RegistryResult<Option<T>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_value<T: Serialize>(&self, key: &str, value: &T) -> RegistryResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(value)?;
        conn.set::<_, _, ()>(key, payload).await?;
        Ok(())
    }

    async fn cas_status<T: Serialize>(
        &self,
        entity: &'static str,
        key: &str,
        id: &str,
        expected: &str,
        value: &T,
    ) -> RegistryResult<bool> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(value)?;
        let outcome: i32 = self
            .cas_script
            .key(key)
            .arg(expected)
            .arg(&payload)
            .invoke_async(&mut conn)
            .await?;
        match outcome {
            1 => Ok(true),
            0 => {
                debug!(entity, id, expected, "Conditional update lost the race");
                Ok(false)
            }
            _ => Err(RegistryError::not_found(entity, id)),
        }
    }

    async fn list_members<T: DeserializeOwned>(
        &self,
        set_key: &str,
        item_key: impl Fn(&str) -> String,
    ) -> RegistryResult<Vec<T>> {
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn.smembers(set_key).await?;
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            let raw: Option<String> = conn.get(item_key(&id)).await?;
            if let Some(json) = raw {
                items.push(serde_json::from_str(&json)?);
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl Registry for RedisRegistry {
    async fn create_media(&self, media: &Media) -> RegistryResult<()> {
        let id = media.media_id.as_str();
        self.create_value("media", &Self::media_key(id), id, media)
            .await
    }

    async fn get_media(&self, id: &MediaId) -> RegistryResult<Option<Media>> {
        self.get_value(&Self::media_key(id.as_str())).await
    }

    async fn update_media_if_status(
        &self,
        expected: MediaStatus,
        media: &Media,
    ) -> RegistryResult<bool> {
        let id = media.media_id.as_str();
        self.cas_status("media", &Self::media_key(id), id, expected.as_str(), media)
            .await
    }

    async fn soft_delete_media(&self, id: &MediaId) -> RegistryResult<bool> {
        // CAS loop: re-read and retry while racing writers move the status.
        loop {
            let current = self
                .get_media(id)
                .await?
                .ok_or_else(|| RegistryError::not_found("media", id.as_str()))?;
            if current.status == MediaStatus::Deleted {
                return Ok(false);
            }
            let expected = current.status;
            let mut deleted = current;
            deleted.status = MediaStatus::Deleted;
            deleted.updated_at = Utc::now();
            if self.update_media_if_status(expected, &deleted).await? {
                return Ok(true);
            }
        }
    }

    async fn create_job(&self, job: &Job) -> RegistryResult<()> {
        let id = job.job_id.as_str();
        self.create_value("job", &Self::job_key(id), id, job).await?;
        let mut conn = self.conn().await?;
        conn.sadd::<_, _, ()>(Self::media_jobs_key(job.media_id.as_str()), id)
            .await?;
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> RegistryResult<Option<Job>> {
        self.get_value(&Self::job_key(id.as_str())).await
    }

    async fn update_job_if_status(&self, expected: JobStatus, job: &Job) -> RegistryResult<bool> {
        let id = job.job_id.as_str();
        self.cas_status("job", &Self::job_key(id), id, expected.as_str(), job)
            .await
    }

    async fn list_jobs_by_media(&self, media: &MediaId) -> RegistryResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .list_members(&Self::media_jobs_key(media.as_str()), Self::job_key)
            .await?;
        jobs.sort_by_key(|j: &Job| j.enqueued_at);
        Ok(jobs)
    }

    async fn put_transcript(&self, transcript: &Transcript) -> RegistryResult<()> {
        self.put_value(
            &Self::artefact_key(transcript.media_id.as_str(), "transcript"),
            transcript,
        )
        .await
    }

    async fn get_transcript(&self, media: &MediaId) -> RegistryResult<Option<Transcript>> {
        self.get_value(&Self::artefact_key(media.as_str(), "transcript"))
            .await
    }

    async fn put_silence_map(&self, map: &SilenceMap) -> RegistryResult<()> {
        self.put_value(&Self::artefact_key(map.media_id.as_str(), "silence"), map)
            .await
    }

    async fn get_silence_map(&self, media: &MediaId) -> RegistryResult<Option<SilenceMap>> {
        self.get_value(&Self::artefact_key(media.as_str(), "silence"))
            .await
    }

    async fn put_scene_cuts(&self, cuts: &SceneCuts) -> RegistryResult<()> {
        self.put_value(&Self::artefact_key(cuts.media_id.as_str(), "cuts"), cuts)
            .await
    }

    async fn get_scene_cuts(&self, media: &MediaId) -> RegistryResult<Option<SceneCuts>> {
        self.get_value(&Self::artefact_key(media.as_str(), "cuts"))
            .await
    }

    async fn put_frame_index(&self, frames: &FrameIndex) -> RegistryResult<()> {
        self.put_value(
            &Self::artefact_key(frames.media_id.as_str(), "frames"),
            frames,
        )
        .await
    }

    async fn get_frame_index(&self, media: &MediaId) -> RegistryResult<Option<FrameIndex>> {
        self.get_value(&Self::artefact_key(media.as_str(), "frames"))
            .await
    }

    async fn put_scene_index(&self, scenes: &SceneIndex) -> RegistryResult<()> {
        self.put_value(
            &Self::artefact_key(scenes.media_id.as_str(), "scenes"),
            scenes,
        )
        .await
    }

    async fn get_scene_index(&self, media: &MediaId) -> RegistryResult<Option<SceneIndex>> {
        self.get_value(&Self::artefact_key(media.as_str(), "scenes"))
            .await
    }

    async fn put_candidates(
        &self,
        media: &MediaId,
        candidates: &[ClipCandidate],
    ) -> RegistryResult<()> {
        self.put_value(
            &Self::artefact_key(media.as_str(), "candidates"),
            &candidates.to_vec(),
        )
        .await
    }

    async fn get_candidates(&self, media: &MediaId) -> RegistryResult<Option<Vec<ClipCandidate>>> {
        self.get_value(&Self::artefact_key(media.as_str(), "candidates"))
            .await
    }

    async fn create_plan(&self, plan: &Plan) -> RegistryResult<()> {
        let id = plan.plan_id.as_str();
        self.create_value("plan", &Self::plan_key(id), id, plan)
            .await?;
        let mut conn = self.conn().await?;
        conn.sadd::<_, _, ()>(Self::media_plans_key(plan.media_id.as_str()), id)
            .await?;
        Ok(())
    }

    async fn get_plan(&self, id: &PlanId) -> RegistryResult<Option<Plan>> {
        self.get_value(&Self::plan_key(id.as_str())).await
    }

    async fn update_plan_if_status(
        &self,
        expected: PlanStatus,
        plan: &Plan,
    ) -> RegistryResult<bool> {
        let id = plan.plan_id.as_str();
        self.cas_status("plan", &Self::plan_key(id), id, expected.as_str(), plan)
            .await
    }

    async fn list_plans_by_media(&self, media: &MediaId) -> RegistryResult<Vec<Plan>> {
        let mut plans: Vec<Plan> = self
            .list_members(&Self::media_plans_key(media.as_str()), Self::plan_key)
            .await?;
        plans.sort_by_key(|p: &Plan| p.created_at);
        Ok(plans)
    }

    async fn create_render(&self, render: &Render) -> RegistryResult<()> {
        let id = render.render_id.as_str();
        self.create_value("render", &Self::render_key(id), id, render)
            .await?;
        let mut conn = self.conn().await?;
        conn.sadd::<_, _, ()>(Self::plan_renders_key(render.plan_id.as_str()), id)
            .await?;
        Ok(())
    }

    async fn get_render(&self, id: &RenderId) -> RegistryResult<Option<Render>> {
        self.get_value(&Self::render_key(id.as_str())).await
    }

    async fn update_render_if_status(
        &self,
        expected: RenderStatus,
        render: &Render,
    ) -> RegistryResult<bool> {
        let id = render.render_id.as_str();
        self.cas_status(
            "render",
            &Self::render_key(id),
            id,
            expected.as_str(),
            render,
        )
        .await
    }

    async fn list_renders_by_plan(&self, plan: &PlanId) -> RegistryResult<Vec<Render>> {
        let mut renders: Vec<Render> = self
            .list_members(&Self::plan_renders_key(plan.as_str()), Self::render_key)
            .await?;
        renders.sort_by_key(|r: &Render| r.created_at);
        Ok(renders)
    }
}
