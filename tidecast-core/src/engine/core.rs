//! Core acquisition engine implementation for the actor model.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use super::AcquireError;
use super::commands::{EngineCommand, JobStage, JobStatus, SessionRecord, SessionSummary};
use crate::config::TidecastConfig;
use crate::naming::SessionKey;
use crate::segmenting::{SegmentProcessor, Segmenter};
use crate::swarm::{InfoHash, MagnetLink, SwarmClient};
use crate::transport::{ChatAddress, ChatTransport};

/// File extensions the playable-media scan accepts, matched
/// case-insensitively against the downloaded file set.
const PLAYABLE_EXTENSIONS: [&str; 6] = ["mp4", "mkv", "avi", "mov", "wmv", "flv"];

/// Returns the first downloaded file with a playable extension.
pub(crate) fn first_playable(files: &[PathBuf]) -> Option<&PathBuf> {
    files.iter().find(|path| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                PLAYABLE_EXTENSIONS
                    .iter()
                    .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            })
    })
}

/// Everything a pipeline task needs after the actor has accepted a job.
struct PipelineContext {
    magnet: MagnetLink,
    requester: ChatAddress,
    work_dir: PathBuf,
    segment_seconds: u32,
    swarm: Arc<dyn SwarmClient>,
    segmenter: Segmenter,
    transport: Arc<dyn ChatTransport>,
    events: mpsc::UnboundedSender<EngineCommand>,
}

impl PipelineContext {
    fn set_stage(&self, stage: JobStage) {
        let _ = self.events.send(EngineCommand::JobStageChanged {
            info_hash: self.magnet.info_hash,
            stage,
        });
    }

    /// Best-effort requester notification. Send failures are logged and
    /// never escalated into the pipeline result.
    async fn notify(&self, body: &str) {
        if let Err(e) = self.transport.send_text(&self.requester, body).await {
            tracing::warn!("Failed to notify {}: {}", self.requester, e);
        }
    }
}

/// Core acquisition engine state.
///
/// This is the private implementation that runs inside the actor. It owns
/// the live-job map and the session registry and processes commands
/// sequentially, which is what makes the check-then-register step for a
/// given info hash atomic with respect to concurrent acquisition attempts.
pub struct AcquisitionEngine {
    /// Swarm download client (real or simulated)
    swarm: Arc<dyn SwarmClient>,
    /// Segmentation engine shared by all pipeline tasks
    segmenter: Segmenter,
    /// Outbound chat channel for requester notifications
    transport: Arc<dyn ChatTransport>,
    /// Live jobs keyed by resource identity
    jobs: HashMap<InfoHash, JobStatus>,
    /// Requester identity to most recent session
    registry: HashMap<ChatAddress, SessionRecord>,
    /// Channel pipeline tasks report back on
    event_sender: mpsc::UnboundedSender<EngineCommand>,
    /// Configuration
    config: TidecastConfig,
}

impl AcquisitionEngine {
    /// Creates a new engine with the provided collaborators.
    pub fn new(
        config: TidecastConfig,
        swarm: Arc<dyn SwarmClient>,
        processor: Arc<dyn SegmentProcessor>,
        transport: Arc<dyn ChatTransport>,
        event_sender: mpsc::UnboundedSender<EngineCommand>,
    ) -> Self {
        let segmenter = Segmenter::new(
            processor,
            config.library.library_dir.clone(),
            config.segmenting.container,
        );
        Self {
            swarm,
            segmenter,
            transport,
            jobs: HashMap::new(),
            registry: HashMap::new(),
            event_sender,
            config,
        }
    }

    /// Handles an acquire command: rejects duplicates, otherwise registers
    /// the job and spawns its pipeline task.
    pub fn handle_acquire(
        &mut self,
        magnet: MagnetLink,
        requester: ChatAddress,
        responder: oneshot::Sender<Result<SessionSummary, AcquireError>>,
    ) {
        let info_hash = magnet.info_hash;

        if self.jobs.contains_key(&info_hash) {
            tracing::info!(
                "Rejecting duplicate acquisition of {} for {}",
                info_hash,
                requester
            );
            let notice = AcquireError::AlreadyInProgress { info_hash }.user_message();
            let transport = Arc::clone(&self.transport);
            tokio::spawn(async move {
                if let Err(e) = transport.send_text(&requester, notice).await {
                    tracing::warn!("Failed to notify {}: {}", requester, e);
                }
            });
            let _ = responder.send(Err(AcquireError::AlreadyInProgress { info_hash }));
            return;
        }

        self.jobs.insert(
            info_hash,
            JobStatus {
                info_hash,
                requester: requester.clone(),
                stage: JobStage::Pending,
                started_at: Instant::now(),
            },
        );
        tracing::info!("Accepted acquisition of {} for {}", info_hash, requester);

        let context = PipelineContext {
            magnet,
            requester,
            work_dir: self.config.library.library_dir.clone(),
            segment_seconds: self.config.segmenting.segment_seconds,
            swarm: Arc::clone(&self.swarm),
            segmenter: self.segmenter.clone(),
            transport: Arc::clone(&self.transport),
            events: self.event_sender.clone(),
        };

        tokio::spawn(run_pipeline(context, responder));
    }

    /// Applies a stage change reported by a pipeline task.
    pub fn update_stage(&mut self, info_hash: InfoHash, stage: JobStage) {
        if let Some(job) = self.jobs.get_mut(&info_hash) {
            tracing::debug!("Job {} moved to stage {}", info_hash, stage);
            job.stage = stage;
        }
    }

    /// Finalizes a job: records the session on success, removes the job,
    /// and answers the original caller.
    pub fn finish_job(
        &mut self,
        info_hash: InfoHash,
        requester: ChatAddress,
        result: Result<SessionSummary, AcquireError>,
        responder: oneshot::Sender<Result<SessionSummary, AcquireError>>,
    ) {
        match &result {
            Ok(summary) => {
                self.update_stage(info_hash, JobStage::Ready);
                let record = SessionRecord {
                    session_key: summary.session_key.clone(),
                    segment_count: summary.segment_files.len(),
                };
                // Latest session wins: the previous entry is dropped and its
                // files stay on disk until flushed by key.
                if let Some(previous) = self.registry.insert(requester.clone(), record) {
                    tracing::warn!(
                        "Requester {} replaced session {}; orphaned segments remain until `flush {}`",
                        requester,
                        previous.session_key,
                        previous.session_key
                    );
                }
                tracing::info!(
                    "Job {} ready: {} segment(s) under key {}",
                    info_hash,
                    summary.segment_files.len(),
                    summary.session_key
                );
            }
            Err(error) => {
                self.update_stage(info_hash, JobStage::Failed);
                tracing::warn!("Job {} failed: {}", info_hash, error);
            }
        }

        self.jobs.remove(&info_hash);
        let _ = responder.send(result);
    }

    /// Registry lookup for one requester.
    pub fn session(&self, requester: &ChatAddress) -> Option<SessionRecord> {
        self.registry.get(requester).cloned()
    }

    /// Snapshot of all live jobs.
    pub fn active_jobs(&self) -> Vec<JobStatus> {
        self.jobs.values().cloned().collect()
    }
}

/// Drives one accepted job to completion and reports back to the actor.
///
/// Sends the job's outbound chat messages itself: the start notice, then
/// exactly one success or failure message. Duplicate rejection is the only
/// notification the actor sends.
async fn run_pipeline(
    context: PipelineContext,
    responder: oneshot::Sender<Result<SessionSummary, AcquireError>>,
) {
    let result = drive_pipeline(&context).await;

    match &result {
        Ok(summary) => context.notify(&format_segment_list(summary)).await,
        Err(error) => context.notify(error.user_message()).await,
    }

    let _ = context.events.send(EngineCommand::JobFinished {
        info_hash: context.magnet.info_hash,
        requester: context.requester.clone(),
        result,
        responder,
    });
}

async fn drive_pipeline(context: &PipelineContext) -> Result<SessionSummary, AcquireError> {
    context.notify("Download started. This may take a while.").await;
    context.set_stage(JobStage::Fetching);

    let files = context
        .swarm
        .download(&context.magnet, &context.work_dir)
        .await?;

    let source = first_playable(&files).ok_or(AcquireError::NoPlayableMedia)?;
    tracing::info!(
        "Download of {} complete, segmenting {}",
        context.magnet.info_hash,
        source.display()
    );

    let session_key = SessionKey::generate();
    context.set_stage(JobStage::Segmenting);

    let segments = context
        .segmenter
        .segment(source, &session_key, context.segment_seconds)
        .await?;

    Ok(SessionSummary {
        session_key,
        segment_files: segments
            .into_iter()
            .map(|segment| segment.file_name)
            .collect(),
    })
}

/// Formats the success notification listing every segment name.
fn format_segment_list(summary: &SessionSummary) -> String {
    let mut body = String::from("Video chunks created:\n");
    for name in &summary.segment_files {
        body.push_str("- ");
        body.push_str(name);
        body.push('\n');
    }
    body.push_str(&format!(
        "Request one with !getchunk <name>, clean up with !flush {}",
        summary.session_key
    ));
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playable_scan_matches_allow_list_case_insensitively() {
        let files = vec![
            PathBuf::from("notes.txt"),
            PathBuf::from("Movie.MKV"),
            PathBuf::from("trailer.mp4"),
        ];
        assert_eq!(first_playable(&files), Some(&PathBuf::from("Movie.MKV")));
    }

    #[test]
    fn playable_scan_rejects_non_video_sets() {
        let files = vec![
            PathBuf::from("readme.md"),
            PathBuf::from("cover.jpg"),
            PathBuf::from("noextension"),
        ];
        assert_eq!(first_playable(&files), None);
        assert_eq!(first_playable(&[]), None);
    }

    #[test]
    fn segment_list_mentions_every_name_and_the_key() {
        let summary = SessionSummary {
            session_key: SessionKey::from_string("a1b2c3"),
            segment_files: vec![
                "a1b2c3-segment-000.mp4".to_string(),
                "a1b2c3-segment-001.mp4".to_string(),
            ],
        };
        let body = format_segment_list(&summary);
        assert!(body.contains("a1b2c3-segment-000.mp4"));
        assert!(body.contains("a1b2c3-segment-001.mp4"));
        assert!(body.contains("!flush a1b2c3"));
    }
}
