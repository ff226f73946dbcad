//! The rendering capability and its Manim-backed implementation.

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::{Duration, SystemTime};
use tokio::process::Command;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::errors::RenderError;
use crate::observability::SpanTimer;
use crate::utils::patterns::compile_static;

/// Default render time budget.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(120);

/// URL prefix under which the media directory is served.
pub const MEDIA_URL_PREFIX: &str = "/media";

const SCRATCH_FILE: &str = "animation_code.py";
const MEDIA_SUBDIRS: [&str; 4] = ["videos", "images", "texts", "Tex"];

static SCENE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r"class\s+(\w+)\s*\(\s*Scene\s*\)"));

/// Where a rendered artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedArtifact {
    /// Identifier the artifact was rendered under.
    pub artifact_id: String,
    /// Public location, e.g. `/media/videos/animation_code/720p30/ab12cd34.mp4`.
    pub location: String,
}

/// Turns animation source into a video artifact.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders `source` and names the output after `artifact_id`.
    async fn render(&self, source: &str, artifact_id: &str) -> Result<RenderedArtifact, RenderError>;
}

/// Renders with the `manim` command line into a media directory.
#[derive(Debug, Clone)]
pub struct ManimRenderer {
    command: String,
    media_dir: PathBuf,
    timeout: Duration,
}

impl ManimRenderer {
    /// Creates a renderer writing under `media_dir`.
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: "manim".to_string(),
            media_dir: media_dir.into(),
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    /// Overrides the executable.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Overrides the time budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The media directory.
    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    fn command_for(&self, file: &Path, scene: &str, artifact_id: &str) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg("render")
            .arg(file)
            .arg(scene)
            .arg("-o")
            .arg(format!("{artifact_id}.mp4"))
            .arg("--media_dir")
            .arg(&self.media_dir)
            .args(["-q", "m", "--fps", "30", "--format", "mp4", "--disable_caching"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Renderer for ManimRenderer {
    async fn render(&self, source: &str, artifact_id: &str) -> Result<RenderedArtifact, RenderError> {
        let scene = scene_name(source).ok_or(RenderError::MissingScene)?;

        for sub in MEDIA_SUBDIRS {
            tokio::fs::create_dir_all(self.media_dir.join(sub)).await?;
        }

        let scratch = tempfile::tempdir()?;
        let file = scratch.path().join(SCRATCH_FILE);
        tokio::fs::write(&file, source).await?;

        info!(artifact_id, scene, command = %self.command, "Rendering animation");
        let timer = SpanTimer::start("render");
        let output = tokio::time::timeout(self.timeout, self.command_for(&file, scene, artifact_id).output())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout.as_secs()))?
            .map_err(RenderError::Spawn)?;
        let duration_ms = timer.finish();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(artifact_id, code = ?output.status.code(), duration_ms, "Renderer failed");
            return Err(RenderError::Failed {
                code: output.status.code(),
                stderr,
            });
        }

        let location = find_video(&self.media_dir, artifact_id)
            .ok_or_else(|| RenderError::ArtifactMissing(artifact_id.to_string()))?;
        info!(artifact_id, %location, duration_ms, "Animation rendered");
        Ok(RenderedArtifact {
            artifact_id: artifact_id.to_string(),
            location,
        })
    }
}

/// The first class deriving from `Scene`.
pub fn scene_name(source: &str) -> Option<&str> {
    SCENE_CLASS
        .captures(source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Locates a rendered video under `media_dir`.
///
/// Prefers an `.mp4` whose name contains `artifact_id`; otherwise falls
/// back to the most recently modified `.mp4`. Returns its public URL.
pub fn find_video(media_dir: &Path, artifact_id: &str) -> Option<String> {
    let videos: Vec<PathBuf> = WalkDir::new(media_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().is_some_and(|ext| ext == "mp4"))
        .collect();

    let named = videos.iter().find(|p| {
        p.file_name()
            .is_some_and(|name| name.to_string_lossy().contains(artifact_id))
    });

    let chosen = match named {
        Some(path) => path,
        None => {
            let newest = videos.iter().max_by_key(|p| modified(p))?;
            warn!(artifact_id, path = %newest.display(), "No video named after artifact, using newest");
            newest
        }
    };

    let url = media_url(media_dir, chosen)?;
    debug!(artifact_id, %url, "Located rendered video");
    Some(url)
}

fn modified(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn media_url(media_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(media_dir).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("{MEDIA_URL_PREFIX}/{}", parts.join("/")))
}
