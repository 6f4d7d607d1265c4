//! Replay video recording
//!
//! Runs the policy for a fixed number of steps, captures one RGB frame per
//! step and pipes the raw stream into an external `ffmpeg` process for h264
//! encoding. Recording is strictly best-effort: any failure is logged and
//! the packaging pipeline continues without a video.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{info, warn};

use crate::agent::{EvalEnv, Policy};
use crate::error::{AgentPackError, Result};

const REPLAY_FILENAME: &str = "replay.mp4";

/// Replay recorder settings
pub struct ReplayRecorder {
    video_length: usize,
    fps: u32,
    deterministic: bool,
    ffmpeg_bin: String,
}

impl ReplayRecorder {
    pub fn new(video_length: usize, fps: u32, deterministic: bool) -> Self {
        Self {
            video_length,
            fps,
            deterministic,
            ffmpeg_bin: "ffmpeg".to_string(),
        }
    }

    /// Use a specific encoder binary instead of `ffmpeg` from PATH
    pub fn with_ffmpeg_bin(mut self, ffmpeg_bin: impl Into<String>) -> Self {
        self.ffmpeg_bin = ffmpeg_bin.into();
        self
    }

    /// Record a replay, swallowing all errors
    ///
    /// Returns the path of the encoded video when recording succeeded.
    pub fn record_best_effort<P: Policy, E: EvalEnv>(
        &self,
        policy: &mut P,
        env: &mut E,
        dest_dir: &Path,
    ) -> Option<PathBuf> {
        match self.record(policy, env, dest_dir) {
            Ok(path) => {
                info!("Recorded replay video at {:?}", path);
                Some(path)
            }
            Err(e) => {
                warn!("{}", e);
                warn!("Unable to generate a replay of the agent, the packaging process continues");
                None
            }
        }
    }

    /// Record `video_length` steps into `dest_dir/replay.mp4`
    pub fn record<P: Policy, E: EvalEnv>(
        &self,
        policy: &mut P,
        env: &mut E,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let (width, height) = env.frame_size().ok_or_else(|| {
            AgentPackError::Replay("environment does not expose a frame size".to_string())
        })?;
        let frame_bytes = (width * height * 3) as usize;

        // Encode into a scratch directory; a failed run must not leave a
        // partial mp4 in the staging dir for the upload step to pick up
        let scratch = tempfile::tempdir()
            .map_err(|e| AgentPackError::Replay(format!("failed to create scratch dir: {}", e)))?;
        let scratch_output = scratch.path().join(REPLAY_FILENAME);
        let mut encoder = self.spawn_encoder(width, height, &scratch_output)?;
        let mut stdin = encoder.stdin.take().ok_or_else(|| {
            AgentPackError::Replay("failed to open encoder stdin".to_string())
        })?;

        let feed_result = (|| -> Result<()> {
            policy.reset_state();
            let mut obs = env.reset()?;

            for _ in 0..self.video_length {
                let frame = env.render_frame()?;
                if frame.len() != frame_bytes {
                    return Err(AgentPackError::Replay(format!(
                        "frame size mismatch: expected {} bytes for {}x{}, got {}",
                        frame_bytes,
                        width,
                        height,
                        frame.len()
                    )));
                }
                stdin
                    .write_all(&frame)
                    .map_err(|e| AgentPackError::Replay(format!("encoder pipe error: {}", e)))?;

                let action = policy.act(&obs, self.deterministic)?;
                let outcome = env.step(&action)?;
                obs = if outcome.done {
                    policy.reset_state();
                    env.reset()?
                } else {
                    outcome.obs
                };
            }
            Ok(())
        })();

        // Close the pipe so the encoder can finalize, then reap it even
        // when feeding failed
        drop(stdin);
        let status = encoder
            .wait()
            .map_err(|e| AgentPackError::Replay(format!("encoder did not exit: {}", e)))?;

        feed_result?;

        if !status.success() {
            return Err(AgentPackError::Replay(format!(
                "{} exited with {}",
                self.ffmpeg_bin, status
            )));
        }

        // Only a finished video is moved into staging
        let output = dest_dir.join(REPLAY_FILENAME);
        fs::copy(&scratch_output, &output)
            .map_err(|e| AgentPackError::Replay(format!("failed to stage video: {}", e)))?;
        Ok(output)
    }

    fn spawn_encoder(&self, width: u32, height: u32, output: &Path) -> Result<Child> {
        Command::new(&self.ffmpeg_bin)
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                &format!("{}x{}", width, height),
                "-r",
                &self.fps.to_string(),
                "-i",
                "-",
                "-vcodec",
                "h264",
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                AgentPackError::Replay(format!("failed to spawn {}: {}", self.ffmpeg_bin, e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::StepOutcome;

    struct StaticPolicy;

    impl Policy for StaticPolicy {
        fn act(&mut self, _obs: &[f32], _deterministic: bool) -> Result<Vec<f32>> {
            Ok(vec![0.0])
        }
    }

    struct PixelEnv {
        steps: usize,
    }

    impl EvalEnv for PixelEnv {
        fn env_id(&self) -> &str {
            "Pixel-v0"
        }

        fn reset(&mut self) -> Result<Vec<f32>> {
            Ok(vec![0.0])
        }

        fn step(&mut self, _action: &[f32]) -> Result<StepOutcome> {
            self.steps += 1;
            Ok(StepOutcome {
                obs: vec![0.0],
                reward: 0.0,
                done: self.steps % 5 == 0,
            })
        }

        fn frame_size(&self) -> Option<(u32, u32)> {
            Some((4, 4))
        }

        fn render_frame(&mut self) -> Result<Vec<u8>> {
            Ok(vec![128u8; 4 * 4 * 3])
        }
    }

    struct BlindEnv;

    impl EvalEnv for BlindEnv {
        fn env_id(&self) -> &str {
            "Blind-v0"
        }

        fn reset(&mut self) -> Result<Vec<f32>> {
            Ok(vec![0.0])
        }

        fn step(&mut self, _action: &[f32]) -> Result<StepOutcome> {
            Ok(StepOutcome {
                obs: vec![0.0],
                reward: 0.0,
                done: true,
            })
        }
    }

    #[test]
    fn test_record_fails_without_frame_size() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ReplayRecorder::new(10, 30, true);

        let err = recorder.record(&mut StaticPolicy, &mut BlindEnv, dir.path());
        assert!(matches!(err, Err(AgentPackError::Replay(_))));
    }

    #[test]
    fn test_best_effort_swallows_errors() {
        let dir = tempfile::tempdir().unwrap();
        // Nonexistent encoder binary: recording fails, but best-effort
        // must not propagate the error
        let recorder =
            ReplayRecorder::new(10, 30, true).with_ffmpeg_bin("agentpack-missing-ffmpeg");

        let result =
            recorder.record_best_effort(&mut StaticPolicy, &mut PixelEnv { steps: 0 }, dir.path());
        assert!(result.is_none());
        assert!(!dir.path().join(REPLAY_FILENAME).exists());
    }
}
