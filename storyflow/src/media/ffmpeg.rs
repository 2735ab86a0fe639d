//! `ffmpeg`/`ffprobe` implementation of the media toolkit.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{CommandRunner, MediaToolkit, MixPlan, ProcessRunner, VideoPlan};
use crate::errors::{Result, StoryflowError, ToolError};

const FFMPEG: &str = "ffmpeg";
const FFPROBE: &str = "ffprobe";

/// Media toolkit that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct Ffmpeg<R = ProcessRunner> {
    runner: R,
    ffmpeg: String,
    ffprobe: String,
}

impl Default for Ffmpeg<ProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl Ffmpeg<ProcessRunner> {
    /// Uses `ffmpeg` and `ffprobe` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_runner(ProcessRunner)
    }
}

impl<R: CommandRunner> Ffmpeg<R> {
    /// Uses a custom command runner.
    #[must_use]
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            ffmpeg: FFMPEG.to_string(),
            ffprobe: FFPROBE.to_string(),
        }
    }

    /// Overrides the program names or paths.
    #[must_use]
    pub fn with_binaries(mut self, ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }

    async fn run_ffmpeg(&self, args: Vec<String>) -> Result<()> {
        self.runner.run(&self.ffmpeg, &args).await?.check(&self.ffmpeg)?;
        Ok(())
    }

    async fn check_available(&self, program: &str) -> Result<()> {
        let outcome = self
            .runner
            .run(program, &validation_args())
            .await
            .and_then(|output| output.check(program));
        match outcome {
            Ok(_) => Ok(()),
            Err(e) => Err(StoryflowError::configuration(format!(
                "{program} is required but not usable: {e}"
            ))),
        }
    }
}

#[async_trait]
impl<R: CommandRunner> MediaToolkit for Ffmpeg<R> {
    async fn validate(&self) -> Result<()> {
        self.check_available(&self.ffmpeg).await?;
        self.check_available(&self.ffprobe).await?;
        tracing::debug!(ffmpeg = %self.ffmpeg, ffprobe = %self.ffprobe, "Media tools available");
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = self
            .runner
            .run(&self.ffprobe, &probe_args(path))
            .await?
            .check(&self.ffprobe)?;
        parse_duration(&output.stdout).ok_or_else(|| {
            ToolError::unexpected_output(&self.ffprobe, output.stdout.trim().to_string()).into()
        })
    }

    async fn concat(&self, inputs: &[PathBuf], manifest: &Path, output: &Path) -> Result<()> {
        tokio::fs::write(manifest, concat_manifest(inputs)).await?;
        self.run_ffmpeg(concat_args(manifest, output)).await
    }

    async fn mix(&self, narration: &Path, music: &Path, output: &Path, plan: &MixPlan) -> Result<()> {
        self.run_ffmpeg(mix_args(narration, music, output, plan)).await
    }

    async fn compose_video(&self, image: &Path, audio: &Path, output: &Path, plan: &VideoPlan) -> Result<()> {
        self.run_ffmpeg(video_args(image, audio, output, plan)).await
    }

    async fn scale_image(&self, input: &Path, output: &Path, width: u32, height: u32) -> Result<()> {
        self.run_ffmpeg(scale_args(input, output, width, height)).await
    }
}

fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Arguments for the availability check.
#[must_use]
pub fn validation_args() -> Vec<String> {
    strings(["-version"])
}

/// `ffprobe` arguments printing only the container duration.
#[must_use]
pub fn probe_args(path: &Path) -> Vec<String> {
    let mut args = strings([
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ]);
    args.push(arg(path));
    args
}

/// Parses `ffprobe` duration output.
#[must_use]
pub fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Seconds with millisecond precision, as passed to `-t`.
#[must_use]
pub fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.3}")
}

/// Concat demuxer list. Paths are made absolute because the demuxer resolves
/// relative entries against the list's own directory.
#[must_use]
pub fn concat_manifest(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| {
            let absolute = std::path::absolute(p).unwrap_or_else(|_| p.clone());
            format!("file '{}'\n", arg(&absolute).replace('\'', r"'\''"))
        })
        .collect()
}

/// Stream-copy concatenation through the concat demuxer.
#[must_use]
pub fn concat_args(manifest: &Path, output: &Path) -> Vec<String> {
    let mut args = strings(["-y", "-f", "concat", "-safe", "0", "-i"]);
    args.push(arg(manifest));
    args.extend(strings(["-c", "copy"]));
    args.push(arg(output));
    args
}

/// Narration over an endlessly looped music bed, cut at the plan duration.
#[must_use]
pub fn mix_args(narration: &Path, music: &Path, output: &Path, plan: &MixPlan) -> Vec<String> {
    let filter = format!(
        "[0:a]volume={}dB[narr];[1:a]volume={}dB[music];\
         [narr][music]amix=inputs=2:duration=first:normalize=0[out]",
        plan.narration_gain_db, plan.music_gain_db
    );

    let mut args = strings(["-y", "-i"]);
    args.push(arg(narration));
    args.extend(strings(["-stream_loop", "-1", "-i"]));
    args.push(arg(music));
    args.push("-filter_complex".to_string());
    args.push(filter);
    args.extend(strings(["-map", "[out]", "-t"]));
    args.push(format_seconds(plan.duration_seconds));
    args.extend(strings(["-c:a", "libmp3lame", "-b:a"]));
    args.push(plan.bitrate.clone());
    args.push(arg(output));
    args
}

/// Still image looped over the audio, letterboxed into the frame.
#[must_use]
pub fn video_args(image: &Path, audio: &Path, output: &Path, plan: &VideoPlan) -> Vec<String> {
    let (w, h) = (plan.width, plan.height);
    let scale = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2"
    );

    let mut args = strings(["-y", "-loop", "1", "-i"]);
    args.push(arg(image));
    args.push("-i".to_string());
    args.push(arg(audio));
    args.extend(strings(["-c:v", "libx264", "-tune", "stillimage", "-c:a", "aac", "-b:a"]));
    args.push(plan.audio_bitrate.clone());
    args.extend(strings(["-pix_fmt", "yuv420p", "-vf"]));
    args.push(scale);
    args.extend(strings(["-shortest", "-t"]));
    args.push(format_seconds(plan.duration_seconds));
    args.push(arg(output));
    args
}

/// Resizes an image to exact dimensions with a Lanczos filter.
#[must_use]
pub fn scale_args(input: &Path, output: &Path, width: u32, height: u32) -> Vec<String> {
    let mut args = strings(["-y", "-i"]);
    args.push(arg(input));
    args.push("-vf".to_string());
    args.push(format!("scale={width}:{height}:flags=lanczos"));
    args.extend(strings(["-frames:v", "1"]));
    args.push(arg(output));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MixConfig, VideoConfig};
    use crate::media::CommandOutput;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        responses: Mutex<VecDeque<std::result::Result<CommandOutput, ToolError>>>,
    }

    impl RecordingRunner {
        fn respond(self, response: std::result::Result<CommandOutput, ToolError>) -> Self {
            self.responses.lock().push_back(response);
            self
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, program: &str, args: &[String]) -> std::result::Result<CommandOutput, ToolError> {
            self.calls.lock().push((program.to_string(), args.to_vec()));
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(CommandOutput::success("")))
        }
    }

    #[test]
    fn test_mix_args_match_filter_graph() {
        let plan = MixPlan::new(&MixConfig::default(), 30.0);
        let args = mix_args(Path::new("n.mp3"), Path::new("bg.m4a"), Path::new("out.mp3"), &plan);
        assert_eq!(
            args,
            vec![
                "-y", "-i", "n.mp3", "-stream_loop", "-1", "-i", "bg.m4a", "-filter_complex",
                "[0:a]volume=5dB[narr];[1:a]volume=-15dB[music];[narr][music]amix=inputs=2:duration=first:normalize=0[out]",
                "-map", "[out]", "-t", "30.000", "-c:a", "libmp3lame", "-b:a", "192k", "out.mp3",
            ]
        );
    }

    #[test]
    fn test_video_args_letterbox_and_duration() {
        let plan = VideoPlan::new(&VideoConfig::default(), 12.3456);
        let args = video_args(Path::new("i.png"), Path::new("a.mp3"), Path::new("v.mp4"), &plan);
        assert_eq!(
            args,
            vec![
                "-y", "-loop", "1", "-i", "i.png", "-i", "a.mp3", "-c:v", "libx264", "-tune",
                "stillimage", "-c:a", "aac", "-b:a", "192k", "-pix_fmt", "yuv420p", "-vf",
                "scale=1920:1080:force_original_aspect_ratio=decrease,pad=1920:1080:(ow-iw)/2:(oh-ih)/2",
                "-shortest", "-t", "12.346", "v.mp4",
            ]
        );
    }

    #[test]
    fn test_concat_manifest_escapes_quotes() {
        let manifest = concat_manifest(&[PathBuf::from("/tmp/it's/chunk_0.mp3"), PathBuf::from("/tmp/b.mp3")]);
        assert_eq!(manifest, "file '/tmp/it'\\''s/chunk_0.mp3'\nfile '/tmp/b.mp3'\n");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30.024000\n"), Some(30.024));
        assert_eq!(parse_duration("N/A"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[tokio::test]
    async fn test_probe_duration_parses_stdout() {
        let runner = RecordingRunner::default().respond(Ok(CommandOutput::success("9.5\n")));
        let ffmpeg = Ffmpeg::with_runner(runner);

        let duration = ffmpeg.probe_duration(Path::new("a.mp3")).await.unwrap();
        assert!((duration - 9.5).abs() < f64::EPSILON);

        let calls = ffmpeg.runner.calls.lock();
        assert_eq!(calls[0].0, "ffprobe");
        assert_eq!(calls[0].1.last().map(String::as_str), Some("a.mp3"));
    }

    #[tokio::test]
    async fn test_probe_garbage_is_tool_error() {
        let runner = RecordingRunner::default().respond(Ok(CommandOutput::success("N/A")));
        let err = Ffmpeg::with_runner(runner)
            .probe_duration(Path::new("a.mp3"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "ToolInvocationError");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_tool_error() {
        let runner = RecordingRunner::default().respond(Ok(CommandOutput::failure(1, "moov atom not found")));
        let plan = MixPlan::new(&MixConfig::default(), 1.0);
        let err = Ffmpeg::with_runner(runner)
            .mix(Path::new("n.mp3"), Path::new("m.m4a"), Path::new("o.mp3"), &plan)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "ToolInvocationError");
        assert!(err.to_string().contains("moov atom"));
    }

    #[tokio::test]
    async fn test_validate_missing_tool_is_fatal() {
        let runner = RecordingRunner::default()
            .respond(Ok(CommandOutput::success("ffmpeg version 6.1")))
            .respond(Err(ToolError::launch("ffprobe", "No such file or directory")));
        let err = Ffmpeg::with_runner(runner).validate().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("ffprobe"));
    }

    #[tokio::test]
    async fn test_concat_writes_manifest_first() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("concat.txt");
        let inputs = vec![dir.path().join("chunk_000.mp3"), dir.path().join("chunk_001.mp3")];
        let ffmpeg = Ffmpeg::with_runner(RecordingRunner::default());

        ffmpeg.concat(&inputs, &manifest, &dir.path().join("out.mp3")).await.unwrap();

        let written = std::fs::read_to_string(&manifest).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.lines().next().unwrap().ends_with("chunk_000.mp3'"));
        assert_eq!(ffmpeg.runner.calls.lock()[0].1[..4], ["-y", "-f", "concat", "-safe"]);
    }
}
