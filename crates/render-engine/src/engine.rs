//! External media engine invocation.
//!
//! Each pass is described by an [`EngineInvocation`] and executed by a
//! [`MediaEngine`]. [`FfmpegEngine`] runs ffmpeg as a blocking subprocess,
//! streams `-progress pipe:1` key/value pairs into progress reports, and
//! returns the full stderr as diagnostics when the process fails.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use reelforge_common::config::EngineConfig;
use reelforge_common::error::{ReelError, ReelResult, RenderPass};
use reelforge_processing_core::DurationProbe;
use serde::Serialize;

use crate::graph::{GraphInput, InputRole};
use crate::progress::{progress_report, ProgressCallback, ProgressState};

/// One engine run, independent of how it is executed.
#[derive(Debug, Clone, Serialize)]
pub struct EngineInvocation {
    pub pass: RenderPass,
    pub inputs: Vec<GraphInput>,
    pub filter_complex: Option<String>,
    /// Simple single-input filter (`-vf`).
    pub video_filter: Option<String>,
    /// `-map` arguments.
    pub maps: Vec<String>,
    pub codec_args: Vec<String>,
    /// Hard output duration cap (`-t`).
    pub duration_secs: Option<f64>,
    /// Duration progress is measured against.
    pub expected_secs: f64,
    pub output: PathBuf,
}

impl EngineInvocation {
    /// Full ffmpeg argument list.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-hide_banner".to_string(), "-y".to_string()];

        for input in &self.inputs {
            args.extend(input.options.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().into_owned());
        }

        if let Some(graph) = &self.filter_complex {
            args.push("-filter_complex".to_string());
            args.push(graph.clone());
        }
        if let Some(filter) = &self.video_filter {
            args.push("-vf".to_string());
            args.push(filter.clone());
        }
        for map in &self.maps {
            args.push("-map".to_string());
            args.push(map.clone());
        }
        args.extend(self.codec_args.iter().cloned());
        if let Some(secs) = self.duration_secs {
            args.push("-t".to_string());
            args.push(format!("{secs:.3}"));
        }

        args.extend([
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
        ]);
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Stream-copy join of the files named in a concat demuxer list.
    pub fn section_join(list_path: &Path, output: &Path, expected_secs: f64) -> Self {
        Self {
            pass: RenderPass::SectionJoin,
            inputs: vec![GraphInput {
                path: list_path.to_path_buf(),
                role: InputRole::SectionList,
                options: ["-f", "concat", "-safe", "0"].map(String::from).to_vec(),
            }],
            filter_complex: None,
            video_filter: None,
            maps: Vec::new(),
            codec_args: vec!["-c".to_string(), "copy".to_string()],
            duration_secs: None,
            expected_secs,
            output: output.to_path_buf(),
        }
    }
}

/// File name of the concat list inside a job workspace.
pub const SECTION_LIST_FILE_NAME: &str = "sections.txt";

/// Concat demuxer list, one `file '<path>'` line per section.
pub fn section_list(sections: &[PathBuf]) -> String {
    sections
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

/// A media engine capable of running passes and probing durations.
pub trait MediaEngine: Send + Sync {
    /// Execute one pass, blocking until the engine exits.
    fn run(
        &self,
        invocation: &EngineInvocation,
        progress: Option<&ProgressCallback>,
    ) -> ReelResult<()>;

    /// Join already rendered sections in order without re-encoding.
    ///
    /// The concat list is written into `scratch_dir`, which the caller owns.
    fn concat_sections(
        &self,
        sections: &[PathBuf],
        scratch_dir: &Path,
        output: &Path,
        expected_secs: f64,
        progress: Option<&ProgressCallback>,
    ) -> ReelResult<()> {
        if sections.is_empty() {
            return Err(ReelError::render("no sections to join"));
        }
        let list_path = scratch_dir.join(SECTION_LIST_FILE_NAME);
        std::fs::write(&list_path, section_list(sections))?;
        tracing::info!(sections = sections.len(), output = %output.display(), "Joining sections");
        self.run(
            &EngineInvocation::section_join(&list_path, output, expected_secs),
            progress,
        )
    }

    /// Intrinsic duration of a media file, in seconds.
    fn probe_duration(&self, path: &Path) -> ReelResult<f64>;

    /// Check if this engine is available on the system.
    fn is_available(&self) -> bool;

    /// Engine name.
    fn name(&self) -> &str;
}

/// Lets any engine act as the classifier's duration probe.
pub struct EngineProbe<'a>(pub &'a dyn MediaEngine);

impl DurationProbe for EngineProbe<'_> {
    fn probe_duration(&self, path: &Path) -> ReelResult<f64> {
        self.0.probe_duration(path)
    }
}

/// ffmpeg/ffprobe subprocess engine.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl FfmpegEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg.clone(),
            ffprobe: config.ffprobe.clone(),
        }
    }
}

impl MediaEngine for FfmpegEngine {
    fn run(
        &self,
        invocation: &EngineInvocation,
        progress: Option<&ProgressCallback>,
    ) -> ReelResult<()> {
        let pass = invocation.pass;
        let args = invocation.to_args();
        tracing::debug!(pass = %pass, args = ?args, "Running ffmpeg");

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| ReelError::render(format!("Failed to start {}: {e}", self.ffmpeg)))?;

        tracing::info!(
            pid = child.id(),
            pass = %pass,
            inputs = invocation.inputs.len(),
            expected_secs = invocation.expected_secs,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReelError::render("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::render("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();

        let mut latest_progress = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = std::time::Instant::now();
        loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|e| ReelError::render(format!("Failed reading ffmpeg progress: {e}")))?;
            if bytes == 0 {
                break;
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest_progress.update(key, value);
            if key != "progress" {
                continue;
            }

            if latest_progress.out_time_secs > last_progress_secs + 0.001 {
                last_progress_secs = latest_progress.out_time_secs;
                last_progress_wall = std::time::Instant::now();
            }
            if let Some(cb) = progress {
                cb(progress_report(
                    &latest_progress,
                    pass,
                    invocation.expected_secs,
                    start.elapsed().as_secs_f64(),
                ));
            }
            if last_progress_wall.elapsed().as_secs() >= 10 {
                tracing::warn!(
                    pass = %pass,
                    out_time_secs = latest_progress.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_progress_wall = std::time::Instant::now();
            }
        }

        let status = child
            .wait()
            .map_err(|e| ReelError::render(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(ReelError::Engine {
                pass,
                status: status.to_string(),
                diagnostics: stderr_output.trim().to_string(),
            });
        }

        tracing::info!(
            pass = %pass,
            elapsed_secs = start.elapsed().as_secs_f64(),
            output = %invocation.output.display(),
            "ffmpeg pass finished"
        );
        Ok(())
    }

    fn probe_duration(&self, path: &Path) -> ReelResult<f64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| ReelError::probe(path, format!("failed to start {}: {e}", self.ffprobe)))?;

        if !output.status.success() {
            return Err(ReelError::probe(
                path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| ReelError::probe(path, "no usable duration in ffprobe output"))
    }

    fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg) && command_exists(&self.ffprobe)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

fn parse_probe_duration(raw: &str) -> Option<f64> {
    let secs = raw.lines().next()?.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

fn command_exists(binary: &str) -> bool {
    if Path::new(binary).is_absolute() {
        return Path::new(binary).is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_args_order() {
        let invocation = EngineInvocation {
            pass: RenderPass::Base,
            inputs: vec![
                GraphInput {
                    path: PathBuf::from("/m/a.mp4"),
                    role: InputRole::Segment,
                    options: vec!["-t".to_string(), "2.000".to_string()],
                },
                GraphInput {
                    path: PathBuf::from("/m/voice.mp3"),
                    role: InputRole::Narration,
                    options: Vec::new(),
                },
            ],
            filter_complex: Some("[0:v]null[outv]".to_string()),
            video_filter: None,
            maps: vec!["[outv]".to_string(), "1:a".to_string()],
            codec_args: vec!["-c:v".to_string(), "libx264".to_string()],
            duration_secs: Some(2.0),
            expected_secs: 2.0,
            output: PathBuf::from("/tmp/out.mp4"),
        };

        assert_eq!(
            invocation.to_args().join(" "),
            "-hide_banner -y -t 2.000 -i /m/a.mp4 -i /m/voice.mp3 -filter_complex [0:v]null[outv] \
             -map [outv] -map 1:a -c:v libx264 -t 2.000 -progress pipe:1 -nostats /tmp/out.mp4"
        );
    }

    #[test]
    fn test_section_join_copies_streams_from_list() {
        let join = EngineInvocation::section_join(
            Path::new("/work/sections.txt"),
            Path::new("/out/long.mp4"),
            120.0,
        );
        assert_eq!(
            join.to_args().join(" "),
            "-hide_banner -y -f concat -safe 0 -i /work/sections.txt -c copy \
             -progress pipe:1 -nostats /out/long.mp4"
        );
        assert_eq!(join.inputs[0].role, InputRole::SectionList);
    }

    #[test]
    fn test_section_list_quotes_paths() {
        let list = section_list(&[
            PathBuf::from("/work/section_001.mp4"),
            PathBuf::from("/work/it's.mp4"),
        ]);
        assert_eq!(
            list,
            "file '/work/section_001.mp4'\nfile '/work/it'\\''s.mp4'\n"
        );
    }

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(parse_probe_duration("12.345000\n"), Some(12.345));
        assert_eq!(parse_probe_duration("N/A\n"), None);
        assert_eq!(parse_probe_duration("0.000\n"), None);
        assert_eq!(parse_probe_duration(""), None);
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let engine = FfmpegEngine::new(&EngineConfig {
            ffmpeg: "/nonexistent/ffmpeg".to_string(),
            ffprobe: "/nonexistent/ffprobe".to_string(),
        });
        assert!(!engine.is_available());
        assert!(engine
            .probe_duration(Path::new("/nonexistent/clip.mp4"))
            .is_err());
    }
}
