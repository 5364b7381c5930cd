//! Timeline composition: concat the segment list, replace the audio
//! track, and encode the container in a single FFmpeg pass.

use std::path::{Path, PathBuf};
use tracing::info;

use voxreel_models::{EncodingConfig, FramePlan, Timeline};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters;

/// One pool clip as the compositor sees it.
#[derive(Debug, Clone)]
pub struct ComposeClip {
    pub path: PathBuf,
    pub plan: FramePlan,
    pub duration: f64,
}

/// Tolerance when deciding whether a segment covers its whole clip.
const TRIM_EPSILON: f64 = 1e-6;

/// Build the FFmpeg command that renders `timeline` over `pool` with
/// `audio_path` as the narration track.
///
/// The composite's duration is governed solely by the timeline: no
/// `-shortest`, no trim against the audio. If the timeline overshoots
/// the narration, the tail plays silent.
pub fn build_compose_command(
    pool: &[ComposeClip],
    timeline: &Timeline,
    audio_path: &Path,
    output: &Path,
    encoding: &EncodingConfig,
) -> MediaResult<FfmpegCommand> {
    let segments = timeline.segments();

    // Composite canvas: the largest normalized frame on the timeline.
    // Every plan shares the target ratio, so this is distortion-free.
    let canvas_w = segments
        .iter()
        .map(|s| pool[s.clip_index].plan.out_w())
        .max()
        .unwrap_or(0);
    let canvas_h = segments
        .iter()
        .map(|s| pool[s.clip_index].plan.out_h())
        .max()
        .unwrap_or(0);

    let mut cmd = FfmpegCommand::new(output);
    let mut chains = Vec::with_capacity(segments.len());

    for segment in segments {
        let clip = &pool[segment.clip_index];
        let mut input_args: Vec<String> = Vec::new();
        if segment.start > 0.0 {
            input_args.push("-ss".to_string());
            input_args.push(format!("{:.3}", segment.start));
        }
        if segment.end < clip.duration - TRIM_EPSILON {
            input_args.push("-t".to_string());
            input_args.push(format!("{:.3}", segment.duration()));
        }
        cmd = cmd.input_with_args(input_args, &clip.path);
        chains.push(filters::segment_chain(&clip.plan, canvas_w, canvas_h));
    }

    let audio_index = segments.len();
    cmd = cmd
        .input(audio_path)
        .filter_complex(filters::concat_filter(&chains))
        .map("[vout]")
        .map(format!("{}:a", audio_index))
        .output_args(encoding.to_ffmpeg_args());

    Ok(cmd)
}

/// Compose and encode a timeline to `output`.
pub async fn compose_timeline(
    pool: &[ComposeClip],
    timeline: &Timeline,
    audio_path: &Path,
    output: &Path,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    if timeline.is_empty() {
        return Err(MediaError::ffmpeg_failed(
            "Refusing to compose an empty timeline",
            None,
            None,
        ));
    }

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!(
        segments = timeline.len(),
        duration = timeline.total_duration(),
        output = %output.display(),
        "Composing timeline"
    );

    let cmd = build_compose_command(pool, timeline, audio_path, output, encoding)?;
    FfmpegRunner::new().run(&cmd).await?;

    info!(output = %output.display(), "Composite written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxreel_models::Timeline;

    fn pool() -> Vec<ComposeClip> {
        vec![
            ComposeClip {
                path: PathBuf::from("a.mp4"),
                plan: FramePlan::Crop {
                    out_w: 1920,
                    out_h: 1080,
                    x: 320,
                    y: 0,
                },
                duration: 4.0,
            },
            ComposeClip {
                path: PathBuf::from("b.mp4"),
                plan: FramePlan::Crop {
                    out_w: 1280,
                    out_h: 720,
                    x: 0,
                    y: 40,
                },
                duration: 3.0,
            },
        ]
    }

    #[test]
    fn test_whole_segments_have_no_trim_args() {
        let timeline = Timeline::assemble(&[4.0, 3.0], 7.0).unwrap();
        let cmd =
            build_compose_command(&pool(), &timeline, Path::new("v.mp3"), Path::new("out.mp4"), &EncodingConfig::default())
                .unwrap();
        let args = cmd.build_args();
        assert!(!args.contains(&"-t".to_string()));
        assert!(!args.contains(&"-ss".to_string()));
    }

    #[test]
    fn test_trimmed_segment_gets_duration_arg() {
        // 4 + 3 = 7s pool against 9s narration: loops, trims the first
        // clip's reuse to two seconds.
        let timeline = Timeline::assemble(&[4.0, 3.0], 9.0).unwrap();
        let cmd =
            build_compose_command(&pool(), &timeline, Path::new("v.mp3"), Path::new("out.mp4"), &EncodingConfig::default())
                .unwrap();
        let args = cmd.build_args();
        let t = args.iter().position(|s| s == "-t").unwrap();
        assert_eq!(args[t + 1], "2.000");
        // The trim precedes the re-used first clip's -i.
        assert_eq!(args[t + 2], "-i");
        assert_eq!(args[t + 3], "a.mp4");
    }

    #[test]
    fn test_audio_mapped_after_all_segments() {
        let timeline = Timeline::assemble(&[4.0, 3.0], 7.0).unwrap();
        let cmd =
            build_compose_command(&pool(), &timeline, Path::new("v.mp3"), Path::new("out.mp4"), &EncodingConfig::default())
                .unwrap();
        let args = cmd.build_args();
        assert!(args.contains(&"2:a".to_string()));
        assert!(args.contains(&"[vout]".to_string()));
        assert!(!args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn test_canvas_is_timeline_maximum() {
        let timeline = Timeline::assemble(&[4.0, 3.0], 7.0).unwrap();
        let cmd =
            build_compose_command(&pool(), &timeline, Path::new("v.mp3"), Path::new("out.mp4"), &EncodingConfig::default())
                .unwrap();
        let args = cmd.build_args();
        let graph = &args[args.iter().position(|s| s == "-filter_complex").unwrap() + 1];
        // The smaller clip is scaled up to the 1920x1080 canvas; the
        // larger one passes through.
        assert!(graph.contains("crop=1280:720:0:40,scale=1920:1080,setsar=1"));
        assert!(graph.contains("crop=1920:1080:320:0,setsar=1"));
        assert!(graph.contains("concat=n=2:v=1:a=0[vout]"));
    }
}
