//! Trim command construction.

use cliptrim_model::trim::{ExportMode, TrimParams};

/// Workspace name the source is written to.
pub const INPUT_NAME: &str = "input.mp4";

/// Workspace name the engine writes the clip to.
pub const OUTPUT_NAME: &str = "output.mp4";

/// Constant-quality target for precise re-encodes.
pub const PRECISE_CRF: u32 = 23;

/// Audio bitrate for precise re-encodes.
pub const PRECISE_AUDIO_BITRATE: &str = "128k";

/// Build the engine arguments for one trim.
///
/// Seeking happens before the input (`-ss` ahead of `-i`), so the engine
/// jumps straight to the range instead of decoding from the beginning.
pub fn build_trim_args(params: &TrimParams, input: &str, output: &str) -> Vec<String> {
    let mut args = vec![
        "-ss".to_string(),
        params.start_secs.to_string(),
        "-i".to_string(),
        input.to_string(),
        "-t".to_string(),
        params.duration_secs.to_string(),
    ];

    let mut codec_args = codec_args_for_mode(params);
    args.append(&mut codec_args);

    args.push(output.to_string());
    args
}

fn codec_args_for_mode(params: &TrimParams) -> Vec<String> {
    match params.mode {
        // Keyframe-snapped cut, no re-encode.
        ExportMode::Fast => vec![
            "-c".to_string(),
            "copy".to_string(),
            "-avoid_negative_ts".to_string(),
            "make_zero".to_string(),
        ],
        ExportMode::Precise => vec![
            "-r".to_string(),
            params.fps.max(1).to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "ultrafast".to_string(),
            "-crf".to_string(),
            PRECISE_CRF.to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            PRECISE_AUDIO_BITRATE.to_string(),
        ],
    }
}

/// Value following the last `-t` flag, if any.
pub fn requested_duration(args: &[String]) -> Option<f64> {
    args.iter()
        .rposition(|arg| arg == "-t")
        .and_then(|idx| args.get(idx + 1))
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}
