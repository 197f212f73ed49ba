//! Timecode formatting for progress and trim displays.

/// Format seconds as `MM:SS.cc`, with an `HH:` prefix once past an hour.
///
/// Non-finite and negative inputs render as `00:00:00`.
pub fn format_timecode(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00:00".to_string();
    }

    let whole = seconds.floor() as u64;
    let h = whole / 3600;
    let m = (whole % 3600) / 60;
    let s = whole % 60;
    let cs = ((seconds.fract() * 100.0).floor() as u64).min(99);

    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}.{cs:02}")
    } else {
        format!("{m:02}:{s:02}.{cs:02}")
    }
}
