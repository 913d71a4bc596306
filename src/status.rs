//! Human-readable status output

use std::fmt::Write;

use crate::state::PlayerState;

/// Render the `status` command output.
pub fn render_status(state: &PlayerState) -> String {
    if !state.play_state {
        return "Playback paused\n".to_string();
    }

    format!(
        "Currently playing:\n\
         \tTrack: {}\n\
         \tArtist: {}\n\
         \tAlbum: {}\n\
         \tTime: {} / {}\n",
        state.track.title,
        state.track.artist,
        state.track.album,
        format_duration_ms(state.time.current),
        format_duration_ms(state.time.total),
    )
}

/// Format milliseconds as `1h2m3.5s`, `2m3s`, `1.25s` or `500ms`.
pub fn format_duration_ms(ms: i64) -> String {
    if ms == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    if ms < 0 {
        out.push('-');
    }
    let ms = ms.unsigned_abs();

    if ms < 1000 {
        let _ = write!(out, "{}ms", ms);
        return out;
    }

    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1000) % 60;
    let millis = ms % 1000;

    if hours > 0 {
        let _ = write!(out, "{}h{}m", hours, minutes);
    } else if minutes > 0 {
        let _ = write!(out, "{}m", minutes);
    }

    if millis == 0 {
        let _ = write!(out, "{}s", seconds);
    } else {
        let fraction = format!("{:03}", millis);
        let _ = write!(out, "{}.{}s", seconds, fraction.trim_end_matches('0'));
    }
    out
}
