//! Terminal rendering of the track list and playhead

use stemdeck_core::waveform::peak_to_amplitude;
use stemdeck_core::{format_time, PlayheadFrame, Track, TrackSet, TransportController};
use stemdeck_core::audio::AudioSubsystem;

const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Width of the waveform summary in characters
pub const SPARKLINE_WIDTH: usize = 48;

/// Summarize waveform peaks as a fixed-width sparkline
pub fn sparkline(peaks: &[u8], width: usize) -> String {
    if peaks.is_empty() || width == 0 {
        return String::new();
    }
    let chunk = peaks.len().div_ceil(width);
    peaks
        .chunks(chunk)
        .map(|c| {
            let max = c.iter().copied().max().unwrap_or(0);
            let level = (peak_to_amplitude(max) * (SPARK_CHARS.len() - 1) as f32).round() as usize;
            SPARK_CHARS[level.min(SPARK_CHARS.len() - 1)]
        })
        .collect()
}

/// One track-list row; a track at gain 0 is shown as muted
pub fn track_line(index: usize, track: &Track, gain: f32) -> String {
    format!(
        "  {}. {:<7} {:>5} {} {}",
        index + 1,
        track.name(),
        format_time(track.duration()),
        if gain == 0.0 { "[muted]" } else { "       " },
        sparkline(track.waveform(), SPARKLINE_WIDTH)
    )
}

/// Print the loaded tracks, numbered from 1
pub fn print_tracks<A: AudioSubsystem>(set: &TrackSet, transport: &TransportController<A>) {
    for (i, track) in set.iter().enumerate() {
        let gain = transport.gains().gain(i).unwrap_or(1.0);
        println!("{}", track_line(i, track, gain));
    }
}

/// Render the playhead line, e.g. `1:05 / 3:30`
pub fn playhead_line(frame: &PlayheadFrame) -> String {
    format!(
        "{} / {}",
        format_time(frame.position),
        format_time(frame.duration)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use stemdeck_core::{StemRole, StereoBuffer, TrackBuffer, TransportState};

    #[test]
    fn test_sparkline_width_and_levels() {
        let peaks: Vec<u8> = (0..1200).map(|i| if i < 600 { 0 } else { 127 }).collect();
        let line = sparkline(&peaks, 48);
        assert_eq!(line.chars().count(), 48);
        assert_eq!(line.chars().next(), Some('▁'));
        assert_eq!(line.chars().last(), Some('█'));
        assert_eq!(sparkline(&[], 10), "");
    }

    #[test]
    fn test_playhead_line() {
        let frame = PlayheadFrame {
            position: 65.2,
            duration: 210.0,
            state: TransportState::Playing,
        };
        assert_eq!(playhead_line(&frame), "1:05 / 3:30");
    }

    #[test]
    fn test_track_line_marks_muted() {
        let buffer = TrackBuffer::new(StereoBuffer::silence(650), 10);
        let track = Track::new(StemRole::Vocals, buffer, 48, false).unwrap();

        let audible = track_line(3, &track, 1.0);
        assert!(audible.starts_with("  4. Vocals"));
        assert!(audible.contains("1:05"));
        assert!(!audible.contains("[muted]"));
        assert!(track_line(3, &track, 0.0).contains("[muted]"));
    }
}
