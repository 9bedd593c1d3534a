//! # Temporal Correlator
//!
//! Maps discrete OCR sighting timestamps onto continuous transcript time
//! segments. Pure functions, no I/O; everything here works on offsets in
//! seconds relative to the broadcast anchor time.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use broadcast_datastore::JudgedWindow;

use crate::stt::TranscribeSegment;

/// One process identifier sighted in a snapshot, at an offset from the
/// broadcast anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotHit {
    pub identifier: String,
    pub offset: f64,
}

/// Converts a snapshot capture time to an offset against the anchor
/// (broadcast start, or upload time when no better anchor exists).
/// Clock skew can put a capture before the anchor; offsets clamp at zero.
pub fn offset_seconds(anchor: DateTime<Utc>, captured_at: DateTime<Utc>) -> f64 {
    let millis = (captured_at - anchor).num_milliseconds();
    (millis as f64 / 1000.0).max(0.0)
}

/// Groups hits by identifier into min/max offset windows and attaches the
/// transcript snippet overlapping each window.
///
/// A single sighting yields a point window (`start_offset == end_offset`);
/// a segment spanning that instant still satisfies the overlap test and
/// contributes its text.
pub fn correlate(hits: &[SnapshotHit], segments: &[TranscribeSegment]) -> Vec<JudgedWindow> {
    let mut windows: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for hit in hits {
        windows
            .entry(hit.identifier.as_str())
            .and_modify(|(start, end)| {
                *start = start.min(hit.offset);
                *end = end.max(hit.offset);
            })
            .or_insert((hit.offset, hit.offset));
    }

    windows
        .into_iter()
        .map(|(identifier, (start_offset, end_offset))| JudgedWindow {
            identifier: identifier.to_string(),
            start_offset,
            end_offset,
            snippet: snippet_for(start_offset, end_offset, segments),
        })
        .collect()
}

/// Concatenates the text of every segment with `start < end_offset` and
/// `end > start_offset`. Segments are pre-sorted by start, so the scan
/// stops at the first segment starting at or past the window end.
fn snippet_for(start_offset: f64, end_offset: f64, segments: &[TranscribeSegment]) -> String {
    let mut parts = Vec::new();
    for segment in segments {
        if segment.start >= end_offset {
            break;
        }
        if segment.end > start_offset {
            let text = segment.text.trim();
            if !text.is_empty() {
                parts.push(text);
            }
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn seg(start: f64, end: f64, text: &str) -> TranscribeSegment {
        TranscribeSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn hit(identifier: &str, offset: f64) -> SnapshotHit {
        SnapshotHit {
            identifier: identifier.to_string(),
            offset,
        }
    }

    #[test]
    fn offset_is_relative_to_anchor() {
        let anchor = Utc::now();
        let captured = anchor + Duration::seconds(42);
        assert_eq!(offset_seconds(anchor, captured), 42.0);
    }

    #[test]
    fn offset_before_anchor_clamps_to_zero() {
        let anchor = Utc::now();
        let captured = anchor - Duration::seconds(5);
        assert_eq!(offset_seconds(anchor, captured), 0.0);
    }

    #[test]
    fn window_spans_min_and_max_offsets_with_overlapping_snippet() {
        let hits = vec![hit("P1", 5.0), hit("P1", 9.0), hit("P1", 5.0)];
        let segments = vec![seg(0.0, 4.0, "x"), seg(4.0, 10.0, "y"), seg(10.0, 20.0, "z")];

        let windows = correlate(&hits, &segments);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].identifier, "P1");
        assert_eq!(windows[0].start_offset, 5.0);
        assert_eq!(windows[0].end_offset, 9.0);
        // Only (4,10) overlaps [5,9): (0,4) ends at the window start and
        // (10,20) begins past its end.
        assert_eq!(windows[0].snippet, "y");
    }

    #[test]
    fn no_overlapping_segment_yields_empty_snippet() {
        let hits = vec![hit("P1", 50.0), hit("P1", 60.0)];
        let segments = vec![seg(0.0, 10.0, "early"), seg(100.0, 110.0, "late")];

        let windows = correlate(&hits, &segments);
        assert_eq!(windows.len(), 1);
        assert!(windows[0].snippet.is_empty());
    }

    #[test]
    fn single_sighting_yields_point_window() {
        let hits = vec![hit("P2", 7.0)];
        let segments = vec![seg(0.0, 20.0, "text")];

        let windows = correlate(&hits, &segments);
        assert_eq!(windows[0].start_offset, 7.0);
        assert_eq!(windows[0].end_offset, 7.0);
        // (0,20) spans the 7.0 instant: 0 < 7 and 20 > 7.
        assert_eq!(windows[0].snippet, "text");
    }

    #[test]
    fn point_window_with_no_spanning_segment_is_empty() {
        let hits = vec![hit("P2", 7.0)];
        let segments = vec![seg(0.0, 7.0, "before"), seg(7.0, 10.0, "after")];

        let windows = correlate(&hits, &segments);
        // (0,7) ends at the instant and (7,10) starts at it; neither spans it.
        assert!(windows[0].snippet.is_empty());
    }

    #[test]
    fn identifiers_produce_independent_windows() {
        let hits = vec![hit("A", 2.0), hit("B", 12.0), hit("A", 6.0)];
        let segments = vec![seg(0.0, 5.0, "one"), seg(5.0, 10.0, "two"), seg(10.0, 15.0, "three")];

        let windows = correlate(&hits, &segments);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].identifier, "A");
        assert_eq!(windows[0].snippet, "one two");
        assert_eq!(windows[1].identifier, "B");
        assert!(windows[1].snippet.is_empty());
    }

    #[test]
    fn segment_texts_are_trimmed_and_joined_in_order() {
        let hits = vec![hit("A", 0.0), hit("A", 30.0)];
        let segments = vec![seg(0.0, 10.0, "  first "), seg(10.0, 20.0, "second\n")];

        let windows = correlate(&hits, &segments);
        assert_eq!(windows[0].snippet, "first second");
    }

    #[test]
    fn no_hits_produces_no_windows() {
        assert!(correlate(&[], &[seg(0.0, 10.0, "x")]).is_empty());
    }
}
