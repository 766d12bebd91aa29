use serde::{Deserialize, Serialize};

/// Single transcription segment with timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start: f32,

    /// End time in seconds
    pub end: f32,

    /// Transcribed text
    pub text: String,
}

impl Segment {
    /// Create a new segment
    pub fn new(start: f32, end: f32, text: String) -> Self {
        Self { start, end, text }
    }

    /// Get duration in seconds
    pub fn duration(&self) -> f32 {
        self.end - self.start
    }

    /// Format timestamp as HH:MM:SS
    pub fn format_timestamp(seconds: f32) -> String {
        let seconds = seconds as u32;
        let h = seconds / 3600;
        let m = (seconds % 3600) / 60;
        let s = seconds % 60;
        format!("{:02}:{:02}:{:02}", h, m, s)
    }

    /// Get formatted time range string
    pub fn time_range(&self) -> String {
        format!(
            "{} - {}",
            Self::format_timestamp(self.start),
            Self::format_timestamp(self.end)
        )
    }
}

/// Complete transcription result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Full transcribed text
    pub full_text: String,

    /// Individual segments, time-ordered and non-overlapping as produced
    /// by the model
    pub segments: Vec<Segment>,

    /// Language used for decoding (ISO code, "auto" when detected)
    pub language: String,

    /// Mean decoder confidence, when the runtime reports one
    pub overall_confidence: Option<f32>,
}

impl TranscriptionResult {
    /// Create a new result
    pub fn new(
        full_text: String,
        segments: Vec<Segment>,
        language: String,
        overall_confidence: Option<f32>,
    ) -> Self {
        Self {
            full_text,
            segments,
            language,
            overall_confidence,
        }
    }

    /// Build a result from segments; the full text is the in-order
    /// concatenation of the segment texts
    pub fn from_segments(segments: Vec<Segment>, language: String) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            full_text,
            segments,
            language,
            overall_confidence: None,
        }
    }

    /// Create from full text only (no segments)
    pub fn from_text(full_text: String, language: String) -> Self {
        Self {
            full_text,
            segments: Vec::new(),
            language,
            overall_confidence: None,
        }
    }

    /// Get total duration covered by the segments
    pub fn duration(&self) -> f32 {
        self.segments.last().map(|seg| seg.end).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_creation() {
        let seg = Segment::new(0.0, 5.5, "Hello world".to_string());
        assert_eq!(seg.duration(), 5.5);
        assert_eq!(seg.time_range(), "00:00:00 - 00:00:05");
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(Segment::format_timestamp(0.0), "00:00:00");
        assert_eq!(Segment::format_timestamp(65.0), "00:01:05");
        assert_eq!(Segment::format_timestamp(3661.0), "01:01:01");
    }

    #[test]
    fn test_from_segments_concatenates_in_order() {
        let segments = vec![
            Segment::new(0.0, 2.0, "góa ê".to_string()),
            Segment::new(2.0, 5.0, "pêng-iú".to_string()),
        ];

        let result = TranscriptionResult::from_segments(segments, "nan".to_string());
        assert_eq!(result.full_text, "góa ê pêng-iú");
        assert_eq!(result.duration(), 5.0);
    }

    #[test]
    fn test_from_segments_skips_empty_text() {
        let segments = vec![
            Segment::new(0.0, 1.0, "  ".to_string()),
            Segment::new(1.0, 2.0, "tsia̍h-pá".to_string()),
        ];

        let result = TranscriptionResult::from_segments(segments, "nan".to_string());
        assert_eq!(result.full_text, "tsia̍h-pá");
        assert_eq!(result.segments.len(), 2);
    }
}
