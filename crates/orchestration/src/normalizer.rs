use crate::{CaptionEvent, Speaker, TranscriptSegment};

/// Decision the normalizer makes for a surviving caption event.
#[derive(Debug, Clone)]
pub enum SegmentDelta {
    /// A new speaker took the floor; append this segment.
    Appended(TranscriptSegment),
    /// The same speaker is still talking; overwrite the last segment.
    Updated(TranscriptSegment),
}

/// Turns the raw word-by-word caption feed into stable append/update deltas.
///
/// The host page re-renders the whole current utterance on every new word, so
/// consecutive events from the same speaker describe ONE segment whose text
/// converges; only a speaker switch starts a new segment.
pub struct CaptionNormalizer {
    min_caption_chars: usize,
    next_id: u64,
    current_id: u64,
    last_speaker: Option<Speaker>,
    last_text: String,
    client_name: Option<String>,
}

impl CaptionNormalizer {
    pub fn new(min_caption_chars: usize) -> Self {
        Self {
            min_caption_chars,
            next_id: 0,
            current_id: 0,
            last_speaker: None,
            last_text: String::new(),
            client_name: None,
        }
    }

    /// First non-agent speaker name seen in the captions.
    pub fn client_name(&self) -> Option<&str> {
        self.client_name.as_deref()
    }

    /// Classifies and dedups a raw caption event.
    ///
    /// Returns `None` for UI noise and for unchanged re-renders of the
    /// current utterance.
    pub fn apply(&mut self, event: &CaptionEvent) -> Option<SegmentDelta> {
        let text = event.text.trim();
        if text.len() < self.min_caption_chars || is_ui_artifact(text) {
            return None;
        }

        let speaker = classify(&event.speaker_name);
        let same_speaker = self.last_speaker == Some(speaker);

        if same_speaker && self.last_text == text {
            return None;
        }
        self.last_text = text.to_string();

        if same_speaker {
            Some(SegmentDelta::Updated(self.segment(speaker, text, event)))
        } else {
            self.last_speaker = Some(speaker);
            self.next_id += 1;
            self.current_id = self.next_id;
            if speaker == Speaker::Client && self.client_name.is_none() {
                self.client_name = Some(event.speaker_name.clone());
            }
            Some(SegmentDelta::Appended(self.segment(speaker, text, event)))
        }
    }

    fn segment(&self, speaker: Speaker, text: &str, event: &CaptionEvent) -> TranscriptSegment {
        TranscriptSegment {
            id: self.current_id,
            speaker,
            text: text.to_string(),
            timestamp: event.timestamp,
            // Captions come from the host page verbatim, not from ASR.
            confidence: Some(1.0),
        }
    }
}

fn classify(speaker_name: &str) -> Speaker {
    let name = speaker_name.trim();
    if name.is_empty() {
        Speaker::Unknown
    } else if name.eq_ignore_ascii_case("you") {
        Speaker::Agent
    } else {
        Speaker::Client
    }
}

/// Scroll hints and icon labels leak into the caption container text.
fn is_ui_artifact(text: &str) -> bool {
    text.contains("Jump to") || text.contains("arrow_")
}
