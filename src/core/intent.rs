//! Keyword-driven voice intent detection.
//!
//! Decides whether a text reply should additionally be spoken. Matching is
//! case-insensitive substring search so keywords work for inflected forms and
//! non-Latin scripts alike.

use serde::Serialize;

use crate::config::settings::{IntentMode, VoiceSettings};

const BASE_SCORE: f32 = 0.25;
const LENGTH_SCORE: f32 = 0.015;

/// Outcome of one intent check.
#[derive(Debug, Clone, Serialize)]
pub struct IntentResult {
    pub should_voice: bool,
    pub matched_keywords: Vec<String>,
    /// In [0, 1]; grows with the number and length of matched keywords.
    pub confidence: f32,
    pub mode: IntentMode,
}

impl IntentResult {
    fn negative(mode: IntentMode) -> Self {
        Self {
            should_voice: false,
            matched_keywords: Vec::new(),
            confidence: 0.0,
            mode,
        }
    }
}

pub struct IntentDetector;

impl IntentDetector {
    /// Evaluates a reply text against an agent's intent configuration.
    pub fn detect(text: &str, settings: &VoiceSettings) -> IntentResult {
        match settings.intent_detection_mode {
            IntentMode::Disabled => IntentResult::negative(IntentMode::Disabled),
            IntentMode::Always => IntentResult {
                should_voice: true,
                matched_keywords: Vec::new(),
                confidence: 1.0,
                mode: IntentMode::Always,
            },
            IntentMode::Keywords => Self::detect_keywords(text, &settings.intent_keywords),
        }
    }

    fn detect_keywords(text: &str, keywords: &[String]) -> IntentResult {
        if keywords.is_empty() {
            return IntentResult::negative(IntentMode::Keywords);
        }

        let haystack = text.to_lowercase();
        let mut matched = Vec::new();
        let mut confidence = 0.0f32;

        // Matches are reported in configuration order, not text order.
        for keyword in keywords {
            let needle = keyword.to_lowercase();
            if !needle.is_empty() && haystack.contains(&needle) {
                confidence += BASE_SCORE + LENGTH_SCORE * keyword.chars().count() as f32;
                matched.push(keyword.clone());
            }
        }

        IntentResult {
            should_voice: !matched.is_empty(),
            confidence: confidence.clamp(0.0, 1.0),
            matched_keywords: matched,
            mode: IntentMode::Keywords,
        }
    }
}
