use anyhow::Result;
use tracing::info;

use super::Summarizer;

const DECISION_KEYWORDS: &[&str] = &["decided", "agreed", "approved", "chose", "selected"];
const ACTION_KEYWORDS: &[&str] = &["will", "should", "need to", "must", "action", "task"];

/// Rule-based summarizer producing the fixed markdown sections.
///
/// Sentence extraction plus keyword filters; a stand-in for a language-model
/// summarizer with the same request/response contract.
pub struct HeuristicSummarizer;

impl HeuristicSummarizer {
    pub fn new() -> Self {
        Self
    }

    fn sentences(transcript: &str) -> Vec<&str> {
        transcript
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| s.len() > 20)
            .collect()
    }

    fn matching<'a>(sentences: &[&'a str], keywords: &[&str]) -> Vec<&'a str> {
        sentences
            .iter()
            .filter(|s| {
                let lower = s.to_lowercase();
                keywords.iter().any(|k| lower.contains(k))
            })
            .copied()
            .collect()
    }
}

impl Default for HeuristicSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Summarizer for HeuristicSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String> {
        let sentences = Self::sentences(transcript);
        let word_count = transcript.split_whitespace().count();
        info!(
            "Summarizing transcript: {} words, {} sentences",
            word_count,
            sentences.len()
        );

        let mut summary = String::from("# Meeting Summary\n\n");

        summary.push_str("## Executive Summary\n");
        summary.push_str(&format!(
            "This meeting covered {} main discussion points. \
             The conversation included {} words of dialogue. \
             Key topics were discussed and action items were identified.\n\n",
            sentences.len().min(10),
            word_count
        ));

        summary.push_str("## Key Discussion Points\n");
        for (i, sentence) in sentences.iter().take(8).enumerate() {
            summary.push_str(&format!("{}. {}\n", i + 1, sentence));
        }
        if sentences.is_empty() {
            summary.push_str("- Review transcript for discussion points\n");
        }

        summary.push_str("\n## Decisions Made\n");
        let decisions = Self::matching(&sentences, DECISION_KEYWORDS);
        if decisions.is_empty() {
            summary.push_str("- Review transcript for specific decisions\n");
        } else {
            for (i, decision) in decisions.iter().take(5).enumerate() {
                summary.push_str(&format!("{}. {}\n", i + 1, decision));
            }
        }

        summary.push_str("\n## Action Items\n");
        let actions = Self::matching(&sentences, ACTION_KEYWORDS);
        if actions.is_empty() {
            summary.push_str("- Follow up on discussed topics\n");
            summary.push_str("- Review meeting notes\n");
        } else {
            for (i, action) in actions.iter().take(5).enumerate() {
                summary.push_str(&format!("{}. {}\n", i + 1, action));
            }
        }

        summary.push_str("\n## Next Steps\n");
        summary.push_str("- Share this summary with all participants\n");
        summary.push_str("- Schedule follow-up meeting if needed\n");
        summary.push_str("- Track action items and deadlines\n");

        summary.push_str("\n## Important Quotes\n");
        let quotes: Vec<&str> = sentences.iter().filter(|s| s.len() > 50).copied().collect();
        if quotes.is_empty() {
            summary.push_str("- Review full transcript for specific quotes\n");
        } else {
            for (i, quote) in quotes.iter().take(3).enumerate() {
                summary.push_str(&format!("{}. \"{}\"\n", i + 1, quote));
            }
        }

        Ok(summary)
    }
}
