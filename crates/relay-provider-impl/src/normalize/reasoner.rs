use relay_protocol::{CanonicalMessage, Usage};
use serde_json::Value;

use super::NormalizedEvent;
use super::openai::parse_usage;

const OPEN_TAG: &str = "<think>";
const CLOSE_TAG: &str = "</think>";

/// One emitted fragment from the embedded-reasoning extractor: either a
/// slice of the reasoning chain or a slice of the final answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Reasoning(String),
    Content(String),
}

/// Extracts a `<think>…</think>`-delimited reasoning chain from a content
/// stream that may split the tags anywhere across chunk boundaries
/// (spec.md §4.2, §8's chunking-insensitivity property). `carry` holds
/// whatever trailing bytes might be the start of a tag that hasn't been
/// confirmed yet; `collecting_think` is the open/closed state of the tag.
#[derive(Debug, Default)]
pub struct ThinkExtractor {
    collecting_think: bool,
    carry: String,
}

impl ThinkExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one upstream content delta, returning the fragments it
    /// produces. A single delta can yield zero, one, or multiple fragments
    /// (e.g. `<think>abc</think>def` yields a reasoning fragment and a
    /// content fragment from one input).
    pub fn push(&mut self, raw: &str) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        let mut s = std::mem::take(&mut self.carry);
        s.push_str(raw);

        loop {
            let tag = if self.collecting_think { CLOSE_TAG } else { OPEN_TAG };
            if let Some(idx) = s.find(tag) {
                let before = s[..idx].to_string();
                if !before.is_empty() {
                    fragments.push(self.wrap(before));
                }
                s = s[idx + tag.len()..].to_string();
                self.collecting_think = !self.collecting_think;
                continue;
            }

            let partial = longest_partial_prefix_suffix(&s, tag);
            if partial > 0 {
                let split = s.len() - partial;
                let before = s[..split].to_string();
                if !before.is_empty() {
                    fragments.push(self.wrap(before));
                }
                self.carry = s[split..].to_string();
            } else if !s.is_empty() {
                fragments.push(self.wrap(s.clone()));
            }
            break;
        }

        fragments
    }

    /// Flushes a non-empty carry if the upstream ends mid-tag (malformed
    /// input) so no content silently disappears.
    pub fn finish(&mut self) -> Vec<Fragment> {
        if self.carry.is_empty() {
            return Vec::new();
        }
        let carry = std::mem::take(&mut self.carry);
        vec![self.wrap(carry)]
    }

    fn wrap(&self, text: String) -> Fragment {
        if self.collecting_think {
            Fragment::Reasoning(text)
        } else {
            Fragment::Content(text)
        }
    }
}

/// Longest `k < tag.len()` such that `s` ends with `tag[..k]`, respecting
/// UTF-8 char boundaries. Used to detect a tag opener/closer that might be
/// completed by a later chunk.
fn longest_partial_prefix_suffix(s: &str, tag: &str) -> usize {
    for k in (1..tag.len()).rev() {
        if k > s.len() {
            continue;
        }
        let cut = s.len() - k;
        if !s.is_char_boundary(cut) {
            continue;
        }
        if &s[cut..] == &tag[..k] {
            return k;
        }
    }
    0
}

/// origin-reasoning models: the upstream already partitions `content` vs
/// `reasoning_content`; copy both through unchanged.
pub fn process_origin_reasoning(json: &Value) -> Option<NormalizedEvent> {
    super::openai::process(json)
}

pub fn decode_final_origin_reasoning(
    json: &Value,
) -> Option<(CanonicalMessage, Option<String>, Option<Usage>, Option<String>)> {
    super::openai::decode_final(json)
}

pub fn parse_reasoner_usage(v: &Value) -> Option<Usage> {
    parse_usage(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_think_then_content() {
        let mut extractor = ThinkExtractor::new();
        let fragments = extractor.push("<think>abc</think>def");
        assert_eq!(
            fragments,
            vec![
                Fragment::Reasoning("abc".to_string()),
                Fragment::Content("def".to_string())
            ]
        );
    }

    #[test]
    fn tags_split_across_chunks() {
        let mut extractor = ThinkExtractor::new();
        assert!(extractor.push("<thi").is_empty());
        let second = extractor.push("nk>abc</th");
        assert_eq!(second, vec![Fragment::Reasoning("abc".to_string())]);
        let third = extractor.push("ink>def");
        assert_eq!(third, vec![Fragment::Content("def".to_string())]);
    }

    #[test]
    fn prose_before_think_is_classified_as_content() {
        let mut extractor = ThinkExtractor::new();
        let fragments = extractor.push("hello <think>why</think>hi");
        assert_eq!(
            fragments,
            vec![
                Fragment::Content("hello ".to_string()),
                Fragment::Reasoning("why".to_string()),
                Fragment::Content("hi".to_string()),
            ]
        );
    }

    #[test]
    fn no_tags_passes_through_as_content() {
        let mut extractor = ThinkExtractor::new();
        assert_eq!(
            extractor.push("just answer"),
            vec![Fragment::Content("just answer".to_string())]
        );
    }
}
