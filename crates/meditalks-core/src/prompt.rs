//! Backend-agnostic prompt construction.

use std::fmt::Write;

use crate::context::CulturalContext;
use crate::error::InputError;
use crate::language::Language;
use crate::summary::SummaryHeaders;

/// Default cap on document text embedded in a summarization prompt.
pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 3000;

/// What the prompt asks the model to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    AdaptMessage,
    SummarizeDocument,
}

/// Builds prompts from a context, source text, and target language.
///
/// Output is deterministic for identical inputs.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    headers: SummaryHeaders,
    max_document_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            headers: SummaryHeaders::default(),
            max_document_chars: DEFAULT_MAX_DOCUMENT_CHARS,
        }
    }
}

impl PromptBuilder {
    pub fn new(headers: SummaryHeaders, max_document_chars: usize) -> Self {
        Self {
            headers,
            max_document_chars: max_document_chars.max(1),
        }
    }

    pub fn headers(&self) -> &SummaryHeaders {
        &self.headers
    }

    pub fn build(
        &self,
        source_text: &str,
        context: &CulturalContext,
        target_language: Language,
        mode: PromptMode,
    ) -> Result<String, InputError> {
        let source = source_text.trim();
        if source.is_empty() {
            return Err(InputError::EmptyInput);
        }

        let language = target_language.name();
        let mut prompt = String::with_capacity(source.len() + 1024);

        // Writing into a String cannot fail.
        let _ = writeln!(
            prompt,
            "You are a medical communication expert specializing in culturally sensitive \
             healthcare communication for Southeast Asian communities."
        );
        prompt.push('\n');

        match mode {
            PromptMode::AdaptMessage => {
                let _ = writeln!(
                    prompt,
                    "Task: Adapt the following medical message for the {} community. \
                     Respond ONLY in {} ({}).",
                    context.display_name,
                    language,
                    target_language.native_name()
                );
            }
            PromptMode::SummarizeDocument => {
                let _ = writeln!(
                    prompt,
                    "Task: Summarize the following medical document for the {} community. \
                     Write the whole summary ONLY in {} ({}).",
                    context.display_name,
                    language,
                    target_language.native_name()
                );
            }
        }
        prompt.push('\n');

        let _ = writeln!(prompt, "Target language: {language}");
        let _ = writeln!(
            prompt,
            "Target community: {} ({})",
            context.description, context.region
        );
        prompt.push('\n');

        prompt.push_str("Tone and style:\n");
        for (i, directive) in context.tone_directives.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {}", i + 1, directive);
        }
        prompt.push('\n');

        prompt.push_str(
            "Sensitive areas: this community treats the following areas as sensitive. \
             Avoid raising them unless medically necessary, and if they must be mentioned, \
             do so gently and indirectly:\n",
        );
        for topic in context.sensitive_topics {
            let _ = writeln!(prompt, "- {}", topic.category);
        }
        prompt.push('\n');

        match mode {
            PromptMode::AdaptMessage => {
                let _ = writeln!(prompt, "Original message:\n\"\"\"\n{source}\n\"\"\"");
                prompt.push('\n');
                prompt.push_str(
                    "Instructions:\n\
                     - Keep every medical fact, dose, and timing accurate.\n\
                     - Use culturally appropriate wording, honorifics, and examples.\n\
                     - Do not add medical advice that is not in the original message.\n",
                );
                prompt.push('\n');
                let _ = write!(
                    prompt,
                    "Provide ONLY the adapted message in {language}. Do not add explanations."
                );
            }
            PromptMode::SummarizeDocument => {
                let document = truncate_chars(source, self.max_document_chars);
                let _ = writeln!(prompt, "Medical document text:\n\"\"\"\n{document}\n\"\"\"");
                prompt.push('\n');
                let _ = writeln!(
                    prompt,
                    "Structure the summary using exactly these section headers, each on its own \
                     line and written exactly as shown, followed by short paragraphs or \"- \" \
                     bullet points:"
                );
                for header in self.headers.iter() {
                    let _ = writeln!(prompt, "**{}**", header.to_uppercase());
                }
                prompt.push('\n');
                let _ = write!(
                    prompt,
                    "Keep medical terms simple and every instruction accurate. \
                     Write everything in {language} only, except the section headers."
                );
            }
        }

        Ok(prompt)
    }
}

/// Cut `text` to at most `max_chars` characters without splitting a code point.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{all, resolve};

    const NEUTRAL: &str = "Take your medication twice daily";

    #[test]
    fn blank_source_is_rejected() {
        let ctx = resolve("thai-low-literacy").unwrap();
        let builder = PromptBuilder::default();
        for blank in ["", "   ", "\n\t "] {
            assert_eq!(
                builder.build(blank, ctx, Language::Th, PromptMode::AdaptMessage),
                Err(InputError::EmptyInput)
            );
        }
    }

    #[test]
    fn always_contains_language_name() {
        let builder = PromptBuilder::default();
        for ctx in all() {
            for lang in Language::ALL {
                for mode in [PromptMode::AdaptMessage, PromptMode::SummarizeDocument] {
                    let prompt = builder.build(NEUTRAL, ctx, lang, mode).unwrap();
                    assert!(
                        prompt.contains(lang.name()),
                        "{} / {:?} prompt missing {}",
                        ctx.id,
                        mode,
                        lang.name()
                    );
                }
            }
        }
    }

    #[test]
    fn never_introduces_sensitive_phrases() {
        let builder = PromptBuilder::default();
        for ctx in all() {
            for lang in Language::ALL {
                for mode in [PromptMode::AdaptMessage, PromptMode::SummarizeDocument] {
                    let prompt = builder.build(NEUTRAL, ctx, lang, mode).unwrap().to_lowercase();
                    for topic in ctx.sensitive_topics {
                        assert!(
                            !prompt.contains(topic.phrase),
                            "{} prompt introduced {:?}",
                            ctx.id,
                            topic.phrase
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn keeps_sensitive_phrase_from_source() {
        let ctx = resolve("malay-traditional").unwrap();
        let prompt = PromptBuilder::default()
            .build(
                "This syrup contains alcohol; ask about alternatives.",
                ctx,
                Language::Ms,
                PromptMode::AdaptMessage,
            )
            .unwrap();
        assert!(prompt.contains("contains alcohol"));
    }

    #[test]
    fn embeds_tone_directives_and_sensitivity_instruction() {
        let ctx = resolve("vietnamese-elderly").unwrap();
        let prompt = PromptBuilder::default()
            .build(NEUTRAL, ctx, Language::Vi, PromptMode::AdaptMessage)
            .unwrap();
        for directive in ctx.tone_directives {
            assert!(prompt.contains(directive));
        }
        for topic in ctx.sensitive_topics {
            assert!(prompt.contains(topic.category));
        }
        assert!(prompt.contains("unless medically necessary"));
        assert!(prompt.contains(NEUTRAL));
    }

    #[test]
    fn summarize_mode_requests_headed_sections() {
        let ctx = resolve("tagalog-rural").unwrap();
        let prompt = PromptBuilder::default()
            .build("Discharge note: rest for 3 days.", ctx, Language::Tl, PromptMode::SummarizeDocument)
            .unwrap();
        for header in [
            "**DOCUMENT SUMMARY**",
            "**KEY MEDICAL INFORMATION**",
            "**IMPORTANT INSTRUCTIONS**",
            "**FOLLOW-UP CARE**",
            "**PATIENT GUIDANCE**",
        ] {
            assert!(prompt.contains(header), "missing {header}");
        }
    }

    #[test]
    fn adapt_mode_has_no_section_headers() {
        let ctx = resolve("tagalog-rural").unwrap();
        let prompt = PromptBuilder::default()
            .build(NEUTRAL, ctx, Language::Tl, PromptMode::AdaptMessage)
            .unwrap();
        assert!(!prompt.contains("**DOCUMENT SUMMARY**"));
    }

    #[test]
    fn custom_headers_are_used() {
        let ctx = resolve("khmer-indigenous").unwrap();
        let builder = PromptBuilder::new(SummaryHeaders::new(vec!["Overview".into()]), 100);
        let prompt = builder
            .build("Some document text.", ctx, Language::Km, PromptMode::SummarizeDocument)
            .unwrap();
        assert!(prompt.contains("**OVERVIEW**"));
        assert!(!prompt.contains("**DOCUMENT SUMMARY**"));
    }

    #[test]
    fn document_text_is_truncated() {
        let ctx = resolve("thai-low-literacy").unwrap();
        let builder = PromptBuilder::new(SummaryHeaders::default(), 10);
        let prompt = builder
            .build("abcdefghijKLMNOP", ctx, Language::En, PromptMode::SummarizeDocument)
            .unwrap();
        assert!(prompt.contains("abcdefghij"));
        assert!(!prompt.contains("KLMNOP"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("ไทยภาษา", 3), "ไทย");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn deterministic_output() {
        let ctx = resolve("malay-traditional").unwrap();
        let builder = PromptBuilder::default();
        let a = builder.build(NEUTRAL, ctx, Language::Ms, PromptMode::AdaptMessage).unwrap();
        let b = builder.build(NEUTRAL, ctx, Language::Ms, PromptMode::AdaptMessage).unwrap();
        assert_eq!(a, b);
    }
}
