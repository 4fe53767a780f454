//! Token estimation for history budgeting.
//!
//! The pipeline operates on text, not raw tokens, so counts are estimated
//! from character length using model-appropriate ratios. Unknown models fall
//! back to a conservative generic ratio.

/// Tokenizer families with distinct characters-per-token ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerFamily {
    /// GPT-3.5/GPT-4 class BPE vocabularies.
    Cl100kBase,
    /// SentencePiece vocabularies (Llama, Mixtral, Gemma).
    SentencePiece,
    /// Generic fallback for unrecognized models.
    Heuristic,
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    family: TokenizerFamily,
    chars_per_token: f32,
}

impl Tokenizer {
    pub fn new(family: TokenizerFamily) -> Self {
        let cpt = match family {
            TokenizerFamily::Cl100kBase => 3.7,
            TokenizerFamily::SentencePiece => 3.3,
            TokenizerFamily::Heuristic => 3.5,
        };

        Self {
            family,
            chars_per_token: cpt,
        }
    }

    /// Resolve the tokenizer for a model identifier, falling back to the
    /// generic ratio when the model family is not recognized.
    pub fn for_model(model_name: &str) -> Self {
        let name = model_name.to_lowercase();

        let family = if name.starts_with("gpt-") || name.starts_with("o1") {
            TokenizerFamily::Cl100kBase
        } else if name.contains("llama") || name.contains("mixtral") || name.contains("gemma") {
            TokenizerFamily::SentencePiece
        } else {
            TokenizerFamily::Heuristic
        };

        Self::new(family)
    }

    pub fn family(&self) -> TokenizerFamily {
        self.family
    }

    /// Estimate how many characters fit in a given token budget.
    pub fn chars_for_tokens(&self, tokens: usize) -> usize {
        (tokens as f32 * self.chars_per_token) as usize
    }

    /// Estimate the number of tokens in a string.
    ///
    /// Char count, not byte count: byte count would overcount CJK/emoji text.
    pub fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let char_count = text.chars().count();
        let estimated = (char_count as f32 / self.chars_per_token).ceil() as usize;
        estimated.max(1)
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerFamily::Heuristic)
    }
}
