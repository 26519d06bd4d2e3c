use std::str::FromStr;

use tiktoken_rs::CoreBPE;

use crate::error::{RagError, Result};

/// Which end of the text survives truncation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TruncationSide {
    /// Drop tokens from the end, keeping the earliest content.
    End,
    /// Drop tokens from the start, keeping the most recent content.
    Start,
}

impl FromStr for TruncationSide {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "end" | "right" => Ok(Self::End),
            "start" | "left" => Ok(Self::Start),
            other => Err(RagError::Config(format!("unknown truncation side `{other}`"))),
        }
    }
}

/// Subword tokenizer used to enforce context and prompt budgets.
///
/// Decoding a token prefix is lossy: a cut may land inside a multi-byte character,
/// so the kept span is shrunk until it decodes and re-encodes within budget.
pub struct TokenBudgeter {
    bpe: CoreBPE,
}

impl TokenBudgeter {
    pub fn new(encoding: &str) -> Result<Self> {
        let bpe = match encoding {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            other => {
                return Err(RagError::Config(format!("unknown tokenizer `{other}`")));
            }
        }
        .map_err(|e| RagError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    pub fn count_or_truncate(&self, text: &str, max_tokens: usize, side: TruncationSide) -> String {
        let tokens = self.bpe.encode_ordinary(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }

        let mut keep = max_tokens;
        while keep > 0 {
            let span = match side {
                TruncationSide::End => &tokens[..keep],
                TruncationSide::Start => &tokens[tokens.len() - keep..],
            };
            if let Ok(decoded) = self.bpe.decode(span.to_vec()) {
                if self.count(&decoded) <= max_tokens {
                    return decoded;
                }
            }
            keep -= 1;
        }
        String::new()
    }
}
