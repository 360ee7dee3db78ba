//! Per-model output-token ceilings.
//!
//! Lookups try an exact model match first, then the longest known name that
//! the model extends with a `-` suffix (dated snapshots such as
//! `gpt-4o-2024-08-06`), then the table's default.

/// A model-name keyed table of output-token ceilings.
#[derive(Debug, Clone, Copy)]
pub struct TokenLimits {
    entries: &'static [(&'static str, u64)],
    default: u64,
}

pub const OPENAI_LIMITS: TokenLimits = TokenLimits {
    entries: &[
        ("gpt-4o", 16_384),
        ("gpt-4o-mini", 16_384),
        ("gpt-4-turbo", 4_096),
        ("gpt-4", 8_192),
        ("gpt-3.5-turbo", 4_096),
        ("gpt-5.1", 100_000),
        ("gpt-5.1-codex", 100_000),
        ("o1", 100_000),
        ("o1-mini", 65_536),
        ("o1-preview", 32_768),
        ("o3", 100_000),
        ("o3-mini", 100_000),
        ("o4-mini", 100_000),
    ],
    default: 16_384,
};

pub const GEMINI_LIMITS: TokenLimits = TokenLimits {
    entries: &[
        ("gemini-2.0-flash", 8_192),
        ("gemini-2.0-flash-lite", 8_192),
        ("gemini-1.5-pro", 8_192),
        ("gemini-1.5-flash", 8_192),
        ("gemini-2.5-pro", 65_536),
        ("gemini-2.5-flash", 65_536),
    ],
    default: 8_192,
};

/// `OpenAI` model families that reject responses cut short by a client cap;
/// requests to them carry no output-token limit at all.
pub const UNCAPPED_OPENAI_FAMILIES: &[&str] = &["o1", "o3", "o4", "gpt-5"];

impl TokenLimits {
    #[must_use]
    pub fn limit_for(&self, model: &str) -> u64 {
        if let Some((_, limit)) = self.entries.iter().find(|(name, _)| *name == model) {
            return *limit;
        }
        self.entries
            .iter()
            .filter(|(name, _)| {
                model
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('-'))
            })
            .max_by_key(|(name, _)| name.len())
            .map_or(self.default, |(_, limit)| *limit)
    }

    /// The requested cap bounded by the model's ceiling; `None` when the
    /// client asked for no cap (absent or zero).
    #[must_use]
    pub fn clamp(&self, model: &str, requested: Option<u64>) -> Option<u64> {
        requested
            .filter(|&n| n > 0)
            .map(|n| n.min(self.limit_for(model)))
    }
}

#[must_use]
pub fn omits_output_cap(model: &str) -> bool {
    UNCAPPED_OPENAI_FAMILIES
        .iter()
        .any(|family| model.starts_with(family))
}
