use std::ops::AddAssign;

use serde::{Serialize, Deserialize};

/// Token accounting reported by a completion service. Zero when the service
/// does not report usage.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Build from the wider counters some services report, clamping at `u32::MAX`.
    pub fn from_counts(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self::new(clamp(prompt_tokens), clamp(completion_tokens))
    }
}

fn clamp(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(rhs.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(rhs.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(rhs.total_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_calls() {
        let mut total = TokenUsage::default();
        total += TokenUsage::new(10, 5);
        total += TokenUsage::new(3, 2);
        assert_eq!(total, TokenUsage { prompt_tokens: 13, completion_tokens: 7, total_tokens: 20 });
    }

    #[test]
    fn huge_counts_saturate() {
        let usage = TokenUsage::new(u32::MAX, 1);
        assert_eq!(usage.total_tokens, u32::MAX);

        let mut total = usage;
        total += TokenUsage::new(5, 5);
        assert_eq!(total.prompt_tokens, u32::MAX);
        assert_eq!(total.total_tokens, u32::MAX);

        let wide = TokenUsage::from_counts(u64::MAX, 7);
        assert_eq!(wide.prompt_tokens, u32::MAX);
        assert_eq!(wide.completion_tokens, 7);
    }
}
