// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use verk_model::Usage;

/// Enforces the per-task usage budget: a hard cap on model requests and an
/// optional cap on total tokens.
#[derive(Debug, Clone)]
pub struct UsageMeter {
    max_requests: u32,
    max_total_tokens: Option<u64>,
    requests: u32,
    usage: Usage,
}

impl UsageMeter {
    pub fn new(max_requests: u32, max_total_tokens: Option<u64>) -> Self {
        Self { max_requests, max_total_tokens, requests: 0, usage: Usage::default() }
    }

    pub fn record_request(&mut self) {
        self.requests += 1;
    }

    pub fn record_usage(&mut self, usage: Usage) {
        self.usage.add(usage);
    }

    /// True when another model request would exceed the request cap.
    pub fn requests_exhausted(&self) -> bool {
        self.requests >= self.max_requests
    }

    /// True when accumulated tokens exceed the configured cap.
    pub fn tokens_exhausted(&self) -> bool {
        self.max_total_tokens
            .map(|cap| self.usage.total() > cap)
            .unwrap_or(false)
    }

    pub fn requests(&self) -> u32 {
        self.requests
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_cap_is_exclusive() {
        let mut meter = UsageMeter::new(2, None);
        assert!(!meter.requests_exhausted());
        meter.record_request();
        assert!(!meter.requests_exhausted());
        meter.record_request();
        assert!(meter.requests_exhausted());
    }

    #[test]
    fn token_cap_counts_all_kinds() {
        let mut meter = UsageMeter::new(100, Some(30));
        meter.record_usage(Usage { input_tokens: 10, output_tokens: 10, reasoning_tokens: 5 });
        assert!(!meter.tokens_exhausted());
        meter.record_usage(Usage { input_tokens: 0, output_tokens: 0, reasoning_tokens: 6 });
        assert!(meter.tokens_exhausted());
    }

    #[test]
    fn no_token_cap_never_exhausts() {
        let mut meter = UsageMeter::new(100, None);
        meter.record_usage(Usage { input_tokens: u64::MAX / 2, ..Default::default() });
        assert!(!meter.tokens_exhausted());
    }
}
