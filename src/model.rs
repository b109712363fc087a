//! Adaptive frequency model for binary symbols.
//!
//! Each context keeps a count of ones and a total count. The probability of a
//! one is `one_freq / total_freq`; both counts stay at least one apart from
//! zero so no symbol ever becomes impossible:
//!
//! ```text
//! 1 <= one_freq < total_freq <= max_freq
//! ```
//!
//! When `total_freq` reaches `max_freq` both symbol counts are halved,
//! rounding up. This bounds the precision the coder needs for the interval
//! split and lets old statistics decay.

use std::fmt;

/// Default rescale ceiling.
pub const DEFAULT_MAX_FREQ: u32 = 256;

/// Largest allowed rescale ceiling.
///
/// The coder keeps its range at or above `2^24` between symbols, so a total
/// of at most `2^16` leaves every split at least 256 units wide.
pub const MAX_FREQ_LIMIT: u32 = 1 << 16;

/// Smallest ceiling that still leaves room to adapt after a rescale.
pub const MIN_MAX_FREQ: u32 = 3;

/// Rejected context parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidContextState {
    pub one_freq: u32,
    pub total_freq: u32,
    pub max_freq: u32,
}

impl fmt::Display for InvalidContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid context state: one_freq={} total_freq={} max_freq={}",
            self.one_freq, self.total_freq, self.max_freq
        )
    }
}

impl std::error::Error for InvalidContextState {}

/// Probability estimate for one binary context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyContext {
    one_freq: u32,
    total_freq: u32,
    max_freq: u32,
    adaptive: bool,
}

impl FrequencyContext {
    /// Create a context with explicit counts.
    pub fn new(
        one_freq: u32,
        total_freq: u32,
        max_freq: u32,
        adaptive: bool,
    ) -> Result<Self, InvalidContextState> {
        let valid = (MIN_MAX_FREQ..=MAX_FREQ_LIMIT).contains(&max_freq)
            && one_freq >= 1
            && one_freq < total_freq
            && total_freq <= max_freq;
        if !valid {
            return Err(InvalidContextState {
                one_freq,
                total_freq,
                max_freq,
            });
        }
        Ok(Self {
            one_freq,
            total_freq,
            max_freq,
            adaptive,
        })
    }

    /// Create an adaptive context with equiprobable symbols.
    pub fn uniform(max_freq: u32) -> Result<Self, InvalidContextState> {
        Self::new(1, 2, max_freq, true)
    }

    #[inline]
    pub fn one_freq(&self) -> u32 {
        self.one_freq
    }

    #[inline]
    pub fn zero_freq(&self) -> u32 {
        self.total_freq - self.one_freq
    }

    #[inline]
    pub fn total_freq(&self) -> u32 {
        self.total_freq
    }

    #[inline]
    pub fn max_freq(&self) -> u32 {
        self.max_freq
    }

    #[inline]
    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    /// Account for one coded symbol. Returns `true` if the counts were rescaled.
    pub fn update(&mut self, symbol: bool) -> bool {
        if !self.adaptive {
            return false;
        }
        if symbol {
            self.one_freq += 1;
        }
        self.total_freq += 1;
        if self.total_freq >= self.max_freq {
            self.rescale();
            return true;
        }
        false
    }

    /// Halve both symbol counts, rounding up.
    fn rescale(&mut self) {
        let one = self.one_freq.div_ceil(2);
        let zero = self.zero_freq().div_ceil(2);
        self.one_freq = one;
        self.total_freq = one + zero;
    }
}

/// Per-context symbol statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Regular symbols coded that were ones
    pub ones: u64,
    /// Regular symbols coded in total
    pub symbols: u64,
}

/// Set of independent contexts addressed by small integer ids.
#[derive(Debug, Clone)]
pub struct ProbabilityModel {
    contexts: Vec<FrequencyContext>,
    initial: FrequencyContext,
    stats: Vec<ContextStats>,
}

impl ProbabilityModel {
    /// Create `num_contexts` equiprobable contexts.
    pub fn new(
        num_contexts: usize,
        max_freq: u32,
        adaptive: bool,
    ) -> Result<Self, InvalidContextState> {
        let initial = FrequencyContext::new(1, 2, max_freq, adaptive)?;
        Ok(Self {
            contexts: vec![initial; num_contexts],
            initial,
            stats: vec![ContextStats::default(); num_contexts],
        })
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn context(&self, id: usize) -> Option<&FrequencyContext> {
        self.contexts.get(id)
    }

    /// Replace a context's state. Returns `false` for an unknown id.
    pub fn set_context(&mut self, id: usize, context: FrequencyContext) -> bool {
        match self.contexts.get_mut(id) {
            Some(slot) => {
                *slot = context;
                true
            }
            None => false,
        }
    }

    /// Account for one regular symbol in context `id`.
    ///
    /// Returns `Some(rescaled)` or `None` for an unknown id.
    pub fn update(&mut self, id: usize, symbol: bool) -> Option<bool> {
        let context = self.contexts.get_mut(id)?;
        let stats = &mut self.stats[id];
        stats.symbols += 1;
        if symbol {
            stats.ones += 1;
        }
        Some(context.update(symbol))
    }

    pub fn stats(&self) -> &[ContextStats] {
        &self.stats
    }

    /// Restore every context to its initial state and clear statistics.
    pub fn reset(&mut self) {
        self.contexts.fill(self.initial);
        self.stats.fill(ContextStats::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(ctx: &FrequencyContext) {
        assert!(ctx.one_freq() >= 1, "{:?}", ctx);
        assert!(ctx.one_freq() < ctx.total_freq(), "{:?}", ctx);
        assert!(ctx.total_freq() <= ctx.max_freq(), "{:?}", ctx);
    }

    #[test]
    fn test_uniform_start() {
        let ctx = FrequencyContext::uniform(DEFAULT_MAX_FREQ).unwrap();
        assert_eq!(ctx.one_freq(), 1);
        assert_eq!(ctx.zero_freq(), 1);
        assert_eq!(ctx.total_freq(), 2);
    }

    #[test]
    fn test_rejects_invalid_states() {
        assert!(FrequencyContext::new(0, 2, 256, true).is_err());
        assert!(FrequencyContext::new(2, 2, 256, true).is_err());
        assert!(FrequencyContext::new(1, 300, 256, true).is_err());
        assert!(FrequencyContext::new(1, 2, 2, true).is_err());
        assert!(FrequencyContext::new(1, 2, MAX_FREQ_LIMIT + 1, true).is_err());
        assert!(FrequencyContext::new(3, 4, 4, false).is_ok());
    }

    #[test]
    fn test_update_counts() {
        let mut ctx = FrequencyContext::uniform(DEFAULT_MAX_FREQ).unwrap();
        ctx.update(true);
        ctx.update(true);
        ctx.update(false);
        assert_eq!(ctx.one_freq(), 3);
        assert_eq!(ctx.zero_freq(), 2);
        assert_eq!(ctx.total_freq(), 5);
    }

    #[test]
    fn test_rescale_at_ceiling() {
        let mut ctx = FrequencyContext::uniform(8).unwrap();
        let mut rescaled = false;
        for _ in 0..6 {
            rescaled = ctx.update(true);
            assert_invariant(&ctx);
        }
        // 1 + 6 ones, 1 zero: total hit 8 and halved to 4 + 1
        assert!(rescaled);
        assert_eq!(ctx.one_freq(), 4);
        assert_eq!(ctx.zero_freq(), 1);
        assert_eq!(ctx.total_freq(), 5);
    }

    #[test]
    fn test_rescale_never_zeroes_a_symbol() {
        let mut ctx = FrequencyContext::uniform(MIN_MAX_FREQ).unwrap();
        for i in 0..1000 {
            ctx.update(i % 7 != 0);
            assert_invariant(&ctx);
        }
        let mut ctx = FrequencyContext::uniform(MIN_MAX_FREQ).unwrap();
        for _ in 0..1000 {
            ctx.update(false);
            assert_invariant(&ctx);
        }
    }

    #[test]
    fn test_fixed_context_does_not_adapt() {
        let mut ctx = FrequencyContext::new(3, 4, 256, false).unwrap();
        for _ in 0..10 {
            assert!(!ctx.update(false));
        }
        assert_eq!(ctx.one_freq(), 3);
        assert_eq!(ctx.total_freq(), 4);
    }

    #[test]
    fn test_model_contexts_are_independent() {
        let mut model = ProbabilityModel::new(3, DEFAULT_MAX_FREQ, true).unwrap();
        model.update(0, true).unwrap();
        model.update(0, true).unwrap();
        model.update(2, false).unwrap();

        assert_eq!(model.context(0).unwrap().one_freq(), 3);
        assert_eq!(model.context(1).unwrap().total_freq(), 2);
        assert_eq!(model.context(2).unwrap().zero_freq(), 2);
        assert_eq!(model.stats()[0], ContextStats { ones: 2, symbols: 2 });
        assert_eq!(model.update(3, true), None);
    }

    #[test]
    fn test_model_reset() {
        let mut model = ProbabilityModel::new(2, 64, true).unwrap();
        let custom = FrequencyContext::new(5, 9, 64, true).unwrap();
        assert!(model.set_context(1, custom));
        assert!(!model.set_context(2, custom));
        model.update(0, true).unwrap();

        model.reset();
        assert_eq!(model.context(0).unwrap().one_freq(), 1);
        assert_eq!(model.context(1).unwrap().total_freq(), 2);
        assert_eq!(model.stats()[0], ContextStats::default());
    }
}
