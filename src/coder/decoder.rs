//! Block decoder.

use std::io::Read;

use super::mcoder::{MContext, MDecoder};
use super::range_coder::RangeDecoder;
use super::{check_context, BlockState, CoderError, CoderKind, CoderOptions, Result};
use crate::bitstream::{BitReader, BitStreamError};
use crate::model::{ContextStats, FrequencyContext, ProbabilityModel};
use crate::trace::{Role, TraceEvent, TraceSink};

enum Engine {
    Adaptive {
        coder: RangeDecoder,
        model: ProbabilityModel,
    },
    MCoder(MDecoder),
}

/// Arithmetic decoder for one block.
///
/// Must be built with the same context count and options as the encoder
/// that produced the block, and fed the same sequence of regular and bypass
/// calls.
pub struct Decoder<'a, R: Read> {
    input: &'a mut BitReader<R>,
    engine: Engine,
    state: BlockState,
    symbols: u64,
    bypass: ContextStats,
    start_bits: u64,
    trace: Option<Box<dyn TraceSink + 'a>>,
}

impl<'a, R: Read> Decoder<'a, R> {
    pub fn new(
        input: &'a mut BitReader<R>,
        num_contexts: usize,
        options: &CoderOptions,
    ) -> Result<Self> {
        let engine = match options.kind {
            CoderKind::Adaptive => Engine::Adaptive {
                coder: RangeDecoder::new(),
                model: ProbabilityModel::new(num_contexts, options.max_freq, options.adaptive)?,
            },
            CoderKind::MCoder => Engine::MCoder(MDecoder::new(num_contexts)),
        };
        Ok(Self {
            input,
            engine,
            state: BlockState::Unstarted,
            symbols: 0,
            bypass: ContextStats::default(),
            start_bits: 0,
            trace: None,
        })
    }

    /// Attach a trace sink.
    pub fn with_trace(mut self, sink: impl TraceSink + 'a) -> Self {
        self.trace = Some(Box::new(sink));
        self
    }

    pub fn kind(&self) -> CoderKind {
        match self.engine {
            Engine::Adaptive { .. } => CoderKind::Adaptive,
            Engine::MCoder(_) => CoderKind::MCoder,
        }
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn num_contexts(&self) -> usize {
        match &self.engine {
            Engine::Adaptive { model, .. } => model.len(),
            Engine::MCoder(coder) => coder.contexts().len(),
        }
    }

    pub fn symbol_count(&self) -> u64 {
        self.symbols
    }

    /// Bits consumed by this block so far.
    pub fn bit_count(&self) -> u64 {
        self.input.bits_read().saturating_sub(self.start_bits)
    }

    pub fn bypass_stats(&self) -> ContextStats {
        self.bypass
    }

    pub fn context_stats(&self) -> Result<&[ContextStats]> {
        match &self.engine {
            Engine::Adaptive { model, .. } => Ok(model.stats()),
            Engine::MCoder(_) => Err(CoderError::Unsupported("context statistics")),
        }
    }

    pub fn context_state(&self, id: usize) -> Result<FrequencyContext> {
        match &self.engine {
            Engine::Adaptive { model, .. } => model
                .context(id)
                .copied()
                .ok_or(CoderError::UnknownContext {
                    id,
                    contexts: model.len(),
                }),
            Engine::MCoder(_) => Err(CoderError::Unsupported("frequency context state")),
        }
    }

    pub fn mcoder_context(&self, id: usize) -> Result<MContext> {
        match &self.engine {
            Engine::MCoder(coder) => {
                check_context(id, coder.contexts().len())?;
                Ok(coder.contexts()[id])
            }
            Engine::Adaptive { .. } => Err(CoderError::Unsupported("M-coder context state")),
        }
    }

    pub fn set_context_state(&mut self, id: usize, context: FrequencyContext) -> Result<()> {
        self.state.ensure_open()?;
        match &mut self.engine {
            Engine::Adaptive { model, .. } => {
                check_context(id, model.len())?;
                model.set_context(id, context);
                Ok(())
            }
            Engine::MCoder(_) => Err(CoderError::Unsupported("frequency context state")),
        }
    }

    pub fn reset_contexts(&mut self) -> Result<()> {
        self.state.ensure_open()?;
        match &mut self.engine {
            Engine::Adaptive { model, .. } => model.reset(),
            Engine::MCoder(coder) => coder.reset_contexts(),
        }
        Ok(())
    }

    /// Read the initial code value of the block.
    ///
    /// A failed start leaves the decoder terminated.
    pub fn start(&mut self) -> Result<()> {
        self.state.ensure_unstarted()?;
        self.check_stream()?;
        self.start_bits = self.input.bits_read();
        let primed = match &mut self.engine {
            Engine::Adaptive { coder, .. } => coder.start(self.input),
            Engine::MCoder(coder) => coder.start(self.input),
        };
        self.abandon_on_error(primed)?;
        self.symbols = 0;
        self.state = BlockState::Started;
        self.emit(TraceEvent::Start {
            role: Role::Decoder,
        });
        Ok(())
    }

    /// Decode one symbol with the estimate of context `id`, then update it.
    pub fn decode_regular(&mut self, id: usize) -> Result<bool> {
        self.state.ensure_started()?;
        check_context(id, self.num_contexts())?;
        self.check_stream()?;
        let decoded = match &mut self.engine {
            Engine::Adaptive { coder, model } => {
                let context = model.context(id).copied().ok_or(CoderError::UnknownContext {
                    id,
                    contexts: model.len(),
                })?;
                coder
                    .decode_freq(context.zero_freq(), context.total_freq(), self.input)
                    .map(|bit| {
                        let rescaled = if model.update(id, bit) == Some(true) {
                            model.context(id).copied()
                        } else {
                            None
                        };
                        (bit, rescaled)
                    })
            }
            Engine::MCoder(coder) => coder.decode_regular(id, self.input).map(|bit| (bit, None)),
        };
        let (bit, rescaled) = self.abandon_on_error(decoded)?;
        self.symbols += 1;
        self.emit(TraceEvent::Regular {
            role: Role::Decoder,
            context: id,
            bit,
        });
        if let Some(context) = rescaled {
            self.emit(TraceEvent::Rescale {
                role: Role::Decoder,
                context: id,
                one_freq: context.one_freq(),
                total_freq: context.total_freq(),
            });
        }
        Ok(bit)
    }

    /// Decode one equiprobable symbol.
    pub fn decode_bypass(&mut self) -> Result<bool> {
        self.state.ensure_started()?;
        self.check_stream()?;
        let decoded = match &mut self.engine {
            Engine::Adaptive { coder, .. } => coder.decode_half(self.input),
            Engine::MCoder(coder) => coder.decode_bypass(self.input),
        };
        let bit = self.abandon_on_error(decoded)?;
        self.symbols += 1;
        self.bypass.symbols += 1;
        if bit {
            self.bypass.ones += 1;
        }
        self.emit(TraceEvent::Bypass {
            role: Role::Decoder,
            bit,
        });
        Ok(bit)
    }

    /// Close the block and check that it ended cleanly.
    ///
    /// The reader is left at the first bit after the block. The block is
    /// closed even when the check fails.
    pub fn terminate(&mut self) -> Result<()> {
        self.state.ensure_started()?;
        self.state = BlockState::Terminated;
        match &mut self.engine {
            Engine::Adaptive { coder, .. } => coder.finish()?,
            Engine::MCoder(coder) => coder.terminate()?,
        }
        let bits = self.bit_count();
        self.emit(TraceEvent::Terminate {
            role: Role::Decoder,
            symbols: self.symbols,
            bits,
        });
        Ok(())
    }

    /// Refuse to decode from a faulted stream, closing the block.
    fn check_stream(&mut self) -> Result<()> {
        match self.input.fault() {
            Some(fault) => {
                self.state = BlockState::Terminated;
                Err(CoderError::Stream(BitStreamError::from(fault)))
            }
            None => Ok(()),
        }
    }

    /// Close the block if an engine call failed.
    fn abandon_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = BlockState::Terminated;
        }
        result
    }

    fn emit(&mut self, event: TraceEvent) {
        if let Some(sink) = self.trace.as_mut() {
            sink.record(&event);
        }
    }
}

impl<R: Read> std::fmt::Debug for Decoder<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("kind", &self.kind())
            .field("state", &self.state)
            .field("symbols", &self.symbols)
            .field("bits", &self.bit_count())
            .finish_non_exhaustive()
    }
}
