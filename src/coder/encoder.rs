//! Block encoder.

use std::io::Write;

use super::mcoder::{MContext, MEncoder};
use super::range_coder::RangeEncoder;
use super::{check_context, BlockState, CoderError, CoderKind, CoderOptions, Result};
use crate::bitstream::{BitStreamError, BitWriter};
use crate::model::{ContextStats, FrequencyContext, ProbabilityModel};
use crate::trace::{Role, TraceEvent, TraceSink};

enum Engine {
    Adaptive {
        coder: RangeEncoder,
        model: ProbabilityModel,
    },
    MCoder(MEncoder),
}

/// Arithmetic encoder for one block.
///
/// Borrows the output stream for the length of the block. Create a fresh
/// encoder on the same stream for each block.
pub struct Encoder<'a, W: Write> {
    out: &'a mut BitWriter<W>,
    engine: Engine,
    state: BlockState,
    symbols: u64,
    bypass: ContextStats,
    /// Stream position at `start()`
    start_bits: u64,
    trace: Option<Box<dyn TraceSink + 'a>>,
}

impl<'a, W: Write> Encoder<'a, W> {
    /// Create an encoder with `num_contexts` equiprobable contexts.
    pub fn new(
        out: &'a mut BitWriter<W>,
        num_contexts: usize,
        options: &CoderOptions,
    ) -> Result<Self> {
        let engine = match options.kind {
            CoderKind::Adaptive => Engine::Adaptive {
                coder: RangeEncoder::new(),
                model: ProbabilityModel::new(num_contexts, options.max_freq, options.adaptive)?,
            },
            CoderKind::MCoder => Engine::MCoder(MEncoder::new(num_contexts)),
        };
        Ok(Self {
            out,
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

    /// Symbols coded in this block, regular and bypass.
    pub fn symbol_count(&self) -> u64 {
        self.symbols
    }

    /// Bits produced by this block so far, including bits still held back
    /// for carry resolution.
    pub fn bit_count(&self) -> u64 {
        let written = self.out.bits_written().saturating_sub(self.start_bits);
        let held = match &self.engine {
            Engine::Adaptive { coder, .. } if self.state == BlockState::Started => {
                coder.held_bytes() * 8
            }
            _ => 0,
        };
        written + held
    }

    /// Bypass symbols coded in this block.
    pub fn bypass_stats(&self) -> ContextStats {
        self.bypass
    }

    /// Regular symbol statistics per context (adaptive engine).
    pub fn context_stats(&self) -> Result<&[ContextStats]> {
        match &self.engine {
            Engine::Adaptive { model, .. } => Ok(model.stats()),
            Engine::MCoder(_) => Err(CoderError::Unsupported("context statistics")),
        }
    }

    /// Current estimate of context `id` (adaptive engine).
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

    /// Current state of context `id` (M-coder engine).
    pub fn mcoder_context(&self, id: usize) -> Result<MContext> {
        match &self.engine {
            Engine::MCoder(coder) => {
                check_context(id, coder.contexts().len())?;
                Ok(coder.contexts()[id])
            }
            Engine::Adaptive { .. } => Err(CoderError::Unsupported("M-coder context state")),
        }
    }

    /// Replace the estimate of context `id` (adaptive engine).
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

    /// Return every context to its initial state.
    pub fn reset_contexts(&mut self) -> Result<()> {
        self.state.ensure_open()?;
        match &mut self.engine {
            Engine::Adaptive { model, .. } => model.reset(),
            Engine::MCoder(coder) => coder.reset_contexts(),
        }
        Ok(())
    }

    /// Open the block with the full coding interval.
    pub fn start(&mut self) -> Result<()> {
        self.state.ensure_unstarted()?;
        self.check_stream()?;
        match &mut self.engine {
            Engine::Adaptive { coder, .. } => *coder = RangeEncoder::new(),
            Engine::MCoder(coder) => coder.start(),
        }
        self.start_bits = self.out.bits_written();
        self.symbols = 0;
        self.state = BlockState::Started;
        self.emit(TraceEvent::Start {
            role: Role::Encoder,
        });
        Ok(())
    }

    /// Encode `bit` with the estimate of context `id`, then update it.
    pub fn encode_regular(&mut self, id: usize, bit: bool) -> Result<()> {
        self.state.ensure_started()?;
        check_context(id, self.num_contexts())?;
        self.check_stream()?;
        let coded = match &mut self.engine {
            Engine::Adaptive { coder, model } => {
                let context = model.context(id).copied().ok_or(CoderError::UnknownContext {
                    id,
                    contexts: model.len(),
                })?;
                coder
                    .encode_freq(context.zero_freq(), context.total_freq(), bit, self.out)
                    .map(|()| {
                        if model.update(id, bit) == Some(true) {
                            model.context(id).copied()
                        } else {
                            None
                        }
                    })
            }
            Engine::MCoder(coder) => coder.encode_regular(id, bit, self.out).map(|()| None),
        };
        let rescaled = self.abandon_on_error(coded)?;
        self.symbols += 1;
        self.emit(TraceEvent::Regular {
            role: Role::Encoder,
            context: id,
            bit,
        });
        if let Some(context) = rescaled {
            self.emit(TraceEvent::Rescale {
                role: Role::Encoder,
                context: id,
                one_freq: context.one_freq(),
                total_freq: context.total_freq(),
            });
        }
        Ok(())
    }

    /// Encode `bit` as an equiprobable symbol.
    pub fn encode_bypass(&mut self, bit: bool) -> Result<()> {
        self.state.ensure_started()?;
        self.check_stream()?;
        let coded = match &mut self.engine {
            Engine::Adaptive { coder, .. } => coder.encode_half(bit, self.out),
            Engine::MCoder(coder) => coder.encode_bypass(bit, self.out),
        };
        self.abandon_on_error(coded)?;
        self.symbols += 1;
        self.bypass.symbols += 1;
        if bit {
            self.bypass.ones += 1;
        }
        self.emit(TraceEvent::Bypass {
            role: Role::Encoder,
            bit,
        });
        Ok(())
    }

    /// Flush the interval so the block decodes unambiguously, and close it.
    ///
    /// The block is closed even if the flush fails.
    pub fn terminate(&mut self) -> Result<()> {
        self.state.ensure_started()?;
        self.state = BlockState::Terminated;
        match &mut self.engine {
            Engine::Adaptive { coder, .. } => coder.flush(self.out)?,
            Engine::MCoder(coder) => coder.terminate(self.out)?,
        }
        let bits = self.bit_count();
        self.emit(TraceEvent::Terminate {
            role: Role::Encoder,
            symbols: self.symbols,
            bits,
        });
        Ok(())
    }

    /// Refuse to code on a faulted stream, closing the block.
    fn check_stream(&mut self) -> Result<()> {
        match self.out.fault() {
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

impl<W: Write> std::fmt::Debug for Encoder<'_, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("kind", &self.kind())
            .field("state", &self.state)
            .field("symbols", &self.symbols)
            .field("bits", &self.bit_count())
            .finish_non_exhaustive()
    }
}
