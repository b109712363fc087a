//! Per-coder trace sinks.
//!
//! A coder reports what it does through an optional [`TraceSink`] supplied at
//! construction. Nothing is global: two coders can trace to different sinks,
//! and a coder without a sink pays only for an `Option` check.
//!
//! ```rust
//! use arith_stream::bitstream::BitWriter;
//! use arith_stream::trace::TraceEvent;
//! use arith_stream::{CoderOptions, Encoder};
//!
//! let mut events: Vec<TraceEvent> = Vec::new();
//! let mut out = BitWriter::new(Vec::new());
//! {
//!     let mut enc = Encoder::new(&mut out, 1, &CoderOptions::default())
//!         .unwrap()
//!         .with_trace(&mut events);
//!     enc.start().unwrap();
//!     enc.encode_regular(0, true).unwrap();
//!     enc.terminate().unwrap();
//! }
//! assert_eq!(events.len(), 3);
//! ```

use std::fmt;

/// Which side of the coder produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Encoder,
    Decoder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoder => write!(f, "encoder"),
            Self::Decoder => write!(f, "decoder"),
        }
    }
}

/// Something a coder did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Start {
        role: Role,
    },
    Regular {
        role: Role,
        context: usize,
        bit: bool,
    },
    Bypass {
        role: Role,
        bit: bool,
    },
    /// A context hit its ceiling and was halved.
    Rescale {
        role: Role,
        context: usize,
        one_freq: u32,
        total_freq: u32,
    },
    Terminate {
        role: Role,
        symbols: u64,
        bits: u64,
    },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start { role } => write!(f, "{} start", role),
            Self::Regular { role, context, bit } => {
                write!(f, "{} regular ctx={} bit={}", role, context, u8::from(*bit))
            }
            Self::Bypass { role, bit } => write!(f, "{} bypass bit={}", role, u8::from(*bit)),
            Self::Rescale {
                role,
                context,
                one_freq,
                total_freq,
            } => write!(
                f,
                "{} rescale ctx={} one={}/{}",
                role, context, one_freq, total_freq
            ),
            Self::Terminate {
                role,
                symbols,
                bits,
            } => write!(f, "{} terminate symbols={} bits={}", role, symbols, bits),
        }
    }
}

/// Receiver for coder events.
pub trait TraceSink {
    fn record(&mut self, event: &TraceEvent);
}

/// Collects events in memory.
impl TraceSink for Vec<TraceEvent> {
    fn record(&mut self, event: &TraceEvent) {
        self.push(event.clone());
    }
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    fn record(&mut self, event: &TraceEvent) {
        (**self).record(event);
    }
}

impl<S: TraceSink + ?Sized> TraceSink for Box<S> {
    fn record(&mut self, event: &TraceEvent) {
        (**self).record(event);
    }
}

/// Forwards events to the `tracing` crate.
///
/// Per-symbol events go out at `TRACE`, block boundaries and rescales at
/// `DEBUG`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&mut self, event: &TraceEvent) {
        match event {
            TraceEvent::Regular { .. } | TraceEvent::Bypass { .. } => {
                tracing::trace!(target: "arith_stream", "{}", event);
            }
            TraceEvent::Start { .. } | TraceEvent::Rescale { .. } | TraceEvent::Terminate { .. } => {
                tracing::debug!(target: "arith_stream", "{}", event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = TraceEvent::Regular {
            role: Role::Decoder,
            context: 2,
            bit: true,
        };
        assert_eq!(event.to_string(), "decoder regular ctx=2 bit=1");

        let event = TraceEvent::Terminate {
            role: Role::Encoder,
            symbols: 16,
            bits: 40,
        };
        assert_eq!(event.to_string(), "encoder terminate symbols=16 bits=40");
    }

    #[test]
    fn test_forwarding_sinks() {
        let mut events: Vec<TraceEvent> = Vec::new();
        {
            let mut sink: Box<dyn TraceSink + '_> = Box::new(&mut events);
            sink.record(&TraceEvent::Start { role: Role::Encoder });
        }
        assert_eq!(events, vec![TraceEvent::Start { role: Role::Encoder }]);

        // Without a subscriber installed this is a no-op
        TracingSink.record(&TraceEvent::Bypass {
            role: Role::Encoder,
            bit: false,
        });
    }
}
