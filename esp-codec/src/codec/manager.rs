//! Codec ownership table and the per-worker dispatch loop.

use std::{
    collections::{BTreeMap, HashMap, hash_map::Entry},
    sync::Arc,
};

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    codec::{
        Codec, CodecApi, DecodeContext, DecodeOutcome, ProtocolRegistry, esp::EspCodecApi,
        terminal::TerminalCodecApi,
    },
    error::{CodecError, Result},
    events::EventSink,
    metrics::registry,
    packet::Packet,
    runtime::conf::DecodersConf,
};

/// The set of codec descriptors, resolved once at startup.
///
/// Maps every claimed protocol id to exactly one descriptor. Immutable after
/// construction and shared by all workers.
pub struct CodecManager {
    apis: Vec<Arc<dyn CodecApi>>,
    by_protocol: HashMap<u16, usize>,
    max_layers: usize,
}

impl CodecManager {
    /// Builds the table, refusing two descriptors that claim the same id.
    pub fn new(apis: Vec<Arc<dyn CodecApi>>, max_layers: usize) -> Result<Self> {
        let mut by_protocol: HashMap<u16, usize> = HashMap::new();
        for (idx, api) in apis.iter().enumerate() {
            for &protocol in api.protocol_ids() {
                match by_protocol.entry(protocol) {
                    Entry::Occupied(owner) => {
                        return Err(CodecError::DuplicateProtocol {
                            protocol,
                            existing: apis[*owner.get()].name(),
                            duplicate: api.name(),
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(idx);
                    }
                }
            }
        }

        info!(
            event.name = "codec.manager.ready",
            codec.count = apis.len(),
            codec.protocol_count = by_protocol.len(),
            decode.max_layers = max_layers,
            "codec table built"
        );

        Ok(Self {
            apis,
            by_protocol,
            max_layers,
        })
    }

    /// The ESP decoder plus the terminal codec, configured from `conf`.
    pub fn from_conf(conf: &DecodersConf, max_layers: usize) -> Result<Self> {
        let apis: Vec<Arc<dyn CodecApi>> = vec![
            Arc::new(EspCodecApi::new(&conf.esp)),
            Arc::new(TerminalCodecApi::new(&conf.terminal)),
        ];
        Self::new(apis, max_layers)
    }

    pub fn apis(&self) -> &[Arc<dyn CodecApi>] {
        &self.apis
    }

    /// Descriptor that owns `protocol`.
    pub fn codec_for(&self, protocol: u16) -> Option<&Arc<dyn CodecApi>> {
        self.by_protocol.get(&protocol).map(|&idx| &self.apis[idx])
    }

    /// Folds every descriptor's live lanes into its totals.
    pub fn sum_all(&self) {
        for api in &self.apis {
            api.sum();
        }
    }

    /// Folded peg totals of every descriptor, in registration order.
    pub fn stats(&self) -> Vec<CodecStats> {
        self.apis
            .iter()
            .map(|api| CodecStats {
                codec: api.name(),
                pegs: api.stats().into_iter().collect(),
            })
            .collect()
    }

    /// Instantiates one codec per descriptor for a worker.
    pub fn instantiate(self: &Arc<Self>) -> WorkerCodecs {
        WorkerCodecs {
            manager: Arc::clone(self),
            codecs: self.apis.iter().map(|api| api.ctor()).collect(),
        }
    }
}

impl ProtocolRegistry for CodecManager {
    fn has_decoder(&self, protocol: u16) -> bool {
        self.by_protocol.contains_key(&protocol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodecStats {
    pub codec: &'static str,
    pub pegs: BTreeMap<&'static str, u64>,
}

/// One decoded layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRecord {
    pub protocol: u16,
    pub codec: &'static str,
    pub outcome: DecodeOutcome,
}

/// Why the dispatch loop stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// The last codec reported no further decodable layer.
    #[default]
    Finished,
    /// No codec claims the protocol that came next.
    NoCodec { protocol: u16 },
    /// `max_layers` layers were decoded and another one was announced.
    DepthLimit,
}

/// The layers one packet went through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeTrace {
    pub layers: Vec<LayerRecord>,
    pub stop: StopReason,
}

impl DecodeTrace {
    pub fn last_outcome(&self) -> Option<DecodeOutcome> {
        self.layers.last().map(|layer| layer.outcome)
    }

    /// Outcome of the first layer the given codec decoded.
    pub fn outcome_of(&self, codec: &str) -> Option<DecodeOutcome> {
        self.layers
            .iter()
            .find(|layer| layer.codec == codec)
            .map(|layer| layer.outcome)
    }
}

/// A worker's own codec instances, one per descriptor.
///
/// Dropping it hands every instance back to its descriptor's `dtor`, which
/// folds the instance's last counts.
pub struct WorkerCodecs {
    manager: Arc<CodecManager>,
    codecs: Vec<Box<dyn Codec>>,
}

impl WorkerCodecs {
    /// Decodes `packet` layer by layer, starting at its current payload view
    /// with `first_protocol`.
    ///
    /// Each layer after the first starts where the previous codec left the
    /// payload view.
    pub fn decode_packet<'a>(
        &self,
        packet: &mut Packet<'a>,
        first_protocol: u16,
        events: &dyn EventSink,
    ) -> DecodeTrace {
        let ctx = DecodeContext {
            registry: &*self.manager,
            events,
        };
        let mut trace = DecodeTrace::default();
        let mut protocol = first_protocol;
        let mut raw = packet.data();

        loop {
            if trace.layers.len() >= self.manager.max_layers {
                trace.stop = StopReason::DepthLimit;
                debug!(
                    event.name = "codec.dispatch.depth_limit",
                    decode.max_layers = self.manager.max_layers,
                    net.protocol = protocol,
                    "layer limit reached"
                );
                break;
            }
            let Some(&idx) = self.manager.by_protocol.get(&protocol) else {
                trace.stop = StopReason::NoCodec { protocol };
                break;
            };

            let codec = &self.codecs[idx];
            let outcome = codec.decode(raw, packet, &ctx);
            registry::LAYERS_TOTAL
                .with_label_values(&[codec.name(), outcome.as_str()])
                .inc();
            trace.layers.push(LayerRecord {
                protocol,
                codec: codec.name(),
                outcome,
            });

            match outcome {
                DecodeOutcome::Decodable { next, .. } => {
                    protocol = next;
                    raw = packet.data();
                }
                _ => break,
            }
        }

        trace
    }
}

impl Drop for WorkerCodecs {
    fn drop(&mut self) {
        for (api, codec) in self.manager.apis.iter().zip(self.codecs.drain(..)) {
            api.dtor(codec);
        }
    }
}
