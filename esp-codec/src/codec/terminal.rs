//! Hand-off codec for protocols that are inspected past the decode stage.
//!
//! Claiming an id here is what makes it "decodable" to the registry: an ESP
//! layer whose next header names one of these protocols is trusted, and its
//! inner bytes are handed on unparsed.

use std::sync::Arc;

use crate::{
    codec::{Codec, CodecApi, DecodeContext, DecodeOutcome},
    packet::{ByteSpan, Packet},
    runtime::conf::TerminalConf,
    stats::{Peg, PegCounts, PegLanes},
};

pub const TERMINAL_CODEC_NAME: &str = "raw";

#[derive(Debug)]
pub struct TerminalCodec {
    pegs: Arc<PegCounts>,
}

impl Codec for TerminalCodec {
    fn name(&self) -> &'static str {
        TERMINAL_CODEC_NAME
    }

    fn pegs(&self) -> &Arc<PegCounts> {
        &self.pegs
    }

    fn decode<'a>(
        &self,
        raw: ByteSpan<'a>,
        packet: &mut Packet<'a>,
        _ctx: &DecodeContext<'_>,
    ) -> DecodeOutcome {
        self.pegs.inc(Peg::Processed);
        packet.set_data(raw);
        DecodeOutcome::Handoff { consumed: 0 }
    }
}

/// Descriptor for [`TerminalCodec`], claiming the configured protocol ids.
#[derive(Debug, Default)]
pub struct TerminalCodecApi {
    protocols: Vec<u16>,
    pegs: PegLanes,
}

impl TerminalCodecApi {
    pub fn new(conf: &TerminalConf) -> Self {
        let mut protocols: Vec<u16> = conf.protocols.iter().map(|&p| u16::from(p)).collect();
        protocols.sort_unstable();
        protocols.dedup();
        Self {
            protocols,
            pegs: PegLanes::default(),
        }
    }
}

impl CodecApi for TerminalCodecApi {
    fn name(&self) -> &'static str {
        TERMINAL_CODEC_NAME
    }

    fn protocol_ids(&self) -> &[u16] {
        &self.protocols
    }

    fn ctor(&self) -> Box<dyn Codec> {
        Box::new(TerminalCodec {
            pegs: self.pegs.register(),
        })
    }

    fn dtor(&self, codec: Box<dyn Codec>) {
        self.pegs.retire(codec.pegs());
    }

    fn sum(&self) {
        self.pegs.sum();
    }

    fn stats(&self) -> Vec<(&'static str, u64)> {
        self.pegs.totals().snapshot()
    }
}
