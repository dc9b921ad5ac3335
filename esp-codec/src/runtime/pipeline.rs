//! Decode worker pool.
//!
//! The reader hands packets round-robin to `worker_count` tasks over bounded
//! channels. Each worker owns a [`WorkerCodecs`] and so its own peg lanes; a
//! stats task folds the lanes on a timer and publishes the totals. When the
//! input ends the channels close, every worker drops its codecs (folding its
//! last counts) and a final fold runs before the summary is built.

use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;
use tokio::{
    io::AsyncRead,
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, trace, warn};

use crate::{
    codec::manager::{CodecManager, CodecStats, DecodeTrace, WorkerCodecs},
    error::{CodecError, Result},
    events::EventSink,
    metrics::{self, registry},
    packet::Packet,
    runtime::conf::Conf,
    source::{HexPacket, HexPacketReader},
};

/// Label used when no codec claimed the first protocol.
const UNDECODED: &str = "undecoded";

#[derive(Debug, Clone, Copy)]
pub struct PipelineConf {
    pub worker_count: usize,
    pub packet_channel_capacity: usize,
    pub stats_interval: Duration,
    pub start_protocol: u16,
}

impl From<&Conf> for PipelineConf {
    fn from(conf: &Conf) -> Self {
        Self {
            worker_count: conf.worker_count,
            packet_channel_capacity: conf.packet_channel_capacity,
            stats_interval: conf.stats_interval,
            start_protocol: conf.start_protocol,
        }
    }
}

/// What one worker saw.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Packets decoded.
    pub packets: u64,
    /// Packets refused before decoding (oversized).
    pub refused: u64,
    /// Classification of the first layer of every decoded packet.
    pub outcomes: BTreeMap<&'static str, u64>,
    /// Packets carrying each flag after decoding.
    pub flags: BTreeMap<&'static str, u64>,
}

impl Tally {
    fn record(&mut self, trace: &DecodeTrace, packet: &Packet<'_>) {
        self.packets += 1;
        let outcome = trace
            .layers
            .first()
            .map_or(UNDECODED, |layer| layer.outcome.as_str());
        *self.outcomes.entry(outcome).or_default() += 1;
        for flag in packet.flags().names() {
            *self.flags.entry(flag).or_default() += 1;
        }
    }

    fn merge(&mut self, other: Tally) {
        self.packets += other.packets;
        self.refused += other.refused;
        for (k, v) in other.outcomes {
            *self.outcomes.entry(k).or_default() += v;
        }
        for (k, v) in other.flags {
            *self.flags.entry(k).or_default() += v;
        }
    }
}

/// Result of a whole run, printed as one JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeSummary {
    #[serde(flatten)]
    pub tally: Tally,
    pub codecs: Vec<CodecStats>,
}

pub struct Pipeline {
    conf: PipelineConf,
    manager: Arc<CodecManager>,
    events: Arc<dyn EventSink>,
}

impl Pipeline {
    pub fn new(conf: PipelineConf, manager: Arc<CodecManager>, events: Arc<dyn EventSink>) -> Self {
        Self {
            conf,
            manager,
            events,
        }
    }

    /// Decodes everything `reader` yields and returns the run summary.
    ///
    /// A read error stops intake, but the packets already handed to workers
    /// are still decoded and folded before the error is returned.
    pub async fn run<R>(&self, mut reader: HexPacketReader<R>) -> Result<DecodeSummary>
    where
        R: AsyncRead + Unpin,
    {
        let worker_count = self.conf.worker_count.max(1);
        let mut senders = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let (tx, rx) = mpsc::channel(self.conf.packet_channel_capacity.max(1));
            senders.push(tx);
            workers.push(spawn_worker(
                id,
                rx,
                self.manager.instantiate(),
                self.conf.start_protocol,
                Arc::clone(&self.events),
            ));
        }

        let (stop_stats, stats_task) =
            spawn_stats_task(Arc::clone(&self.manager), self.conf.stats_interval);

        info!(
            event.name = "pipeline.started",
            pipeline.workers = worker_count,
            pipeline.channel_capacity = self.conf.packet_channel_capacity,
            "decode pipeline started"
        );

        let intake = feed(&mut reader, &senders).await;
        drop(senders);

        let joined = join_workers(workers).await;

        // the stats task may already be gone; the final fold below covers it
        let _ = stop_stats.send(());
        let _ = stats_task.await;
        self.manager.sum_all();
        publish_all(&self.manager);

        let tally = joined?;
        let fed = intake?;
        info!(
            event.name = "pipeline.finished",
            pipeline.packets_read = fed,
            pipeline.packets_decoded = tally.packets,
            "decode pipeline finished"
        );

        Ok(DecodeSummary {
            tally,
            codecs: self.manager.stats(),
        })
    }
}

/// Awaits every worker, even after one has failed, and merges their tallies.
/// The first failure is returned.
async fn join_workers(workers: Vec<JoinHandle<Tally>>) -> Result<Tally> {
    let mut tally = Tally::default();
    let mut failure = None;
    for (id, worker) in workers.into_iter().enumerate() {
        match worker.await {
            Ok(worker_tally) => tally.merge(worker_tally),
            Err(source) => {
                warn!(
                    event.name = "pipeline.worker.failed",
                    pipeline.worker = id,
                    error.message = %source,
                    "decode worker did not finish"
                );
                failure.get_or_insert(CodecError::Worker { worker: id, source });
            }
        }
    }
    match failure {
        Some(err) => Err(err),
        None => Ok(tally),
    }
}

/// Reads packets and deals them round-robin. Returns how many were handed on.
async fn feed<R>(reader: &mut HexPacketReader<R>, senders: &[mpsc::Sender<HexPacket>]) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut fed = 0u64;
    let mut next = 0usize;
    while let Some(packet) = reader.next_packet().await? {
        registry::PACKETS_TOTAL.inc();
        registry::BYTES_TOTAL.inc_by(packet.bytes.len() as u64);

        let line = packet.line;
        match senders[next].send(packet).await {
            Ok(()) => {
                registry::CHANNEL_SENDS_TOTAL
                    .with_label_values(&["success"])
                    .inc();
                fed += 1;
            }
            Err(_) => {
                registry::CHANNEL_SENDS_TOTAL
                    .with_label_values(&["error"])
                    .inc();
                warn!(
                    event.name = "pipeline.send_failed",
                    pipeline.worker = next,
                    input.line = line,
                    "decode worker is gone, packet dropped"
                );
            }
        }
        next = (next + 1) % senders.len();
    }
    Ok(fed)
}

fn spawn_worker(
    id: usize,
    mut rx: mpsc::Receiver<HexPacket>,
    codecs: WorkerCodecs,
    start_protocol: u16,
    events: Arc<dyn EventSink>,
) -> JoinHandle<Tally> {
    tokio::spawn(async move {
        debug!(event.name = "pipeline.worker.started", pipeline.worker = id);
        let mut tally = Tally::default();

        while let Some(input) = rx.recv().await {
            decode_one(&codecs, &input, start_protocol, &*events, &mut tally);
        }

        drop(codecs);
        debug!(
            event.name = "pipeline.worker.stopped",
            pipeline.worker = id,
            pipeline.packets = tally.packets
        );
        tally
    })
}

fn decode_one(
    codecs: &WorkerCodecs,
    input: &HexPacket,
    start_protocol: u16,
    events: &dyn EventSink,
    tally: &mut Tally,
) {
    let mut packet = match Packet::new(&input.bytes) {
        Ok(packet) => packet,
        Err(e) => {
            warn!(
                event.name = "pipeline.packet.refused",
                input.line = input.line,
                error.message = %e,
                "packet refused"
            );
            tally.refused += 1;
            return;
        }
    };

    let started = Instant::now();
    let trace = codecs.decode_packet(&mut packet, start_protocol, events);
    registry::DECODE_LATENCY_SECONDS.observe(started.elapsed().as_secs_f64());

    trace!(
        event.name = "pipeline.packet.decoded",
        input.line = input.line,
        packet.len = input.bytes.len(),
        packet.layers = trace.layers.len(),
        packet.dsize = packet.dsize(),
        packet.flags = packet.flags().bits(),
        "packet decoded"
    );
    tally.record(&trace, &packet);
}

fn publish_all(manager: &CodecManager) {
    for api in manager.apis() {
        metrics::publish_pegs(&**api);
    }
}

fn spawn_stats_task(
    manager: Arc<CodecManager>,
    every: Duration,
) -> (oneshot::Sender<()>, JoinHandle<()>) {
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    manager.sum_all();
                    publish_all(&manager);
                    trace!(event.name = "pipeline.stats.folded", "peg lanes folded");
                }
                _ = &mut stop_rx => break,
            }
        }
    });
    (stop_tx, handle)
}
