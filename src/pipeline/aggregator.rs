//! # Packet Aggregator
//!
//! Sole consumer of the movement, aim and action channels and sole writer to
//! the transport, so packets never interleave on the wire.
//!
//! Two shapes are supported:
//!
//! - [`AggregationMode::Simple`]: whichever of movement or action arrives
//!   first becomes its own 4-byte packet.
//! - [`AggregationMode::Combined`]: an aim sample and a movement sample are
//!   joined, the action channel is peeked, and one 7-byte packet is sent.
//!
//! The combined join can starve. If one side never produces within the
//! receive timeout, no packet is built and the other side's buffered data
//! ages in its channel until capacity evicts new arrivals. [`JoinStrategy`]
//! decides what happens to a sample whose partner timed out.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use super::channel::ChannelReceiver;
use crate::error::{MotionPadError, Result};
use crate::packet::encoder::encode_packet;
use crate::packet::protocol::{ActionCode, AxisSample, OrientationSample, Packet, PacketShape};
use crate::serial::Transport;
use crate::telemetry::PipelineStats;

/// Which packet shape the aggregator assembles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Independent 4-byte movement and action packets
    Simple,
    /// Joined 7-byte aim + movement + action packets
    Combined,
}

impl AggregationMode {
    /// Wire layout produced in this mode
    pub fn packet_shape(&self) -> PacketShape {
        match self {
            AggregationMode::Simple => PacketShape::Simple,
            AggregationMode::Combined => PacketShape::Combined,
        }
    }
}

/// How the combined shape waits for its aim and movement inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    /// Wait for aim, then for movement. An aim timeout skips the movement
    /// receive entirely, and a received aim is discarded if movement then
    /// times out.
    Sequential,
    /// Wait for both at once. A sample whose partner timed out is held for
    /// the next cycle. If the partner times out again the held sample is
    /// discarded, so an idle stick never pairs fresh movement with stale aim.
    Concurrent,
}

/// Receiving ends of the channels the aggregator drains.
#[derive(Debug)]
pub struct AggregatorInputs {
    pub movement: ChannelReceiver<AxisSample>,
    pub actions: ChannelReceiver<ActionCode>,
    /// Required in combined mode
    pub aim: Option<ChannelReceiver<OrientationSample>>,
}

/// Packet assembly and transmission task.
pub struct PacketAggregator<T: Transport> {
    mode: AggregationMode,
    join: JoinStrategy,
    movement: ChannelReceiver<AxisSample>,
    actions: ChannelReceiver<ActionCode>,
    aim: Option<ChannelReceiver<OrientationSample>>,
    pending_aim: Option<Held<OrientationSample>>,
    pending_movement: Option<Held<AxisSample>>,
    receive_timeout: Duration,
    transport: T,
    stats: Arc<PipelineStats>,
}

impl<T: Transport> std::fmt::Debug for PacketAggregator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketAggregator")
            .field("mode", &self.mode)
            .field("join", &self.join)
            .field("receive_timeout", &self.receive_timeout)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> PacketAggregator<T> {
    /// Create an aggregator
    ///
    /// # Arguments
    ///
    /// * `mode` - Packet shape to assemble
    /// * `join` - Combined-shape join strategy (ignored in simple mode)
    /// * `inputs` - Channel receivers to drain
    /// * `transport` - Link the packets are written to
    /// * `receive_timeout` - Upper bound on each blocking receive
    /// * `stats` - Shared counters
    ///
    /// # Errors
    ///
    /// Returns [`MotionPadError::Init`] if combined mode is requested without
    /// an aim channel
    pub fn new(
        mode: AggregationMode,
        join: JoinStrategy,
        inputs: AggregatorInputs,
        transport: T,
        receive_timeout: Duration,
        stats: Arc<PipelineStats>,
    ) -> Result<Self> {
        if mode == AggregationMode::Combined && inputs.aim.is_none() {
            return Err(MotionPadError::Init(
                "combined aggregation requires an aim channel".to_string(),
            ));
        }

        Ok(Self {
            mode,
            join,
            movement: inputs.movement,
            actions: inputs.actions,
            aim: inputs.aim,
            pending_aim: None,
            pending_movement: None,
            receive_timeout,
            transport,
            stats,
        })
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// Build one packet and transmit it.
    ///
    /// Returns the packet if it was written. A timed-out receive or a
    /// transport failure returns `None`; neither is surfaced as an error.
    pub async fn cycle(&mut self) -> Option<Packet> {
        let packet = self.next_packet().await?;
        self.transmit(&packet).await.then_some(packet)
    }

    /// Run until the task is aborted.
    pub async fn run(mut self) {
        info!(
            "Packet aggregator running ({:?} mode, {:?} join)",
            self.mode, self.join
        );
        loop {
            self.cycle().await;
        }
    }

    async fn next_packet(&mut self) -> Option<Packet> {
        let packet = match self.mode {
            AggregationMode::Simple => self.next_simple().await,
            AggregationMode::Combined => self.next_combined().await,
        };
        if packet.is_none() {
            self.stats.record_timeout();
            trace!("Aggregator receive timed out");
        }
        packet
    }

    async fn next_simple(&mut self) -> Option<Packet> {
        let timeout = self.receive_timeout;
        let movement = &mut self.movement;
        let actions = &mut self.actions;

        tokio::select! {
            sample = movement.recv() => Some(Packet::Movement(sample)),
            action = actions.recv() => Some(Packet::Action(action)),
            _ = sleep(timeout) => None,
        }
    }

    async fn next_combined(&mut self) -> Option<Packet> {
        let timeout = self.receive_timeout;
        let aim_rx = self.aim.as_mut()?;

        let (aim, movement) = match self.join {
            JoinStrategy::Sequential => {
                let aim = aim_rx.recv_timeout(timeout).await?;
                let movement = self.movement.recv_timeout(timeout).await;
                if movement.is_none() {
                    debug!("Movement timed out, discarding aim sample {:?}", aim.axis);
                }
                (aim, movement?)
            }
            JoinStrategy::Concurrent => {
                let (aim, movement) = tokio::join!(
                    take_or_recv(&mut self.pending_aim, aim_rx, timeout),
                    take_or_recv(&mut self.pending_movement, &mut self.movement, timeout),
                );
                match (aim, movement) {
                    (Some(aim), Some(movement)) => (aim.value, movement.value),
                    (aim, movement) => {
                        self.pending_aim = hold(aim, "aim");
                        self.pending_movement = hold(movement, "movement");
                        return None;
                    }
                }
            }
        };

        let action = self.actions.try_recv().unwrap_or_default();
        Some(Packet::Combined {
            aim,
            movement,
            action,
        })
    }

    async fn transmit(&mut self, packet: &Packet) -> bool {
        let bytes = encode_packet(packet);
        match self.transport.send_packet(&bytes).await {
            Ok(()) => {
                self.stats.record_packet(bytes.len());
                true
            }
            Err(e) => {
                self.stats.record_write_error();
                warn!("Failed to send packet: {}", e);
                false
            }
        }
    }
}

/// Timed-out partner receives a held sample survives before it is dropped.
const MAX_HELD_CYCLES: u32 = 1;

/// Sample waiting for its partner in a concurrent join.
#[derive(Debug)]
struct Held<V> {
    value: V,
    waited: u32,
}

/// Use the held value if there is one, otherwise wait on the channel.
async fn take_or_recv<V>(
    slot: &mut Option<Held<V>>,
    rx: &mut ChannelReceiver<V>,
    timeout: Duration,
) -> Option<Held<V>> {
    match slot.take() {
        Some(held) => Some(held),
        None => rx
            .recv_timeout(timeout)
            .await
            .map(|value| Held { value, waited: 0 }),
    }
}

/// Keep a sample whose partner timed out, unless it already waited too long.
fn hold<V>(held: Option<Held<V>>, what: &str) -> Option<Held<V>> {
    let held = held?;
    if held.waited >= MAX_HELD_CYCLES {
        debug!("Partner timed out again, discarding held {} sample", what);
        return None;
    }
    Some(Held {
        value: held.value,
        waited: held.waited + 1,
    })
}
