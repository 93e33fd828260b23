//! # Pipeline Module
//!
//! Wires the producers, channels and aggregator together.
//!
//! This module handles:
//! - Bounded channels between tasks
//! - The periodic task loop
//! - Packet aggregation and transmission
//! - Startup checks and task spawning
//!
//! Every channel is created here, once, and moved into the task that owns
//! each end. Nothing is global.

pub mod aggregator;
pub mod channel;
pub mod task;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::axis::sampler::AxisSampler;
use crate::config::Config;
use crate::error::{MotionPadError, Result};
use crate::input::capture::InputCapture;
use crate::input::classifier::InputClassifier;
use crate::orientation::fusion::{ComplementaryFilter, OrientationFusion};
use crate::orientation::sampler::OrientationSampler;
use crate::packet::protocol::Axis;
use crate::peripherals::{AnalogInput, ButtonInterrupts, InertialSensor};
use crate::serial::Transport;
use crate::telemetry::{PipelineStats, StatsSnapshot};
use aggregator::{AggregationMode, AggregatorInputs, PacketAggregator};
use channel::{channel, ChannelCounters};
use task::spawn_periodic;

/// Driver-layer handles the pipeline runs on.
pub struct Peripherals {
    pub x_axis: Box<dyn AnalogInput>,
    pub y_axis: Box<dyn AnalogInput>,
    /// Required in combined mode
    pub imu: Option<Box<dyn InertialSensor>>,
    pub buttons: Box<dyn ButtonInterrupts>,
}

impl std::fmt::Debug for Peripherals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peripherals")
            .field("imu", &self.imu.is_some())
            .finish_non_exhaustive()
    }
}

/// Handle to a running pipeline.
#[derive(Debug)]
pub struct PipelineHandle {
    capture: InputCapture,
    stats: Arc<PipelineStats>,
    channels: Vec<Arc<ChannelCounters>>,
    tasks: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Interrupt handler for the button lines.
    pub fn capture(&self) -> &InputCapture {
        &self.capture
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Counters for every channel, in creation order.
    pub fn channels(&self) -> &[Arc<ChannelCounters>] {
        &self.channels
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot(&self.channels)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Stop every pipeline task.
    pub fn abort(self) {
        for task in &self.tasks {
            task.abort();
        }
        info!("Pipeline stopped ({} tasks)", self.tasks.len());
    }
}

/// Start the pipeline with the built-in complementary filter.
///
/// # Errors
///
/// See [`start_with_fusion`].
pub fn start<T>(config: &Config, peripherals: Peripherals, transport: T) -> Result<PipelineHandle>
where
    T: Transport + 'static,
{
    let fusion = ComplementaryFilter::new(config.orientation.fusion_gain);
    start_with_fusion(config, peripherals, Box::new(fusion), transport)
}

/// Start every task of the pipeline.
///
/// All resources are checked before the first task is spawned, so a failed
/// start leaves nothing running. Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns error if:
/// - Combined mode is selected but no IMU is present
/// - Arming the button interrupts fails
pub fn start_with_fusion<T>(
    config: &Config,
    mut peripherals: Peripherals,
    fusion: Box<dyn OrientationFusion>,
    transport: T,
) -> Result<PipelineHandle>
where
    T: Transport + 'static,
{
    let mode = config.pipeline.mode;
    let imu = match (mode, peripherals.imu.take()) {
        (AggregationMode::Combined, None) => {
            return Err(MotionPadError::Init(
                "combined mode requires an inertial sensor".to_string(),
            ));
        }
        (AggregationMode::Combined, Some(imu)) => Some(imu),
        (AggregationMode::Simple, _) => None,
    };

    let (raw_tx, raw_rx) = channel("raw_buttons");
    let (action_tx, action_rx) = channel("actions");
    let (movement_tx, movement_rx) = channel("movement");
    let (aim_tx, aim_rx) = match imu {
        Some(_) => {
            let (tx, rx) = channel("aim");
            (Some(tx), Some(rx))
        }
        None => (None, None),
    };

    let mut channels = vec![
        raw_tx.counters(),
        action_tx.counters(),
        movement_tx.counters(),
    ];
    channels.extend(aim_tx.as_ref().map(|tx| tx.counters()));

    let capture = InputCapture::new(config.input.button_lines(), raw_tx);
    capture.attach(peripherals.buttons.as_mut())?;

    let stats = Arc::new(PipelineStats::new());
    let aggregator = PacketAggregator::new(
        mode,
        config.pipeline.join,
        AggregatorInputs {
            movement: movement_rx,
            actions: action_rx,
            aim: aim_rx,
        },
        transport,
        config.pipeline.receive_timeout(),
        Arc::clone(&stats),
    )?;

    let mut tasks = vec![
        spawn_periodic(InputClassifier::new(
            raw_rx,
            action_tx,
            config.input.action_policy,
            config.input.period(),
        )),
        spawn_periodic(AxisSampler::new(
            Axis::X,
            peripherals.x_axis,
            config.axis.filter,
            movement_tx.clone(),
            config.axis.period(),
        )),
        spawn_periodic(AxisSampler::new(
            Axis::Y,
            peripherals.y_axis,
            config.axis.filter,
            movement_tx,
            config.axis.period(),
        )),
    ];

    if let (Some(imu), Some(aim_tx)) = (imu, aim_tx) {
        tasks.push(spawn_periodic(OrientationSampler::new(
            imu,
            fusion,
            aim_tx,
            config.orientation.period(),
        )));
    }

    tasks.push(tokio::spawn(aggregator.run()));

    info!(
        "Pipeline started: {:?} mode, {:?} actions, {:?} filter, {} tasks",
        mode,
        config.input.action_policy,
        config.axis.filter,
        tasks.len()
    );

    Ok(PipelineHandle {
        capture,
        stats,
        channels,
        tasks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::capture::Edge;
    use crate::input::classifier::ActionPolicy;
    use crate::packet::decoder::PacketDecoder;
    use crate::packet::protocol::{ActionCode, Frame};
    use crate::peripherals::sim::{SimulatedButtons, SimulatedImu};
    use crate::peripherals::{MockAnalogInput, MockButtonInterrupts};
    use crate::serial::port_trait::mocks::MockTransport;
    use std::time::Duration;

    /// ADC input stuck at one reading
    fn fixed_adc(raw: u16) -> Box<dyn AnalogInput> {
        let mut adc = MockAnalogInput::new();
        adc.expect_read().returning(move || raw);
        Box::new(adc)
    }

    fn peripherals(imu: bool) -> Peripherals {
        Peripherals {
            // Scaled +100 on X, centered on Y
            x_axis: fixed_adc(2048 + 100 * 14),
            y_axis: fixed_adc(2048),
            imu: imu.then(|| {
                Box::new(SimulatedImu::new(Duration::from_millis(10))) as Box<dyn InertialSensor>
            }),
            buttons: Box::new(SimulatedButtons::new()),
        }
    }

    fn decode(transport: &MockTransport, mode: AggregationMode) -> Vec<Frame> {
        let mut decoder = PacketDecoder::new(mode.packet_shape());
        transport
            .get_written_data()
            .iter()
            .flat_map(|packet| decoder.push(packet))
            .collect()
    }

    #[tokio::test]
    async fn test_combined_mode_requires_imu() {
        let config = Config::default();
        assert_eq!(config.pipeline.mode, AggregationMode::Combined);

        match start(&config, peripherals(false), MockTransport::new()) {
            Err(MotionPadError::Init(msg)) => assert!(msg.contains("inertial")),
            other => panic!("Expected Init error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_attach_failure_propagates() {
        let mut buttons = MockButtonInterrupts::new();
        buttons
            .expect_enable_falling_edge()
            .returning(|pin| Err(MotionPadError::Init(format!("GPIO {} unavailable", pin))));

        let mut p = peripherals(true);
        p.buttons = Box::new(buttons);

        match start(&Config::default(), p, MockTransport::new()) {
            Err(MotionPadError::Init(msg)) => assert!(msg.contains("GPIO 2")),
            other => panic!("Expected Init error, got: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_simple_mode_end_to_end() {
        let mut config = Config::default();
        config.pipeline.mode = AggregationMode::Simple;
        config.input.action_policy = ActionPolicy::EdgeTriggered;
        config.axis.filter = crate::axis::sampler::FilterPolicy::MovingAverage;

        let transport = MockTransport::new();
        let handle = start(&config, peripherals(false), transport.clone()).unwrap();
        assert_eq!(handle.task_count(), 4);
        assert_eq!(handle.channels().len(), 3);

        tokio::time::sleep(Duration::from_millis(55)).await;
        assert!(handle.capture().on_edge(5, Edge::Falling));
        tokio::time::sleep(Duration::from_millis(60)).await;

        let snapshot = handle.snapshot();
        handle.abort();

        let frames = decode(&transport, AggregationMode::Simple);
        let actions: Vec<_> = frames.iter().filter_map(Frame::action).collect();
        assert_eq!(actions, vec![ActionCode::Jump]);

        let movement: Vec<_> = frames
            .iter()
            .filter_map(|f| match *f {
                Frame::Movement { axis, value } => Some((axis, value)),
                _ => None,
            })
            .collect();
        assert!(!movement.is_empty());
        assert!(movement.iter().all(|(axis, _)| *axis == Axis::X));
        assert_eq!(movement.last(), Some(&(Axis::X, 100)));

        assert_eq!(snapshot.packets_sent as usize, frames.len());
        assert_eq!(snapshot.write_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_combined_mode_end_to_end() {
        let mut config = Config::default();
        config.pipeline.mode = AggregationMode::Combined;
        config.input.action_policy = ActionPolicy::FixedRate;

        let transport = MockTransport::new();
        let handle = start(&config, peripherals(true), transport.clone()).unwrap();
        assert_eq!(handle.task_count(), 5);
        assert_eq!(handle.channels().len(), 4);

        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.capture().on_edge(4, Edge::Falling);
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        let frames = decode(&transport, AggregationMode::Combined);
        assert!(!frames.is_empty());
        assert!(frames
            .iter()
            .all(|f| matches!(f, Frame::Combined { .. })));
        assert!(frames
            .iter()
            .any(|f| f.action() == Some(ActionCode::Interact)));
    }
}
