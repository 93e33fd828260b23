//! # Axis Sampler
//!
//! One periodic task per joystick axis: read the ADC, scale, filter, and push
//! the result onto the movement channel.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::trace;

use super::filter::{classify, outside_deadzone, scale_reading, MovingAverage};
use crate::packet::protocol::{Axis, AxisSample, AxisValue};
use crate::peripherals::AnalogInput;
use crate::pipeline::channel::ChannelSender;
use crate::pipeline::task::PeriodicTask;

/// How raw readings become movement samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPolicy {
    /// 5-sample average, forwarded only outside the deadzone
    MovingAverage,
    /// Instantaneous tri-state, forwarded every cycle
    Classification,
}

/// Periodic sampler for one axis.
pub struct AxisSampler {
    axis: Axis,
    adc: Box<dyn AnalogInput>,
    policy: FilterPolicy,
    average: MovingAverage,
    movement: ChannelSender<AxisSample>,
    period: Duration,
}

impl std::fmt::Debug for AxisSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisSampler")
            .field("axis", &self.axis)
            .field("policy", &self.policy)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl AxisSampler {
    pub fn new(
        axis: Axis,
        adc: Box<dyn AnalogInput>,
        policy: FilterPolicy,
        movement: ChannelSender<AxisSample>,
        period: Duration,
    ) -> Self {
        Self {
            axis,
            adc,
            policy,
            average: MovingAverage::new(),
            movement,
            period,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Filter one raw reading, returning the sample to forward, if any.
    pub fn process(&mut self, raw: u16) -> Option<AxisSample> {
        let scaled = scale_reading(raw);

        let value = match self.policy {
            FilterPolicy::MovingAverage => {
                let average = self.average.push(scaled);
                if !outside_deadzone(average) {
                    return None;
                }
                AxisValue::Magnitude(average as i16)
            }
            FilterPolicy::Classification => AxisValue::Direction(classify(scaled)),
        };

        Some(AxisSample {
            axis: self.axis,
            value,
        })
    }

    /// Read the ADC once and forward the filtered sample.
    ///
    /// Returns `true` if a sample was enqueued.
    pub fn sample_once(&mut self) -> bool {
        let raw = self.adc.read();
        match self.process(raw) {
            Some(sample) => {
                trace!("Axis {:?}: raw {} -> {:?}", self.axis, raw, sample.value);
                self.movement.try_send(sample)
            }
            None => false,
        }
    }
}

#[async_trait]
impl PeriodicTask for AxisSampler {
    fn name(&self) -> &'static str {
        match self.axis {
            Axis::X => "x axis sampler",
            Axis::Y => "y axis sampler",
        }
    }

    fn period(&self) -> Duration {
        self.period
    }

    async fn cycle(&mut self) {
        self.sample_once();
    }
}
