//! # Input Classifier
//!
//! Task side of button handling: drains the raw-button channel and emits
//! [`ActionCode`]s on the action channel.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::packet::protocol::{ActionCode, ButtonId};
use crate::pipeline::channel::{ChannelReceiver, ChannelSender};
use crate::pipeline::task::PeriodicTask;

/// When the classifier writes to the action channel.
///
/// The choice matters downstream: under [`ActionPolicy::FixedRate`] the
/// action channel is never idle, which keeps the simple aggregator busy with
/// `None` packets; under [`ActionPolicy::EdgeTriggered`] an idle controller
/// sends nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPolicy {
    /// One action per cycle, `None` when idle
    FixedRate,
    /// Only real presses
    EdgeTriggered,
}

/// Periodic classifier task.
#[derive(Debug)]
pub struct InputClassifier {
    raw: ChannelReceiver<ButtonId>,
    actions: ChannelSender<ActionCode>,
    policy: ActionPolicy,
    period: Duration,
}

impl InputClassifier {
    /// # Arguments
    ///
    /// * `raw` - Raw-button channel filled by [`InputCapture`](super::capture::InputCapture)
    /// * `actions` - Action channel drained by the aggregator
    /// * `policy` - Fixed-rate or edge-triggered output
    /// * `period` - Cycle period; also the budget for waiting on a button
    pub fn new(
        raw: ChannelReceiver<ButtonId>,
        actions: ChannelSender<ActionCode>,
        policy: ActionPolicy,
        period: Duration,
    ) -> Self {
        Self {
            raw,
            actions,
            policy,
            period,
        }
    }

    pub fn policy(&self) -> ActionPolicy {
        self.policy
    }

    /// Run one classification cycle.
    ///
    /// Waits at most one period for a raw button, then returns the action
    /// written to the action channel, or `None` if nothing was written.
    pub async fn poll_once(&mut self) -> Option<ActionCode> {
        let button = self.raw.recv_timeout(self.period).await;
        let action = ActionCode::from(button);

        if button.is_none() && self.policy == ActionPolicy::EdgeTriggered {
            return None;
        }

        if button.is_some() {
            debug!("Button {:?} -> action {:?}", button, action);
        }

        if self.actions.try_send(action) {
            Some(action)
        } else {
            None
        }
    }
}

#[async_trait]
impl PeriodicTask for InputClassifier {
    fn name(&self) -> &'static str {
        "input classifier"
    }

    fn period(&self) -> Duration {
        self.period
    }

    async fn cycle(&mut self) {
        self.poll_once().await;
    }
}
