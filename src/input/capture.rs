//! # Button Capture
//!
//! Interrupt-side half of button handling. [`InputCapture::on_edge`] is the
//! handler the GPIO layer calls on a pin change; it only ever performs a
//! non-blocking send into the raw-button channel.
//!
//! There is no debounce here. Bounces that make it into the channel are
//! absorbed by the classifier's polling cadence, and a full channel simply
//! loses the press.

use tracing::{debug, info};

use crate::error::Result;
use crate::packet::protocol::ButtonId;
use crate::peripherals::ButtonInterrupts;
use crate::pipeline::channel::ChannelSender;

/// GPIO pin change reported by the interrupt controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Falling,
    Rising,
}

/// Maps button lines to [`ButtonId`]s and forwards presses.
#[derive(Debug, Clone)]
pub struct InputCapture {
    lines: [(u32, ButtonId); 4],
    raw: ChannelSender<ButtonId>,
}

impl InputCapture {
    /// # Arguments
    ///
    /// * `lines` - GPIO pin for each button
    /// * `raw` - Raw-button channel feeding the classifier
    pub fn new(lines: [(u32, ButtonId); 4], raw: ChannelSender<ButtonId>) -> Self {
        Self { lines, raw }
    }

    /// Arm falling-edge interrupts on every button line.
    ///
    /// # Errors
    ///
    /// Returns the first failure from the interrupt controller.
    pub fn attach(&self, interrupts: &mut dyn ButtonInterrupts) -> Result<()> {
        for (pin, button) in self.lines {
            interrupts.enable_falling_edge(pin)?;
            debug!("Armed falling edge on GPIO {} for {:?}", pin, button);
        }
        info!("Button capture attached to {} lines", self.lines.len());
        Ok(())
    }

    /// Button wired to `pin`, if any.
    pub fn button_for(&self, pin: u32) -> Option<ButtonId> {
        self.lines
            .iter()
            .find(|(line, _)| *line == pin)
            .map(|(_, button)| *button)
    }

    /// Interrupt handler.
    ///
    /// Returns `true` if a button event was enqueued. Rising edges, unknown
    /// pins and a full channel all return `false`.
    pub fn on_edge(&self, pin: u32, edge: Edge) -> bool {
        if edge != Edge::Falling {
            return false;
        }
        match self.button_for(pin) {
            Some(button) => self.raw.try_send(button),
            None => false,
        }
    }
}
