//! Panel Bridge
//!
//! Receives what the controller sends to its surface and applies it to the
//! local [`PanelAnimation`]. Loading the markup is answered with
//! [`SurfaceEvent::Ready`], which the app forwards back to the controller.

use tokio::sync::mpsc;

use nyan_core::{PanelAnimation, PanelMarkup, SurfaceDirective, SurfaceEvent};

/// Terminal side of a `ChannelSurface`
#[derive(Debug)]
pub struct PanelBridge {
    rx: mpsc::UnboundedReceiver<SurfaceDirective>,
    panel: PanelAnimation,
    markup: Option<PanelMarkup>,
    reveals: u64,
    connected: bool,
    prefers_reduced_motion: bool,
}

impl PanelBridge {
    /// Wrap the receiving end of a surface channel
    pub fn new(
        rx: mpsc::UnboundedReceiver<SurfaceDirective>,
        prefers_reduced_motion: bool,
    ) -> Self {
        let mut panel = PanelAnimation::new();
        panel.set_prefers_reduced_motion(prefers_reduced_motion);
        Self {
            rx,
            panel,
            markup: None,
            reveals: 0,
            connected: true,
            prefers_reduced_motion,
        }
    }

    /// Apply everything waiting in the channel
    ///
    /// Returns the events the controller should receive in reply.
    pub fn drain(&mut self) -> Vec<SurfaceEvent> {
        let mut replies = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(directive) => {
                    if let Some(reply) = self.apply(directive) {
                        replies.push(reply);
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if self.connected {
                        tracing::debug!("Controller released the panel");
                        self.connected = false;
                    }
                    break;
                }
            }
        }
        replies
    }

    fn apply(&mut self, directive: SurfaceDirective) -> Option<SurfaceEvent> {
        match directive {
            SurfaceDirective::Markup(markup) => {
                // A fresh document starts from scratch
                self.panel = PanelAnimation::new();
                self.panel.set_prefers_reduced_motion(self.prefers_reduced_motion);
                self.panel.set_status(&markup.status_text);
                self.markup = Some(markup);
                tracing::debug!("Panel markup loaded");
                Some(SurfaceEvent::Ready)
            }
            SurfaceDirective::Message(message) => {
                self.panel.handle_message(&message);
                None
            }
            SurfaceDirective::Reveal { preserve_focus } => {
                self.reveals += 1;
                tracing::trace!(preserve_focus, "Panel revealed");
                None
            }
        }
    }

    /// External reduced-motion preference changed
    pub fn set_prefers_reduced_motion(&mut self, prefers: bool) {
        self.prefers_reduced_motion = prefers;
        self.panel.set_prefers_reduced_motion(prefers);
    }

    /// The panel's view state
    pub fn panel(&self) -> &PanelAnimation {
        &self.panel
    }

    /// Mutable access for frame stepping
    pub fn panel_mut(&mut self) -> &mut PanelAnimation {
        &mut self.panel
    }

    /// Markup most recently loaded, if any
    pub fn markup(&self) -> Option<&PanelMarkup> {
        self.markup.as_ref()
    }

    /// Number of reveal requests received
    pub fn reveals(&self) -> u64 {
        self.reveals
    }

    /// Whether the controller still holds the sending end
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyan_core::provider::INITIAL_STATUS;
    use nyan_core::{
        ActivityController, ChannelSurface, MemoryStatusSink, SharedSettings, StartOptions,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn wired(prefers_reduced: bool) -> (ActivityController, PanelBridge) {
        let controller = ActivityController::new(
            Arc::new(SharedSettings::default()),
            Arc::new(MemoryStatusSink::new()),
        );
        let (surface, rx) = ChannelSurface::new();
        controller.resolve_surface(Arc::new(surface));
        (controller, PanelBridge::new(rx, prefers_reduced))
    }

    #[tokio::test(start_paused = true)]
    async fn test_markup_is_answered_with_ready() {
        let (_controller, mut bridge) = wired(false);
        assert_eq!(bridge.drain(), vec![SurfaceEvent::Ready]);
        assert_eq!(bridge.panel().status(), INITIAL_STATUS);
        assert!(bridge.markup().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_drive_the_panel() {
        let (controller, mut bridge) = wired(false);
        for reply in bridge.drain() {
            controller.handle_surface_event(reply);
        }

        controller.begin_context("Task: build", StartOptions::auto_reveal(), None);
        assert!(bridge.drain().is_empty());
        assert!(bridge.panel().is_running());
        assert_eq!(bridge.panel().status(), "Task: build");
        assert_eq!(bridge.reveals(), 1);

        controller.stop_all(None);
        bridge.drain();
        assert!(!bridge.panel().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_preference_survives_reload() {
        let (controller, mut bridge) = wired(true);
        bridge.drain();
        assert!(bridge.panel().is_reduced_motion());

        let (surface, rx) = ChannelSurface::new();
        bridge.rx = rx;
        controller.resolve_surface(Arc::new(surface));
        assert_eq!(bridge.drain(), vec![SurfaceEvent::Ready]);
        assert!(bridge.panel().is_reduced_motion());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disposed_controller_disconnects() {
        let (controller, mut bridge) = wired(false);
        bridge.drain();
        controller.dispose();
        drop(controller);
        bridge.drain();
        assert!(!bridge.is_connected());
    }
}
