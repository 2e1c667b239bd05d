//! Application State and Event Loop
//!
//! The app embeds the activity controller and acts as its panel. Key presses
//! become commands on the controller's inbound queue; whatever the controller
//! posts to its surface comes back through the [`PanelBridge`] and is drawn
//! at roughly 60 frames per second.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use nyan_core::{
    ActivityController, ChannelSurface, Command, InboundEvent, MemoryStatusSink, NyanHost,
    PanelAnimation, SharedSettings, SurfaceEvent,
};

use crate::bridge::PanelBridge;
use crate::theme::{dim_style, title_style, RUNNING_GREEN};
use crate::widgets::track::metrics_for;
use crate::widgets::{fit_width, TrackWidget};

/// Frame interval (~60 fps)
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Rows inside the track border
const TRACK_ROWS: u16 = 3;

const HELP: &str = "t toggle  d demo  s stop all  space panel toggle  q quit";

/// What a key press asks for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Leave the app
    Quit,
    /// Flip the manual context
    Toggle,
    /// Play the demo sequence
    Demo,
    /// Stop every context
    StopAll,
    /// The panel's own toggle button
    PanelToggle,
}

impl KeyAction {
    /// Queue event for this action, if it has one
    pub fn inbound(self) -> Option<InboundEvent> {
        match self {
            Self::Quit => None,
            Self::Toggle => Some(Command::Toggle.into()),
            Self::Demo => Some(Command::Demo.into()),
            Self::StopAll => Some(Command::Stop.into()),
            Self::PanelToggle => Some(SurfaceEvent::Toggle.into()),
        }
    }
}

/// Map a key press to an action
pub fn key_action(key: &KeyEvent) -> Option<KeyAction> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAction::Quit)
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char('t') => Some(KeyAction::Toggle),
        KeyCode::Char('d') => Some(KeyAction::Demo),
        KeyCode::Char('s') => Some(KeyAction::StopAll),
        KeyCode::Char(' ') | KeyCode::Enter => Some(KeyAction::PanelToggle),
        _ => None,
    }
}

/// Main application state
pub struct App {
    // === Core State ===
    /// Whether the app is running
    running: bool,
    /// Owns the controller
    host: NyanHost,
    /// Status-bar indicator as last drawn by the controller
    status_bar: MemoryStatusSink,

    // === Panel ===
    bridge: PanelBridge,

    // === Inbound Queue ===
    inbound: Option<mpsc::Sender<InboundEvent>>,
    dispatcher: Option<JoinHandle<()>>,

    // === Frame Timing ===
    epoch: Instant,
    /// Terminal width in cells
    width: u16,
}

impl App {
    /// Activate the controller and attach the terminal panel
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(settings: SharedSettings, prefers_reduced_motion: bool) -> anyhow::Result<Self> {
        let status_bar = MemoryStatusSink::new();
        let host = NyanHost::activate(Arc::new(settings), Arc::new(status_bar.clone()));

        let (surface, rx) = ChannelSurface::new();
        host.controller()
            .context("Controller is not active")?
            .resolve_surface(Arc::new(surface));
        let (inbound, dispatcher) = host.spawn_dispatcher()?;

        Ok(Self {
            running: true,
            host,
            status_bar,
            bridge: PanelBridge::new(rx, prefers_reduced_motion),
            inbound: Some(inbound),
            dispatcher: Some(dispatcher),
            epoch: Instant::now(),
            width: 80,
        })
    }

    /// Run until the user quits
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();
        let mut ticker = tokio::time::interval(FRAME_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.width = terminal.size()?.width;
        self.tick();
        terminal.draw(|frame| self.draw(frame))?;

        while self.running {
            tokio::select! {
                biased;

                maybe_event = event_stream.next() => match maybe_event {
                    // Only handle Press events (not Release or Repeat)
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(&key);
                    }
                    Some(Ok(Event::Resize(width, _))) => self.width = width,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Terminal event stream failed");
                        self.running = false;
                    }
                    None => self.running = false,
                },

                _ = ticker.tick() => {}
            }

            self.tick();
            terminal.draw(|frame| self.draw(frame))?;
        }

        Ok(())
    }

    /// Apply one key press
    pub fn handle_key(&mut self, key: &KeyEvent) {
        let Some(action) = key_action(key) else {
            return;
        };
        tracing::debug!(?action, "Key action");
        match action.inbound() {
            Some(event) => self.send(event),
            None => self.running = false,
        }
    }

    fn send(&mut self, event: InboundEvent) {
        let Some(inbound) = &self.inbound else {
            return;
        };
        if let Err(e) = inbound.try_send(event) {
            tracing::warn!(error = %e, "Dropped inbound event");
        }
    }

    /// Take in panel directives and advance the animation one frame
    pub fn tick(&mut self) {
        for reply in self.bridge.drain() {
            self.send(reply.into());
        }

        if self.bridge.panel().wants_frame() {
            let now = self.elapsed_ms();
            let metrics = metrics_for(self.track_width());
            self.bridge.panel_mut().step(now, metrics);
        }
    }

    fn elapsed_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    fn track_width(&self) -> u16 {
        self.width.saturating_sub(2)
    }

    /// Draw the whole panel
    pub fn draw(&self, frame: &mut Frame) {
        let [title, track, status, indicator, _, help] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(TRACK_ROWS + 2),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());
        let width = usize::from(frame.area().width);
        let panel = self.bridge.panel();

        let button = panel.button();
        let state_style = if button.pressed {
            Style::default().fg(RUNNING_GREEN)
        } else {
            dim_style()
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(" Nyan Progress ", title_style()),
                Span::styled(format!("[{}]", button.label), state_style),
                Span::styled(format!(" {}", button.aria_label), dim_style()),
            ])),
            title,
        );

        let block = Block::bordered().border_style(dim_style());
        let inner = block.inner(track);
        frame.render_widget(block, track);
        frame.render_widget(TrackWidget::new(panel, self.elapsed_ms()), inner);

        frame.render_widget(
            Paragraph::new(format!(" {}", fit_width(panel.status(), width.saturating_sub(1)))),
            status,
        );

        let bar = self.status_bar.state();
        if bar.visible {
            let text = if bar.tooltip.is_empty() || bar.tooltip == bar.text {
                bar.text
            } else {
                format!("{}  {}", bar.text, bar.tooltip)
            };
            frame.render_widget(
                Paragraph::new(fit_width(&text, width)).style(dim_style()),
                indicator,
            );
        }

        frame.render_widget(Paragraph::new(fit_width(HELP, width)).style(dim_style()), help);
    }

    /// The panel's view state
    pub fn panel(&self) -> &PanelAnimation {
        self.bridge.panel()
    }

    /// The live controller
    pub fn controller(&self) -> Option<ActivityController> {
        self.host.controller()
    }

    /// Whether the loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Close the queue, wait for it to drain, then deactivate
    pub async fn shutdown(&mut self) {
        self.inbound = None;
        if let Some(dispatcher) = self.dispatcher.take() {
            if let Err(e) = dispatcher.await {
                tracing::warn!(error = %e, "Dispatcher task failed");
            }
        }
        self.host.deactivate();
    }
}
