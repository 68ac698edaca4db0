//! TUI input handling and main event loop

use crate::gateway::{Gateway, GatewayCommand, GatewayEvent};
use crate::tui::{
    render::Terminal,
    state::BrowserState,
    types::{action_for_key, Action},
};
use crossterm::event::{self, Event};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc::error::TryRecvError, mpsc::UnboundedReceiver};
use tracing::{debug, warn};

/// How long one loop iteration waits for a key press.
pub const INPUT_POLL: Duration = Duration::from_millis(100);

fn dispatch_all<G: Gateway>(gateway: &mut G, commands: Vec<GatewayCommand>) {
    for command in commands {
        debug!(?command, "Dispatching gateway command");
        gateway.dispatch(command);
    }
}

/// Apply a user action and send the resulting commands to the gateway.
pub fn apply_action<G: Gateway>(state: &mut BrowserState, gateway: &mut G, action: Action) {
    let commands = state.handle_action(action);
    dispatch_all(gateway, commands);
}

/// Drain every pending gateway event into the state. Returns how many were applied, or
/// `None` once the gateway side of the channel is gone.
pub fn pump_events<G: Gateway>(
    state: &mut BrowserState,
    gateway: &mut G,
    events: &mut UnboundedReceiver<GatewayEvent>,
) -> Option<usize> {
    let mut applied = 0;
    loop {
        match events.try_recv() {
            Ok(event) => {
                let commands = state.handle_event(event);
                dispatch_all(gateway, commands);
                applied += 1;
            }
            Err(TryRecvError::Empty) => return Some(applied),
            Err(TryRecvError::Disconnected) => return None,
        }
    }
}

/// Run the browser event loop. Returns when quit is requested or shutdown signal received.
///
/// The gateway is asked to connect first; every iteration then redraws, handles at
/// most one key press and applies all gateway events that arrived meanwhile.
pub async fn run_browser<G: Gateway>(
    state: &mut BrowserState,
    gateway: &mut G,
    events: &mut UnboundedReceiver<GatewayEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let mut terminal = Terminal::new()?;
    gateway.connect();
    let mut gateway_open = true;

    while !state.is_quit_requested() {
        let (topic_rows, message_rows) = terminal.pane_capacities(state.messages().messages())?;
        state.set_viewport(topic_rows, message_rows);
        terminal.draw(&state.snapshot())?;

        // Poll for events with timeout
        if event::poll(INPUT_POLL)? {
            if let Event::Key(key) = event::read()? {
                if let Some(action) = action_for_key(&key) {
                    apply_action(state, gateway, action);
                }
            }
        }

        if shutdown_rx.try_recv().is_ok() {
            apply_action(state, gateway, Action::Quit);
        }

        if gateway_open && pump_events(state, gateway, events).is_none() {
            warn!("Gateway event channel closed");
            gateway_open = false;
        }

        // Let gateway tasks run between frames.
        tokio::task::yield_now().await;
    }

    Ok(())
}
