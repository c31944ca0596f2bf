//! Demo form: one view and a handful of handlers exercising every update
//! path (labels, buttons, checkboxes, line charts) plus the shared store.

use std::time::Duration;

use gasp_middleware::{ClientEvent, DEFAULT_LINE_NAME, LineChart, SharedStore};
use gasp_server::Server;
use gasp_types::GaspError;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::Config;

/// The compiled-in demo page.
const DEMO_HTML: &str = include_str!("demo.html");

const GREETINGS: &str = "demo/greetings";
const CHART_LOOP: &str = "demo/chart-loop";
const CHART_PERIOD: &str = "demo/chart-period";

const SLOW_MS: u64 = 250;
const FAST_MS: u64 = 50;

/// Build the demo server from `cfg`.
pub fn build(cfg: &Config) -> Result<Server, GaspError> {
    let mut server = Server::new(cfg.socket.as_str())?.with_queue_capacity(cfg.queue_capacity);
    server.add_view(&cfg.view_path, DEMO_HTML)?;
    register(&mut server)?;
    Ok(server)
}

pub fn register(server: &mut Server) -> Result<(), GaspError> {
    server
        .add_event_handler("*", "gbutton0", "click", greet)?
        .add_event_handler("*", "gcheckbox0", "change", toggle_greeting)?
        .add_event_handler("*", "gdropdown0", "change", change_speed)?
        .add_event_handler("*", "gbutton1", "click", toggle_chart)?
        .add_event_handler("*", "*", "click", log_click)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

fn greet(evt: &ClientEvent) {
    let Some(session) = evt.session() else { return };
    let name = evt
        .state
        .get_textbox("gtextbox0")
        .map(|t| t.control.text.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or("stranger");

    let count = session
        .store()
        .with_or_insert(
            GREETINGS,
            || 0u64,
            |n| {
                *n += 1;
                *n
            },
        )
        .unwrap_or_default();

    session
        .outbox()
        .label("glabel0")
        .update_text(format!("Hello, {name}! ({count})"));
}

fn toggle_greeting(evt: &ClientEvent) {
    let Some(outbox) = evt.outbox() else { return };
    let enabled = evt
        .state
        .get_checkbox("gcheckbox0")
        .map(|c| c.is_checked)
        .unwrap_or(true);
    outbox.button("gbutton0").update_is_enabled(enabled);
    outbox.label("glabel0").update_is_visible(enabled);
}

fn change_speed(evt: &ClientEvent) {
    let Some(session) = evt.session() else { return };
    let selected = evt
        .data_str("selected")
        .or_else(|| evt.state.get_dropdown("gdropdown0").map(|d| d.control.text.as_str()))
        .unwrap_or("slow");
    let period = if selected == "fast" { FAST_MS } else { SLOW_MS };
    session.store().insert(CHART_PERIOD, period);
    debug!(%selected, period_ms = period, "chart speed changed");
}

fn toggle_chart(evt: &ClientEvent) {
    let Some(session) = evt.session() else { return };
    let store = session.store().clone();
    let button = session.outbox().button("gbutton1");

    if let Some(stop) = store.take::<oneshot::Sender<()>>(CHART_LOOP) {
        // The loop may have ended already.
        let _ = stop.send(());
        button.update_text("Start chart");
        return;
    }

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("chart loop needs a tokio runtime");
        return;
    };
    let (stop_tx, stop_rx) = oneshot::channel();
    store.insert(CHART_LOOP, stop_tx);
    runtime.spawn(feed_chart(session.outbox().line_chart("glinechart0"), store, stop_rx));
    button.update_text("Stop chart");
}

fn log_click(evt: &ClientEvent) {
    info!(view = %evt.view, id = %evt.id, "click");
}

async fn feed_chart(chart: LineChart, store: SharedStore, mut stop: oneshot::Receiver<()>) {
    let mut t = 0.0f64;
    loop {
        let period = store.with::<u64, _>(CHART_PERIOD, |ms| *ms).unwrap_or(SLOW_MS);
        tokio::select! {
            _ = &mut stop => break,
            _ = tokio::time::sleep(Duration::from_millis(period)) => {
                t += 0.2;
                chart.update_values(DEFAULT_LINE_NAME, &[t.sin()]);
            }
        }
    }
    debug!("chart loop stopped");
}
