//! Test fixtures for scripted backends and project directories.

use gb_core::backend::{MockBackend, MockStep};
use gb_protocol::ipc::Event;
use gb_protocol::pipeline_models::StepName;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Step timings of the reference build: 5 / 8 / 2 / 10 / 20 / 3 seconds.
#[allow(dead_code)]
pub const REFERENCE_TIMINGS: [(StepName, u64); 6] = [
    (StepName::Crawling, 5),
    (StepName::Structuring, 8),
    (StepName::Line1, 2),
    (StepName::Document, 10),
    (StepName::Indexing, 20),
    (StepName::Update, 3),
];

/// A backend whose steps take the reference timings of (tokio) time and
/// report no execution time of their own.
#[allow(dead_code)]
pub fn timed_backend() -> MockBackend {
    REFERENCE_TIMINGS
        .into_iter()
        .fold(MockBackend::success(), |backend, (step, secs)| {
            backend.with_step(step, MockStep::after_secs(secs))
        })
}

/// Create a temporary project directory with a `.graphbuild/config.toml`
/// pointing at `base_url`.
///
/// Returns a TempDir that must be kept alive for the test duration.
#[allow(dead_code)]
pub fn create_test_project(base_url: &str) -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let gb_dir = temp_dir.path().join(".graphbuild");
    std::fs::create_dir_all(&gb_dir)?;
    std::fs::write(
        gb_dir.join("config.toml"),
        format!("[backend]\nbase-url = \"{base_url}\"\nrequest-timeout-secs = 5\n\n[status]\npoll-interval-secs = 1\nmax-polls = 3\n"),
    )?;
    Ok(temp_dir)
}

/// An event channel large enough for any single run.
#[allow(dead_code)]
pub fn event_channel() -> (mpsc::Sender<Event>, mpsc::Receiver<Event>) {
    mpsc::channel(256)
}

/// Drain every event already sent on a closed or finished channel.
#[allow(dead_code)]
pub async fn drain(rx: &mut mpsc::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
