use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::JoinHandle;

/// A capture thread that stops when its stop sender is dropped.
pub(crate) struct Worker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    name: &'static str,
}

impl Worker {
    /// Spawns `body` with a receiver that disconnects when the worker is stopped.
    pub(crate) fn spawn(
        name: &'static str,
        body: impl FnOnce(Receiver<()>) + Send + 'static,
    ) -> std::io::Result<Self> {
        let (stop, stop_rx) = bounded::<()>(0);
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(stop_rx))?;
        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
            name,
        })
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Signals the thread and waits for it to exit.
    pub(crate) fn stop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(target: "session", "[DEVICE] {} thread panicked", self.name);
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
