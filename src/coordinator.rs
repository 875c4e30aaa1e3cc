//! The coordination context: one single-threaded executor on which every
//! observable mutation and outcome delivery runs. Worker threads never touch
//! the graph; they hand values to a [`CoordHandle`], whose consumer task runs
//! the registered handler back on the context.

use std::future::Future;

use tokio::sync::mpsc;

/// Sending half of a typed inbox. Cheap to clone and safe to use from any
/// thread; this is the only way off-context work reaches the graph.
pub struct CoordHandle<T> {
    sender: mpsc::UnboundedSender<T>,
}

impl<T> Clone for CoordHandle<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> CoordHandle<T> {
    pub fn post(&self, value: T) {
        if self.sender.send(value).is_err() {
            log::warn!("Coordination context has shut down, dropping delivery");
        }
    }
}

/// Registers a handler on the coordination context and returns the handle to
/// post values to it. Must be called from within the context (see [`run`]);
/// the handler runs there for every posted value, in post order.
pub fn inbox<T: 'static>(handler: impl Fn(T) + 'static) -> CoordHandle<T> {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    tokio::task::spawn_local(async move {
        while let Some(value) = receiver.recv().await {
            handler(value);
        }
    });
    CoordHandle { sender }
}

/// Drives `future` to completion on a fresh coordination context: a
/// current-thread runtime wrapping a `LocalSet`, so the future may
/// `spawn_local` non-`Send` tasks against the observable graph.
pub fn run<F: Future>(future: F) -> Result<F::Output, std::io::Error> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    Ok(runtime.block_on(local.run_until(future)))
}
