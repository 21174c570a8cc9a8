use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel};
use tracing::debug;

use crate::controller::LoadRequest;
use crate::models::View;
use crate::render::{self, CardAction};
use crate::transport::{Method, Transport, TransportError};

/// A finished network call, handed back to the UI thread.
#[derive(Debug)]
pub enum Completion {
    Loaded {
        view: View,
        outcome: Result<Value, TransportError>,
    },
    ActionDone {
        action: CardAction,
        outcome: Result<Value, TransportError>,
    },
}

/// Runs transport calls on a background pool so the UI loop keeps handling
/// input while a request is outstanding. Nothing is cancelled; every
/// submitted call completes and is reported.
pub struct Dispatcher {
    runtime: Runtime,
    transport: Arc<dyn Transport>,
    tx: UnboundedSender<Completion>,
    rx: UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("joblog-net")
            .enable_all()
            .build()
            .context("Failed to start network runtime")?;
        let (tx, rx) = unbounded_channel();
        Ok(Self {
            runtime,
            transport,
            tx,
            rx,
            in_flight: 0,
        })
    }

    pub fn submit_load(&mut self, request: LoadRequest) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        self.in_flight += 1;
        debug!(view = %request.view, path = %request.path(), "dispatching load");
        self.runtime.spawn_blocking(move || {
            let outcome = transport.request(Method::Get, &request.path(), None);
            let _ = tx.send(Completion::Loaded {
                view: request.view,
                outcome,
            });
        });
    }

    pub fn submit_action(&mut self, action: CardAction) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        self.in_flight += 1;
        debug!(job_id = action.job_id(), ?action, "dispatching card action");
        self.runtime.spawn_blocking(move || {
            let outcome = render::action_request(transport.as_ref(), &action);
            let _ = tx.send(Completion::ActionDone { action, outcome });
        });
    }

    /// Completions that arrived since the last call, in arrival order.
    pub fn drain(&mut self) -> Vec<Completion> {
        let mut done = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(completion) => done.push(completion),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.in_flight = self.in_flight.saturating_sub(done.len());
        done
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Stops without waiting for outstanding requests.
    pub fn shutdown(self) {
        self.runtime.shutdown_background();
    }
}
