//! Search-as-you-type plumbing.
//!
//! A [`SearchPipeline`] sits between keystrokes and an async search. Queries are
//! held back until the input has been quiet for the debounce period, a query equal
//! to the previously sent one is dropped, and sending a new query cancels the search
//! still running for the old one. Only the newest query can therefore deliver
//! results.

use std::{future::Future, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};

#[derive(Debug)]
enum Command {
    Query(String),
    Reset,
}

/// Write side of a pipeline. Cheap to clone; the pipeline stops once every
/// handle is dropped.
#[derive(Debug, Clone)]
pub struct SearchInput {
    commands: mpsc::UnboundedSender<Command>,
}

impl SearchInput {
    /// Offer the latest text of the search box.
    pub fn push(&self, query: impl Into<String>) {
        if self.commands.send(Command::Query(query.into())).is_err() {
            tracing::debug!("search pipeline closed, dropping query");
        }
    }

    /// Forget the pending query, cancel the running search and clear the
    /// last-sent query so that retyping it searches again.
    pub fn reset(&self) {
        if self.commands.send(Command::Reset).is_err() {
            tracing::debug!("search pipeline closed, nothing to reset");
        }
    }
}

/// Read side of a pipeline.
#[derive(Debug)]
pub struct SearchOutput<T> {
    results: mpsc::UnboundedReceiver<T>,
}

impl<T> SearchOutput<T> {
    /// Next batch of results, or `None` once the pipeline has stopped.
    pub async fn next(&mut self) -> Option<T> {
        self.results.recv().await
    }
}

#[derive(Debug)]
pub struct SearchPipeline<T> {
    input: SearchInput,
    output: SearchOutput<T>,
}

impl<T: Send + 'static> SearchPipeline<T> {
    /// Start the pipeline on the current tokio runtime.
    pub fn spawn<F, Fut>(delay: Duration, search: F) -> Self
    where
        F: Fn(String) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        tokio::spawn(drive(command_rx, result_tx, delay, search));

        Self {
            input: SearchInput { commands: command_tx },
            output: SearchOutput { results: result_rx },
        }
    }

    pub fn push(&self, query: impl Into<String>) {
        self.input.push(query);
    }

    pub fn reset(&self) {
        self.input.reset();
    }

    pub async fn next(&mut self) -> Option<T> {
        self.output.next().await
    }

    pub fn split(self) -> (SearchInput, SearchOutput<T>) {
        (self.input, self.output)
    }
}

enum Step {
    Input(Command),
    Quiet,
    Closed,
}

async fn drive<T, F, Fut>(
    mut commands: mpsc::UnboundedReceiver<Command>,
    results: mpsc::UnboundedSender<T>,
    delay: Duration,
    search: F,
) where
    T: Send + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    let mut last_sent: Option<String> = None;
    let mut in_flight: Option<JoinHandle<()>> = None;
    let mut pending: Option<String> = None;

    loop {
        let step = match pending {
            // Nothing typed yet: wait for input without a deadline.
            None => match commands.recv().await {
                Some(command) => Step::Input(command),
                None => Step::Closed,
            },
            Some(_) => tokio::select! {
                next = commands.recv() => match next {
                    Some(command) => Step::Input(command),
                    None => Step::Closed,
                },
                _ = tokio::time::sleep(delay) => Step::Quiet,
            },
        };

        match step {
            Step::Input(Command::Query(query)) => pending = Some(query),
            Step::Input(Command::Reset) => {
                pending = None;
                last_sent = None;
                if let Some(handle) = in_flight.take() {
                    handle.abort();
                }
            }
            Step::Quiet => {
                let Some(query) = pending.take() else { continue };

                if last_sent.as_deref() == Some(query.as_str()) {
                    tracing::trace!(query = %query, "query unchanged, not searching again");
                    continue;
                }

                if let Some(handle) = in_flight.take() {
                    handle.abort();
                }

                tracing::debug!(query = %query, "debounced query");
                last_sent = Some(query.clone());

                let fut = search(query);
                let results = results.clone();
                in_flight = Some(tokio::spawn(async move {
                    let _ = results.send(fut.await);
                }));
            }
            Step::Closed => break,
        }
    }

    if let Some(handle) = in_flight {
        handle.abort();
    }
}
