//! Tracing instrumentation for callbox function wrappers.
//!
//! This example wires [`TracingPolicy`] into a set of request handlers stored
//! as [`Function`]s. Every call opens a `callbox.call` span, so the events the
//! handlers emit are nested under the handler that produced them, and
//! [`CallStatsLayer`] keeps a per-handler count of calls and panics.
//!
//! If you currently use `tracing_subscriber::fmt::init()`, this shows how to
//! expand that setup to add `CallStatsLayer`.

use std::collections::BTreeMap;

use callbox::{Function, markers::Local};
use callbox_tracing::{CallStatsLayer, TracingPolicy};
use tracing::instrument;
use tracing_subscriber::{Registry, layer::SubscriberExt};

#[derive(Debug, thiserror::Error)]
enum ParsePortError {
    #[error("port is empty")]
    Empty,
    #[error("port {0:?} is not a number")]
    NotANumber(&'static str),
    #[error("port 0 is reserved")]
    Reserved,
}

type Handler = Function<fn(&'static str) -> Result<u16, ParsePortError>, Local, TracingPolicy>;

#[instrument]
fn parse_port(input: &'static str) -> Result<u16, ParsePortError> {
    if input.is_empty() {
        return Err(ParsePortError::Empty);
    }
    match input.parse::<u16>() {
        Ok(0) => Err(ParsePortError::Reserved),
        Ok(port) => Ok(port),
        Err(_) => Err(ParsePortError::NotANumber(input)),
    }
}

fn main() {
    let stats_layer = CallStatsLayer::new();
    let stats = stats_layer.stats();

    // This replaces `tracing_subscriber::fmt::init()` to add call statistics
    let subscriber = Registry::default()
        .with(stats_layer)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber).expect("failed to set default subscriber");

    let mut handlers: BTreeMap<&str, Handler> = BTreeMap::new();
    handlers.insert("strict", Function::new(parse_port));

    let fallback = 8080;
    handlers.insert(
        "lenient",
        Function::new(move |input: &'static str| -> Result<u16, ParsePortError> {
            tracing::info!(input, "falling back on bad input");
            Ok(input.parse().unwrap_or(fallback))
        }),
    );

    // A handler that has not been configured yet
    handlers.insert("disabled", Function::empty());

    for input in ["443", "", "http", "0"] {
        for (name, handler) in &handlers {
            match handler.try_call((input,)) {
                Ok(Ok(port)) => println!("{name:>8}: {input:?} -> {port}"),
                Ok(Err(error)) => println!("{name:>8}: {input:?} -> error: {error}"),
                Err(error) => println!("{name:>8}: {input:?} -> {error}"),
            }
        }
    }

    println!();
    println!("Call statistics:");
    for (callable, summary) in stats.snapshot() {
        println!(
            "  {callable}: {} calls, {} panics, {:?} mean",
            summary.calls,
            summary.panics,
            summary.mean()
        );
    }
}
