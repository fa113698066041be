#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Tracing instrumentation for callbox function wrappers.
//!
//! This crate provides [`TracingPolicy`], a [`CallPolicy`] that wraps every
//! call of a [`Function`](callbox::Function) in a `tracing` span, and
//! [`CallStatsLayer`], a layer that aggregates those spans into per-target
//! call statistics.
//!
//! # How It Works
//!
//! Choose [`TracingPolicy`] as the policy parameter of a wrapper. Each call
//! then enters a `callbox.call` span carrying the target's type name, the
//! signature, the call mode and the placement. When the call returns, or
//! unwinds, a `call completed` event with the elapsed time and a `panicked`
//! flag is emitted inside that span.
//!
//! # Quick Start
//!
//! ```
//! use callbox::{Function, markers::Local};
//! use callbox_tracing::{CallStatsLayer, TracingPolicy};
//! use tracing_subscriber::{Registry, layer::SubscriberExt};
//!
//! // 1. Set up tracing, optionally with the statistics layer
//! let stats_layer = CallStatsLayer::new();
//! let stats = stats_layer.stats();
//! let subscriber = Registry::default().with(stats_layer);
//!
//! tracing::subscriber::with_default(subscriber, || {
//!     // 2. Use the policy on any wrapper
//!     let f: Function<fn(u32) -> u32, Local, TracingPolicy> = Function::new(|x: u32| x + 1);
//!     assert_eq!(f.call((1,)), 2);
//! });
//!
//! // 3. Inspect what was recorded
//! assert_eq!(stats.snapshot().len(), 1);
//! ```
//!
//! # Environment Variables
//!
//! - `CALLBOX_TRACING` - Comma-separated options:
//!   - `debug` - Emit spans and events at `DEBUG` instead of `TRACE` level
//!   - `nopost` - Do not emit the `call completed` event. [`CallStatsLayer`]
//!     records nothing in that mode.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, OnceLock, PoisonError},
    time::{Duration, Instant},
};

use callbox::{CallInfo, CallPolicy};
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
    span::{Attributes, EnteredSpan, Id},
};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// Name of the span entered around every call.
pub const CALL_SPAN_NAME: &str = "callbox.call";

/// Target of the spans and events emitted by [`TracingPolicy`].
pub const TRACING_TARGET: &str = "callbox";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct CallboxTracingEnvOptions {
    debug_level: bool,
    completion_event: bool,
}

impl Default for CallboxTracingEnvOptions {
    fn default() -> Self {
        Self {
            debug_level: false,
            completion_event: true,
        }
    }
}

impl CallboxTracingEnvOptions {
    fn parse(var: &str) -> Self {
        let mut options = Self::default();
        for v in var.split(',').map(str::trim) {
            if v.eq_ignore_ascii_case("debug") {
                options.debug_level = true;
            } else if v.eq_ignore_ascii_case("nopost") {
                options.completion_event = false;
            }
        }
        options
    }

    fn get() -> &'static Self {
        static CALLBOX_TRACING_FLAGS: OnceLock<CallboxTracingEnvOptions> = OnceLock::new();

        CALLBOX_TRACING_FLAGS.get_or_init(|| match std::env::var_os("CALLBOX_TRACING") {
            Some(var) => Self::parse(&var.to_string_lossy()),
            None => Self::default(),
        })
    }
}

/// A [`CallPolicy`] instrumenting every call with a `tracing` span.
///
/// The span is named [`CALL_SPAN_NAME`] and has the fields `callable`,
/// `signature`, `mode` and `placement`. A `call completed` event with the
/// fields `elapsed_us` and `panicked` is emitted inside it after the call.
///
/// Configuration is controlled by the `CALLBOX_TRACING` environment
/// variable, which is read once.
///
/// # Examples
///
/// ```
/// use callbox::{Function, SendFunction};
/// use callbox_tracing::TracingPolicy;
///
/// let f: SendFunction<fn(&'static str) -> usize, TracingPolicy> =
///     Function::new(|s: &'static str| s.len());
/// assert_eq!(f.call(("four",)), 4);
/// ```
#[derive(Debug)]
pub struct TracingPolicy {
    options: &'static CallboxTracingEnvOptions,
    active: Option<ActiveCall>,
}

#[derive(Debug)]
struct ActiveCall {
    span: EnteredSpan,
    start: Instant,
}

impl Default for TracingPolicy {
    fn default() -> Self {
        Self {
            options: CallboxTracingEnvOptions::get(),
            active: None,
        }
    }
}

impl CallPolicy for TracingPolicy {
    fn precall(&mut self, info: &CallInfo) {
        let span = if self.options.debug_level {
            tracing::debug_span!(
                target: TRACING_TARGET,
                CALL_SPAN_NAME,
                callable = info.target_type_name(),
                signature = info.signature(),
                mode = ?info.mode(),
                placement = ?info.placement()
            )
        } else {
            tracing::trace_span!(
                target: TRACING_TARGET,
                CALL_SPAN_NAME,
                callable = info.target_type_name(),
                signature = info.signature(),
                mode = ?info.mode(),
                placement = ?info.placement()
            )
        };

        self.active = Some(ActiveCall {
            span: span.entered(),
            start: Instant::now(),
        });
    }

    fn postcall(&mut self, _info: &CallInfo) {
        let Some(active) = self.active.take() else {
            return;
        };

        if self.options.completion_event {
            let elapsed_us = u64::try_from(active.start.elapsed().as_micros()).unwrap_or(u64::MAX);
            let panicked = std::thread::panicking();

            if self.options.debug_level {
                tracing::debug!(target: TRACING_TARGET, elapsed_us, panicked, "call completed");
            } else {
                tracing::trace!(target: TRACING_TARGET, elapsed_us, panicked, "call completed");
            }
        }

        drop(active.span);
    }
}

/// Aggregated statistics for one target type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CallSummary {
    /// Number of completed calls, including ones that panicked.
    pub calls: u64,
    /// Number of calls that panicked.
    pub panics: u64,
    /// Total time spent in the target.
    pub total: Duration,
}

impl CallSummary {
    /// Average time spent per call, or zero if there were no calls.
    pub fn mean(&self) -> Duration {
        if self.calls == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total.as_nanos() / u128::from(self.calls);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Shared handle to the statistics collected by a [`CallStatsLayer`].
#[derive(Clone, Debug, Default)]
pub struct CallStats {
    inner: Arc<Mutex<HashMap<String, CallSummary>>>,
}

impl CallStats {
    /// Returns the statistics of the target with the type name `callable`.
    pub fn summary(&self, callable: &str) -> Option<CallSummary> {
        self.lock().get(callable).copied()
    }

    /// Returns the statistics of every target seen so far, sorted by type
    /// name.
    pub fn snapshot(&self) -> Vec<(String, CallSummary)> {
        let mut entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(name, summary)| (name.clone(), *summary))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Forgets everything recorded so far.
    pub fn reset(&self) {
        self.lock().clear();
    }

    fn record(&self, callable: &str, elapsed: Duration, panicked: bool) {
        let mut stats = self.lock();
        let summary = stats.entry(callable.to_owned()).or_default();
        summary.calls += 1;
        summary.panics += u64::from(panicked);
        summary.total = summary.total.saturating_add(elapsed);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CallSummary>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A tracing layer aggregating the spans of [`TracingPolicy`] into
/// per-target [`CallStats`].
///
/// Add it to your subscriber alongside your other layers. It ignores every
/// span and event not produced by [`TracingPolicy`].
///
/// # Examples
///
/// ```
/// use callbox_tracing::CallStatsLayer;
/// use tracing_subscriber::{Registry, layer::SubscriberExt};
///
/// let layer = CallStatsLayer::new();
/// let stats = layer.stats();
///
/// let subscriber = Registry::default()
///     .with(layer)
///     .with(tracing_subscriber::fmt::layer());
///
/// tracing::subscriber::set_global_default(subscriber).expect("failed to set subscriber");
/// assert!(stats.snapshot().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CallStatsLayer {
    stats: CallStats,
}

impl CallStatsLayer {
    /// Creates a new layer with empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the statistics collected by this layer.
    pub fn stats(&self) -> CallStats {
        self.stats.clone()
    }
}

/// Type name of the target, stored in the extensions of a call span.
struct CallTarget(String);

impl<S> Layer<S> for CallStatsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if attrs.metadata().name() != CALL_SPAN_NAME {
            return;
        }
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut visitor = CallableVisitor::default();
        attrs.record(&mut visitor);
        if let Some(callable) = visitor.callable {
            span.extensions_mut().insert(CallTarget(callable));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if event.metadata().target() != TRACING_TARGET {
            return;
        }

        let mut visitor = CompletionVisitor::default();
        event.record(&mut visitor);
        let Some(elapsed_us) = visitor.elapsed_us else {
            return;
        };

        let Some(span) = ctx.event_span(event) else {
            return;
        };
        let extensions = span.extensions();
        if let Some(CallTarget(callable)) = extensions.get::<CallTarget>() {
            self.stats
                .record(callable, Duration::from_micros(elapsed_us), visitor.panicked);
        }
    }
}

#[derive(Default)]
struct CallableVisitor {
    callable: Option<String>,
}

impl Visit for CallableVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "callable" {
            self.callable = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}
}

#[derive(Default)]
struct CompletionVisitor {
    elapsed_us: Option<u64>,
    panicked: bool,
}

impl Visit for CompletionVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "elapsed_us" {
            self.elapsed_us = Some(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "panicked" {
            self.panicked = value;
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}
}
