//! # Print Pipeline
//!
//! Runs one print attempt through an ordered list of render strategies:
//!
//! ```text
//!            ┌────────────── Retrying(failure) ◄─────────────┐
//!            ▼                                               │
//!      Selecting ──► Encoding ──► Transmitting ──► Succeeded │
//!            │           │              │                    │
//!            │           └── encode err ┴── transport err ───┘
//!            ▼
//!   Failed (list exhausted)
//! ```
//!
//! Encoding failures (unmappable or undrawable glyph, oversized raster) and transport
//! failures (unavailable, rejected, timed out) are recorded and the next
//! strategy is tried. The attempt only fails once every strategy has.
//!
//! Cancellation is checked before selecting and again before transmitting;
//! once bytes are on their way they are not interrupted.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{FailureReason, FailureRecord, PrintError};
use crate::receipt::layout::layout;
use crate::receipt::{Receipt, ReceiptBuilder};
use crate::render::glyphs::{self, GlyphEngine};
use crate::strategy::{BuildOptions, RenderStrategy, Selection, build_payload, select, shaping_required};
use crate::transport::{
    Connector, LockPolicy, Payload, SurfaceHandle, TargetLocks, TransportTarget, deliver,
};

/// A successful attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOutcome {
    pub attempt: Uuid,
    pub strategy: RenderStrategy,
    pub target: TransportTarget,
    pub bytes_sent: usize,
    /// Strategies that failed before this one worked, in order.
    pub failures: Vec<FailureRecord>,
}

#[derive(Debug)]
enum State {
    Selecting,
    Encoding(RenderStrategy),
    Transmitting {
        strategy: RenderStrategy,
        target: TransportTarget,
        payload: Payload,
    },
    Retrying(FailureRecord),
}

/// Prints receipts. Cheap to clone; clones share the connector and the
/// target locks.
#[derive(Clone)]
pub struct Pipeline {
    connector: Arc<dyn Connector>,
    locks: Arc<TargetLocks>,
    strategies: Vec<RenderStrategy>,
    options: BuildOptions,
    compositor_queue: Option<String>,
    dialog_surface: Option<SurfaceHandle>,
    engine: Option<Arc<GlyphEngine>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("strategies", &self.strategies)
            .field("options", &self.options)
            .field("compositor_queue", &self.compositor_queue)
            .field("dialog_surface", &self.dialog_surface)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            locks: Arc::new(TargetLocks::new(LockPolicy::Wait)),
            strategies: RenderStrategy::defaults(),
            options: BuildOptions::default(),
            compositor_queue: None,
            dialog_surface: None,
            engine: None,
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<RenderStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Share a lock table with other pipelines talking to the same printers.
    pub fn with_locks(mut self, locks: Arc<TargetLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Spooler queue used by `HostCompositor` when the caller's target is
    /// not a queue.
    pub fn with_compositor_queue(mut self, queue: impl Into<String>) -> Self {
        self.compositor_queue = Some(queue.into());
        self
    }

    /// Surface used by `InteractiveDialog` when the caller's target is not
    /// a dialog.
    pub fn with_dialog_surface(mut self, surface: SurfaceHandle) -> Self {
        self.dialog_surface = Some(surface);
        self
    }

    /// Render with `engine` instead of the process-wide one.
    pub fn with_engine(mut self, engine: Arc<GlyphEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn strategies(&self) -> &[RenderStrategy] {
        &self.strategies
    }

    fn engine(&self) -> &GlyphEngine {
        match &self.engine {
            Some(engine) => engine.as_ref(),
            None => glyphs::engine(),
        }
    }

    /// Target `strategy` transmits to, given the caller's `target`.
    fn bind(
        &self,
        strategy: &RenderStrategy,
        target: &TransportTarget,
    ) -> Result<TransportTarget, FailureReason> {
        match strategy {
            RenderStrategy::DirectText(_) | RenderStrategy::RasterBitmap { .. } => {
                if self.connector.capabilities(target).raw_bytes {
                    Ok(target.clone())
                } else {
                    Err(FailureReason::NoTarget(format!("{target} cannot take raw bytes")))
                }
            }
            RenderStrategy::HostCompositor => match (target, &self.compositor_queue) {
                (TransportTarget::SpoolerQueue(_), _) => Ok(target.clone()),
                (_, Some(queue)) => Ok(TransportTarget::SpoolerQueue(queue.clone())),
                (_, None) => Err(FailureReason::NoTarget("no spooler queue configured".into())),
            },
            RenderStrategy::InteractiveDialog => match (target, &self.dialog_surface) {
                (TransportTarget::HostDialog(_), _) => Ok(target.clone()),
                (_, Some(surface)) => Ok(TransportTarget::HostDialog(surface.clone())),
                (_, None) => Err(FailureReason::NoTarget("no dialog surface attached".into())),
            },
        }
    }

    /// Print `receipt`, falling back through the strategy list.
    pub async fn print(
        &self,
        receipt: &Receipt,
        target: &TransportTarget,
    ) -> Result<PrintOutcome, PrintError> {
        self.print_with_cancel(receipt, target, &CancellationToken::new())
            .await
    }

    /// Validate and print.
    pub async fn print_builder(
        &self,
        builder: ReceiptBuilder,
        target: &TransportTarget,
    ) -> Result<PrintOutcome, PrintError> {
        let receipt = builder.build()?;
        self.print(&receipt, target).await
    }

    pub async fn print_with_cancel(
        &self,
        receipt: &Receipt,
        target: &TransportTarget,
        cancel: &CancellationToken,
    ) -> Result<PrintOutcome, PrintError> {
        let attempt = Uuid::new_v4();
        let span = tracing::info_span!("print", %attempt, %target);
        self.run(attempt, receipt, target, cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        attempt: Uuid,
        receipt: &Receipt,
        target: &TransportTarget,
        cancel: &CancellationToken,
    ) -> Result<PrintOutcome, PrintError> {
        if self.strategies.is_empty() {
            return Err(PrintError::EmptyStrategyList);
        }

        let blocks = layout(receipt);
        let shaping = shaping_required(receipt);
        let mut history: Vec<FailureRecord> = Vec::new();
        let mut state = State::Selecting;

        loop {
            state = match state {
                State::Selecting => {
                    if cancel.is_cancelled() {
                        return Err(PrintError::Cancelled { history });
                    }
                    match select(&self.strategies, &history, shaping) {
                        Selection::Try(strategy) => State::Encoding(strategy),
                        Selection::Skip(record) => State::Retrying(record),
                        Selection::Exhausted => {
                            tracing::error!(failures = history.len(), "every render strategy failed");
                            return Err(PrintError::ExhaustedStrategies { history });
                        }
                    }
                }

                State::Encoding(strategy) => {
                    tracing::debug!(%strategy, "encoding");
                    let built = self.bind(&strategy, target).and_then(|bound| {
                        let capabilities = self.connector.capabilities(&bound);
                        build_payload(&strategy, &blocks, &self.options, capabilities, self.engine())
                            .map(|payload| (bound, payload))
                    });
                    match built {
                        Ok(_) if cancel.is_cancelled() => {
                            return Err(PrintError::Cancelled { history });
                        }
                        Ok((target, payload)) => State::Transmitting {
                            strategy,
                            target,
                            payload,
                        },
                        Err(reason) => State::Retrying(FailureRecord { strategy, reason }),
                    }
                }

                State::Transmitting {
                    strategy,
                    target,
                    payload,
                } => match deliver(self.connector.as_ref(), &self.locks, &target, &payload).await {
                    Ok(bytes_sent) => {
                        tracing::info!(%strategy, bytes_sent, fallbacks = history.len(), "printed");
                        return Ok(PrintOutcome {
                            attempt,
                            strategy,
                            target,
                            bytes_sent,
                            failures: history,
                        });
                    }
                    Err(err) => State::Retrying(FailureRecord {
                        strategy,
                        reason: err.into(),
                    }),
                },

                State::Retrying(record) => {
                    tracing::warn!(
                        strategy = %record.strategy,
                        reason = %record.reason,
                        "strategy failed, falling back"
                    );
                    history.push(record);
                    State::Selecting
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::protocol::codepage::Codepage;
    use crate::transport::Channel;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Accepts everything and remembers what it got.
    #[derive(Default)]
    struct Sink {
        sent: Arc<Mutex<Vec<(TransportTarget, Payload)>>>,
    }

    struct SinkChannel {
        target: TransportTarget,
        sent: Arc<Mutex<Vec<(TransportTarget, Payload)>>>,
    }

    #[async_trait]
    impl Channel for SinkChannel {
        async fn send(&mut self, payload: &Payload) -> Result<(), TransportError> {
            self.sent
                .lock()
                .unwrap()
                .push((self.target.clone(), payload.clone()));
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Connector for Sink {
        async fn open(&self, target: &TransportTarget) -> Result<Box<dyn Channel>, TransportError> {
            Ok(Box::new(SinkChannel {
                target: target.clone(),
                sent: Arc::clone(&self.sent),
            }))
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(Arc::new(Sink::default())).with_engine(Arc::new(GlyphEngine::builtin()))
    }

    fn tcp() -> TransportTarget {
        TransportTarget::NetworkSocket {
            host: "printer.local".into(),
            port: 9100,
        }
    }

    #[tokio::test]
    async fn test_latin_prints_as_text() {
        let receipt = Receipt::builder("STORE").build().unwrap();
        let outcome = pipeline().print(&receipt, &tcp()).await.unwrap();
        assert_eq!(outcome.strategy, RenderStrategy::DirectText(Codepage::PC437));
        assert!(outcome.failures.is_empty());
        assert!(outcome.bytes_sent > 0);
    }

    #[tokio::test]
    async fn test_arabic_skips_text() {
        // The builtin font has no Arabic, so raster gives way too.
        let outcome = pipeline()
            .with_compositor_queue("office")
            .print(&Receipt::sample_arabic(), &tcp())
            .await
            .unwrap();
        assert_eq!(outcome.strategy, RenderStrategy::HostCompositor);
        let reasons: Vec<_> = outcome.failures.iter().map(|r| &r.reason).collect();
        assert!(matches!(
            reasons[..],
            [
                FailureReason::ShapingRequired { .. },
                FailureReason::MissingGlyph { .. }
            ]
        ));
    }

    #[tokio::test]
    async fn test_byte_strategies_need_a_byte_target() {
        let pipeline = pipeline().with_strategies(vec![RenderStrategy::raster()]);
        let dialog = TransportTarget::HostDialog(SurfaceHandle("main".into()));
        let err = pipeline
            .print(&Receipt::builder("STORE").build().unwrap(), &dialog)
            .await
            .unwrap_err();
        assert!(matches!(
            err.history()[0].reason,
            FailureReason::NoTarget(_)
        ));
    }

    #[tokio::test]
    async fn test_compositor_uses_configured_queue() {
        let sink = Arc::new(Sink::default());
        let pipeline = Pipeline::new(sink.clone())
            .with_strategies(vec![RenderStrategy::HostCompositor])
            .with_compositor_queue("office");
        let outcome = pipeline
            .print(&Receipt::sample_arabic(), &tcp())
            .await
            .unwrap();
        assert_eq!(outcome.target, TransportTarget::SpoolerQueue("office".into()));
        let sent = sink.sent.lock().unwrap();
        assert!(matches!(sent[0].1, Payload::Document(_)));
    }

    #[tokio::test]
    async fn test_empty_list() {
        let err = pipeline()
            .with_strategies(Vec::new())
            .print(&Receipt::builder("STORE").build().unwrap(), &tcp())
            .await
            .unwrap_err();
        assert!(matches!(err, PrintError::EmptyStrategyList));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = pipeline()
            .print_with_cancel(&Receipt::builder("STORE").build().unwrap(), &tcp(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PrintError::Cancelled { ref history } if history.is_empty()));
    }

    #[tokio::test]
    async fn test_invalid_builder() {
        let err = pipeline()
            .print_builder(Receipt::builder("  "), &tcp())
            .await
            .unwrap_err();
        assert!(matches!(err, PrintError::InvalidReceipt(_)));
    }
}
