//! ISS position poller.
//!
//! A background thread owns a tokio runtime, the repeat timer and the single in-flight
//! request. Each request is tagged with a generation; issuing a new one aborts the
//! previous task, and `dispatch` drops any outcome whose generation is no longer
//! current. Subscribers are only ever invoked from `dispatch`, on the caller's thread.

use anyhow::{Context, Result};
use bevy::log::{debug, info, warn};
use bevy::prelude::Resource;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{
    Arc, Mutex,
    mpsc::{self, Receiver, Sender},
};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::iss::fetcher::{PositionSource, fetch_position};
use crate::iss::types::{IssError, MIN_POLL_INTERVAL, PollCommand, PollOutcome, PositionFix};

/// Receives the results of completed polls.
pub trait PositionSubscriber {
    fn on_update(&mut self, fix: PositionFix);
    fn on_error(&mut self, error: IssError);
}

/// Adapts a pair of closures into a [`PositionSubscriber`].
pub struct Callbacks<U, E> {
    pub on_update: U,
    pub on_error: E,
}

impl<U, E> PositionSubscriber for Callbacks<U, E>
where
    U: FnMut(PositionFix),
    E: FnMut(IssError),
{
    fn on_update(&mut self, fix: PositionFix) {
        (self.on_update)(fix)
    }

    fn on_error(&mut self, error: IssError) {
        (self.on_error)(error)
    }
}

/// Request generation shared by the host (manual polls, stop) and the worker (ticks).
#[derive(Default)]
struct Generation {
    counter: AtomicU64,
    ticking: AtomicBool,
}

impl Generation {
    fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    fn bump(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Bump only while the timer is meant to be running. A concurrent `stop` either
    /// makes this return `None` or bumps past the returned value.
    fn bump_if_ticking(&self) -> Option<u64> {
        loop {
            let current = self.counter.load(Ordering::SeqCst);
            if !self.ticking.load(Ordering::SeqCst) {
                return None;
            }
            if self
                .counter
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Some(current + 1);
            }
        }
    }

    fn set_ticking(&self, ticking: bool) {
        self.ticking.store(ticking, Ordering::SeqCst);
    }
}

#[derive(Resource)]
pub struct PositionPoller {
    cmd_tx: UnboundedSender<PollCommand>,
    res_rx: Arc<Mutex<Receiver<PollOutcome>>>,
    generation: Arc<Generation>,
    running: bool,
}

impl PositionPoller {
    /// Start the worker thread. Nothing is fetched until `start` or `poll`.
    pub fn spawn<S: PositionSource>(source: S, radius: f64) -> Result<Self> {
        let runtime = tokio::runtime::Runtime::new().context("tokio runtime for ISS poller")?;
        let (cmd_tx, cmd_rx) = unbounded_channel::<PollCommand>();
        let (res_tx, res_rx) = mpsc::channel::<PollOutcome>();
        let generation = Arc::new(Generation::default());

        let worker = Worker {
            source: Arc::new(source),
            radius,
            generation: Arc::clone(&generation),
            res_tx,
            in_flight: None,
        };

        thread::Builder::new()
            .name("iss-poller".to_string())
            .spawn(move || runtime.block_on(worker.run(cmd_rx)))
            .context("spawn ISS poller thread")?;

        Ok(Self {
            cmd_tx,
            res_rx: Arc::new(Mutex::new(res_rx)),
            generation,
            running: false,
        })
    }

    /// Poll now and then every `interval` until `stop`. Intervals shorter than
    /// [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn start(&mut self, interval: Duration) {
        let interval = interval.max(MIN_POLL_INTERVAL);
        self.generation.set_ticking(true);
        self.running = true;
        info!(interval_ms = interval.as_millis() as u64, "ISS poller started");
        self.send(PollCommand::Start { interval });
    }

    /// One fetch-decode-convert cycle, superseding any request still outstanding.
    pub fn poll(&mut self) {
        let generation = self.generation.bump();
        self.send(PollCommand::Fetch { generation });
    }

    /// Cancel the timer and any in-flight request. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.generation.set_ticking(false);
        self.generation.bump();
        if self.running {
            info!("ISS poller stopped");
        }
        self.running = false;
        self.send(PollCommand::Stop);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    /// Deliver completed polls to `subscriber`. Outcomes of superseded or cancelled
    /// requests are dropped. Returns the number delivered.
    pub fn dispatch(&mut self, subscriber: &mut impl PositionSubscriber) -> usize {
        let guard = self.res_rx.lock().unwrap_or_else(|poisoned| {
            warn!("ISS result channel lock was poisoned by a panicking subscriber");
            self.res_rx.clear_poison();
            poisoned.into_inner()
        });
        let current = self.generation.current();
        let mut delivered = 0;

        while let Ok(outcome) = guard.try_recv() {
            if outcome.generation != current {
                debug!(
                    generation = outcome.generation,
                    current, "discarding superseded ISS poll"
                );
                continue;
            }
            match outcome.result {
                Ok(fix) => subscriber.on_update(fix),
                Err(err) => subscriber.on_error(err),
            }
            delivered += 1;
        }

        delivered
    }

    fn send(&self, cmd: PollCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            warn!("ISS poller worker is gone; command dropped");
        }
    }
}

struct Worker<S> {
    source: Arc<S>,
    radius: f64,
    generation: Arc<Generation>,
    res_tx: Sender<PollOutcome>,
    in_flight: Option<(u64, JoinHandle<()>)>,
}

impl<S: PositionSource> Worker<S> {
    async fn run(mut self, mut cmd_rx: UnboundedReceiver<PollCommand>) {
        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(PollCommand::Start { interval }) => {
                        // First tick fires immediately.
                        let mut t = tokio::time::interval(interval);
                        t.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        ticker = Some(t);
                    }
                    Some(PollCommand::Fetch { generation }) => {
                        // A tick may already have issued a newer request.
                        if generation == self.generation.current() {
                            self.spawn_fetch(generation).await;
                        }
                    }
                    Some(PollCommand::Stop) => {
                        ticker = None;
                        self.cancel_in_flight().await;
                    }
                    None => break,
                },
                _ = next_tick(&mut ticker) => {
                    if let Some(generation) = self.generation.bump_if_ticking() {
                        self.spawn_fetch(generation).await;
                    }
                }
            }
        }

        self.cancel_in_flight().await;
        debug!("ISS poller worker exiting");
    }

    async fn spawn_fetch(&mut self, generation: u64) {
        self.cancel_in_flight().await;

        let source = Arc::clone(&self.source);
        let res_tx = self.res_tx.clone();
        let radius = self.radius;
        let handle = tokio::spawn(async move {
            let result = fetch_position(source.as_ref(), radius).await;
            if let Err(err) = &result {
                warn!(generation, "ISS position poll failed: {}", err);
            }
            let _ = res_tx.send(PollOutcome { generation, result });
        });
        self.in_flight = Some((generation, handle));
    }

    /// Abort the outstanding request and wait until its task is gone, so the next one
    /// never overlaps it.
    async fn cancel_in_flight(&mut self) {
        let Some((generation, handle)) = self.in_flight.take() else {
            return;
        };
        if !handle.is_finished() {
            debug!(generation, "cancelling in-flight ISS request");
            handle.abort();
        }
        let _ = handle.await;
    }
}

async fn next_tick(ticker: &mut Option<Interval>) -> Instant {
    match ticker {
        Some(t) => t.tick().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iss::types::IssErrorKind;
    use std::future::Future;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone)]
    enum Reply {
        Body(String),
        Fail(&'static str),
    }

    fn body(lat: &str, lng: &str) -> Reply {
        Reply::Body(format!(
            r#"{{"message":"success","iss_position":{{"latitude":"{lat}","longitude":"{lng}"}}}}"#
        ))
    }

    struct InFlight {
        now: Arc<AtomicUsize>,
    }

    impl Drop for InFlight {
        fn drop(&mut self) {
            self.now.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Replies from a script, one entry per call; the last entry repeats.
    struct ScriptedSource {
        script: Vec<(Duration, Reply)>,
        calls: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<(Duration, Reply)>) -> Self {
            Self {
                script,
                calls: Arc::new(AtomicUsize::new(0)),
                in_flight: Arc::new(AtomicUsize::new(0)),
                max_in_flight: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl PositionSource for ScriptedSource {
        fn fetch(&self) -> impl Future<Output = Result<String, IssError>> + Send {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay, reply) = self.script[idx.min(self.script.len() - 1)].clone();
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let guard = InFlight {
                now: Arc::clone(&self.in_flight),
            };
            async move {
                let _guard = guard;
                tokio::time::sleep(delay).await;
                match reply {
                    Reply::Body(body) => Ok(body),
                    Reply::Fail(msg) => Err(IssError::Network(msg.to_string())),
                }
            }
        }
    }

    #[derive(Default)]
    struct Recorded {
        fixes: Vec<PositionFix>,
        errors: Vec<IssErrorKind>,
    }

    impl PositionSubscriber for Recorded {
        fn on_update(&mut self, fix: PositionFix) {
            self.fixes.push(fix);
        }

        fn on_error(&mut self, error: IssError) {
            self.errors.push(error.kind());
        }
    }

    fn collect_for(poller: &mut PositionPoller, rec: &mut Recorded, wait: Duration) {
        let deadline = std::time::Instant::now() + wait;
        while std::time::Instant::now() < deadline {
            poller.dispatch(rec);
            thread::sleep(Duration::from_millis(5));
        }
        poller.dispatch(rec);
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn single_poll_delivers_update() {
        let source = ScriptedSource::new(vec![(ms(5), body("10.5", "-20.25"))]);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();
        let mut rec = Recorded::default();

        poller.poll();
        collect_for(&mut poller, &mut rec, ms(300));

        assert_eq!(rec.fixes.len(), 1);
        assert!(rec.errors.is_empty());
        assert!((rec.fixes[0].coordinate.latitude - 10.5).abs() < 1e-9);
        assert!((rec.fixes[0].point.length() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn newer_poll_cancels_outstanding_one() {
        let source = ScriptedSource::new(vec![
            (ms(300), body("1.0", "1.0")),
            (ms(20), body("2.0", "2.0")),
        ]);
        let calls = Arc::clone(&source.calls);
        let max_in_flight = Arc::clone(&source.max_in_flight);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();
        let mut rec = Recorded::default();

        poller.poll();
        thread::sleep(ms(100));
        poller.poll();
        collect_for(&mut poller, &mut rec, ms(600));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(rec.fixes.len(), 1);
        assert!((rec.fixes[0].coordinate.latitude - 2.0).abs() < 1e-9);
        assert!(rec.errors.is_empty());
    }

    #[test]
    fn completed_but_superseded_result_is_discarded() {
        let source = ScriptedSource::new(vec![
            (ms(5), body("1.0", "1.0")),
            (ms(150), body("2.0", "2.0")),
        ]);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();
        let mut rec = Recorded::default();

        poller.poll();
        // Let the first finish without dispatching it.
        thread::sleep(ms(100));
        poller.poll();
        collect_for(&mut poller, &mut rec, ms(500));

        assert_eq!(rec.fixes.len(), 1);
        assert!((rec.fixes[0].coordinate.latitude - 2.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_json_reports_decode_error_only() {
        let source = ScriptedSource::new(vec![(ms(5), Reply::Body("<html>".to_string()))]);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();
        let mut rec = Recorded::default();

        poller.poll();
        collect_for(&mut poller, &mut rec, ms(300));

        assert!(rec.fixes.is_empty());
        assert_eq!(rec.errors, vec![IssErrorKind::Decode]);
    }

    #[test]
    fn non_numeric_coordinate_reports_error_without_panicking() {
        let source = ScriptedSource::new(vec![(ms(5), body("10.5", "not-a-number"))]);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();
        let mut rec = Recorded::default();

        poller.poll();
        collect_for(&mut poller, &mut rec, ms(300));

        assert!(rec.fixes.is_empty());
        assert_eq!(rec.errors, vec![IssErrorKind::InvalidCoordinate]);
    }

    #[test]
    fn transport_failure_reports_network_error() {
        let source = ScriptedSource::new(vec![(ms(5), Reply::Fail("connection refused"))]);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();
        let mut rec = Recorded::default();

        poller.poll();
        collect_for(&mut poller, &mut rec, ms(300));

        assert_eq!(rec.errors, vec![IssErrorKind::Network]);
    }

    #[test]
    fn stop_cancels_in_flight_request_and_is_idempotent() {
        let source = ScriptedSource::new(vec![(ms(200), body("1.0", "1.0"))]);
        let in_flight = Arc::clone(&source.in_flight);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();
        let mut rec = Recorded::default();

        poller.poll();
        thread::sleep(ms(50));
        poller.stop();
        poller.stop();
        collect_for(&mut poller, &mut rec, ms(400));

        assert!(rec.fixes.is_empty());
        assert!(rec.errors.is_empty());
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
        assert!(!poller.is_running());
    }

    #[test]
    fn timer_polls_immediately_and_repeatedly_until_stopped() {
        let source = ScriptedSource::new(vec![(ms(2), body("3.0", "4.0"))]);
        let calls = Arc::clone(&source.calls);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();
        let mut rec = Recorded::default();

        poller.start(ms(100));
        assert!(poller.is_running());
        collect_for(&mut poller, &mut rec, ms(400));
        assert!(rec.fixes.len() >= 3, "got {} fixes", rec.fixes.len());

        poller.stop();
        thread::sleep(ms(20));
        let calls_at_stop = calls.load(Ordering::SeqCst);
        let mut after = Recorded::default();
        collect_for(&mut poller, &mut after, ms(200));

        assert!(after.fixes.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), calls_at_stop);
    }

    #[test]
    fn slow_requests_are_superseded_by_ticks() {
        let source = ScriptedSource::new(vec![(ms(250), body("5.0", "6.0"))]);
        let calls = Arc::clone(&source.calls);
        let max_in_flight = Arc::clone(&source.max_in_flight);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();
        let mut rec = Recorded::default();

        poller.start(ms(100));
        collect_for(&mut poller, &mut rec, ms(450));
        poller.stop();

        assert!(calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert!(rec.fixes.is_empty());
    }

    #[test]
    fn zero_interval_is_raised_to_minimum() {
        let source = ScriptedSource::new(vec![(ms(2), body("7.0", "8.0"))]);
        let calls = Arc::clone(&source.calls);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();
        let mut rec = Recorded::default();

        poller.start(Duration::ZERO);
        collect_for(&mut poller, &mut rec, ms(250));
        poller.stop();
        // Ticks at 0, 100 and 200 ms.
        let ticked = calls.load(Ordering::SeqCst);
        assert!((2..=4).contains(&ticked), "ticked {ticked} times");
        assert!(!rec.fixes.is_empty());

        // The worker survived: a manual poll still goes through.
        let mut after = Recorded::default();
        poller.poll();
        collect_for(&mut poller, &mut after, ms(200));
        assert_eq!(after.fixes.len(), 1);
        assert!(after.errors.is_empty());
    }

    #[test]
    fn panicking_subscriber_does_not_block_later_dispatch() {
        let source = ScriptedSource::new(vec![(ms(2), body("9.0", "10.0"))]);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();

        poller.poll();
        thread::sleep(ms(100));
        let mut exploding = Callbacks {
            on_update: |fix: PositionFix| {
                if fix.point.length() > 0.0 {
                    panic!("subscriber failure");
                }
            },
            on_error: |_err: IssError| {},
        };
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            poller.dispatch(&mut exploding)
        }));
        assert!(outcome.is_err());

        let mut rec = Recorded::default();
        poller.poll();
        collect_for(&mut poller, &mut rec, ms(200));
        assert_eq!(rec.fixes.len(), 1);
    }

    #[test]
    fn closure_callbacks_receive_results() {
        let source = ScriptedSource::new(vec![(ms(5), body("-33.9", "151.2"))]);
        let mut poller = PositionPoller::spawn(source, 1.0).unwrap();
        let mut points = Vec::new();
        let mut failures = 0;

        poller.poll();
        {
            let mut callbacks = Callbacks {
                on_update: |fix: PositionFix| points.push(fix.point),
                on_error: |_err: IssError| failures += 1,
            };
            let deadline = std::time::Instant::now() + ms(300);
            while std::time::Instant::now() < deadline {
                poller.dispatch(&mut callbacks);
                thread::sleep(ms(5));
            }
        }

        assert_eq!(points.len(), 1);
        assert_eq!(failures, 0);
        assert!((points[0].length() - 1.0).abs() < 1e-12);
        assert!(points[0].z < 0.0);
    }

    #[test]
    fn generation_advances_per_poll_and_stop() {
        let source = ScriptedSource::new(vec![(ms(5), body("0", "0"))]);
        let mut poller = PositionPoller::spawn(source, 0.25).unwrap();
        assert_eq!(poller.generation(), 0);
        poller.poll();
        poller.poll();
        assert_eq!(poller.generation(), 2);
        poller.stop();
        assert_eq!(poller.generation(), 3);
    }
}
