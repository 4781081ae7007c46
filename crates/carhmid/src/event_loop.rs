use crate::dispatcher::{Dispatcher, RepeatHandle};
use crate::sinks::{Player, System};
use anyhow::Result;
use carhmi_core::event::Event;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Outcome of a single loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A message arrived and was dispatched.
    Dispatched,
    /// The tick window elapsed; shutdown and repeat were evaluated.
    Tick,
    /// The event feed is gone.
    Closed,
}

/// Single-threaded tick scheduler driving the dispatcher.
pub struct EventLoop<P, S> {
    dispatcher: Dispatcher<P, S>,
    tick: Duration,
    repeat: Option<RepeatHandle>,
}

impl<P: Player, S: System> EventLoop<P, S> {
    pub fn new(dispatcher: Dispatcher<P, S>, tick: Duration) -> Self {
        Self {
            dispatcher,
            tick,
            repeat: None,
        }
    }

    /// Run until the feed closes. Interruption is handled by the caller.
    pub async fn run(&mut self, events: &mut mpsc::UnboundedReceiver<String>) -> Result<()> {
        loop {
            if self.step(events).await == Step::Closed {
                anyhow::bail!("event feed closed");
            }
        }
    }

    /// Wait up to one tick for a message; dispatch it, or do tick work.
    pub async fn step(&mut self, events: &mut mpsc::UnboundedReceiver<String>) -> Step {
        match tokio::time::timeout(self.tick, events.recv()).await {
            Ok(Some(message)) => {
                let event = Event::parse(&message);
                info!(event = %event, "received event");
                // A new dispatch always replaces the previous repeat.
                self.repeat = self.dispatcher.dispatch(&event, now()).await;
                Step::Dispatched
            }
            Ok(None) => Step::Closed,
            Err(_) => {
                self.run_tick().await;
                Step::Tick
            }
        }
    }

    async fn run_tick(&mut self) {
        if self.dispatcher.needs_shutdown(now()) {
            self.dispatcher.shutdown().await;
        }
        if let Some(handle) = self.repeat {
            debug!(action = ?handle.action(), "tick repeat");
            self.dispatcher.repeat(&handle).await;
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<P, S> {
        &self.dispatcher
    }
}

/// Wall clock as seen by the tokio timer, so paused test time applies.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::fakes::{Call, FakePlayer, FakeSystem};
    use carhmi_core::bindings::Bindings;
    use carhmi_core::TICK;

    type TestLoop = EventLoop<FakePlayer, FakeSystem>;

    fn make_loop() -> (TestLoop, mpsc::UnboundedSender<String>, mpsc::UnboundedReceiver<String>) {
        let dispatcher = Dispatcher::new(FakePlayer::default(), FakeSystem::default(), Bindings::builtin(), now());
        let (tx, rx) = mpsc::unbounded_channel();
        (EventLoop::new(dispatcher, TICK), tx, rx)
    }

    fn shutdowns(l: &TestLoop) -> usize {
        l.dispatcher().system().calls.iter().filter(|c| **c == Call::Shutdown).count()
    }

    #[tokio::test(start_paused = true)]
    async fn idle_loop_only_ticks() {
        let (mut l, _tx, mut rx) = make_loop();
        for _ in 0..5 {
            assert_eq!(l.step(&mut rx).await, Step::Tick);
        }
        assert!(l.dispatcher().player().calls.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn repeatable_action_fires_every_tick_until_superseded() {
        let (mut l, tx, mut rx) = make_loop();
        tx.send("volume up press".into()).unwrap();
        assert_eq!(l.step(&mut rx).await, Step::Dispatched);
        assert_eq!(l.dispatcher().player().volume, 52);

        for _ in 0..3 {
            assert_eq!(l.step(&mut rx).await, Step::Tick);
        }
        assert_eq!(l.dispatcher().player().volume, 58);

        tx.send("arrow up press".into()).unwrap();
        assert_eq!(l.step(&mut rx).await, Step::Dispatched);
        for _ in 0..3 {
            l.step(&mut rx).await;
        }
        assert_eq!(l.dispatcher().player().volume, 58);
        assert_eq!(l.dispatcher().player().calls.last(), Some(&Call::Next));
    }

    #[tokio::test(start_paused = true)]
    async fn new_repeatable_replaces_old_one() {
        let (mut l, tx, mut rx) = make_loop();
        tx.send("volume up press".into()).unwrap();
        l.step(&mut rx).await;
        tx.send("volume down press".into()).unwrap();
        l.step(&mut rx).await;
        assert_eq!(l.dispatcher().player().volume, 50);

        l.step(&mut rx).await;
        assert_eq!(l.dispatcher().player().volume, 48);
    }

    #[tokio::test(start_paused = true)]
    async fn unbound_event_clears_repeat() {
        let (mut l, tx, mut rx) = make_loop();
        tx.send("volume up press".into()).unwrap();
        l.step(&mut rx).await;
        tx.send("volume up release".into()).unwrap();
        l.step(&mut rx).await;
        l.step(&mut rx).await;
        assert_eq!(l.dispatcher().player().volume, 52);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_messages_preempt_tick_work() {
        let (mut l, tx, mut rx) = make_loop();
        tx.send("volume up press".into()).unwrap();
        tx.send("rotary right".into()).unwrap();
        tx.send("rotary right".into()).unwrap();
        for _ in 0..3 {
            assert_eq!(l.step(&mut rx).await, Step::Dispatched);
        }
        // no repeat ran between the queued messages
        assert_eq!(l.dispatcher().player().calls, vec![Call::Volume(52), Call::Volume(54), Call::Volume(56)]);
    }

    #[tokio::test(start_paused = true)]
    async fn power_loss_shuts_down_once_after_grace_period() {
        let (mut l, tx, mut rx) = make_loop();
        tx.send("power off".into()).unwrap();
        l.step(&mut rx).await;

        // 2.9s of ticks: still alive
        for _ in 0..29 {
            l.step(&mut rx).await;
        }
        assert_eq!(shutdowns(&l), 0);
        assert!(!l.dispatcher().is_shutting_down());

        for _ in 0..3 {
            l.step(&mut rx).await;
        }
        assert_eq!(shutdowns(&l), 1);
        assert!(l.dispatcher().is_shutting_down());

        for _ in 0..20 {
            l.step(&mut rx).await;
        }
        assert_eq!(shutdowns(&l), 1);
        assert!(l.dispatcher().is_shutting_down());
    }

    #[tokio::test(start_paused = true)]
    async fn power_restored_within_grace_keeps_running() {
        let (mut l, tx, mut rx) = make_loop();
        tx.send("power off".into()).unwrap();
        l.step(&mut rx).await;
        for _ in 0..20 {
            l.step(&mut rx).await;
        }
        tx.send("power on".into()).unwrap();
        l.step(&mut rx).await;
        for _ in 0..50 {
            l.step(&mut rx).await;
        }
        assert_eq!(shutdowns(&l), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mode_interlock_survives_power_loss() {
        let (mut l, tx, mut rx) = make_loop();
        tx.send("mode press".into()).unwrap();
        tx.send("power off".into()).unwrap();
        l.step(&mut rx).await;
        l.step(&mut rx).await;
        for _ in 0..100 {
            l.step(&mut rx).await;
        }
        assert_eq!(shutdowns(&l), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_feed_ends_the_loop() {
        let (mut l, tx, mut rx) = make_loop();
        drop(tx);
        assert_eq!(l.step(&mut rx).await, Step::Closed);
        assert!(l.run(&mut rx).await.is_err());
    }
}
