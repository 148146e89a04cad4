/// Simulation execution loop.
///
/// Drives the scheduler: pops events, advances virtual time, dispatches
/// to a user-supplied handler. The loop is purely synchronous and
/// single-threaded — determinism is trivial. A handler may call
/// [`SimulationContext::stop`] to halt the run; every not-yet-executed
/// event is then discarded without running.

use tracing::debug;

use crate::event::{Event, EventId};
use crate::scheduler::Scheduler;
use crate::time::VirtualTime;

// ── Handler trait ─────────────────────────────────────────────────────

/// User-defined event handler.
///
/// Implement this trait to react to dispatched events. The handler
/// receives a mutable reference to `SimulationContext` so it can
/// schedule follow-up events or stop the run.
pub trait EventHandler<A> {
    /// Called for every dispatched event.
    fn handle(&mut self, ctx: &mut SimulationContext<'_, A>, event: &Event<A>);
}

/// A handler backed by a closure — useful for tests and one-off scripts.
impl<A, F> EventHandler<A> for F
where
    F: FnMut(&mut SimulationContext<'_, A>, &Event<A>),
{
    fn handle(&mut self, ctx: &mut SimulationContext<'_, A>, event: &Event<A>) {
        (self)(ctx, event);
    }
}

// ── Simulation Context ───────────────────────────────────────────────

/// Mutable context passed to the handler on every event dispatch.
///
/// Provides the handler with:
/// - the current virtual time
/// - the ability to schedule follow-up events
/// - a once-only stop switch
///
/// The context borrows the scheduler mutably, so a handler cannot
/// interfere with dispatch ordering outside of the schedule API.
pub struct SimulationContext<'a, A> {
    pub(crate) scheduler: &'a mut Scheduler<A>,
    pub(crate) now: VirtualTime,
    pub(crate) halted: &'a mut bool,
}

impl<A> SimulationContext<'_, A> {
    /// Current virtual time.
    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Schedule an action `delay` ticks into the future relative to now.
    ///
    /// # Panics
    /// Panics on arithmetic overflow (astronomically unlikely).
    pub fn schedule_after(&mut self, delay: u64, payload: A) -> EventId {
        let at = self
            .now
            .advance(delay)
            .expect("VirtualTime overflow when scheduling");
        self.scheduler.schedule(at, payload)
    }

    /// Halt the run after the current handler returns.
    ///
    /// All remaining pending events are discarded without executing.
    /// Calling this more than once is harmless.
    pub fn stop(&mut self) {
        *self.halted = true;
    }

    /// Number of pending events in the scheduler.
    pub fn pending_count(&self) -> usize {
        self.scheduler.len()
    }
}

// ── Simulation ────────────────────────────────────────────────────────

/// Top-level simulation driver.
///
/// Owns the scheduler and tracks the current virtual time.
/// Call `run` to execute until the queue drains or a handler stops the
/// run, or `step` to advance by exactly one event.
#[derive(Debug)]
pub struct Simulation<A> {
    scheduler: Scheduler<A>,
    current_time: VirtualTime,
    events_processed: u64,
    halted: bool,
}

impl<A> Simulation<A> {
    /// Create a new simulation starting at time zero.
    pub fn new() -> Self {
        Simulation {
            scheduler: Scheduler::new(),
            current_time: VirtualTime::ZERO,
            events_processed: 0,
            halted: false,
        }
    }

    /// Current virtual time.
    pub fn current_time(&self) -> VirtualTime {
        self.current_time
    }

    /// Total events processed so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Returns `true` once a handler has stopped the run.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Schedule an action before the simulation starts running.
    pub fn schedule(&mut self, at: VirtualTime, payload: A) -> EventId {
        self.scheduler.schedule(at, payload)
    }

    /// Execute a single step: pop one event, advance time, dispatch.
    ///
    /// Returns `Some(event)` if an event was processed, `None` if the
    /// queue is empty or the run has been stopped.
    pub fn step(&mut self, handler: &mut dyn EventHandler<A>) -> Option<Event<A>> {
        if self.halted {
            return None;
        }
        let event = self.scheduler.pop_next()?;

        // Virtual time must never go backward.
        assert!(
            event.scheduled_at >= self.current_time,
            "Time went backward! current={}, event={}",
            self.current_time,
            event.scheduled_at
        );
        self.current_time = event.scheduled_at;
        self.events_processed += 1;

        let mut ctx = SimulationContext {
            scheduler: &mut self.scheduler,
            now: self.current_time,
            halted: &mut self.halted,
        };
        handler.handle(&mut ctx, &event);

        if self.halted {
            let discarded = self.scheduler.clear();
            debug!(
                at = self.current_time.ticks(),
                discarded, "run stopped; pending events discarded"
            );
        }

        Some(event)
    }

    /// Run until the event queue drains or a handler stops the run.
    ///
    /// Returns the total number of events processed during this run.
    pub fn run(&mut self, handler: &mut dyn EventHandler<A>) -> u64 {
        let start = self.events_processed;
        while self.step(handler).is_some() {}
        self.events_processed - start
    }

    /// Run until the queue drains, the run is stopped, **or** `max_steps`
    /// events have been dispatched, whichever comes first.
    ///
    /// Returns the number of events processed in this call.
    pub fn run_for(&mut self, max_steps: u64, handler: &mut dyn EventHandler<A>) -> u64 {
        let start = self.events_processed;
        let mut steps = 0u64;
        while steps < max_steps {
            if self.step(handler).is_none() {
                break;
            }
            steps += 1;
        }
        self.events_processed - start
    }

    /// Returns `true` if there are no more events to process.
    pub fn is_finished(&self) -> bool {
        self.halted || self.scheduler.is_empty()
    }
}

impl<A> Default for Simulation<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_execution_loop() {
        let mut sim = Simulation::new();

        sim.schedule(VirtualTime::new(10), "a");
        sim.schedule(VirtualTime::new(20), "b");
        sim.schedule(VirtualTime::new(30), "c");

        let mut log: Vec<&str> = Vec::new();

        let processed = sim.run(&mut |_ctx: &mut SimulationContext<'_, _>, event: &Event<_>| {
            log.push(event.payload);
        });

        assert_eq!(processed, 3);
        assert_eq!(log, vec!["a", "b", "c"]);
        assert_eq!(sim.current_time(), VirtualTime::new(30));
    }

    #[test]
    fn test_handler_schedules_followup() {
        let mut sim = Simulation::new();

        // Seed a single event.
        sim.schedule(VirtualTime::ZERO, "start");

        let mut log: Vec<(u64, &str)> = Vec::new();

        sim.run(&mut |ctx: &mut SimulationContext<'_, _>, event: &Event<_>| {
            log.push((ctx.now().ticks(), event.payload));

            // Schedule a follow-up 10 ticks later, up to tick 30.
            if ctx.now().ticks() < 30 {
                ctx.schedule_after(10, "ping");
            }
        });

        assert_eq!(
            log,
            vec![(0, "start"), (10, "ping"), (20, "ping"), (30, "ping")]
        );
        assert_eq!(sim.current_time(), VirtualTime::new(30));
    }

    #[test]
    fn test_stop_discards_pending_events() {
        let mut sim = Simulation::new();

        sim.schedule(VirtualTime::new(5), "first");
        sim.schedule(VirtualTime::new(15), "never");
        sim.schedule(VirtualTime::new(25), "never");

        let mut seen = Vec::new();
        let processed = sim.run(&mut |ctx: &mut SimulationContext<'_, _>, event: &Event<_>| {
            seen.push(event.payload);
            ctx.stop();
        });

        assert_eq!(processed, 1);
        assert_eq!(seen, vec!["first"]);
        assert!(sim.is_halted());
        assert!(sim.is_finished());
        // Time froze at the stopping event.
        assert_eq!(sim.current_time(), VirtualTime::new(5));
    }

    #[test]
    fn test_step_by_step() {
        let mut sim = Simulation::new();

        sim.schedule(VirtualTime::new(5), ());
        sim.schedule(VirtualTime::new(15), ());

        let mut noop = |_ctx: &mut SimulationContext<'_, ()>, _event: &Event<()>| {};

        let first = sim.step(&mut noop).unwrap();
        assert_eq!(first.scheduled_at, VirtualTime::new(5));
        assert_eq!(sim.current_time(), VirtualTime::new(5));

        let second = sim.step(&mut noop).unwrap();
        assert_eq!(second.scheduled_at, VirtualTime::new(15));

        assert!(sim.step(&mut noop).is_none());
    }

    #[test]
    fn test_run_for_limits_steps() {
        let mut sim = Simulation::new();

        for i in 0..100 {
            sim.schedule(VirtualTime::new(i), ());
        }

        let mut noop = |_ctx: &mut SimulationContext<'_, ()>, _event: &Event<()>| {};

        let processed = sim.run_for(10, &mut noop);
        assert_eq!(processed, 10);
        assert!(!sim.is_finished());
    }

    #[test]
    fn test_time_monotonicity() {
        let mut sim = Simulation::new();

        // Schedule events in reverse order — scheduler must still
        // dispatch in time-ascending order.
        for t in [100u64, 50, 75, 10] {
            sim.schedule(VirtualTime::new(t), ());
        }

        let mut times: Vec<u64> = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext<'_, ()>, _event: &Event<()>| {
            times.push(ctx.now().ticks());
        });

        assert_eq!(times, vec![10, 50, 75, 100]);
    }

    #[test]
    fn test_deterministic_replay() {
        fn run_trace() -> Vec<(u64, u64, &'static str)> {
            let mut sim = Simulation::new();

            sim.schedule(VirtualTime::new(5), "alpha");
            sim.schedule(VirtualTime::new(5), "beta");
            sim.schedule(VirtualTime::new(3), "gamma");
            sim.schedule(VirtualTime::new(10), "delta");

            let mut trace = Vec::new();
            sim.run(&mut |ctx: &mut SimulationContext<'_, _>, event: &Event<_>| {
                trace.push((event.id.raw(), ctx.now().ticks(), event.payload));
            });
            trace
        }

        assert_eq!(run_trace(), run_trace(), "Simulation is not deterministic!");
    }

    #[test]
    fn test_empty_simulation() {
        let mut sim: Simulation<()> = Simulation::new();
        let mut noop = |_ctx: &mut SimulationContext<'_, ()>, _event: &Event<()>| {};
        assert_eq!(sim.run(&mut noop), 0);
        assert!(sim.is_finished());
    }
}
