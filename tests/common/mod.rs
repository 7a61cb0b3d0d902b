#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use qao_runtime::prelude::*;
use qao_runtime::{PriorityResolver, Tick};

pub const LOW: &str = "low";
pub const MID: &str = "mid";
pub const HIGH: &str = "high";
pub const LATE: &str = "late";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Updated(&'static str, Tick),
    Destroyed(&'static str),
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub type Behaviour = Box<dyn FnMut(&mut StepContext<'_, Tracer>)>;

/// Test object that records its updates and destruction.
pub struct Tracer {
    pub name: &'static str,
    pub ticks: u32,
    pub children: Vec<OwnedHandle>,
    log: Log,
    behaviour: Option<Behaviour>,
}

impl Tracer {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self { name, ticks: 0, children: Vec::new(), log: log.clone(), behaviour: None }
    }

    pub fn with_behaviour(
        name: &'static str,
        log: &Log,
        behaviour: impl FnMut(&mut StepContext<'_, Tracer>) + 'static,
    ) -> Self {
        Self { behaviour: Some(Box::new(behaviour)), ..Self::new(name, log) }
    }
}

impl ActiveObject for Tracer {
    fn update(&mut self, ctx: &mut StepContext<'_, Self>) {
        self.ticks += 1;
        self.log.borrow_mut().push(Event::Updated(self.name, ctx.tick()));
        if let Some(behaviour) = self.behaviour.as_mut() {
            behaviour(ctx);
        }
    }

    fn on_destroy(&mut self, _identity: Identity) {
        self.log.borrow_mut().push(Event::Destroyed(self.name));
    }
}

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn resolver() -> PriorityResolver {
    [(LOW, 1), (MID, 3), (HIGH, 5), (LATE, 10)].into_iter().collect()
}

pub fn runtime() -> Runtime<Tracer> {
    Runtime::with_resolver(resolver())
}

/// Names updated during `tick`, in visit order.
pub fn visited(log: &Log, tick: Tick) -> Vec<&'static str> {
    log.borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Updated(name, t) if *t == tick => Some(*name),
            _ => None,
        })
        .collect()
}

/// Names destroyed so far, in destruction order.
pub fn destroyed(log: &Log) -> Vec<&'static str> {
    log.borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Destroyed(name) => Some(*name),
            _ => None,
        })
        .collect()
}

/// Shared slot a behaviour can stash created handles in.
pub type Stash = Rc<RefCell<Vec<OwnedHandle>>>;

pub fn new_stash() -> Stash {
    Rc::new(RefCell::new(Vec::new()))
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("name", &self.name)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}
