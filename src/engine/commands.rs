//! # Commands
//!
//! This module defines deferred commands used to mutate the runtime between
//! steps.
//!
//! ## Purpose
//! Structural changes that would disturb a traversal in progress (removing
//! an object from the orderer, freeing its slot, moving it to another
//! priority bucket) are never applied while a step walks its snapshot.
//! Instead they are recorded as `Command` values and applied at the next step
//! boundary.
//!
//! ## Sources
//! - `StepContext::request_destroy` / `Runtime::request_destroy`
//! - dropping a bound [`OwnedHandle`](crate::engine::handle::OwnedHandle)
//! - `StepContext::set_priority`
//!
//! ## Invariants
//! - Commands are applied in the order they were recorded.
//! - A command whose target is no longer live when applied is skipped.
//! - Commands produced while applying (destroy cascades from dropped owned
//!   handles) are applied in the same boundary.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::engine::identity::Identity;
use crate::engine::types::{Priority, RuntimeID};


/// Why a destroy command was recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestroyCause {
    /// Explicit request by identity.
    Requested,
    /// The owning handle was dropped.
    HandleDropped,
}

/// A deferred runtime mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Destroys an object.
    ///
    /// ## Behavior
    /// - Removes the identity from its priority bucket.
    /// - Frees the slot, advancing its generation.
    /// - Runs the object's destroy hook and drops it.
    Destroy {
        /// Object to destroy.
        identity: Identity,
        /// Where the request came from.
        cause: DestroyCause,
    },

    /// Moves an object to the tail of another priority bucket.
    Reprioritize {
        /// Object to move.
        identity: Identity,
        /// New priority.
        priority: Priority,
    },
}

impl Command {
    /// The object the command targets.
    pub fn target(&self) -> Identity {
        match self {
            Command::Destroy { identity, .. } | Command::Reprioritize { identity, .. } => *identity,
        }
    }
}

/// The part of a runtime that handles can reach.
///
/// Shared through `Rc` with every bound handle; handles hold it weakly so a
/// dropped runtime simply stops accepting commands.
#[derive(Debug)]
pub(crate) struct CommandQueue {
    runtime: RuntimeID,
    commands: RefCell<VecDeque<Command>>,
    closed: Cell<bool>,
}

impl CommandQueue {
    pub(crate) fn new(runtime: RuntimeID) -> Self {
        Self {
            runtime,
            commands: RefCell::new(VecDeque::new()),
            closed: Cell::new(false),
        }
    }

    #[inline]
    pub(crate) fn runtime(&self) -> RuntimeID { self.runtime }

    /// Records a command. Ignored once the runtime has been torn down.
    pub(crate) fn push(&self, command: Command) {
        if self.closed.get() {
            return;
        }
        self.commands.borrow_mut().push_back(command);
    }

    /// Takes every queued command, leaving the queue empty.
    ///
    /// The borrow ends before the caller applies anything, so destroy hooks
    /// and dropped handles may push new commands freely.
    pub(crate) fn drain(&self) -> VecDeque<Command> {
        std::mem::take(&mut *self.commands.borrow_mut())
    }

    pub(crate) fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    pub(crate) fn is_pending_destroy(&self, identity: Identity) -> bool {
        self.commands
            .borrow()
            .iter()
            .any(|command| matches!(command, Command::Destroy { identity: target, .. } if *target == identity))
    }

    /// Drops every queued command targeting `identity`.
    pub(crate) fn purge(&self, identity: Identity) -> usize {
        let mut commands = self.commands.borrow_mut();
        let before = commands.len();
        commands.retain(|command| command.target() != identity);
        before - commands.len()
    }

    pub(crate) fn close(&self) {
        self.closed.set(true);
        self.commands.borrow_mut().clear();
    }
}
