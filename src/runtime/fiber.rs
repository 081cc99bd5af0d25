//! Fibers: alternate stacks sharing one execution context
//!
//! Coroutine switch code keeps one stack per fiber but a single pair of stack
//! limits. Switching saves the outgoing fiber's limits, stack pointer and
//! frames, then installs the incoming fiber's with `set_limits`.

use super::context::{ExecutionContext, StackState};
use super::errors::RuntimeError;
use crate::memory::{Address, StackRegion};
use rustc_hash::FxHashMap;

/// Name of the fiber that owns the linker-provided stack
pub const MAIN_FIBER: &str = "main";

/// A fiber. `state` is `None` while the fiber is the one running, because its
/// live state sits in the [`ExecutionContext`].
#[derive(Debug, Clone)]
pub struct Fiber<A> {
    pub name: String,
    state: Option<StackState<A>>,
}

impl<A: Address> Fiber<A> {
    pub fn is_running(&self) -> bool {
        self.state.is_none()
    }

    /// Saved state of a suspended fiber
    pub fn suspended(&self) -> Option<&StackState<A>> {
        self.state.as_ref()
    }
}

/// All fibers of one execution context
#[derive(Debug, Clone)]
pub struct FiberSet<A> {
    fibers: FxHashMap<String, Fiber<A>>,
    order: Vec<String>,
    active: String,
}

impl<A: Address> FiberSet<A> {
    /// A set holding only the running `main` fiber
    pub fn new() -> Self {
        let mut fibers = FxHashMap::default();
        fibers.insert(
            MAIN_FIBER.to_string(),
            Fiber {
                name: MAIN_FIBER.to_string(),
                state: None,
            },
        );
        FiberSet {
            fibers,
            order: vec![MAIN_FIBER.to_string()],
            active: MAIN_FIBER.to_string(),
        }
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Fiber<A>> {
        self.fibers.get(name)
    }

    /// Fibers in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Fiber<A>> {
        self.order.iter().filter_map(|name| self.fibers.get(name))
    }

    /// Declare a suspended fiber with its own stack `[end, base]`
    pub fn create(&mut self, name: &str, base: A, end: A) -> Result<(), RuntimeError> {
        if self.fibers.contains_key(name) {
            return Err(RuntimeError::DuplicateFiber {
                name: name.to_string(),
                location: None,
            });
        }
        let region = StackRegion::with_limits(base, end);
        log::debug!("fiber {} created over {}", name, region);
        self.fibers.insert(
            name.to_string(),
            Fiber {
                name: name.to_string(),
                state: Some(StackState::fresh(region)),
            },
        );
        self.order.push(name.to_string());
        Ok(())
    }

    /// Make `name` the running fiber. Switching to the running fiber is a
    /// no-op.
    pub fn switch(
        &mut self,
        context: &mut ExecutionContext<A>,
        name: &str,
    ) -> Result<(), RuntimeError> {
        if !self.fibers.contains_key(name) {
            return Err(RuntimeError::UnknownFiber {
                name: name.to_string(),
                location: None,
            });
        }
        if name == self.active {
            log::debug!("switch to running fiber {} ignored", name);
            return Ok(());
        }
        if !context.is_initialized() {
            return Err(RuntimeError::Uninitialized { location: None });
        }

        let incoming = self
            .fibers
            .get_mut(name)
            .and_then(|f| f.state.take())
            .ok_or_else(|| RuntimeError::generic(format!("fiber '{}' has no saved stack", name)))?;
        let outgoing = context.switch_to(incoming)?;

        if let Some(previous) = self.fibers.get_mut(&self.active) {
            previous.state = Some(outgoing);
        }
        log::debug!("switched fiber {} -> {}", self.active, name);
        self.active = name.to_string();
        Ok(())
    }
}

impl<A: Address> Default for FiberSet<A> {
    fn default() -> Self {
        Self::new()
    }
}
