//! Execution context: one stack and the code that walks it
//!
//! An [`ExecutionContext`] is what the runtime around the tracker looks like:
//! it owns a [`StackTracker`], the environment's stack pointer, the frames
//! currently on the stack and the `stackSave` slots. Overflow checks happen
//! here, using the tracker's free-space arithmetic.

use super::errors::RuntimeError;
use crate::memory::{format_address, Address, LinkerBounds, StackRegion, StackTracker};
use crate::script::ast::SourceLocation;

/// An activation record on the simulated stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<A> {
    pub name: String,
    /// Frame size after rounding to the stack alignment
    pub size: A,
    /// Stack pointer before the call; `ret` restores it
    pub saved_sp: A,
    pub location: Option<SourceLocation>,
}

impl<A: Address> Frame<A> {
    /// Lowest address of the frame as pushed
    pub fn bottom(&self) -> A {
        self.saved_sp.wrapping_sub(self.size)
    }
}

/// Everything that changes when the active stack is swapped out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackState<A> {
    pub region: StackRegion<A>,
    pub stack_pointer: A,
    pub frames: Vec<Frame<A>>,
    pub saved: Vec<A>,
}

impl<A: Address> StackState<A> {
    /// A fresh, empty stack over `region` with the stack pointer at its base
    pub fn fresh(region: StackRegion<A>) -> Self {
        StackState {
            region,
            stack_pointer: region.base(),
            frames: Vec::new(),
            saved: Vec::new(),
        }
    }
}

/// One execution context's stack bookkeeping
#[derive(Debug, Clone)]
pub struct ExecutionContext<A: Address> {
    tracker: StackTracker<A>,
    stack_pointer: A,
    frames: Vec<Frame<A>>,
    saved: Vec<A>,
}

impl<A: Address> ExecutionContext<A> {
    pub fn new() -> Self {
        ExecutionContext {
            tracker: StackTracker::new(),
            stack_pointer: A::ZERO,
            frames: Vec::new(),
            saved: Vec::new(),
        }
    }

    /// Bootstrap step: `stack_init` from the linker bounds, then start the
    /// stack pointer at the base.
    pub fn bootstrap(&mut self, bounds: LinkerBounds<A>) -> Result<(), RuntimeError> {
        self.tracker.init(bounds)?;
        self.stack_pointer = self.tracker.get_base()?;
        Ok(())
    }

    pub fn tracker(&self) -> &StackTracker<A> {
        &self.tracker
    }

    pub fn is_initialized(&self) -> bool {
        self.tracker.is_initialized()
    }

    pub fn base(&self) -> Result<A, RuntimeError> {
        Ok(self.tracker.get_base()?)
    }

    pub fn end(&self) -> Result<A, RuntimeError> {
        Ok(self.tracker.get_end()?)
    }

    /// `get_free` against the current stack pointer (raw, wrapping)
    pub fn free(&self) -> Result<A, RuntimeError> {
        Ok(self.tracker.get_free(self.stack_pointer)?)
    }

    /// Usable headroom: like [`free`](Self::free) but zero once the stack
    /// pointer has dropped below `stack_end`.
    pub fn headroom(&self) -> Result<A, RuntimeError> {
        let end = self.end()?;
        Ok(if self.stack_pointer >= end {
            self.stack_pointer.wrapping_sub(end)
        } else {
            A::ZERO
        })
    }

    pub fn set_limits(&mut self, base: A, end: A) {
        self.tracker.set_limits(base, end);
    }

    pub fn stack_pointer(&self) -> A {
        self.stack_pointer
    }

    /// The environment moves the stack pointer; nothing is checked
    pub fn set_stack_pointer(&mut self, sp: A) {
        self.stack_pointer = sp;
    }

    pub fn frames(&self) -> &[Frame<A>] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn saved(&self) -> &[A] {
        &self.saved
    }

    /// Push a frame of `size` bytes (rounded up to 16). Returns the new stack
    /// pointer.
    pub fn push_frame(
        &mut self,
        name: &str,
        size: A,
        location: Option<SourceLocation>,
    ) -> Result<A, RuntimeError> {
        let headroom = self.headroom()?;
        let aligned = size
            .checked_align_up(A::STACK_ALIGN)
            .ok_or(RuntimeError::StackOverflow {
                requested: size.to_u64(),
                free: headroom.to_u64(),
                location,
            })?;

        if aligned > headroom {
            log::debug!(
                "overflow calling {}: need {} bytes, {} free",
                name,
                aligned,
                headroom
            );
            return Err(RuntimeError::StackOverflow {
                requested: aligned.to_u64(),
                free: headroom.to_u64(),
                location,
            });
        }

        let saved_sp = self.stack_pointer;
        self.stack_pointer = saved_sp.wrapping_sub(aligned);
        self.frames.push(Frame {
            name: name.to_string(),
            size: aligned,
            saved_sp,
            location,
        });
        log::trace!(
            "call {} ({} bytes): sp {} -> {}",
            name,
            aligned,
            format_address(saved_sp),
            format_address(self.stack_pointer)
        );
        Ok(self.stack_pointer)
    }

    /// Pop the top frame, restoring the caller's stack pointer
    pub fn pop_frame(&mut self) -> Result<Frame<A>, RuntimeError> {
        let frame = self
            .frames
            .pop()
            .ok_or(RuntimeError::NoFrame { location: None })?;
        self.stack_pointer = frame.saved_sp;
        log::trace!(
            "ret from {}: sp -> {}",
            frame.name,
            format_address(self.stack_pointer)
        );
        Ok(frame)
    }

    /// `stackAlloc`: `sp = (sp - size) & !15`, refusing to cross `stack_end`.
    /// Returns the new stack pointer, which is the allocation's address.
    pub fn stack_alloc(&mut self, size: A) -> Result<A, RuntimeError> {
        let end = self.end()?;
        let overflow = || RuntimeError::StackOverflow {
            requested: size.to_u64(),
            free: self.headroom().map(Address::to_u64).unwrap_or(0),
            location: None,
        };

        let target = self
            .stack_pointer
            .checked_sub(size)
            .map(|sp| sp.align_down(A::STACK_ALIGN))
            .ok_or_else(overflow)?;
        if target < end {
            return Err(overflow());
        }

        self.stack_pointer = target;
        Ok(target)
    }

    /// `stackSave`: the current stack pointer
    pub fn stack_save(&self) -> A {
        self.stack_pointer
    }

    /// `stackRestore`: move the stack pointer back to a saved value. The value
    /// must lie within the current limits.
    pub fn stack_restore(&mut self, sp: A) -> Result<(), RuntimeError> {
        let region = *self.tracker.region()?;
        if !region.contains(sp) {
            return Err(RuntimeError::InvalidStackPointer {
                address: sp.to_u64(),
                base: region.base().to_u64(),
                end: region.end().to_u64(),
                location: None,
            });
        }
        self.stack_pointer = sp;
        Ok(())
    }

    /// `stackSave` into a slot
    pub fn save(&mut self) -> Result<A, RuntimeError> {
        self.tracker.region()?;
        let sp = self.stack_save();
        self.saved.push(sp);
        Ok(sp)
    }

    /// `stackRestore` from the most recent slot
    pub fn restore(&mut self) -> Result<A, RuntimeError> {
        let sp = *self
            .saved
            .last()
            .ok_or(RuntimeError::NoSavedPointer { location: None })?;
        self.stack_restore(sp)?;
        self.saved.pop();
        Ok(sp)
    }

    /// Swap the active stack for `incoming`: the current limits are read back
    /// with `get_base`/`get_end`, then replaced with `set_limits`. Returns
    /// the outgoing stack.
    pub fn switch_to(&mut self, incoming: StackState<A>) -> Result<StackState<A>, RuntimeError> {
        let outgoing_region = StackRegion::with_limits(self.base()?, self.end()?);
        self.tracker
            .set_limits(incoming.region.base(), incoming.region.end());

        let outgoing = StackState {
            region: outgoing_region,
            stack_pointer: self.stack_pointer,
            frames: std::mem::replace(&mut self.frames, incoming.frames),
            saved: std::mem::replace(&mut self.saved, incoming.saved),
        };
        self.stack_pointer = incoming.stack_pointer;
        Ok(outgoing)
    }
}

impl<A: Address> Default for ExecutionContext<A> {
    fn default() -> Self {
        Self::new()
    }
}
