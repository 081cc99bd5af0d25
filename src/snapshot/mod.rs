// Snapshot management for reverse execution

use crate::memory::Address;
use crate::runtime::context::{ExecutionContext, Frame};
use crate::runtime::fiber::FiberSet;
use crate::script::ast::SourceLocation;

/// Severity of an event log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

/// A line of the event log with source location tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLine {
    pub text: String,
    pub level: EventLevel,
    pub location: SourceLocation,
}

/// What the runtime reported while executing the script
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub lines: Vec<EventLine>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog { lines: Vec::new() }
    }

    pub fn push(&mut self, text: String, level: EventLevel, location: SourceLocation) {
        self.lines.push(EventLine {
            text,
            level,
            location,
        });
    }

    pub fn info(&mut self, text: String, location: SourceLocation) {
        self.push(text, EventLevel::Info, location);
    }

    pub fn warn(&mut self, text: String, location: SourceLocation) {
        self.push(text, EventLevel::Warn, location);
    }

    pub fn error(&mut self, text: String, location: SourceLocation) {
        self.push(text, EventLevel::Error, location);
    }
}

/// A frame, widened to `u64` for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameView {
    pub name: String,
    pub size: u64,
    pub saved_sp: u64,
    pub location: Option<SourceLocation>,
}

impl<A: Address> From<&Frame<A>> for FrameView {
    fn from(frame: &Frame<A>) -> Self {
        FrameView {
            name: frame.name.clone(),
            size: frame.size.to_u64(),
            saved_sp: frame.saved_sp.to_u64(),
            location: frame.location,
        }
    }
}

/// One fiber's stack at the time of the snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiberView {
    pub name: String,
    pub base: u64,
    pub end: u64,
    pub stack_pointer: u64,
    pub depth: usize,
    pub running: bool,
}

/// Stack limits and pointer of the running fiber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionView {
    pub base: u64,
    pub end: u64,
    /// Raw `get_free`, wrapping at the pointer width
    pub free: u64,
}

impl RegionView {
    /// Bytes between the stack pointer and the base
    pub fn used(&self, stack_pointer: u64) -> u64 {
        self.base.saturating_sub(stack_pointer)
    }

    pub fn size(&self) -> u64 {
        self.base.saturating_sub(self.end)
    }

    pub fn is_overflowed(&self, stack_pointer: u64) -> bool {
        stack_pointer < self.end
    }
}

/// Snapshot of execution state
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// `None` until init
    pub region: Option<RegionView>,
    pub stack_pointer: u64,
    pub frames: Vec<FrameView>,
    pub saved: Vec<u64>,
    pub fibers: Vec<FiberView>,
    pub active_fiber: String,
    pub events: EventLog,
    pub memory_bytes: u64,
    pub address_bytes: usize,
    pub statement_index: usize, // Statements executed so far
    pub source_location: SourceLocation,
}

impl Snapshot {
    /// Capture the live state of a context and its fibers
    pub fn capture<A: Address>(
        context: &ExecutionContext<A>,
        fibers: &FiberSet<A>,
        events: &EventLog,
        memory_bytes: u64,
        statement_index: usize,
        source_location: SourceLocation,
    ) -> Self {
        let region = context
            .tracker()
            .region()
            .ok()
            .map(|r| RegionView {
                base: r.base().to_u64(),
                end: r.end().to_u64(),
                free: r.free(context.stack_pointer()).to_u64(),
            });

        let fiber_views = fibers
            .iter()
            .map(|fiber| match fiber.suspended() {
                Some(state) => FiberView {
                    name: fiber.name.clone(),
                    base: state.region.base().to_u64(),
                    end: state.region.end().to_u64(),
                    stack_pointer: state.stack_pointer.to_u64(),
                    depth: state.frames.len(),
                    running: false,
                },
                None => FiberView {
                    name: fiber.name.clone(),
                    base: region.map(|r| r.base).unwrap_or(0),
                    end: region.map(|r| r.end).unwrap_or(0),
                    stack_pointer: context.stack_pointer().to_u64(),
                    depth: context.depth(),
                    running: true,
                },
            })
            .collect();

        Snapshot {
            region,
            stack_pointer: context.stack_pointer().to_u64(),
            frames: context.frames().iter().map(FrameView::from).collect(),
            saved: context.saved().iter().map(|sp| sp.to_u64()).collect(),
            fibers: fiber_views,
            active_fiber: fibers.active().to_string(),
            events: events.clone(),
            memory_bytes,
            address_bytes: A::BYTES,
            statement_index,
            source_location,
        }
    }

    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        // This is a rough estimate
        let frames = self.frames.len() * 64;
        let fibers = self.fibers.len() * 64;
        // Events: assume 50 bytes per line on average
        let events = self.events.lines.len() * 50;

        128 + frames + fibers + events + self.saved.len() * 8
    }
}

/// Manages execution history for reverse execution
#[derive(Debug)]
pub struct SnapshotManager {
    snapshots: Vec<Snapshot>,
    max_memory: usize,
    current_memory: usize,
}

impl SnapshotManager {
    pub fn new(max_memory: usize) -> Self {
        SnapshotManager {
            snapshots: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Add a snapshot to history
    pub fn push(&mut self, snapshot: Snapshot) -> Result<(), String> {
        let snapshot_size = snapshot.estimated_size();

        if self.current_memory + snapshot_size > self.max_memory {
            return Err(format!(
                "Snapshot memory limit exceeded: {} + {} > {}",
                self.current_memory, snapshot_size, self.max_memory
            ));
        }

        self.current_memory += snapshot_size;
        self.snapshots.push(snapshot);
        Ok(())
    }

    /// Get a snapshot by index
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    /// Get the number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Get current memory usage
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Get max memory limit
    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::LinkerBounds;

    fn loc(line: usize) -> SourceLocation {
        SourceLocation::new(line, 1)
    }

    #[test]
    fn capture_before_init_has_no_region() {
        let ctx = ExecutionContext::<u32>::new();
        let fibers = FiberSet::new();
        let snapshot = Snapshot::capture(&ctx, &fibers, &EventLog::new(), 0x1_0000, 0, loc(0));

        assert!(snapshot.region.is_none());
        assert_eq!(snapshot.address_bytes, 4);
        assert_eq!(snapshot.active_fiber, "main");
        assert_eq!(snapshot.fibers.len(), 1);
        assert!(snapshot.fibers[0].running);
    }

    #[test]
    fn capture_widens_region_and_frames() {
        let mut ctx = ExecutionContext::<u32>::new();
        ctx.bootstrap(LinkerBounds::new(0x2000, 0x1001)).unwrap();
        ctx.push_frame("main", 20, Some(loc(3))).unwrap();
        let mut fibers = FiberSet::new();
        fibers.create("worker", 0x1000, 0x800).unwrap();

        let snapshot = Snapshot::capture(&ctx, &fibers, &EventLog::new(), 0x1_0000, 2, loc(3));
        let region = snapshot.region.unwrap();

        assert_eq!((region.base, region.end), (0x2000, 0x1010));
        assert_eq!(snapshot.stack_pointer, 0x2000 - 32);
        assert_eq!(region.free, 0x2000 - 32 - 0x1010);
        assert_eq!(region.used(snapshot.stack_pointer), 32);
        assert_eq!(snapshot.frames[0].size, 32);

        let worker = &snapshot.fibers[1];
        assert_eq!(worker.name, "worker");
        assert!(!worker.running);
        assert_eq!(worker.stack_pointer, 0x1000);
    }

    #[test]
    fn region_view_flags_overflow() {
        let view = RegionView {
            base: 0x2000,
            end: 0x1000,
            free: 0,
        };
        assert!(!view.is_overflowed(0x1000));
        assert!(view.is_overflowed(0xff0));
        assert_eq!(view.size(), 0x1000);
    }

    #[test]
    fn manager_enforces_memory_limit() {
        let ctx = ExecutionContext::<u32>::new();
        let fibers = FiberSet::new();
        let snapshot = Snapshot::capture(&ctx, &fibers, &EventLog::new(), 0, 0, loc(0));
        let size = snapshot.estimated_size();

        let mut manager = SnapshotManager::new(size * 2);
        assert!(manager.push(snapshot.clone()).is_ok());
        assert!(manager.push(snapshot.clone()).is_ok());
        assert!(manager.push(snapshot).is_err());
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.memory_usage(), size * 2);
    }
}
