// Execution engine for trace scripts

use crate::memory::{
    format_address, linear::max_pages, Address, LinearMemory, LinkerBounds, StackRegion,
};
use crate::runtime::context::ExecutionContext;
use crate::runtime::errors::RuntimeError;
use crate::runtime::fiber::FiberSet;
use crate::script::ast::{Program, SourceLocation, Statement};
use crate::snapshot::{EventLog, Snapshot, SnapshotManager};

/// Runs a trace script against one execution context, recording a snapshot
/// after every statement
pub struct Machine<A: Address> {
    /// Parsed script
    program: Program,

    /// Size of the module's linear memory
    memory: LinearMemory,

    /// Linker bound symbols, once `layout` ran
    layout: Option<LinkerBounds<A>>,

    /// The running fiber's stack
    context: ExecutionContext<A>,

    /// All fibers, including the running one
    fibers: FiberSet<A>,

    /// What happened so far
    events: EventLog,

    /// Current source location being executed
    current_location: SourceLocation,

    /// Snapshot manager for reverse execution
    snapshot_manager: SnapshotManager,

    /// Current position in execution history (for stepping backward/forward)
    history_position: usize,

    /// Statements executed successfully
    executed: usize,

    /// Whether execution has finished
    finished: bool,

    /// The error that halted execution, if any
    error: Option<RuntimeError>,
}

impl<A: Address> Machine<A> {
    /// Create a new machine for the parsed script
    pub fn new(program: Program, snapshot_memory_limit: usize) -> Self {
        Machine {
            program,
            memory: LinearMemory::default(),
            layout: None,
            context: ExecutionContext::new(),
            fibers: FiberSet::new(),
            events: EventLog::new(),
            current_location: SourceLocation::new(0, 0),
            snapshot_manager: SnapshotManager::new(snapshot_memory_limit),
            history_position: 0,
            executed: 0,
            finished: false,
            error: None,
        }
    }

    /// Run the script from start to finish.
    ///
    /// On a runtime error, execution stops and the history up to (and
    /// including) the failing statement is kept.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        if self.finished {
            return Err(RuntimeError::generic("Script already executed"));
        }

        log::info!(
            "running {} statements ({}-bit addresses)",
            self.program.statements.len(),
            A::BYTES * 8
        );
        self.take_snapshot()?;

        for index in 0..self.program.statements.len() {
            let stmt = self.program.statements[index].clone();
            let location = stmt.location();
            self.current_location = location;
            log::debug!("line {}: {}", location.line, stmt.keyword());

            if let Err(e) = self.execute(&stmt) {
                let e = e.at(location);
                log::warn!("{}", e);
                self.events.error(e.to_string(), location);
                self.error = Some(e.clone());
                self.finished = true;
                // The halting error wins over a full snapshot history
                if let Err(snapshot_error) = self.take_snapshot() {
                    log::warn!("no snapshot of the failing statement: {}", snapshot_error);
                }
                return Err(e);
            }

            self.executed += 1;
            self.take_snapshot()?;
        }

        self.finished = true;
        log::info!("finished after {} statements", self.executed);
        Ok(())
    }

    fn execute(&mut self, stmt: &Statement) -> Result<(), RuntimeError> {
        let loc = stmt.location();
        match stmt {
            Statement::Memory { pages, .. } => {
                if self.context.is_initialized() {
                    return Err(RuntimeError::LayoutAfterInit { location: None });
                }
                if *pages == 0 || *pages > max_pages(A::BYTES) {
                    return Err(RuntimeError::InvalidMemorySize {
                        pages: *pages,
                        location: None,
                    });
                }
                let memory = LinearMemory::new(*pages);
                if let Some(bounds) = self.layout {
                    self.check_fits(&memory, bounds.low.to_u64(), bounds.high.to_u64())?;
                }
                for fiber in self.fibers.iter() {
                    if let Some(state) = fiber.suspended() {
                        self.check_fits(
                            &memory,
                            state.region.end().to_u64(),
                            state.region.base().to_u64(),
                        )?;
                    }
                }
                self.memory = memory;
                self.events.info(
                    format!(
                        "linear memory: {} pages ({} bytes)",
                        pages,
                        memory.size_bytes()
                    ),
                    loc,
                );
            }

            Statement::Layout { high, low, .. } => {
                if self.context.is_initialized() {
                    return Err(RuntimeError::LayoutAfterInit { location: None });
                }
                let high_addr = self.address(*high)?;
                let low_addr = self.address(*low)?;
                self.check_fits(&self.memory, *low, *high)?;

                let bounds = LinkerBounds::new(high_addr, low_addr);
                let region = StackRegion::init(bounds);
                if region.is_inverted() {
                    self.events.warn(
                        format!(
                            "layout leaves no stack: high {} is below aligned low {}",
                            format_address(region.base()),
                            format_address(region.end())
                        ),
                        loc,
                    );
                }
                self.layout = Some(bounds);
                self.events.info(
                    format!(
                        "layout: __stack_high={} __stack_low={}",
                        format_address(high_addr),
                        format_address(low_addr)
                    ),
                    loc,
                );
            }

            Statement::Init { .. } => {
                let bounds = self.layout.ok_or(RuntimeError::NoLayout { location: None })?;
                self.context.bootstrap(bounds)?;
                let end = self.context.end()?;
                self.events.info(
                    format!(
                        "stack_init: base={} end={} (low bound rounded up by {})",
                        format_address(self.context.base()?),
                        format_address(end),
                        end.wrapping_sub(bounds.low)
                    ),
                    loc,
                );
            }

            Statement::Call { name, size, .. } => {
                let size = self.address(*size)?;
                let sp = self.context.push_frame(name, size, Some(loc))?;
                let pushed = self
                    .context
                    .frames()
                    .last()
                    .map(|f| f.size)
                    .unwrap_or(A::ZERO);
                self.events.info(
                    format!(
                        "call {}: {} bytes, sp={}, free={}",
                        name,
                        pushed,
                        format_address(sp),
                        self.context.headroom()?
                    ),
                    loc,
                );
            }

            Statement::Ret { .. } => {
                let frame = self.context.pop_frame()?;
                self.events.info(
                    format!(
                        "ret from {}: sp={}",
                        frame.name,
                        format_address(self.context.stack_pointer())
                    ),
                    loc,
                );
            }

            Statement::Alloc { size, .. } => {
                let size = self.address(*size)?;
                let addr = self.context.stack_alloc(size)?;
                self.events.info(
                    format!("stackAlloc({}) = {}", size, format_address(addr)),
                    loc,
                );
            }

            Statement::Save { .. } => {
                let sp = self.context.save()?;
                self.events
                    .info(format!("stackSave() = {}", format_address(sp)), loc);
            }

            Statement::Restore { .. } => {
                let sp = self.context.restore()?;
                self.events
                    .info(format!("stackRestore({})", format_address(sp)), loc);
            }

            Statement::SetStackPointer { address, .. } => {
                let sp = self.address(*address)?;
                self.context.set_stack_pointer(sp);
                if let Ok(region) = self.context.tracker().region() {
                    if !region.contains(sp) {
                        self.events.warn(
                            format!("stack pointer {} is outside {}", format_address(sp), region),
                            loc,
                        );
                    }
                }
                self.events
                    .info(format!("stack pointer = {}", format_address(sp)), loc);
            }

            Statement::Limits { base, end, .. } => {
                let base = self.address(*base)?;
                let end = self.address(*end)?;
                self.context.set_limits(base, end);
                if StackRegion::with_limits(base, end).is_inverted() {
                    self.events.warn(
                        format!(
                            "inverted limits: base {} is below end {}",
                            format_address(base),
                            format_address(end)
                        ),
                        loc,
                    );
                }
                self.events.info(
                    format!(
                        "stack_set_limits(base={}, end={})",
                        format_address(base),
                        format_address(end)
                    ),
                    loc,
                );
            }

            Statement::Fiber { name, base, end, .. } => {
                let base_addr = self.address(*base)?;
                let end_addr = self.address(*end)?;
                self.check_fits(&self.memory, *end, *base)?;
                self.fibers.create(name, base_addr, end_addr)?;
                if StackRegion::with_limits(base_addr, end_addr).is_inverted() {
                    self.events.warn(
                        format!(
                            "fiber {} has an inverted stack: base {} is below end {}",
                            name,
                            format_address(base_addr),
                            format_address(end_addr)
                        ),
                        loc,
                    );
                }
                self.events.info(
                    format!(
                        "fiber {}: [{} .. {}]",
                        name,
                        format_address(end_addr),
                        format_address(base_addr)
                    ),
                    loc,
                );
            }

            Statement::Switch { name, .. } => {
                let from = self.fibers.active().to_string();
                self.fibers.switch(&mut self.context, name)?;
                self.events.info(
                    format!(
                        "switch {} -> {}: base={} end={} sp={}",
                        from,
                        name,
                        format_address(self.context.base()?),
                        format_address(self.context.end()?),
                        format_address(self.context.stack_pointer())
                    ),
                    loc,
                );
            }

            Statement::Report { .. } => {
                let base = self.context.base()?;
                let end = self.context.end()?;
                let sp = self.context.stack_pointer();
                self.events.info(
                    format!(
                        "[{}] base={} end={} sp={} free={}",
                        self.fibers.active(),
                        format_address(base),
                        format_address(end),
                        format_address(sp),
                        self.context.free()?
                    ),
                    loc,
                );
                if sp < end {
                    self.events.warn(
                        format!(
                            "stack pointer is {} bytes below stack_end",
                            end.wrapping_sub(sp)
                        ),
                        loc,
                    );
                }
            }
        }
        Ok(())
    }

    /// Narrow a script literal to the machine's pointer width
    fn address(&self, value: u64) -> Result<A, RuntimeError> {
        A::from_u64(value).ok_or(RuntimeError::AddressOutOfRange {
            value,
            bytes: A::BYTES,
            location: None,
        })
    }

    /// Both ends of a stack must lie in memory. Inverted pairs are checked
    /// with the ends swapped.
    fn check_fits(&self, memory: &LinearMemory, low: u64, high: u64) -> Result<(), RuntimeError> {
        if memory.contains_range(low.min(high), low.max(high)) {
            Ok(())
        } else {
            Err(RuntimeError::OutOfLinearMemory {
                low,
                high,
                memory_size: memory.size_bytes(),
                location: None,
            })
        }
    }

    // ========== Snapshot / history ==========

    fn take_snapshot(&mut self) -> Result<(), RuntimeError> {
        let snapshot = Snapshot::capture(
            &self.context,
            &self.fibers,
            &self.events,
            self.memory.size_bytes(),
            self.executed,
            self.current_location,
        );

        self.snapshot_manager
            .push(snapshot)
            .map_err(|_| RuntimeError::SnapshotLimitExceeded {
                current: self.snapshot_manager.memory_usage(),
                limit: self.snapshot_manager.memory_limit(),
            })?;

        self.history_position = self.snapshot_manager.len() - 1;
        Ok(())
    }

    /// Step backward in execution (previous snapshot)
    pub fn step_backward(&mut self) -> Result<(), RuntimeError> {
        if self.history_position == 0 {
            return Err(RuntimeError::Generic {
                message: "Already at the beginning of execution".to_string(),
                location: Some(self.current_location()),
            });
        }
        self.history_position -= 1;
        Ok(())
    }

    /// Step forward in execution (next snapshot)
    pub fn step_forward(&mut self) -> Result<(), RuntimeError> {
        if self.history_position + 1 >= self.snapshot_manager.len() {
            return Err(RuntimeError::Generic {
                message: "No more snapshots available (execution finished)".to_string(),
                location: Some(self.current_location()),
            });
        }
        self.history_position += 1;
        Ok(())
    }

    /// Rewind to the beginning of execution history
    pub fn rewind_to_start(&mut self) -> Result<(), RuntimeError> {
        if self.snapshot_manager.is_empty() {
            return Err(RuntimeError::generic("No snapshots available"));
        }
        self.history_position = 0;
        Ok(())
    }

    /// Jump to the last snapshot
    pub fn jump_to_end(&mut self) {
        self.history_position = self.snapshot_manager.len().saturating_sub(1);
    }

    // ========== Getter methods for UI ==========

    /// Snapshot at the current history position
    pub fn current(&self) -> Option<&Snapshot> {
        self.snapshot_manager.get(self.history_position)
    }

    /// Source location of the current history position
    pub fn current_location(&self) -> SourceLocation {
        self.current()
            .map(|s| s.source_location)
            .unwrap_or(self.current_location)
    }

    pub fn history_position(&self) -> usize {
        self.history_position
    }

    pub fn total_snapshots(&self) -> usize {
        self.snapshot_manager.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The error that stopped execution
    pub fn error(&self) -> Option<&RuntimeError> {
        self.error.as_ref()
    }

    /// Whether the current history position is the failing statement
    pub fn at_error(&self) -> bool {
        self.error.is_some() && self.history_position + 1 == self.snapshot_manager.len()
    }

    /// Live context after the last executed statement
    pub fn context(&self) -> &ExecutionContext<A> {
        &self.context
    }

    pub fn fibers(&self) -> &FiberSet<A> {
        &self.fibers
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn executed(&self) -> usize {
        self.executed
    }
}
