// Integration tests for trace scripts driving the stack runtime

use stackscope::memory::Address;
use stackscope::runtime::engine::Machine;
use stackscope::runtime::errors::RuntimeError;
use stackscope::script::Parser;
use stackscope::snapshot::EventLevel;

const SNAPSHOT_LIMIT: usize = 1024 * 1024 * 16;

fn run_script<A: Address>(source: &str) -> (Machine<A>, Result<(), RuntimeError>) {
    let mut parser = Parser::new(source).expect("Parser creation failed");
    let program = parser.parse_program().expect("Parsing failed");
    let mut machine = Machine::new(program, SNAPSHOT_LIMIT);
    let result = machine.run();
    (machine, result)
}

fn error_line(result: &Result<(), RuntimeError>) -> usize {
    match result {
        Err(e) => e.location().map(|l| l.line).unwrap_or(0),
        Ok(()) => panic!("expected a runtime error"),
    }
}

#[test]
fn test_init_rounds_low_bound_up() {
    let source = "layout high=0x10000 low=0x1001\ninit\nreport\n";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    let ctx = machine.context();
    assert_eq!(ctx.base(), Ok(0x10000));
    assert_eq!(ctx.end(), Ok(0x1010));
    assert_eq!(ctx.stack_pointer(), 0x10000);
    assert_eq!(ctx.free(), Ok(0x10000 - 0x1010));
}

#[test]
fn test_call_and_ret_restore_stack_pointer() {
    let source = "\
layout high=0x2000 low=0x1000
init
call main 40
call helper 100
ret
";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    let ctx = machine.context();
    // 40 rounds up to 48
    assert_eq!(ctx.stack_pointer(), 0x2000 - 48);
    assert_eq!(ctx.depth(), 1);
    assert_eq!(ctx.frames()[0].name, "main");
    assert_eq!(ctx.frames()[0].size, 48);
}

#[test]
fn test_overflow_reports_requested_and_free() {
    let source = "\
layout high=0x2000 low=0x1f00
init
call main 128
call deep 256
report
";
    let (mut machine, result) = run_script::<u32>(source);

    assert!(matches!(
        result,
        Err(RuntimeError::StackOverflow {
            requested: 256,
            free: 128,
            ..
        })
    ));
    assert_eq!(error_line(&result), 4);
    assert_eq!(machine.executed(), 3);
    // The failing frame was not pushed
    assert_eq!(machine.context().depth(), 1);

    machine.jump_to_end();
    assert!(machine.at_error());
    let last = machine.current().expect("no snapshot");
    let event = last.events.lines.last().expect("no events");
    assert_eq!(event.level, EventLevel::Error);
    assert_eq!(event.location.line, 4);
}

#[test]
fn test_frame_exactly_filling_the_stack() {
    let source = "layout high=0x1100 low=0x1000\ninit\ncall all 256\nreport\n";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    assert_eq!(machine.context().stack_pointer(), 0x1000);
    assert_eq!(machine.context().free(), Ok(0));
}

#[test]
fn test_stack_alloc_aligns_down() {
    let source = "layout high=0x2000 low=0x1000\ninit\nalloc 20\n";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    // (0x2000 - 20) & !15
    assert_eq!(machine.context().stack_pointer(), 0x1fe0);
}

#[test]
fn test_stack_alloc_past_end_fails() {
    let source = "layout high=0x1040 low=0x1000\ninit\nalloc 0x41\n";
    let (machine, result) = run_script::<u32>(source);

    assert!(matches!(result, Err(RuntimeError::StackOverflow { .. })));
    assert_eq!(error_line(&result), 3);
    assert_eq!(machine.context().stack_pointer(), 0x1040);
}

#[test]
fn test_save_and_restore() {
    let source = "\
layout high=0x2000 low=0x1000
init
save
alloc 100
alloc 200
restore
";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    assert_eq!(machine.context().stack_pointer(), 0x2000);
    assert!(machine.context().saved().is_empty());
}

#[test]
fn test_restore_without_save() {
    let source = "layout high=0x2000 low=0x1000\ninit\nrestore\n";
    let (_, result) = run_script::<u32>(source);

    assert!(matches!(result, Err(RuntimeError::NoSavedPointer { .. })));
    assert_eq!(error_line(&result), 3);
}

#[test]
fn test_restore_outside_current_limits() {
    // The saved pointer belongs to the old limits
    let source = "\
layout high=0x2000 low=0x1000
init
save
limits base=0x800 end=0x400
restore
";
    let (_, result) = run_script::<u32>(source);

    assert!(matches!(
        result,
        Err(RuntimeError::InvalidStackPointer {
            address: 0x2000,
            base: 0x800,
            end: 0x400,
            ..
        })
    ));
}

#[test]
fn test_ret_without_call() {
    let source = "layout high=0x2000 low=0x1000\ninit\nret\n";
    let (_, result) = run_script::<u32>(source);

    assert!(matches!(result, Err(RuntimeError::NoFrame { .. })));
}

#[test]
fn test_init_twice_fails() {
    let source = "layout high=0x2000 low=0x1000\ninit\ninit\n";
    let (machine, result) = run_script::<u32>(source);

    assert!(matches!(result, Err(RuntimeError::AlreadyInitialized { .. })));
    assert_eq!(error_line(&result), 3);
    // First init still stands
    assert_eq!(machine.context().base(), Ok(0x2000));
}

#[test]
fn test_report_before_init_fails() {
    let (_, result) = run_script::<u32>("report\n");
    assert!(matches!(result, Err(RuntimeError::Uninitialized { .. })));
}

#[test]
fn test_call_before_init_fails() {
    let (_, result) = run_script::<u32>("layout high=0x2000 low=0x1000\ncall main 16\n");
    assert!(matches!(result, Err(RuntimeError::Uninitialized { .. })));
}

#[test]
fn test_init_without_layout_fails() {
    let (_, result) = run_script::<u32>("init\n");
    assert!(matches!(result, Err(RuntimeError::NoLayout { .. })));
}

#[test]
fn test_layout_after_init_fails() {
    let source = "layout high=0x2000 low=0x1000\ninit\nlayout high=0x3000 low=0x1000\n";
    let (_, result) = run_script::<u32>(source);
    assert!(matches!(result, Err(RuntimeError::LayoutAfterInit { .. })));

    let source = "layout high=0x2000 low=0x1000\ninit\nmemory 512\n";
    let (_, result) = run_script::<u32>(source);
    assert!(matches!(result, Err(RuntimeError::LayoutAfterInit { .. })));
}

#[test]
fn test_limits_are_stored_verbatim() {
    let source = "\
layout high=0x10000 low=0x1000
init
limits base=0x9001 end=0x5003
report
";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    assert_eq!(machine.context().base(), Ok(0x9001));
    assert_eq!(machine.context().end(), Ok(0x5003));
}

#[test]
fn test_limits_before_init_defines_region() {
    let source = "limits base=0x8000 end=0x4000\nsp 0x7000\nreport\n";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    assert_eq!(machine.context().free(), Ok(0x3000));

    let source = "layout high=0x2000 low=0x1000\nlimits base=0x8000 end=0x4000\ninit\n";
    let (_, result) = run_script::<u32>(source);
    assert!(matches!(result, Err(RuntimeError::AlreadyInitialized { .. })));
}

#[test]
fn test_inverted_layout_is_accepted_with_warning() {
    let source = "layout high=0x1000 low=0x2000\ninit\n";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    assert_eq!(machine.context().base(), Ok(0x1000));
    assert_eq!(machine.context().end(), Ok(0x2000));
    assert!(machine
        .events()
        .lines
        .iter()
        .any(|e| e.level == EventLevel::Warn && e.location.line == 1));
}

#[test]
fn test_stack_pointer_below_end_wraps_free() {
    let source = "layout high=0x2000 low=0x1000\ninit\nsp 0xff0\nreport\n";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    assert_eq!(machine.context().free(), Ok(0xff0u32.wrapping_sub(0x1000)));
    assert!(machine
        .events()
        .lines
        .iter()
        .any(|e| e.level == EventLevel::Warn && e.location.line == 4));
}

#[test]
fn test_fiber_switch_round_trip() {
    let source = "\
layout high=0x10000 low=0x8000
init
call main_loop 64
fiber worker base=0x8000 end=0x4000
switch worker
call task 32
switch main
report
";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    let ctx = machine.context();
    assert_eq!(ctx.base(), Ok(0x10000));
    assert_eq!(ctx.end(), Ok(0x8000));
    assert_eq!(ctx.stack_pointer(), 0x10000 - 64);
    assert_eq!(ctx.depth(), 1);

    assert_eq!(machine.fibers().active(), "main");
    let worker = machine.fibers().get("worker").expect("worker missing");
    let state = worker.suspended().expect("worker should be suspended");
    assert_eq!(state.region.base(), 0x8000);
    assert_eq!(state.region.end(), 0x4000);
    assert_eq!(state.stack_pointer, 0x8000 - 32);
    assert_eq!(state.frames.len(), 1);
}

#[test]
fn test_switch_to_unknown_fiber() {
    let source = "layout high=0x2000 low=0x1000\ninit\nswitch nobody\n";
    let (_, result) = run_script::<u32>(source);
    assert!(matches!(
        result,
        Err(RuntimeError::UnknownFiber { ref name, .. }) if name == "nobody"
    ));
}

#[test]
fn test_duplicate_fiber() {
    let source = "\
layout high=0x10000 low=0x8000
init
fiber a base=0x8000 end=0x4000
fiber a base=0x4000 end=0x2000
";
    let (_, result) = run_script::<u32>(source);
    assert!(matches!(result, Err(RuntimeError::DuplicateFiber { .. })));
    assert_eq!(error_line(&result), 4);
}

#[test]
fn test_address_out_of_range_for_32_bit() {
    let (_, result) = run_script::<u32>("layout high=0x1_0000_0000 low=0x0\n");
    assert!(matches!(
        result,
        Err(RuntimeError::AddressOutOfRange {
            value: 0x1_0000_0000,
            bytes: 4,
            ..
        })
    ));
}

#[test]
fn test_64_bit_machine_accepts_wide_addresses() {
    let source = "\
memory 0x20000
layout high=0x1_0000_0000 low=0xffff_0001
init
call main 100
";
    let (machine, result) = run_script::<u64>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    let ctx = machine.context();
    assert_eq!(ctx.end(), Ok(0xffff_0010));
    assert_eq!(ctx.stack_pointer(), 0x1_0000_0000 - 112);
}

#[test]
fn test_layout_outside_memory() {
    let source = "memory 1\nlayout high=0x20000 low=0x10000\n";
    let (_, result) = run_script::<u32>(source);
    assert!(matches!(
        result,
        Err(RuntimeError::OutOfLinearMemory {
            memory_size: 0x10000,
            ..
        })
    ));
}

#[test]
fn test_invalid_memory_size() {
    let (_, result) = run_script::<u32>("memory 0\n");
    assert!(matches!(result, Err(RuntimeError::InvalidMemorySize { pages: 0, .. })));

    let (_, result) = run_script::<u32>("memory 65537\n");
    assert!(matches!(result, Err(RuntimeError::InvalidMemorySize { .. })));
}

#[test]
fn test_step_backward() {
    let source = "layout high=0x2000 low=0x1000\ninit\ncall main 16\n";
    let (mut machine, result) = run_script::<u32>(source);
    assert!(result.is_ok(), "Execution failed: {:?}", result);

    // Initial snapshot plus one per statement
    assert_eq!(machine.total_snapshots(), 4);
    assert_eq!(machine.history_position(), 3);

    machine.step_backward().expect("step back failed");
    let snapshot = machine.current().expect("no snapshot");
    assert!(snapshot.region.is_some());
    assert!(snapshot.frames.is_empty());
    assert_eq!(snapshot.stack_pointer, 0x2000);
}

#[test]
fn test_step_forward_and_backward() {
    let source = "layout high=0x2000 low=0x1000\ninit\ncall main 16\n";
    let (mut machine, _) = run_script::<u32>(source);

    machine.rewind_to_start().expect("rewind failed");
    assert!(machine.current().expect("no snapshot").region.is_none());

    machine.step_forward().expect("step forward failed");
    machine.step_forward().expect("step forward failed");
    assert_eq!(machine.current_location().line, 2);
    let region = machine.current().and_then(|s| s.region).expect("no region");
    assert_eq!((region.base, region.end), (0x2000, 0x1000));

    machine.step_forward().expect("step forward failed");
    assert!(machine.step_forward().is_err());
}

#[test]
fn test_step_backward_at_beginning() {
    let (mut machine, _) = run_script::<u32>("layout high=0x2000 low=0x1000\n");
    machine.rewind_to_start().expect("rewind failed");
    assert!(matches!(
        machine.step_backward(),
        Err(RuntimeError::Generic { .. })
    ));
}

#[test]
fn test_snapshot_limit_exceeded() {
    let mut parser = Parser::new("layout high=0x2000 low=0x1000\ninit\n").expect("Parser creation failed");
    let program = parser.parse_program().expect("Parsing failed");
    let mut machine = Machine::<u32>::new(program, 64);

    assert!(matches!(
        machine.run(),
        Err(RuntimeError::SnapshotLimitExceeded { limit: 64, .. })
    ));
}

#[test]
fn test_parse_errors_carry_line() {
    let err = Parser::new("init\ncall main\n")
        .and_then(|mut p| p.parse_program())
        .expect_err("should not parse");
    assert_eq!(err.location.line, 2);

    let err = Parser::new("layout high=1 high=2\n")
        .and_then(|mut p| p.parse_program())
        .expect_err("duplicate key should not parse");
    assert_eq!(err.location.line, 1);
}

#[test]
fn test_memory_shrink_below_declared_fiber_fails() {
    let source = "\
fiber w base=0x30000 end=0x20000
memory 1
layout high=0x8000 low=0x1000
init
switch w
";
    let (machine, result) = run_script::<u32>(source);

    assert!(matches!(
        result,
        Err(RuntimeError::OutOfLinearMemory {
            low: 0x20000,
            high: 0x30000,
            memory_size: 0x10000,
            ..
        })
    ));
    assert_eq!(error_line(&result), 2);
    // Memory keeps its previous size
    assert_eq!(machine.memory().size_bytes(), 256 * 0x10000);
}

#[test]
fn test_memory_grow_with_declared_fiber() {
    let source = "fiber w base=0x30000 end=0x20000\nmemory 4\n";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    assert_eq!(machine.memory().pages(), 4);
}

#[test]
fn test_runtime_error_reported_when_history_is_full() {
    let mut parser = Parser::new("ret\n").expect("Parser creation failed");
    let program = parser.parse_program().expect("Parsing failed");
    // Room for the initial snapshot only
    let mut machine = Machine::<u32>::new(program, 200);

    let result = machine.run();

    assert!(matches!(result, Err(RuntimeError::NoFrame { .. })));
    assert_eq!(error_line(&result), 1);
    assert_eq!(machine.error(), result.as_ref().err());
    assert_eq!(machine.total_snapshots(), 1);
}

#[test]
fn test_inverted_fiber_is_accepted_with_warning() {
    let source = "\
layout high=0x2000 low=0x1000
init
fiber w base=0x100 end=0x200
switch w
";
    let (machine, result) = run_script::<u32>(source);

    assert!(result.is_ok(), "Execution failed: {:?}", result);
    assert_eq!(machine.context().base(), Ok(0x100));
    assert_eq!(machine.context().end(), Ok(0x200));
    assert!(machine
        .events()
        .lines
        .iter()
        .any(|e| e.level == EventLevel::Warn && e.location.line == 3));
}

#[test]
fn test_fiber_outside_memory_fails() {
    let source = "memory 1\nfiber w base=0x20000 end=0x18000\n";
    let (_, result) = run_script::<u32>(source);
    assert!(matches!(result, Err(RuntimeError::OutOfLinearMemory { .. })));
    assert_eq!(error_line(&result), 2);
}
