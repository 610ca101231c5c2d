// Tests for coroutines, yields and continuations
use crate::*;

/// Yields 1, 2, 3, then returns "done"
struct CountUp;

impl Continuation for CountUp {
    fn resume(state: LuaState, _status: ThreadStatus, ctx: isize) -> i32 {
        if ctx < 3 {
            state.push_integer(ctx as i64 + 1);
            state.yield_k::<CountUp>(1, ctx + 1)
        }
        state.push_string("done");
        1
    }
}

fn count_up(state: LuaState) -> i32 {
    state.push_integer(1);
    state.yield_k::<CountUp>(1, 1)
}

#[test]
fn test_continuation_yields_then_returns() {
    let vm = LuaVM::with_stdlib().unwrap();
    let co = vm.new_thread();
    co.push_function(count_up);

    for expected in 1..=3 {
        let (status, n) = co.resume(Some(vm.state()), 0);
        assert_eq!(status, ThreadStatus::Yield);
        assert_eq!(n, 1);
        assert_eq!(co.to_integer(-1), Some(expected));
        assert_eq!(co.status(), ThreadStatus::Yield);
        co.pop(n);
    }

    let (status, n) = co.resume(Some(vm.state()), 0);
    assert_eq!(status, ThreadStatus::Ok);
    assert_eq!(n, 1);
    assert_eq!(co.to_string(-1).as_deref(), Some("done"));
}

fn yielder(state: LuaState) -> i32 {
    state.push_string("y");
    state.yield_values(1)
}

#[test]
fn test_yield_from_host_function() {
    let vm = LuaVM::with_stdlib().unwrap();
    vm.register("yielder", yielder);
    let status = vm.do_string(
        "local co = coroutine.wrap(function() local x = yielder() return x * 2 end) \
         assert(co() == 'y') assert(co(5) == 10)",
    );
    assert_eq!(status, ThreadStatus::Ok);
}

#[test]
fn test_script_coroutine_yield() {
    let vm = LuaVM::with_stdlib().unwrap();
    assert_eq!(
        vm.do_string("return coroutine.create(function(a) local b = coroutine.yield(a + 1) return b * 10 end)"),
        ThreadStatus::Ok
    );
    let co = vm.to_thread(-1).unwrap();

    co.push_integer(1);
    let (status, n) = co.resume(Some(vm.state()), 1);
    assert_eq!((status, n), (ThreadStatus::Yield, 1));
    assert_eq!(co.to_integer(-1), Some(2));
    co.pop(1);

    co.push_integer(4);
    let (status, n) = co.resume(Some(vm.state()), 1);
    assert_eq!((status, n), (ThreadStatus::Ok, 1));
    assert_eq!(co.to_integer(-1), Some(40));
}

#[test]
fn test_resume_error_leaves_message() {
    let vm = LuaVM::with_stdlib().unwrap();
    let co = vm.new_thread();
    assert_eq!(co.load_buffer(b"error('inside')", "=co"), ThreadStatus::Ok);
    let (status, _) = co.resume(None, 0);
    assert_eq!(status, ThreadStatus::ErrRun);
    assert!(co.to_string(-1).unwrap().contains("inside"));
    assert!(matches!(co.check_status(status), Err(LuaError::Runtime(_))));
    vm.traceback(co, None, 0);
    assert!(vm.to_string(-1).unwrap().starts_with("stack traceback:"));
}

struct AfterPcall;

impl Continuation for AfterPcall {
    fn resume(state: LuaState, status: ThreadStatus, ctx: isize) -> i32 {
        state.push_boolean(matches!(status, ThreadStatus::Ok | ThreadStatus::Yield));
        state.push_integer(ctx as i64);
        state.get_top()
    }
}

fn protected(state: LuaState) -> i32 {
    state.set_top(1);
    let status = state.pcallk::<AfterPcall>(0, 1, 0, 7);
    AfterPcall::resume(state, status, 7)
}

#[test]
fn test_pcallk_across_yield() {
    let vm = LuaVM::with_stdlib().unwrap();
    vm.register("protected", protected);
    let status = vm.do_string(
        "local co = coroutine.wrap(function() \
            return protected(function() local v = coroutine.yield('paused') return v end) \
         end) \
         assert(co() == 'paused') \
         local r, ok, ctx = co('resumed') \
         assert(r == 'resumed' and ok == true and ctx == 7) \
         local r2, ok2 = protected(function() return 'direct' end) \
         assert(r2 == 'direct' and ok2)",
    );
    if let Err(e) = vm.check_status(status) {
        panic!("{e}");
    }
}

#[test]
fn test_is_yieldable() {
    let vm = LuaVM::with_stdlib().unwrap();
    assert!(!vm.is_yieldable());
    vm.register("can_yield", |state| {
        let y = state.is_yieldable();
        state.push_boolean(y);
        1
    });
    let status = vm.do_string(
        "assert(not can_yield()) \
         assert(coroutine.wrap(function() return can_yield() end)())",
    );
    assert_eq!(status, ThreadStatus::Ok);
}
