// Tests for the VM handle and raw stack operations
use crate::lua_vm::{EXTRA_SPACE, REGISTRY_INDEX, RIDX_GLOBALS, RIDX_MAINTHREAD};
use crate::*;

#[test]
fn test_do_string_returns_value() {
    let vm = LuaVM::with_stdlib().unwrap();
    let status = vm.do_string("return \"asdf\"");
    assert_eq!(status, ThreadStatus::Ok);
    assert_eq!(vm.get_top(), 1);
    assert_eq!(vm.type_of(-1), LuaType::String);
    assert_eq!(vm.to_string(-1).as_deref(), Some("asdf"));
}

#[test]
fn test_syntax_error_status() {
    let vm = LuaVM::new().unwrap();
    let status = vm.do_string("return +");
    assert_eq!(status, ThreadStatus::ErrSyntax);
    assert!(status.is_error());
    assert_eq!(vm.type_of(-1), LuaType::String);
    match vm.check_status(status) {
        Err(LuaError::Syntax(msg)) => assert!(msg.contains("unexpected symbol")),
        other => panic!("expected syntax error, got {other:?}"),
    }
    // check_status copies, it does not pop
    assert_eq!(vm.get_top(), 1);
}

#[test]
fn test_runtime_error_object() {
    let vm = LuaVM::with_stdlib().unwrap();
    let status = vm.do_string("error({code = 1})");
    assert_eq!(status, ThreadStatus::ErrRun);
    assert_eq!(vm.type_of(-1), LuaType::Table);
    let err = vm.check_status(status).unwrap_err();
    assert_eq!(err.to_string(), "runtime error: (error object is a table value)");
    assert!(vm.check_status(ThreadStatus::Ok).is_ok());
}

#[test]
fn test_primitive_round_trips() {
    let vm = LuaVM::new().unwrap();
    vm.push_nil();
    vm.push_boolean(true);
    vm.push_integer(-42);
    vm.push_number(2.5);
    vm.push_string("hello");
    vm.push_bytes(b"a\0b");
    assert_eq!(vm.get_top(), 6);

    assert!(vm.is_nil(1));
    assert!(vm.to_boolean(2));
    assert!(vm.is_integer(3));
    assert_eq!(vm.to_integer(3), Some(-42));
    assert!(!vm.is_integer(4));
    assert_eq!(vm.to_number(4), Some(2.5));
    assert_eq!(vm.to_string(5).as_deref(), Some("hello"));
    assert_eq!(vm.to_bytes(6).as_deref(), Some(&b"a\0b"[..]));
    assert_eq!(vm.raw_len(6), 3);

    assert_eq!(vm.type_name(3), "number");
    assert!(vm.is_none(7));
    assert!(vm.is_none_or_nil(1));
    assert_eq!(vm.to_integer(5), None);
}

#[test]
fn test_stack_shuffling() {
    let vm = LuaVM::new().unwrap();
    for i in 1..=4 {
        vm.push_integer(i);
    }
    // 1 2 3 4 -> 4 1 2 3
    vm.insert(1);
    assert_eq!(vm.to_integer(1), Some(4));
    assert_eq!(vm.to_integer(2), Some(1));
    // 4 1 2 3 -> 4 2 3
    vm.remove(2);
    assert_eq!(vm.get_top(), 3);
    assert_eq!(vm.to_integer(2), Some(2));
    // replace slot 1 with the top: 3 2
    vm.replace(1);
    assert_eq!(vm.to_integer(1), Some(3));
    assert_eq!(vm.get_top(), 2);
    vm.copy(1, 2);
    assert_eq!(vm.to_integer(2), Some(3));
    vm.push_value(-1);
    assert_eq!(vm.get_top(), 3);
    assert_eq!(vm.abs_index(-1), 3);
    vm.set_top(0);
    assert_eq!(vm.get_top(), 0);
}

#[test]
fn test_compare_and_concat() {
    let vm = LuaVM::new().unwrap();
    vm.push_integer(1);
    vm.push_number(2.0);
    assert!(vm.compare(1, 2, CompareOp::Lt));
    assert!(vm.compare(1, 2, CompareOp::Le));
    assert!(!vm.compare(1, 2, CompareOp::Eq));
    vm.push_number(1.0);
    assert!(vm.compare(1, 3, CompareOp::Eq));
    assert!(vm.raw_equal(1, 3));
    vm.set_top(0);

    vm.push_string("a");
    vm.push_integer(1);
    vm.push_string("b");
    vm.concat(3);
    assert_eq!(vm.to_string(-1).as_deref(), Some("a1b"));
}

#[test]
fn test_to_string_meta_pushes() {
    let vm = LuaVM::new().unwrap();
    vm.push_boolean(false);
    assert_eq!(vm.to_string_meta(1), "false");
    assert_eq!(vm.get_top(), 2);
}

#[test]
fn test_globals_and_fields() {
    let vm = LuaVM::with_stdlib().unwrap();
    vm.push_integer(7);
    vm.set_global("answer");
    assert_eq!(vm.do_string("return answer * 6"), ThreadStatus::Ok);
    assert_eq!(vm.to_integer(-1), Some(42));
    vm.pop(1);

    vm.new_table();
    vm.push_string("v");
    vm.set_field(-2, "k");
    vm.push_integer(10);
    vm.set_i(-2, 1);
    assert_eq!(vm.get_field(-1, "k"), LuaType::String);
    vm.pop(1);
    assert_eq!(vm.raw_get_i(-1, 1), LuaType::Number);
    assert_eq!(vm.to_integer(-1), Some(10));
    vm.pop(1);
    assert_eq!(vm.get_i(-1, 2), LuaType::Nil);
    vm.pop(2);

    assert_eq!(vm.raw_get_i(REGISTRY_INDEX, RIDX_GLOBALS), LuaType::Table);
    vm.push_globals();
    assert!(vm.raw_equal(-1, -2));
    vm.pop(2);
    assert_eq!(vm.raw_get_i(REGISTRY_INDEX, RIDX_MAINTHREAD), LuaType::Thread);
    assert_eq!(vm.to_thread(-1), Some(vm.main_thread()));
}

#[test]
fn test_metatables() {
    let vm = LuaVM::with_stdlib().unwrap();
    assert!(vm.new_metatable("test.Meta"));
    vm.push_string("meta!");
    vm.set_field(-2, "__name_tag");
    vm.pop(1);
    // idempotent
    assert!(!vm.new_metatable("test.Meta"));
    vm.pop(1);

    vm.new_table();
    assert!(!vm.get_metatable(-1));
    assert_eq!(vm.get_named_metatable("test.Meta"), LuaType::Table);
    vm.set_metatable(-2);
    assert!(vm.get_metatable(-1));
    assert_eq!(vm.get_field(-1, "__name_tag"), LuaType::String);
    vm.pop(3);
    assert_eq!(vm.get_named_metatable("test.Missing"), LuaType::Nil);
}

#[test]
fn test_extra_space_is_writable() {
    let vm = LuaVM::new().unwrap();
    let p = vm.extra_space();
    assert!(!p.is_null());
    assert_eq!(EXTRA_SPACE, std::mem::size_of::<*mut std::ffi::c_void>());
    let marker = 0x5a5a_usize;
    unsafe {
        p.cast::<usize>().write(marker);
        assert_eq!(vm.extra_space().cast::<usize>().read(), marker);
    }
}

#[test]
fn test_threads_share_globals_and_xmove() {
    let vm = LuaVM::with_stdlib().unwrap();
    let co = vm.new_thread();
    assert_eq!(vm.type_of(-1), LuaType::Thread);
    assert_ne!(co, vm.state());
    assert_eq!(co.main_thread(), vm.state());

    vm.push_integer(5);
    vm.xmove(co, 1);
    assert_eq!(co.to_integer(-1), Some(5));
    co.set_global("shared");
    assert_eq!(vm.get_global("shared"), LuaType::Number);
    vm.pop(2);
}

#[test]
fn test_close_consumes_vm() {
    let vm = LuaVM::new().unwrap();
    vm.push_string("bye");
    vm.close();
}
