// Tests for registry handles and the unsafe wrapper layer
use crate::*;

#[test]
fn test_ref_and_push() {
    let vm = LuaVM::new().unwrap();
    vm.push_string("kept");
    let id = vm.registry_ref();
    assert_eq!(vm.get_top(), 0);
    assert!(id > 0);
    assert_eq!(vm.push_ref(id), LuaType::String);
    assert_eq!(vm.to_string(-1).as_deref(), Some("kept"));
    vm.pop(1);
    vm.registry_unref(id);
}

#[test]
fn test_nil_and_sentinels() {
    let vm = LuaVM::new().unwrap();
    vm.push_nil();
    assert_eq!(vm.registry_ref(), REF_NIL);
    assert_eq!(vm.push_ref(REF_NIL), LuaType::Nil);
    assert_eq!(vm.push_ref(NO_REF), LuaType::Nil);
    vm.pop(2);
    // no-ops
    vm.registry_unref(REF_NIL);
    vm.registry_unref(NO_REF);
}

#[test]
fn test_released_id_is_reused() {
    let vm = LuaVM::new().unwrap();
    vm.push_string("first");
    let stale = UnsafeLuaRef::pop_from(vm.state());
    let id = stale.id();
    stale.unref();

    vm.push_string("second");
    let fresh = UnsafeLuaRef::pop_from(vm.state());
    // the registry hands out the freed integer again; a stale handle would
    // now see an unrelated value
    assert_eq!(fresh.id(), id);
    fresh.push();
    assert_eq!(vm.to_string(-1).as_deref(), Some("second"));
    vm.pop(1);
    fresh.unref();
}

#[test]
fn test_copy_registers_again() {
    let vm = LuaVM::new().unwrap();
    vm.new_table();
    let a = UnsafeLuaRef::from_index(vm.state(), -1);
    assert_eq!(vm.get_top(), 1);
    let b = a.copy();
    assert_ne!(a.id(), b.id());

    a.unref();
    // b still holds the table
    assert_eq!(b.push(), LuaType::Table);
    assert!(vm.raw_equal(-1, 1));
    vm.pop(2);
    b.unref();
}

#[test]
fn test_raw_parts_round_trip() {
    let vm = LuaVM::new().unwrap();
    vm.push_integer(3);
    let r = UnsafeLuaRef::pop_from(vm.state());
    let (state, id) = r.into_raw_parts();
    let r = unsafe { UnsafeLuaRef::from_raw_parts(state, id) };
    assert_eq!(r.push(), LuaType::Number);
    vm.pop(1);
    r.unref();
}

#[test]
fn test_unsafe_value_variants() {
    let vm = LuaVM::with_stdlib().unwrap();
    assert_eq!(vm.do_string("return nil, true, 7, 'str', {}, print"), ThreadStatus::Ok);

    assert!(vm.to_unsafe_value(1).is_nil());
    assert_eq!(vm.to_unsafe_value(2).as_bool(), Some(true));
    assert_eq!(vm.to_unsafe_value(3).as_number(), Some(LuaNumber::Int(7)));
    assert!(matches!(vm.to_unsafe_value(10), UnsafeLuaValue::None));

    let s = vm.to_unsafe_value(4);
    assert_eq!(s.type_of(), LuaType::String);
    assert!(s.ref_id().is_some());
    let t = vm.to_unsafe_value(5);
    let f = vm.to_unsafe_value(6);
    assert_eq!(f.type_of(), LuaType::Function);
    f.unref();

    // consuming accessor on a mismatch hands the value back
    let s = match s.as_table() {
        Ok(_) => panic!("a string is not a table"),
        Err(back) => back,
    };
    let s = s.as_string().unwrap();
    s.push();
    assert_eq!(vm.to_string(-1).as_deref(), Some("str"));
    vm.pop(1);
    s.unref();

    let t2 = t.copy();
    t.unref();
    t2.push(vm.state());
    assert_eq!(vm.type_of(-1), LuaType::Table);
    vm.pop(1);
    t2.unref();
}

#[test]
fn test_unsafe_value_pop_and_into_safe() {
    let vm = LuaVM::new().unwrap();
    vm.push_string("x");
    let v = UnsafeLuaValue::pop_from(vm.state());
    assert_eq!(vm.get_top(), 0);
    let safe = v.into_safe();
    assert_eq!(safe.type_of(), LuaType::String);
    let s = safe.as_string().unwrap();
    assert_eq!(s.to_string_lossy(), "x");
}
