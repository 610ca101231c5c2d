// Tests for copying tables between the VM and the host
use crate::*;

fn copy_of(vm: &LuaVM, code: &str) -> Table {
    assert_eq!(vm.do_string(code), ThreadStatus::Ok, "{code}");
    let t = vm.copy_table(-1);
    vm.pop(1);
    t
}

#[test]
fn test_dense_table_copies_to_array() {
    let vm = LuaVM::with_stdlib().unwrap();
    let t = copy_of(&vm, "return {10, 20, 30, 40}");
    assert_eq!(t.narr(), 4);
    assert_eq!(t.nrec(), 0);
    let ints: Vec<_> = t.array().iter().filter_map(Value::as_integer).collect();
    assert_eq!(ints, vec![10, 20, 30, 40]);
    assert_eq!(vm.get_top(), 0);
}

#[test]
fn test_sparse_key_stays_in_map() {
    let vm = LuaVM::with_stdlib().unwrap();
    let t = copy_of(&vm, "local t = {} t[5] = 'five' return t");
    assert_eq!(t.narr(), 0);
    assert_eq!(t.nrec(), 1);
    assert_eq!(t.get(5), Some(&Value::from("five")));

    let t = copy_of(&vm, "local t = {} for i = 5, 1, -1 do t[i] = i end return t");
    assert_eq!(t.narr(), 5);
    assert_eq!(t.nrec(), 0);
}

#[test]
fn test_mixed_keys() {
    let vm = LuaVM::with_stdlib().unwrap();
    let t = copy_of(
        &vm,
        "return {1, 2, name = 'x', [true] = 'yes', [0] = 'zero', [-3] = 'neg', [2.5] = 'half'}",
    );
    assert_eq!(t.narr(), 2);
    assert_eq!(t.get("name"), Some(&Value::from("x")));
    assert_eq!(t.get(true), Some(&Value::from("yes")));
    assert_eq!(t.get(0.0), Some(&Value::from("zero")));
    assert_eq!(t.get(0), Some(&Value::from("zero")));
    assert_eq!(t.get(-3), Some(&Value::from("neg")));
    assert_eq!(t.get(2.5), Some(&Value::from("half")));
}

#[test]
fn test_nested_tables() {
    let vm = LuaVM::with_stdlib().unwrap();
    let t = copy_of(&vm, "return {inner = {1, {deep = true}}}");
    let inner = t.get("inner").and_then(Value::as_table).unwrap();
    assert_eq!(inner.narr(), 2);
    let deep = inner.get(2).and_then(Value::as_table).unwrap();
    assert_eq!(deep.get("deep"), Some(&Value::Bool(true)));
}

#[test]
fn test_unrepresentable_entries_skipped() {
    let vm = LuaVM::with_stdlib().unwrap();
    let t = copy_of(&vm, "return {f = print, [{}] = 1, co = coroutine.create(print), ok = 1}");
    assert_eq!(t.nrec(), 1);
    assert_eq!(t.get("ok"), Some(&Value::from(1)));
}

#[test]
fn test_cyclic_table_copies_once() {
    let vm = LuaVM::with_stdlib().unwrap();
    let t = copy_of(&vm, "local t = {name = 'root'} t.self = t t.child = {parent = t, n = 1} return t");
    assert_eq!(t.get("name"), Some(&Value::from("root")));
    assert!(t.get("self").is_none());
    let child = t.get("child").and_then(Value::as_table).unwrap();
    assert!(child.get("parent").is_none());
    assert_eq!(child.get("n"), Some(&Value::from(1)));
}

#[test]
fn test_shared_subtable_is_not_a_cycle() {
    let vm = LuaVM::with_stdlib().unwrap();
    let t = copy_of(&vm, "local s = {1} return {a = s, b = s}");
    assert!(t.get("a").and_then(Value::as_table).is_some());
    assert!(t.get("b").and_then(Value::as_table).is_some());
}

#[test]
fn test_non_utf8_string_is_lossy() {
    let vm = LuaVM::with_stdlib().unwrap();
    assert_eq!(vm.do_string("return '\\xff'"), ThreadStatus::Ok);
    assert_eq!(vm.to_host(-1), Some(Value::from("\u{fffd}")));
}

#[test]
fn test_to_host_of_non_table() {
    let vm = LuaVM::with_stdlib().unwrap();
    vm.push_integer(3);
    vm.push_number(0.5);
    vm.get_global("print");
    assert_eq!(vm.to_host(1), Some(Value::from(3)));
    assert_eq!(vm.to_host(2), Some(Value::from(0.5)));
    assert_eq!(vm.to_host(3), None);
    assert_eq!(vm.to_host(4), None);
}

#[test]
fn test_push_table_round_trip() {
    let vm = LuaVM::with_stdlib().unwrap();
    let mut host: Table = (1..=3i64).map(Value::from).collect();
    host.set("name", Value::from("t"));
    host.set(false, Value::from(0));
    host.set(-1, Value::from("neg"));
    host.set(1.5, Value::from("frac"));
    host.set(10, Value::from("far"));

    vm.push_table(&host);
    vm.set_global("t");
    let check = "return #t == 3 and t.name == 't' and t[false] == 0 and t[-1] == 'neg' \
                 and t[1.5] == 'frac' and t[10] == 'far' and math.type(t[1]) == 'integer'";
    assert_eq!(vm.do_string(check), ThreadStatus::Ok);
    assert!(vm.to_boolean(-1));
    vm.pop(1);

    vm.get_global("t");
    let back = vm.copy_table(-1);
    assert_eq!(back.narr(), 3);
    assert_eq!(back.nrec(), 5);
    assert_eq!(back.get(10), Some(&Value::from("far")));
}

#[test]
fn test_push_host_nested() {
    let vm = LuaVM::with_stdlib().unwrap();
    let inner: Table = vec![("x", Value::from(1))].into_iter().collect();
    let outer: Table = vec![Value::Table(inner), Value::from("s")].into_iter().collect();
    vm.push_host(&Value::Table(outer));
    vm.set_global("o");
    assert_eq!(vm.do_string("return o[1].x + #o"), ThreadStatus::Ok);
    assert_eq!(vm.to_integer(-1), Some(3));
}
