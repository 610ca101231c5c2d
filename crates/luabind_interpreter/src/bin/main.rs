use luabind::lua_vm::MULTRET;
use luabind::{Key, LuaState, LuaType, LuaVM, Table, ThreadStatus, Value};
use std::env;
use std::fs;
use std::io::{self, BufRead, Read, Write};

const VERSION: &str = "Lua 5.4 (luabind)";
const COPYRIGHT: &str = "Copyright (C) 1994-2024 Lua.org, PUC-Rio";

fn print_usage() {
    eprintln!("usage: lua [options] [script [args]]");
    eprintln!("Available options are:");
    eprintln!("  -e stat   execute string 'stat'");
    eprintln!("  -i        enter interactive mode after executing 'script'");
    eprintln!("  -v        show version information");
    eprintln!("  -E        ignore environment variables");
    eprintln!("  -W        turn warnings on");
    eprintln!("  --        stop handling options");
    eprintln!("  -         stop handling options and execute stdin");
}

fn print_version() {
    println!("{}  {}", VERSION, COPYRIGHT);
}

#[derive(Default, Debug)]
struct Options {
    execute_strings: Vec<String>,
    interactive: bool,
    script_file: Option<String>,
    script_args: Vec<String>,
    show_version: bool,
    read_stdin: bool,
    ignore_env: bool,
    warnings_on: bool,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options::default();
    let mut i = 1;
    let mut stop_options = false;

    while i < args.len() {
        let arg = &args[i];

        if !stop_options && arg.starts_with('-') {
            match arg.as_str() {
                "-e" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("'-e' needs argument".to_string());
                    }
                    opts.execute_strings.push(args[i].clone());
                }
                "-i" => {
                    opts.interactive = true;
                    opts.show_version = true;
                }
                "-v" => {
                    opts.show_version = true;
                }
                "-E" => {
                    opts.ignore_env = true;
                }
                "-W" => {
                    opts.warnings_on = true;
                }
                "--" => {
                    stop_options = true;
                }
                "-" => {
                    opts.read_stdin = true;
                    i += 1;
                    opts.script_args.extend(args[i.min(args.len())..].iter().cloned());
                    break;
                }
                _ => {
                    return Err(format!("unrecognized option '{}'", arg));
                }
            }
        } else {
            // First non-option argument is the script file
            opts.script_file = Some(arg.clone());
            opts.script_args.extend(args[i + 1..].iter().cloned());
            break;
        }
        i += 1;
    }

    Ok(opts)
}

/// `arg[-1]` is the interpreter, `arg[0]` the script, `arg[1..]` its arguments.
fn build_arg_table(exe_path: &str, script_name: Option<&str>, args: &[String]) -> Table {
    let mut table: Table = args.iter().map(|a| Value::from(a.as_str())).collect();
    table.set(Key::Integer(-1), Value::from(exe_path));
    if let Some(name) = script_name {
        table.set(Key::Integer(0), Value::from(name));
    }
    table
}

/// Message handler: append a traceback to string errors.
fn message_handler(state: LuaState) -> i32 {
    let msg = match state.type_of(1) {
        LuaType::String | LuaType::Number => state.to_string(1).unwrap_or_default(),
        LuaType::Nil | LuaType::None => "(error object is a nil value)".to_string(),
        _ => {
            // __tostring may give something printable
            let s = state.to_string_meta(1);
            state.pop(1);
            s
        }
    };
    state.traceback(state, Some(&msg), 1);
    1
}

/// Call the function below the `nargs` arguments on top, with tracebacks.
fn docall(state: LuaState, nargs: i32, nresults: i32) -> ThreadStatus {
    let base = state.get_top() - nargs;
    state.push_function(message_handler);
    state.insert(base);
    let status = state.pcall(nargs, nresults, base);
    state.remove(base);
    status
}

/// Print and pop the error message on top of the stack, if any.
fn report(state: LuaState, status: ThreadStatus) -> Result<(), String> {
    if status.is_ok() {
        return Ok(());
    }
    let msg = state
        .to_string(-1)
        .unwrap_or_else(|| format!("(error object is a {} value)", state.type_name(-1)));
    state.pop(1);
    log::debug!("chunk failed with {status:?}");
    Err(msg)
}

fn run_chunk(state: LuaState, code: &[u8], name: &str) -> Result<(), String> {
    let mut status = state.load_buffer(code, name);
    if status.is_ok() {
        status = docall(state, 0, 0);
    }
    report(state, status)
}

fn execute_file(state: LuaState, filename: &str, args: &[String]) -> Result<(), String> {
    let code = fs::read(filename).map_err(|e| format!("cannot open {}: {}", filename, e))?;
    // skip a leading '#!' line, keeping line numbers
    let code = if code.starts_with(b"#") {
        let end = code.iter().position(|&b| b == b'\n').unwrap_or(code.len());
        [b"--".as_slice(), &code[end..]].concat()
    } else {
        code
    };
    let mut status = state.load_buffer(&code, &format!("@{filename}"));
    if status.is_ok() {
        for a in args {
            state.push_string(a);
        }
        status = docall(state, args.len() as i32, MULTRET);
    }
    report(state, status)
}

fn execute_stdin(state: LuaState, args: &[String]) -> Result<(), String> {
    let mut code = Vec::new();
    io::stdin()
        .read_to_end(&mut code)
        .map_err(|e| format!("error reading stdin: {}", e))?;
    let mut status = state.load_buffer(&code, "=stdin");
    if status.is_ok() {
        for a in args {
            state.push_string(a);
        }
        status = docall(state, args.len() as i32, MULTRET);
    }
    report(state, status)
}

/// A syntax error caused by a chunk that just needs more lines.
fn is_incomplete(state: LuaState, status: ThreadStatus) -> bool {
    status == ThreadStatus::ErrSyntax
        && state
            .to_string(-1)
            .is_some_and(|msg| msg.ends_with("<eof>"))
}

/// Load `input` as an expression first, then as a statement.
fn load_line(state: LuaState, input: &str) -> ThreadStatus {
    let status = state.load_buffer(format!("return {input};").as_bytes(), "=stdin");
    if status.is_ok() {
        return status;
    }
    state.pop(1);
    state.load_buffer(input.as_bytes(), "=stdin")
}

/// Print everything on the stack through the global `print`.
fn print_results(state: LuaState) {
    let n = state.get_top();
    if n == 0 {
        return;
    }
    if state.get_global("print") != LuaType::Function {
        state.pop(n + 1);
        return;
    }
    state.insert(1);
    let status = state.pcall(n, 0, 0);
    if let Err(msg) = report(state, status) {
        eprintln!("lua: error calling 'print' ({msg})");
    }
}

fn run_repl(state: LuaState) {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut incomplete = String::new();

    loop {
        print!("{}", if incomplete.is_empty() { "> " } else { ">> " });
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(_)) | None => break,
        };

        if !incomplete.is_empty() {
            incomplete.push('\n');
        }
        incomplete.push_str(&line);

        let status = load_line(state, &incomplete);
        if is_incomplete(state, status) {
            state.pop(1);
            continue;
        }
        incomplete.clear();

        let status = if status.is_ok() {
            docall(state, 0, MULTRET)
        } else {
            status
        };
        match report(state, status) {
            Ok(()) => print_results(state),
            Err(msg) => eprintln!("{msg}"),
        }
        state.set_top(0);
    }
    println!();
}

fn handle_lua_init(state: LuaState) -> Result<(), String> {
    let (name, init) = match env::var("LUA_INIT_5_4") {
        Ok(init) => ("=LUA_INIT_5_4", init),
        Err(_) => match env::var("LUA_INIT") {
            Ok(init) => ("=LUA_INIT", init),
            Err(_) => return Ok(()),
        },
    };
    match init.strip_prefix('@') {
        Some(filename) => execute_file(state, filename, &[]),
        None => run_chunk(state, init.as_bytes(), name),
    }
}

fn main() {
    env_logger::init();
    std::process::exit(lua_main());
}

fn lua_main() -> i32 {
    let args: Vec<String> = env::args().collect();
    let opts = match parse_args(&args) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("lua: {}", e);
            print_usage();
            return 1;
        }
    };
    log::debug!("{opts:?}");

    if opts.show_version {
        print_version();
    }

    let vm = match LuaVM::with_stdlib() {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("lua: cannot create state: {e}");
            return 1;
        }
    };
    let state = vm.state();

    if opts.warnings_on {
        let _ = run_chunk(state, b"warn('@on')", "=(command line)");
    }

    let exe_path = args.first().map(String::as_str).unwrap_or("lua");
    let arg_table = build_arg_table(exe_path, opts.script_file.as_deref(), &opts.script_args);
    state.push_table(&arg_table);
    state.set_global("arg");

    if !opts.ignore_env {
        if let Err(e) = handle_lua_init(state) {
            eprintln!("lua: {}", e);
            return 1;
        }
    }

    for code in &opts.execute_strings {
        if let Err(e) = run_chunk(state, code.as_bytes(), "=(command line)") {
            eprintln!("lua: {}", e);
            return 1;
        }
    }

    if let Some(filename) = &opts.script_file {
        if let Err(e) = execute_file(state, filename, &opts.script_args) {
            eprintln!("lua: {}", e);
            return 1;
        }
    } else if opts.read_stdin {
        if let Err(e) = execute_stdin(state, &opts.script_args) {
            eprintln!("lua: {}", e);
            return 1;
        }
    }

    if opts.interactive
        || (opts.execute_strings.is_empty()
            && opts.script_file.is_none()
            && !opts.read_stdin
            && !opts.show_version)
    {
        if !opts.show_version {
            print_version();
        }
        run_repl(state);
    }

    vm.close();
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("lua")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_script_and_args() {
        let opts = parse_args(&argv(&["-e", "x=1", "script.lua", "a", "-v"])).unwrap();
        assert_eq!(opts.execute_strings, vec!["x=1"]);
        assert_eq!(opts.script_file.as_deref(), Some("script.lua"));
        assert_eq!(opts.script_args, vec!["a", "-v"]);
        assert!(!opts.show_version);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&argv(&["-e"])).is_err());
        assert!(parse_args(&argv(&["-x"])).is_err());
    }

    #[test]
    fn test_parse_stdin_and_double_dash() {
        let opts = parse_args(&argv(&["-", "a"])).unwrap();
        assert!(opts.read_stdin);
        assert_eq!(opts.script_args, vec!["a"]);

        let opts = parse_args(&argv(&["--", "-e"])).unwrap();
        assert_eq!(opts.script_file.as_deref(), Some("-e"));
    }

    #[test]
    fn test_arg_table_layout() {
        let t = build_arg_table("lua", Some("s.lua"), &["x".to_string(), "y".to_string()]);
        assert_eq!(t.narr(), 2);
        assert_eq!(t.get(Key::Integer(0)), Some(&Value::from("s.lua")));
        assert_eq!(t.get(Key::Integer(-1)), Some(&Value::from("lua")));
        assert_eq!(t.get(Key::Integer(2)), Some(&Value::from("y")));
    }

    #[test]
    fn test_script_receives_arg_table() {
        let vm = LuaVM::with_stdlib().unwrap();
        let state = vm.state();
        let t = build_arg_table("lua", Some("s.lua"), &["x".to_string()]);
        state.push_table(&t);
        state.set_global("arg");
        assert!(run_chunk(state, b"assert(arg[0] == 's.lua' and arg[1] == 'x' and #arg == 1)", "=t").is_ok());
        let err = run_chunk(state, b"error('boom')", "=t").unwrap_err();
        assert!(err.contains("boom"));
        assert!(err.contains("stack traceback"));
    }
}
