use std::{env, io::Read, process::ExitCode};

use jerboa::{ScriptValue, Vm};

fn read_stdin() -> std::io::Result<String> {
    let mut source = String::new();
    std::io::stdin().read_to_string(&mut source)?;
    Ok(source)
}

fn io_print(_vm: &mut Vm, args: &[ScriptValue]) -> Result<ScriptValue, String> {
    let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
    print!("{}", rendered.join(" "));
    Ok(ScriptValue::Undefined)
}

fn io_puts(vm: &mut Vm, args: &[ScriptValue]) -> Result<ScriptValue, String> {
    io_print(vm, args)?;
    println!();
    Ok(ScriptValue::Undefined)
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = args.get(1).map_or("-", String::as_str);

    let (source, display_path) = if file_path == "-" {
        match read_stdin() {
            Ok(source) => (source, "<stdin>".to_owned()),
            Err(err) => {
                eprintln!("error: could not read from stdin: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        match std::fs::read_to_string(file_path) {
            Ok(source) => (source, file_path.to_owned()),
            Err(err) => {
                eprintln!("error: could not read file {file_path}: {err}");
                return ExitCode::FAILURE;
            }
        }
    };

    let mut vm = Vm::new();
    vm.register_module("io", &[("print", io_print), ("puts", io_puts)]);

    match vm.eval(&source, &display_path) {
        Ok(_) => ExitCode::SUCCESS,
        Err(exception) => {
            eprintln!("{exception}");
            ExitCode::FAILURE
        }
    }
}
