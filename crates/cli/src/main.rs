use std::env;
use std::fs;
use std::io::Read;
use std::process;

use bumpalo::Bump;
use pegvm_bridge::{Driver, RunOutcome};
use pegvm_common::StringInterner;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut dump = false;
    let mut grammar_path: Option<&str> = None;
    let mut input_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--dump" => dump = true,
            arg if arg == "-" || !arg.starts_with('-') => {
                if grammar_path.is_none() {
                    grammar_path = Some(arg);
                } else if input_path.is_none() {
                    input_path = Some(arg);
                }
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let grammar_path = match grammar_path {
        Some(p) => p,
        None => {
            eprintln!("Usage: {} [--dump] <grammar-file> [input-file|-]", args[0]);
            eprintln!("Options:");
            eprintln!("  --dump  Print the compiled grammar instead of running");
            eprintln!("With no input file (or '-'), input is read from stdin.");
            process::exit(1);
        }
    };

    let grammar = match fs::read_to_string(grammar_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", grammar_path, e);
            process::exit(1);
        }
    };

    if dump {
        let arena = Bump::new();
        let mut strings = StringInterner::new(&arena);
        match pegvm_parser::compile(&arena, &mut strings, &grammar) {
            Ok(compiled) => compiled.dump(),
            Err(e) => {
                eprintln!("{}: {}", grammar_path, e.render());
                process::exit(1);
            }
        }
        return;
    }

    let input = match input_path {
        Some(p) if p != "-" => match fs::read_to_string(p) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading {}: {}", p, e);
                process::exit(1);
            }
        },
        _ => {
            let mut buf = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
                eprintln!("Error reading stdin: {}", e);
                process::exit(1);
            }
            buf
        }
    };

    // Inputs ending in a trailing newline are common when piped; grammars
    // rarely intend to match it
    let input = input.strip_suffix('\n').unwrap_or(&input).to_string();

    let mut driver = Driver::new();
    match driver.run(&grammar, &input) {
        Ok(RunOutcome::Matched(text)) => {
            println!("{}", text);
        }
        Ok(RunOutcome::Failed(msg)) => {
            eprintln!("{}", msg);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
