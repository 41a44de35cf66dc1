use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    let args = env::args().skip(1).collect::<Vec<_>>();

    if let Some(result) = maybe_run_subcommand(&args) {
        if let Err(err) = result {
            eprintln!("{}", err);
            std::process::exit(1);
        }
        return;
    }

    if let Err(err) = run_compile(&args) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn maybe_run_subcommand(args: &[String]) -> Option<Result<(), String>> {
    match args.first()?.as_str() {
        "fmt" => Some(run_fmt_command(args)),
        "check" => Some(run_check_command(args)),
        "build" => Some(run_build_command(args)),
        _ => None,
    }
}

/// Default mode: compile one file and print (or write) its IR.
fn run_compile(args: &[String]) -> Result<(), String> {
    let mut file = None;
    let mut out: Option<PathBuf> = None;
    for arg in args {
        if let Some(value) = arg.strip_prefix("--out=") {
            out = Some(PathBuf::from(value));
            continue;
        }
        if arg.starts_with("--") {
            return Err(format!("unknown option '{}'", arg));
        }
        if file.is_none() {
            file = Some(arg.clone());
            continue;
        }
        return Err("usage: lode <file> [--out=<path>]".to_string());
    }
    let Some(file) = file else {
        return Err("usage: lode <file> [--out=<path>]".to_string());
    };

    let ir = compile_file(&file)?;
    match out {
        Some(path) => fs::write(&path, ir)
            .map_err(|err| format!("failed to write '{}': {}", path.display(), err)),
        None => {
            print!("{}", ir);
            Ok(())
        }
    }
}

fn compile_file(file: &str) -> Result<String, String> {
    let source =
        fs::read_to_string(file).map_err(|err| format!("failed to read '{}': {}", file, err))?;
    lode::compile(&source).map_err(|err| lode::errors::pretty::render(file, &source, &err))
}

fn run_fmt_command(args: &[String]) -> Result<(), String> {
    let mut check_only = false;
    let mut file = None;
    for arg in args.iter().skip(1) {
        if arg == "--check" {
            check_only = true;
            continue;
        }
        if file.is_none() {
            file = Some(arg.clone());
            continue;
        }
        return Err(format!("unknown fmt option '{}'", arg));
    }
    let Some(file) = file else {
        return Err("fmt usage: lode fmt [--check] <file>".to_string());
    };

    let source =
        fs::read_to_string(&file).map_err(|err| format!("failed to read '{}': {}", file, err))?;
    let program = lode::parser::parse(&source)
        .map_err(|err| lode::errors::pretty::render(&file, &source, &err.into()))?;
    let formatted = lode::formatter::format_program(&program);

    if check_only {
        if source == formatted {
            println!("fmt check passed: {}", file);
            Ok(())
        } else {
            Err(format!("formatting differs for '{}'; run `lode fmt {}`", file, file))
        }
    } else {
        fs::write(&file, formatted)
            .map_err(|err| format!("failed to write '{}': {}", file, err))?;
        println!("formatted {}", file);
        Ok(())
    }
}

fn run_check_command(args: &[String]) -> Result<(), String> {
    let Some(file) = args.get(1) else {
        return Err("check usage: lode check <file>".to_string());
    };
    compile_file(file)?;
    println!("check passed: {}", file);
    Ok(())
}

/// Compiles to IR, then drives the external backend: `qbe` lowers the IR
/// to assembly and the system C compiler assembles and links it.
fn run_build_command(args: &[String]) -> Result<(), String> {
    let mut file = None;
    let mut out: Option<PathBuf> = None;
    for arg in args.iter().skip(1) {
        if let Some(value) = arg.strip_prefix("--out=") {
            out = Some(PathBuf::from(value));
            continue;
        }
        if arg.starts_with("--") {
            return Err(format!(
                "unknown build option '{}'; supported: --out=<path>",
                arg
            ));
        }
        if file.is_none() {
            file = Some(arg.clone());
            continue;
        }
        return Err("build usage: lode build <file> [--out=<path>]".to_string());
    }
    let Some(file) = file else {
        return Err("build usage: lode build <file> [--out=<path>]".to_string());
    };

    let ir = compile_file(&file)?;
    let output = out.unwrap_or_else(|| default_output_path(&file));

    let work_dir = env::temp_dir().join(format!("lode-build-{}", std::process::id()));
    fs::create_dir_all(&work_dir)
        .map_err(|err| format!("failed to create '{}': {}", work_dir.display(), err))?;
    let ssa_path = work_dir.join("out.ssa");
    let asm_path = work_dir.join("out.s");
    fs::write(&ssa_path, ir)
        .map_err(|err| format!("failed to write '{}': {}", ssa_path.display(), err))?;

    run_tool(
        Command::new("qbe")
            .arg("-o")
            .arg(&asm_path)
            .arg(&ssa_path),
        "qbe",
    )?;
    run_tool(
        Command::new("cc").arg(&asm_path).arg("-o").arg(&output),
        "cc",
    )?;

    let _ = fs::remove_dir_all(&work_dir);
    println!("built {}", output.display());
    Ok(())
}

fn run_tool(command: &mut Command, name: &str) -> Result<(), String> {
    let status = command
        .status()
        .map_err(|err| format!("failed to run {}: {}", name, err))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{} failed", name))
    }
}

fn default_output_path(file: &str) -> PathBuf {
    let stem = Path::new(file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "a.out".to_string());
    PathBuf::from(stem)
}
