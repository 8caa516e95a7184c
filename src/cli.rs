//! `clap`-derived CLI surface and file-I/O driver, grounded on
//! `examples/original_source/hw4/compiler.py`'s argument handling.

use std::fs;
use std::path::PathBuf;

use clap::Parser as ClapParser;

use crate::diagnostic::Diagnostic;

#[derive(ClapParser)]
#[command(name = "quackc", version, about = "Compiler for the Quack language")]
pub struct Cli {
    /// Source file to compile.
    pub source: PathBuf,

    /// Name of the synthesized class that owns top-level statements.
    /// Defaults to the source file's stem.
    #[arg(short = 'm', long = "main-class")]
    pub main_class: Option<String>,

    /// Directory to write `<class>.asm` files into.
    #[arg(short = 'o', long = "output-dir", default_value = "out")]
    pub output_dir: PathBuf,

    /// Directory an external assembler writes object code into. Created but
    /// otherwise untouched by this crate.
    #[arg(short = 'j', long = "obj-dir", default_value = "OBJ")]
    pub obj_dir: PathBuf,

    /// Log level: INFO, DEBUG, or TRACE (case-insensitive).
    #[arg(short = 'D', long = "log-level", default_value = "INFO")]
    pub log_level: String,

    /// Dump a tree image. Accepted for interface compatibility; tree
    /// visualization is out of core scope (spec.md §1) and is skipped.
    #[arg(short = 'p', long = "png")]
    pub png: Option<PathBuf>,
}

impl Cli {
    pub fn tracing_level(&self) -> tracing::Level {
        match self.log_level.to_ascii_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            _ => tracing::Level::INFO,
        }
    }

    pub fn main_class_name(&self) -> String {
        self.main_class.clone().unwrap_or_else(|| {
            self.source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Main".to_string())
        })
    }
}

/// Reads `cli.source`, runs the compiler, and writes one `.asm` file per
/// class into `cli.output_dir`. Returns whether compilation succeeded so
/// `main` can turn it into a process exit code.
pub fn run(cli: &Cli) -> bool {
    if let Some(png) = &cli.png {
        tracing::warn!(target: "quack::cli", "tree image dump ({}) is not implemented; skipping", png.display());
    }

    let source = match fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: could not read {}: {err}", cli.source.display());
            return false;
        }
    };

    if source.trim().is_empty() {
        Diagnostic::warning("source file is empty".to_string(), crate::span::Span::dummy())
            .render(&cli.source.to_string_lossy(), &source);
    }

    let main_class = cli.main_class_name();
    tracing::info!(target: "quack::cli", "compiling {} as class {main_class}", cli.source.display());

    let asm = match crate::compile(&source, &main_class) {
        Ok(asm) => asm,
        Err(diag) => {
            diag.render(&cli.source.to_string_lossy(), &source);
            return false;
        }
    };

    if let Err(err) = fs::create_dir_all(&cli.output_dir) {
        eprintln!("error: could not create {}: {err}", cli.output_dir.display());
        return false;
    }
    if let Err(err) = fs::create_dir_all(&cli.obj_dir) {
        eprintln!("error: could not create {}: {err}", cli.obj_dir.display());
        return false;
    }

    for (class, listing) in &asm {
        let path = cli.output_dir.join(format!("{class}.asm"));
        if let Err(err) = fs::write(&path, listing) {
            eprintln!("error: could not write {}: {err}", path.display());
            return false;
        }
        tracing::debug!(target: "quack::cli", "wrote {}", path.display());
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_class_name_defaults_to_file_stem() {
        let cli = Cli {
            source: PathBuf::from("programs/point.qk"),
            main_class: None,
            output_dir: PathBuf::from("out"),
            obj_dir: PathBuf::from("OBJ"),
            log_level: "INFO".to_string(),
            png: None,
        };
        assert_eq!(cli.main_class_name(), "point");
    }

    #[test]
    fn test_main_class_name_explicit_override() {
        let cli = Cli {
            source: PathBuf::from("programs/point.qk"),
            main_class: Some("Launcher".to_string()),
            output_dir: PathBuf::from("out"),
            obj_dir: PathBuf::from("OBJ"),
            log_level: "INFO".to_string(),
            png: None,
        };
        assert_eq!(cli.main_class_name(), "Launcher");
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let mut cli = Cli {
            source: PathBuf::from("x.qk"),
            main_class: None,
            output_dir: PathBuf::from("out"),
            obj_dir: PathBuf::from("OBJ"),
            log_level: "debug".to_string(),
            png: None,
        };
        assert_eq!(cli.tracing_level(), tracing::Level::DEBUG);
        cli.log_level = "trace".to_string();
        assert_eq!(cli.tracing_level(), tracing::Level::TRACE);
        cli.log_level = "bogus".to_string();
        assert_eq!(cli.tracing_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_run_writes_asm_files() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("prog.qk");
        fs::write(&source_path, "x = 1 + 2;").unwrap();
        let output_dir = dir.path().join("out");
        let obj_dir = dir.path().join("OBJ");

        let cli = Cli {
            source: source_path,
            main_class: Some("Main".to_string()),
            output_dir: output_dir.clone(),
            obj_dir,
            log_level: "INFO".to_string(),
            png: None,
        };

        assert!(run(&cli));
        assert!(output_dir.join("Main.asm").exists());
    }

    #[test]
    fn test_run_fails_on_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("bad.qk");
        fs::write(&source_path, "y: Int = x + 1;").unwrap();

        let cli = Cli {
            source: source_path,
            main_class: Some("Main".to_string()),
            output_dir: dir.path().join("out"),
            obj_dir: dir.path().join("OBJ"),
            log_level: "INFO".to_string(),
            png: None,
        };

        assert!(!run(&cli));
    }
}
