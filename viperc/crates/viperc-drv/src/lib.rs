//! viperc-drv - The compiler driver.
//!
//! Command-line surface:
//!
//! ```text
//! viperc [options] <input-file>
//!
//!   -W<name>         enable warning <name>
//!   -Wno-<name>      disable warning <name>
//!   --emit <stage>   stop after `tokens` or `ast` and dump the result
//!   --verbose        phase tracing on stderr
//! ```
//!
//! Exit code 0 on success, 1 on an I/O, argument, parse or type error.
//!
//! The pipeline is: read the file, seed a [`Context`], lex (plus the
//! invalid-token sweep), parse, and type-check when parsing was clean.
//! Code generation is skipped whenever any error has been reported;
//! diagnostics are rendered to stderr at the end either way.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use thiserror::Error;

use viperc_lex::{scan_invalid_tokens, Lexer, Token};
use viperc_par::{Parser, TypeChecker};
use viperc_sem::Context;
use viperc_util::Diagnostics;

/// How far to run the pipeline before dumping and stopping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitStage {
    /// Dump the token stream.
    Tokens,
    /// Dump the parsed AST.
    Ast,
    /// Full front-end: parse and type-check.
    Check,
}

/// Errors from command-line parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no input files")]
    NoInput,

    #[error("multiple input files: '{0}'")]
    MultipleInputs(String),

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("missing stage for '--emit' (expected 'tokens' or 'ast')")]
    MissingEmitStage,

    #[error("unknown emit stage '{0}' (expected 'tokens' or 'ast')")]
    UnknownEmitStage(String),
}

/// Driver configuration, parsed from command-line arguments.
#[derive(Debug)]
pub struct Config {
    pub input_file: PathBuf,
    /// Warning toggles, in flag order.
    pub warnings: Vec<(bool, String)>,
    pub emit: EmitStage,
    pub verbose: bool,
}

impl Config {
    /// Parse command-line arguments (program name already stripped).
    pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Config, ConfigError> {
        let mut input_file: Option<PathBuf> = None;
        let mut warnings = Vec::new();
        let mut emit = EmitStage::Check;
        let mut verbose = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if let Some(name) = arg.strip_prefix("-W") {
                if name.is_empty() {
                    return Err(ConfigError::UnknownOption(arg));
                }
                match name.strip_prefix("no-") {
                    Some(disabled) => warnings.push((false, disabled.to_string())),
                    None => warnings.push((true, name.to_string())),
                }
            } else if arg == "--emit" {
                let stage = args.next().ok_or(ConfigError::MissingEmitStage)?;
                emit = match stage.as_str() {
                    "tokens" => EmitStage::Tokens,
                    "ast" => EmitStage::Ast,
                    _ => return Err(ConfigError::UnknownEmitStage(stage)),
                };
            } else if arg == "--verbose" || arg == "-v" {
                verbose = true;
            } else if arg.starts_with('-') {
                return Err(ConfigError::UnknownOption(arg));
            } else if input_file.is_some() {
                return Err(ConfigError::MultipleInputs(arg));
            } else {
                input_file = Some(PathBuf::from(arg));
            }
        }

        Ok(Config {
            input_file: input_file.ok_or(ConfigError::NoInput)?,
            warnings,
            emit,
            verbose,
        })
    }
}

/// One compiler invocation: configuration plus the semantic state and
/// diagnostics it accumulates.
pub struct Session {
    pub config: Config,
    pub ctx: Context,
    pub diag: Diagnostics,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let mut diag = Diagnostics::new();
        diag.set_file_name(config.input_file.display().to_string());
        for (enabled, name) in &config.warnings {
            diag.set_warning(*enabled, name);
        }
        Self {
            config,
            ctx: Context::new(),
            diag,
        }
    }

    fn trace(&self, phase: &str) {
        if self.config.verbose {
            eprintln!("viperc: {}", phase);
        }
    }

    /// Run the front-end over `source`. Returns the dump requested by
    /// `--emit`, or `None` for a full run; errors are collected in
    /// `self.diag`.
    pub fn compile(&mut self, source: &str) -> Option<String> {
        self.diag.set_text(source);

        self.trace("lexing");
        let tokens = Lexer::new(source, &self.ctx.types, &mut self.diag).lex();
        scan_invalid_tokens(&tokens, &mut self.diag);
        if self.config.emit == EmitStage::Tokens {
            return Some(render_tokens(&tokens));
        }

        self.trace("parsing");
        let mut ast = Parser::new(tokens, &mut self.ctx, &mut self.diag).parse();
        if self.config.emit == EmitStage::Ast {
            return Some(format!("{:#?}\n", ast));
        }

        // Type checking a broken tree only multiplies the noise.
        if !self.diag.had_errors() {
            self.trace("type checking");
            TypeChecker::new(&mut self.ctx, &mut self.diag).check(&mut ast);
        }
        None
    }
}

fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        if token.text.is_empty() {
            let _ = writeln!(
                out,
                "{}:{}: {:?}",
                token.span.line, token.span.column, token.kind
            );
        } else {
            let _ = writeln!(
                out,
                "{}:{}: {:?} {:?}",
                token.span.line, token.span.column, token.kind, token.text
            );
        }
    }
    out
}

/// Entry point shared by the binary and the tests: parse arguments,
/// run the pipeline, print diagnostics, produce the exit code.
pub fn run(args: impl IntoIterator<Item = String>) -> Result<ExitCode> {
    let config = Config::parse_args(args)?;

    let source = fs::read_to_string(&config.input_file)
        .with_context(|| format!("could not read file '{}'", config.input_file.display()))?;

    let mut session = Session::new(config);
    if let Some(dump) = session.compile(&source) {
        print!("{}", dump);
    }

    eprint!("{}", session.diag.render_all());
    if session.diag.had_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_input_files() {
        assert_eq!(
            Config::parse_args(args(&[])).unwrap_err(),
            ConfigError::NoInput
        );
    }

    #[test]
    fn test_positional_input() {
        let config = Config::parse_args(args(&["main.vpr"])).unwrap();
        assert_eq!(config.input_file, PathBuf::from("main.vpr"));
        assert_eq!(config.emit, EmitStage::Check);
        assert!(!config.verbose);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_warning_flags() {
        let config =
            Config::parse_args(args(&["-Wunused-variable", "-Wno-unused-variable", "main.vpr"]))
                .unwrap();
        assert_eq!(
            config.warnings,
            vec![
                (true, "unused-variable".to_string()),
                (false, "unused-variable".to_string()),
            ]
        );
    }

    #[test]
    fn test_emit_stage() {
        let config = Config::parse_args(args(&["--emit", "tokens", "main.vpr"])).unwrap();
        assert_eq!(config.emit, EmitStage::Tokens);

        let config = Config::parse_args(args(&["--emit", "ast", "main.vpr"])).unwrap();
        assert_eq!(config.emit, EmitStage::Ast);

        assert_eq!(
            Config::parse_args(args(&["--emit"])).unwrap_err(),
            ConfigError::MissingEmitStage
        );
        assert_eq!(
            Config::parse_args(args(&["--emit", "mir", "main.vpr"])).unwrap_err(),
            ConfigError::UnknownEmitStage("mir".to_string())
        );
    }

    #[test]
    fn test_unknown_option() {
        assert_eq!(
            Config::parse_args(args(&["--frobnicate", "main.vpr"])).unwrap_err(),
            ConfigError::UnknownOption("--frobnicate".to_string())
        );
    }

    #[test]
    fn test_multiple_inputs_rejected() {
        assert_eq!(
            Config::parse_args(args(&["a.vpr", "b.vpr"])).unwrap_err(),
            ConfigError::MultipleInputs("b.vpr".to_string())
        );
    }

    #[test]
    fn test_session_compiles_clean_source() {
        let config = Config::parse_args(args(&["main.vpr"])).unwrap();
        let mut session = Session::new(config);
        let dump = session.compile("let i32 main() = { return 0; };");
        assert!(dump.is_none());
        assert!(!session.diag.had_errors());
    }

    #[test]
    fn test_session_reports_errors() {
        let config = Config::parse_args(args(&["main.vpr"])).unwrap();
        let mut session = Session::new(config);
        session.compile("let i32 x = y;");
        assert!(session.diag.had_errors());
    }

    #[test]
    fn test_session_token_dump() {
        let config = Config::parse_args(args(&["--emit", "tokens", "main.vpr"])).unwrap();
        let mut session = Session::new(config);
        let dump = session.compile("let i32 x = 42;").unwrap();
        assert!(dump.contains("LetKeyword"));
        assert!(dump.contains("IntegerLiteral \"42\""));
    }

    #[test]
    fn test_session_ast_dump() {
        let config = Config::parse_args(args(&["--emit", "ast", "main.vpr"])).unwrap();
        let mut session = Session::new(config);
        let dump = session.compile("let i32 main() = { return 0; };").unwrap();
        assert!(dump.contains("Function"));
        assert!(dump.contains("main"));
    }
}
