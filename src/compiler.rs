use std::thread;

use inkwell::{context::Context, module::Module};
use thiserror::Error;

use crate::{
    ast::Program,
    codegen::{self, interface::DEFAULT_UART_BAUD, CodegenOptions, InternalError, Target},
    diagnostic::Diagnostics,
    ir::{self, VerifyError},
    lexer::{self, Scanned},
    resolve::resolve_program,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    pub target: Target,
    pub module_name: String,
    pub uart_baud: u16,
    /// Refuse to emit when the resolve pass reports warnings.
    pub warnings_as_errors: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            target: Target::Hosted,
            module_name: "main".to_string(),
            uart_baud: DEFAULT_UART_BAUD,
            warnings_as_errors: false,
        }
    }
}

impl CompileOptions {
    fn codegen(&self) -> CodegenOptions {
        CodegenOptions {
            target: self.target,
            uart_baud: self.uart_baud,
        }
    }
}

/// The output of a successful compilation: the verified module and the
/// warnings found on the way.
#[derive(Debug)]
pub struct CompilationArtifact<'ctx> {
    pub module: Module<'ctx>,
    pub diagnostics: Diagnostics,
}

impl CompilationArtifact<'_> {
    /// The module as LLVM assembly.
    pub fn ir(&self) -> String {
        self.module.print_to_string().to_string()
    }
}

/// A unit compiled on a worker thread, printed before its context is dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct EmittedUnit {
    pub ir: String,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("compilation failed with {} error(s)", .0.errors().count())]
    Semantic(Diagnostics),
    #[error("warnings treated as errors ({} warning(s))", .0.warnings().count())]
    Warnings(Diagnostics),
    #[error("internal compiler error: {0}")]
    Internal(#[from] InternalError),
    #[error("emitted module is invalid: {0}")]
    Verify(#[from] VerifyError),
}

impl CompileError {
    /// The semantic diagnostics that stopped the compilation, if any.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            CompileError::Semantic(diagnostics) | CompileError::Warnings(diagnostics) => {
                Some(diagnostics)
            }
            CompileError::Internal(_) | CompileError::Verify(_) => None,
        }
    }
}

pub fn tokenize(filename: &str, src: &str) -> Scanned {
    lexer::scan(filename, src)
}

/// Resolves the program and, when it is free of errors, lowers it into a
/// verified module.
#[tracing::instrument(level = "debug", skip_all, fields(module = %options.module_name))]
pub fn compile<'ctx>(
    context: &'ctx Context,
    program: &Program,
    options: &CompileOptions,
) -> Result<CompilationArtifact<'ctx>, CompileError> {
    let diagnostics = resolve_program(program);
    if diagnostics.has_errors() {
        return Err(CompileError::Semantic(diagnostics));
    }
    if options.warnings_as_errors && diagnostics.has_warnings() {
        return Err(CompileError::Warnings(diagnostics));
    }

    let module =
        codegen::generate(context, &options.module_name, program, &options.codegen())?;
    ir::verify(&module)?;
    tracing::debug!(warnings = diagnostics.len(), "compiled");
    Ok(CompilationArtifact {
        module,
        diagnostics,
    })
}

/// Compiles independent programs on separate threads. Each unit gets its own
/// context, module and diagnostics; results are in input order.
pub fn compile_units(
    units: &[(&Program, CompileOptions)],
) -> Vec<Result<EmittedUnit, CompileError>> {
    thread::scope(|scope| {
        let handles: Vec<_> = units
            .iter()
            .map(|(program, options)| {
                scope.spawn(move || -> Result<EmittedUnit, CompileError> {
                    let context = Context::create();
                    let artifact = compile(&context, program, options)?;
                    Ok(EmittedUnit {
                        ir: artifact.ir(),
                        diagnostics: artifact.diagnostics,
                    })
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::util::test_utils::{messages, read_program};

    const SAMPLE: &str = r#"main { render + "The output is " ( & 101 99 ); }"#;

    #[test]
    fn compiles_the_sample_program() {
        let context = Context::create();
        let artifact =
            compile(&context, &read_program(SAMPLE), &CompileOptions::default()).unwrap();
        assert!(artifact.diagnostics.is_empty());
        let printed = artifact.ir();
        assert!(printed.starts_with("; ModuleID = 'main'\n"), "{printed}");
        assert!(printed.contains("declare ptr @__yttria_concat_str(ptr, ptr)"));
        assert!(printed.contains("@printf("));
    }

    #[test]
    fn semantic_errors_stop_the_pipeline() {
        let program = read_program("main { render i8 200; return; }");
        let context = Context::create();
        let error = compile(&context, &program, &CompileOptions::default()).unwrap_err();
        assert_eq!(error.to_string(), "compilation failed with 2 error(s)");
        assert_eq!(
            messages(error.diagnostics().unwrap()),
            [
                "[line 1, column 18] error: overflow value for i8 type: 200",
                "[line 1, column 23] error: invalid no return value, must return i32",
            ]
        );
    }

    #[test]
    fn renders_outside_main_never_reach_lowering() {
        let context = Context::create();
        let program = read_program("render 1;");
        let error = compile(&context, &program, &CompileOptions::default()).unwrap_err();
        assert!(matches!(error, CompileError::Semantic(_)), "{error}");
        assert_eq!(
            messages(error.diagnostics().unwrap()),
            ["[line 1, column 1] error: render statement outside of main"]
        );
    }

    #[test]
    fn warnings_are_kept_or_promoted() {
        let program = read_program("main { render + i8 1 i32 2; }");
        let context = Context::create();
        let artifact = compile(&context, &program, &CompileOptions::default()).unwrap();
        assert_eq!(
            messages(&artifact.diagnostics),
            ["[line 1, column 15] warning: loose integer binary '+' operation with i8 and i32"]
        );

        let strict = CompileOptions {
            warnings_as_errors: true,
            ..CompileOptions::default()
        };
        let error = compile(&context, &program, &strict).unwrap_err();
        assert!(matches!(error, CompileError::Warnings(_)));
    }

    #[test]
    fn units_compile_independently() {
        let good = read_program(SAMPLE);
        let bad = read_program("main { render + true 1; }");
        let embedded = CompileOptions {
            target: Target::Embedded,
            module_name: "board".to_string(),
            ..CompileOptions::default()
        };
        let results = compile_units(&[
            (&good, CompileOptions::default()),
            (&bad, CompileOptions::default()),
            (&good, embedded),
        ]);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(CompileError::Semantic(_))));
        let board = &results[2].as_ref().unwrap().ir;
        assert!(board.contains("@__yttria_uart_print"), "{board}");
        assert!(!board.contains("@printf"), "{board}");
    }

    #[test]
    fn tokenize_reports_lexical_errors() {
        let scanned = tokenize("test.yt", "main { render 'open");
        assert_eq!(scanned.tokens.len(), 4);
        assert_eq!(
            scanned
                .errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            ["[line 1, column 15] unclosed literal encountered"]
        );
    }
}
