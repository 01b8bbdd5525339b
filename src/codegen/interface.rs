use inkwell::{context::Context, module::Module};

use crate::{
    ast::Program,
    codegen::{
        generator::Generator,
        profile::{Embedded, Hosted},
        InternalError,
    },
};

pub const DEFAULT_UART_BAUD: u16 = 9600;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CodegenOptions {
    pub target: Target,
    /// Baud rate passed to the serial setup of embedded entry points.
    pub uart_baud: u16,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            target: Target::Hosted,
            uart_baud: DEFAULT_UART_BAUD,
        }
    }
}

/// Lowers a resolved program into a fresh module owned by `context`.
///
/// The program must have been resolved without errors; an ill-typed tree
/// yields an [`InternalError`].
#[tracing::instrument(level = "debug", skip(context, program), fields(target = %options.target))]
pub fn generate<'ctx>(
    context: &'ctx Context,
    module_name: &str,
    program: &Program,
    options: &CodegenOptions,
) -> Result<Module<'ctx>, InternalError> {
    type HostedGenerator<'m, 'ctx> = Generator<'m, 'ctx, Hosted>;
    type EmbeddedGenerator<'m, 'ctx> = Generator<'m, 'ctx, Embedded>;

    let module = context.create_module(module_name);
    match options.target {
        Target::Hosted => HostedGenerator::new(context, &module, options).generate(program)?,
        Target::Embedded => EmbeddedGenerator::new(context, &module, options).generate(program)?,
    }
    tracing::debug!(
        functions = module.get_functions().count(),
        globals = module.get_globals().count(),
        "lowering finished"
    );
    Ok(module)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// A general operating-system binary linked against the C library.
    Hosted,
    /// A microcontroller image talking through a serial line.
    Embedded,
}

impl Target {
    pub const ALL: &[Target] = &[Target::Hosted, Target::Embedded];

    pub fn from_name(name: &str) -> Option<Target> {
        Target::ALL.iter().copied().find(|t| t.name() == name)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Target::Hosted => "hosted",
            Target::Embedded => "embedded",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
