use std::marker::PhantomData;

use inkwell::{context::Context, module::Module};

use crate::{
    ast::{Expr, Program, Stmt, StmtKind},
    codegen::{interface::CodegenOptions, profile::Profile, runtime::RuntimeFn, InternalError},
    ir::{IrBuilder, Type, ValueId},
    types::DataType,
};

/// Lowers statements and expressions through an [`IrBuilder`]. The profile
/// `P` selects the target-specific parts of the entry point and of `render`.
pub struct Generator<'m, 'ctx, P> {
    pub(super) builder: IrBuilder<'m, 'ctx>,
    uart_baud: u16,
    _profile: PhantomData<P>,
}

impl<'m, 'ctx, P> Generator<'m, 'ctx, P>
where
    P: Profile,
{
    pub fn new(
        context: &'ctx Context,
        module: &'m Module<'ctx>,
        options: &CodegenOptions,
    ) -> Generator<'m, 'ctx, P> {
        Generator {
            builder: IrBuilder::new(context, module),
            uart_baud: options.uart_baud,
            _profile: PhantomData,
        }
    }

    pub fn generate(mut self, program: &Program) -> Result<(), InternalError> {
        tracing::trace!(profile = P::NAME, "generating program");
        self.g_block(&program.body)
    }

    fn g_stmt(&mut self, stmt: &Stmt) -> Result<(), InternalError> {
        match &stmt.kind {
            StmtKind::Main { body } => self.g_main(body),
            StmtKind::Render { expr } => self.g_render(expr),
            StmtKind::Return { value } => self.g_return(value.as_ref()),
            // Reached directly only for a defer nested in another defer,
            // which runs at the point of its parent.
            StmtKind::Defer { stmt } => self.g_stmt(stmt),
            StmtKind::Block { body } | StmtKind::Unsafe { body } => self.g_block(body),
        }
    }

    /// Emits the statements of the block in order, then its deferred
    /// statements last to first.
    fn g_block(&mut self, body: &[Stmt]) -> Result<(), InternalError> {
        let (deferred, immediate): (Vec<_>, Vec<_>) = body.iter().partition(|s| s.is_defer());
        for stmt in immediate {
            self.g_reachable_stmt(stmt)?;
        }
        for stmt in deferred.into_iter().rev() {
            self.g_reachable_stmt(stmt)?;
        }
        Ok(())
    }

    /// Code following a return goes to a fresh block with no predecessors.
    fn g_reachable_stmt(&mut self, stmt: &Stmt) -> Result<(), InternalError> {
        if self.builder.is_terminated() {
            if let Some((function, _)) = self.builder.insertion_point() {
                let block = self.builder.append_block(function, "unreachable");
                self.builder.position_at_end(function, block);
            }
        }
        self.g_stmt(stmt)
    }

    fn g_main(&mut self, body: &[Stmt]) -> Result<(), InternalError> {
        let outer = self.builder.insertion_point();
        let main = self.builder.declare_function("main", &[], Type::I32, false);
        let entry = self.builder.append_block(main, "entry");
        self.builder.position_at_end(main, entry);

        if P::SERIAL_OUTPUT {
            let init = RuntimeFn::UartInit.get_or_declare(&mut self.builder);
            let baud = self.builder.const_int(16, i128::from(self.uart_baud));
            self.builder.call(init, &[baud])?;
            let wait = RuntimeFn::UartWait.get_or_declare(&mut self.builder);
            self.builder.call(wait, &[])?;
        }

        self.g_block(body)?;
        if !self.builder.is_terminated() {
            let success = self.builder.const_int(32, 0);
            self.builder.ret(Some(success))?;
        }

        match outer {
            Some((function, block)) => self.builder.position_at_end(function, block),
            None => self.builder.clear_insertion_point(),
        }
        Ok(())
    }

    fn g_render(&mut self, expr: &Expr) -> Result<(), InternalError> {
        self.require_insertion_point("render")?;
        let ty = expr.static_type();
        let value = self.g_expr(expr)?;

        if P::SERIAL_OUTPUT {
            let text = self
                .to_text(value, ty)?
                .ok_or(InternalError::UnknownType)?;
            let print = RuntimeFn::UartPrint.get_or_declare(&mut self.builder);
            self.builder.call(print, &[text])?;
            return Ok(());
        }

        let (format, arg) = match ty {
            DataType::Bool => ("%d", self.builder.int_cast(value, Type::I32, false)?),
            ty if ty.is_integral() && ty.bits() == 64 => ("%llu", value),
            ty if ty.is_integral() => ("%d", self.builder.int_cast(value, Type::I32, ty.is_int())?),
            ty if ty.is_float() => ("%g", self.builder.float_cast(value, Type::F64)?),
            DataType::String => ("%s", value),
            _ => return Err(InternalError::UnknownType),
        };
        let format = self.builder.global_string(format)?;
        let printf = RuntimeFn::Printf.get_or_declare(&mut self.builder);
        self.builder.call(printf, &[format, arg])?;
        Ok(())
    }

    fn g_return(&mut self, value: Option<&Expr>) -> Result<(), InternalError> {
        self.require_insertion_point("return")?;
        let value = value.map(|value| self.g_expr(value)).transpose()?;
        self.builder.ret(value)?;
        Ok(())
    }

    fn require_insertion_point(&self, stmt: &'static str) -> Result<(), InternalError> {
        match self.builder.insertion_point() {
            Some(_) => Ok(()),
            None => Err(InternalError::NoInsertionPoint(stmt)),
        }
    }

    /// Converts a value to a string pointer, through the runtime conversion
    /// helpers for numbers. `None` for types without a textual form.
    pub(super) fn to_text(
        &mut self,
        value: ValueId,
        ty: DataType,
    ) -> Result<Option<ValueId>, InternalError> {
        let (helper, wide) = match ty {
            DataType::String => return Ok(Some(value)),
            DataType::Bool => (
                RuntimeFn::ConvI2S,
                self.builder.int_cast(value, Type::I64, false)?,
            ),
            ty if ty.is_integral() => (
                RuntimeFn::ConvI2S,
                self.builder.int_cast(value, Type::I64, ty.is_int())?,
            ),
            ty if ty.is_float() => (
                RuntimeFn::ConvF2S,
                self.builder.float_cast(value, Type::F64)?,
            ),
            _ => return Ok(None),
        };
        let conv = helper.get_or_declare(&mut self.builder);
        Ok(Some(self.builder.call_value(conv, &[wide])?))
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use inkwell::context::Context;
    use pretty_assertions::assert_eq;

    use crate::{
        codegen::{generate, CodegenOptions, InternalError, Target},
        ir,
        util::test_utils::{call_args, lower_to_ir, read_program, rendered, string_arg},
    };

    #[test]
    fn entry_point_returns_success() {
        let ir = lower_to_ir("main { }", Target::Hosted);
        assert!(ir.starts_with("; ModuleID = 'test'"), "{ir}");
        let expected = indoc! {"
            define i32 @main() {
            entry:
              ret i32 0
            }
        "};
        assert!(ir.contains(expected), "{ir}");
    }

    #[test]
    fn deferred_statements_run_last_in_reverse_order() {
        assert_eq!(
            rendered("main { render 'A'; defer render 'B'; render 'C'; defer render 'D'; }"),
            [
                string_arg("A"),
                string_arg("C"),
                string_arg("D"),
                string_arg("B"),
            ]
        );
    }

    #[test]
    fn nested_defer_runs_at_its_parent_point() {
        assert_eq!(
            rendered("main { defer defer render 'X'; render 'A'; }"),
            [string_arg("A"), string_arg("X")]
        );
        assert_eq!(
            rendered(
                "main { render 'A'; defer { render 'B'; defer render 'C'; } render 'D'; }"
            ),
            [
                string_arg("A"),
                string_arg("D"),
                string_arg("B"),
                string_arg("C"),
            ]
        );
    }

    #[test]
    fn render_selects_formatter_by_type() {
        let ir = lower_to_ir(
            "main { render i64 1; render u64 2; render f32 1.5; render 2.5; render 'x'; \
             render i8 3; render true; }",
            Target::Hosted,
        );
        let formats: Vec<_> = call_args(&ir, "printf")
            .into_iter()
            .filter_map(|args| args.split_once(", ").map(|(format, _)| format.to_string()))
            .collect();
        assert_eq!(
            formats,
            ["%llu", "%llu", "%g", "%g", "%s", "%d", "%d"].map(string_arg)
        );
        assert!(ir.contains("declare i32 @printf(ptr, ...)"), "{ir}");
    }

    #[test]
    fn renders_through_printf_with_widened_arguments() {
        assert_eq!(
            rendered("main { render i8 - 3; render f32 0.5; render u8 200; render true; render u64 7; }"),
            [
                "i32 -3",
                "double 5.000000e-01",
                "i32 200",
                "i32 1",
                "i64 7"
            ]
        );
    }

    #[test]
    fn embedded_entry_brings_up_the_serial_line() {
        let ir = lower_to_ir("main { render 7; }", Target::Embedded);
        let expected = indoc! {"
            entry:
              call void @__yttria_uart_init(i16 9600)
              call void @__yttria_uart_wait()
              %0 = call ptr @__yttria_conv_i2s(i64 7)
              call void @__yttria_uart_print(ptr %0)
              ret i32 0
        "};
        assert!(ir.contains(expected), "{ir}");
        assert!(!ir.contains("@printf"), "{ir}");
    }

    #[test]
    fn embedded_render_converts_every_type_to_text() {
        let ir = lower_to_ir(
            "main { render 'hi'; render f32 0.5; render true; render u8 255; }",
            Target::Embedded,
        );
        assert_eq!(
            call_args(&ir, "__yttria_uart_print"),
            [string_arg("hi").as_str(), "ptr %0", "ptr %1", "ptr %2"]
        );
        assert_eq!(
            call_args(&ir, "__yttria_conv_f2s"),
            ["double 5.000000e-01"]
        );
        assert_eq!(call_args(&ir, "__yttria_conv_i2s"), ["i64 1", "i64 255"]);
    }

    #[test]
    fn code_after_return_goes_to_an_unreachable_block() {
        let context = Context::create();
        let program = read_program("main { return 1; render 2; }");
        let module = generate(&context, "test", &program, &CodegenOptions::default()).unwrap();
        ir::verify(&module).unwrap();

        let main = module.get_function("main").unwrap();
        let blocks = main.get_basic_blocks();
        let labels: Vec<_> = blocks
            .iter()
            .map(|block| block.get_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(labels, ["entry", "unreachable"]);
        assert!(blocks.iter().all(|block| block.get_terminator().is_some()));

        let ir = module.print_to_string().to_string();
        assert!(ir.contains("entry:\n  ret i32 1\n"), "{ir}");
    }

    #[test]
    fn statements_outside_the_entry_point_are_internal_errors() {
        let context = Context::create();
        let options = CodegenOptions::default();
        assert_eq!(
            generate(&context, "test", &read_program("render 1;"), &options).map(|_| ()),
            Err(InternalError::NoInsertionPoint("render"))
        );
        assert_eq!(
            generate(&context, "test", &read_program("return;"), &options).map(|_| ()),
            Err(InternalError::NoInsertionPoint("return"))
        );
    }
}
