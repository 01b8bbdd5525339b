use crate::ir::{FunctionId, IrBuilder, Type};

/// External entry points the lowered code calls into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RuntimeFn {
    Printf,
    Abs,
    LlAbs,
    Fabs,
    Strcmp,
    ConcatStr,
    ConvI2S,
    ConvF2S,
    UartInit,
    UartWait,
    UartPrint,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub params: &'static [Type],
    pub ret: Type,
    pub variadic: bool,
}

impl Signature {
    const fn fixed(params: &'static [Type], ret: Type) -> Signature {
        Signature {
            params,
            ret,
            variadic: false,
        }
    }
}

impl RuntimeFn {
    pub const ALL: &[RuntimeFn] = &[
        RuntimeFn::Printf,
        RuntimeFn::Abs,
        RuntimeFn::LlAbs,
        RuntimeFn::Fabs,
        RuntimeFn::Strcmp,
        RuntimeFn::ConcatStr,
        RuntimeFn::ConvI2S,
        RuntimeFn::ConvF2S,
        RuntimeFn::UartInit,
        RuntimeFn::UartWait,
        RuntimeFn::UartPrint,
    ];

    pub const fn symbol(self) -> &'static str {
        match self {
            RuntimeFn::Printf => "printf",
            RuntimeFn::Abs => "abs",
            RuntimeFn::LlAbs => "llabs",
            RuntimeFn::Fabs => "fabs",
            RuntimeFn::Strcmp => "strcmp",
            RuntimeFn::ConcatStr => "__yttria_concat_str",
            RuntimeFn::ConvI2S => "__yttria_conv_i2s",
            RuntimeFn::ConvF2S => "__yttria_conv_f2s",
            RuntimeFn::UartInit => "__yttria_uart_init",
            RuntimeFn::UartWait => "__yttria_uart_wait",
            RuntimeFn::UartPrint => "__yttria_uart_print",
        }
    }

    pub const fn signature(self) -> Signature {
        match self {
            RuntimeFn::Printf => Signature {
                params: &[Type::Ptr],
                ret: Type::I32,
                variadic: true,
            },
            RuntimeFn::Abs => Signature::fixed(&[Type::I32], Type::I32),
            RuntimeFn::LlAbs => Signature::fixed(&[Type::I64], Type::I64),
            RuntimeFn::Fabs => Signature::fixed(&[Type::F64], Type::F64),
            RuntimeFn::Strcmp => Signature::fixed(&[Type::Ptr, Type::Ptr], Type::I32),
            RuntimeFn::ConcatStr => Signature::fixed(&[Type::Ptr, Type::Ptr], Type::Ptr),
            RuntimeFn::ConvI2S => Signature::fixed(&[Type::I64], Type::Ptr),
            RuntimeFn::ConvF2S => Signature::fixed(&[Type::F64], Type::Ptr),
            RuntimeFn::UartInit => Signature::fixed(&[Type::Int(16)], Type::Void),
            RuntimeFn::UartWait => Signature::fixed(&[], Type::Void),
            RuntimeFn::UartPrint => Signature::fixed(&[Type::Ptr], Type::Void),
        }
    }

    /// Returns the declaration of this entry point in the builder's module,
    /// declaring it on first use.
    pub fn get_or_declare(self, builder: &mut IrBuilder<'_, '_>) -> FunctionId {
        if let Some(id) = builder.function_by_name(self.symbol()) {
            return id;
        }
        let Signature {
            params,
            ret,
            variadic,
        } = self.signature();
        tracing::trace!(symbol = self.symbol(), "declaring runtime function");
        builder.declare_function(self.symbol(), params, ret, variadic)
    }
}
