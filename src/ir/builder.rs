use inkwell::{
    builder::Builder,
    context::Context,
    module::Module,
    types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FloatType, IntType},
    values::{BasicMetadataValueEnum, BasicValue, FloatValue, IntValue, PointerValue},
    AddressSpace, FloatPredicate, IntPredicate,
};
use rustc_hash::FxHashMap;

use super::{
    arena::{BlockId, FunctionId, ValueArena, ValueId},
    string_symbol, BinOp, IrError, Type,
};

/// Instruction builder over an `inkwell` module.
///
/// Values, blocks and functions are referenced through `Copy` ids, so the
/// `'ctx` lifetime stays inside the builder. Operations on constants are
/// folded by LLVM as they are built.
pub struct IrBuilder<'m, 'ctx> {
    context: &'ctx Context,
    module: &'m Module<'ctx>,
    builder: Builder<'ctx>,
    arena: ValueArena<'ctx>,
    strings: FxHashMap<Box<str>, ValueId>,
    position: Option<(FunctionId, BlockId)>,
}

impl<'m, 'ctx> IrBuilder<'m, 'ctx> {
    pub fn new(context: &'ctx Context, module: &'m Module<'ctx>) -> IrBuilder<'m, 'ctx> {
        IrBuilder {
            context,
            module,
            builder: context.create_builder(),
            arena: ValueArena::new(),
            strings: FxHashMap::default(),
            position: None,
        }
    }

    pub fn module(&self) -> &'m Module<'ctx> {
        self.module
    }

    // -- Functions and blocks --

    pub fn function_by_name(&mut self, name: &str) -> Option<FunctionId> {
        let function = self.module.get_function(name)?;
        Some(self.arena.intern_function(function))
    }

    /// Declares an external function, or returns the existing function of the
    /// same name.
    pub fn declare_function(
        &mut self,
        name: &str,
        params: &[Type],
        ret: Type,
        variadic: bool,
    ) -> FunctionId {
        if let Some(id) = self.function_by_name(name) {
            return id;
        }
        let params: Vec<BasicMetadataTypeEnum<'ctx>> = params
            .iter()
            .filter_map(|&ty| self.basic_type(ty))
            .map(Into::into)
            .collect();
        let fn_type = match self.basic_type(ret) {
            Some(ret) => ret.fn_type(&params, variadic),
            None => self.context.void_type().fn_type(&params, variadic),
        };
        let function = self.module.add_function(name, fn_type, None);
        tracing::trace!(name, "declared function");
        self.arena.intern_function(function)
    }

    /// Appends a block to the function, turning a declaration into a
    /// definition. LLVM makes labels unique within the function.
    pub fn append_block(&mut self, function: FunctionId, label: &str) -> BlockId {
        let function = self.arena.function(function);
        let block = self.context.append_basic_block(function, label);
        self.arena.push_block(block)
    }

    pub fn position_at_end(&mut self, function: FunctionId, block: BlockId) {
        self.builder.position_at_end(self.arena.block(block));
        self.position = Some((function, block));
    }

    pub fn clear_insertion_point(&mut self) {
        self.builder.clear_insertion_position();
        self.position = None;
    }

    pub fn insertion_point(&self) -> Option<(FunctionId, BlockId)> {
        self.position
    }

    /// Whether the current block already ends with a terminator. False when
    /// there is no insertion point.
    pub fn is_terminated(&self) -> bool {
        self.position
            .is_some_and(|(_, block)| self.arena.block(block).get_terminator().is_some())
    }

    // -- Values --

    pub fn value_type(&self, value: ValueId) -> Type {
        match self.arena.value(value).get_type() {
            BasicTypeEnum::IntType(ty) => Type::Int(ty.get_bit_width()),
            BasicTypeEnum::FloatType(ty) if ty == self.context.f32_type() => Type::F32,
            BasicTypeEnum::FloatType(_) => Type::F64,
            BasicTypeEnum::PointerType(_) => Type::Ptr,
            _ => Type::Void,
        }
    }

    /// Creates an integer constant of `bits` width holding the low bits of
    /// `value`.
    pub fn const_int(&mut self, bits: u32, value: i128) -> ValueId {
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let low = value as u64;
        let constant = self
            .context
            .custom_width_int_type(bits)
            .const_int(low, value < 0);
        self.arena.push_value(constant.into())
    }

    pub fn const_bool(&mut self, value: bool) -> ValueId {
        self.const_int(1, i128::from(value))
    }

    /// Creates a float constant, rounding the value to the precision of `ty`.
    pub fn const_float(&mut self, ty: Type, value: f64) -> ValueId {
        let constant = self.float_type(ty).const_float(value);
        self.arena.push_value(constant.into())
    }

    /// Returns a pointer to a private constant holding `content`.
    ///
    /// The symbol name is derived from the content, so identical literals
    /// share one global. A symbol already taken by another content is
    /// resolved with a numeric suffix.
    pub fn global_string(&mut self, content: &str) -> Result<ValueId, IrError> {
        if let Some(&id) = self.strings.get(content) {
            return Ok(id);
        }
        let base = string_symbol(content);
        let mut name = base.clone();
        let mut suffix = 0;
        while self.module.get_global(&name).is_some() {
            suffix += 1;
            name = format!("{base}.{suffix}");
        }
        let global = self.builder.build_global_string_ptr(content, &name)?;
        let id = self
            .arena
            .push_value(global.as_pointer_value().as_basic_value_enum());
        self.strings.insert(content.into(), id);
        Ok(id)
    }

    // -- Arithmetic and logic --

    pub fn binary(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> Result<ValueId, IrError> {
        let b = &self.builder;
        let value = if op.is_float() {
            let (l, r) = (self.float(lhs, op.mnemonic())?, self.float(rhs, op.mnemonic())?);
            match op {
                BinOp::FAdd => b.build_float_add(l, r, "")?,
                BinOp::FSub => b.build_float_sub(l, r, "")?,
                BinOp::FMul => b.build_float_mul(l, r, "")?,
                BinOp::FDiv => b.build_float_div(l, r, "")?,
                _ => b.build_float_rem(l, r, "")?,
            }
            .as_basic_value_enum()
        } else {
            let (l, r) = (self.int(lhs, op.mnemonic())?, self.int(rhs, op.mnemonic())?);
            match op {
                BinOp::Add => b.build_int_add(l, r, "")?,
                BinOp::Sub => b.build_int_sub(l, r, "")?,
                BinOp::Mul => b.build_int_mul(l, r, "")?,
                BinOp::SDiv => b.build_int_signed_div(l, r, "")?,
                BinOp::UDiv => b.build_int_unsigned_div(l, r, "")?,
                BinOp::SRem => b.build_int_signed_rem(l, r, "")?,
                BinOp::URem => b.build_int_unsigned_rem(l, r, "")?,
                BinOp::Shl => b.build_left_shift(l, r, "")?,
                BinOp::AShr => b.build_right_shift(l, r, true, "")?,
                BinOp::LShr => b.build_right_shift(l, r, false, "")?,
                BinOp::And => b.build_and(l, r, "")?,
                BinOp::Or => b.build_or(l, r, "")?,
                _ => b.build_xor(l, r, "")?,
            }
            .as_basic_value_enum()
        };
        Ok(self.arena.push_value(value))
    }

    pub fn neg(&mut self, value: ValueId) -> Result<ValueId, IrError> {
        let negated = if self.value_type(value).is_float() {
            let value = self.float(value, "fneg")?;
            self.builder.build_float_neg(value, "")?.as_basic_value_enum()
        } else {
            let value = self.int(value, "neg")?;
            self.builder.build_int_neg(value, "")?.as_basic_value_enum()
        };
        Ok(self.arena.push_value(negated))
    }

    /// Bitwise complement.
    pub fn not(&mut self, value: ValueId) -> Result<ValueId, IrError> {
        let value = self.int(value, "not")?;
        let result = self.builder.build_not(value, "")?;
        Ok(self.arena.push_value(result.into()))
    }

    pub fn icmp(&mut self, pred: IntPredicate, lhs: ValueId, rhs: ValueId) -> Result<ValueId, IrError> {
        let (l, r) = (self.int(lhs, "icmp")?, self.int(rhs, "icmp")?);
        let result = self.builder.build_int_compare(pred, l, r, "")?;
        Ok(self.arena.push_value(result.into()))
    }

    pub fn fcmp(
        &mut self,
        pred: FloatPredicate,
        lhs: ValueId,
        rhs: ValueId,
    ) -> Result<ValueId, IrError> {
        let (l, r) = (self.float(lhs, "fcmp")?, self.float(rhs, "fcmp")?);
        let result = self.builder.build_float_compare(pred, l, r, "")?;
        Ok(self.arena.push_value(result.into()))
    }

    pub fn is_not_null(&mut self, value: ValueId) -> Result<ValueId, IrError> {
        let value = self.pointer(value, "is_not_null")?;
        let result = self.builder.build_is_not_null(value, "")?;
        Ok(self.arena.push_value(result.into()))
    }

    // -- Conversions --

    /// Truncates or extends an integer to `to`; a no-op for equal widths.
    pub fn int_cast(&mut self, value: ValueId, to: Type, signed: bool) -> Result<ValueId, IrError> {
        let from = self.value_type(value).bits();
        if from == to.bits() {
            return Ok(value);
        }
        let int = self.int(value, "int_cast")?;
        let ty = self.int_type(to);
        let cast = if from > to.bits() {
            self.builder.build_int_truncate(int, ty, "")?
        } else if signed {
            self.builder.build_int_s_extend(int, ty, "")?
        } else {
            self.builder.build_int_z_extend(int, ty, "")?
        };
        Ok(self.arena.push_value(cast.into()))
    }

    pub fn float_cast(&mut self, value: ValueId, to: Type) -> Result<ValueId, IrError> {
        let from = self.value_type(value).bits();
        if from == to.bits() {
            return Ok(value);
        }
        let float = self.float(value, "float_cast")?;
        let ty = self.float_type(to);
        let cast = if from > to.bits() {
            self.builder.build_float_trunc(float, ty, "")?
        } else {
            self.builder.build_float_ext(float, ty, "")?
        };
        Ok(self.arena.push_value(cast.into()))
    }

    pub fn int_to_float(&mut self, value: ValueId, to: Type, signed: bool) -> Result<ValueId, IrError> {
        let int = self.int(value, "int_to_float")?;
        let ty = self.float_type(to);
        let cast = if signed {
            self.builder.build_signed_int_to_float(int, ty, "")?
        } else {
            self.builder.build_unsigned_int_to_float(int, ty, "")?
        };
        Ok(self.arena.push_value(cast.into()))
    }

    // -- Calls and terminators --

    /// Builds a direct call. Returns `None` for callees returning `void`.
    pub fn call(&mut self, callee: FunctionId, args: &[ValueId]) -> Result<Option<ValueId>, IrError> {
        let function = self.arena.function(callee);
        let args: Vec<BasicMetadataValueEnum<'ctx>> = args
            .iter()
            .map(|&id| self.arena.value(id).into())
            .collect();
        let call = self.builder.build_call(function, &args, "")?;
        Ok(call
            .try_as_basic_value()
            .basic()
            .map(|value| self.arena.push_value(value)))
    }

    /// Like [`call`](Self::call), for callees known to return a value.
    pub fn call_value(&mut self, callee: FunctionId, args: &[ValueId]) -> Result<ValueId, IrError> {
        self.call(callee, args)?.ok_or(IrError::Operand {
            op: "call",
            expected: "non-void callee",
        })
    }

    pub fn ret(&mut self, value: Option<ValueId>) -> Result<(), IrError> {
        let value = value.map(|id| self.arena.value(id));
        self.builder
            .build_return(value.as_ref().map(|v| v as &dyn BasicValue<'ctx>))?;
        Ok(())
    }
}

impl<'ctx> IrBuilder<'_, 'ctx> {
    fn basic_type(&self, ty: Type) -> Option<BasicTypeEnum<'ctx>> {
        match ty {
            Type::Void => None,
            Type::Int(_) => Some(self.int_type(ty).into()),
            Type::F32 | Type::F64 => Some(self.float_type(ty).into()),
            Type::Ptr => Some(self.context.ptr_type(AddressSpace::default()).into()),
        }
    }

    fn int_type(&self, ty: Type) -> IntType<'ctx> {
        self.context.custom_width_int_type(ty.bits().max(1))
    }

    fn float_type(&self, ty: Type) -> FloatType<'ctx> {
        match ty {
            Type::F32 => self.context.f32_type(),
            _ => self.context.f64_type(),
        }
    }

    fn int(&self, id: ValueId, op: &'static str) -> Result<IntValue<'ctx>, IrError> {
        match self.arena.value(id) {
            value if value.is_int_value() => Ok(value.into_int_value()),
            value => {
                tracing::error!(op, ty = ?value.get_type(), "integer operation on non-integer");
                Err(IrError::Operand {
                    op,
                    expected: "integer",
                })
            }
        }
    }

    fn float(&self, id: ValueId, op: &'static str) -> Result<FloatValue<'ctx>, IrError> {
        match self.arena.value(id) {
            value if value.is_float_value() => Ok(value.into_float_value()),
            value => {
                tracing::error!(op, ty = ?value.get_type(), "float operation on non-float");
                Err(IrError::Operand {
                    op,
                    expected: "floating-point",
                })
            }
        }
    }

    fn pointer(&self, id: ValueId, op: &'static str) -> Result<PointerValue<'ctx>, IrError> {
        match self.arena.value(id) {
            value if value.is_pointer_value() => Ok(value.into_pointer_value()),
            value => {
                tracing::error!(op, ty = ?value.get_type(), "pointer operation on non-pointer");
                Err(IrError::Operand {
                    op,
                    expected: "pointer",
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use inkwell::{context::Context, values::AnyValue};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ir::verify;

    fn entry(b: &mut IrBuilder<'_, '_>) -> FunctionId {
        let main = b.declare_function("main", &[], Type::I32, false);
        let block = b.append_block(main, "entry");
        b.position_at_end(main, block);
        main
    }

    fn global_names(module: &Module<'_>) -> Vec<String> {
        module
            .get_globals()
            .map(|g| g.get_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn identical_strings_share_one_global() {
        let context = Context::create();
        let module = context.create_module("test");
        let mut b = IrBuilder::new(&context, &module);
        entry(&mut b);

        let hello = b.global_string("hello").unwrap();
        b.global_string("world").unwrap();
        assert_eq!(b.global_string("hello").unwrap(), hello);

        assert_eq!(
            global_names(&module),
            [string_symbol("hello"), string_symbol("world")]
        );
        let printed = module.print_to_string().to_string();
        assert!(printed.contains(r#"c"hello\00""#), "{printed}");
    }

    #[test]
    fn taken_symbol_gets_a_suffix() {
        let context = Context::create();
        let module = context.create_module("test");
        module.add_global(context.i8_type(), None, &string_symbol("b"));
        let mut b = IrBuilder::new(&context, &module);
        entry(&mut b);

        b.global_string("b").unwrap();
        assert_eq!(
            global_names(&module),
            [string_symbol("b"), format!("{}.1", string_symbol("b"))]
        );
    }

    #[test]
    fn casts_select_by_width_and_signedness() {
        let context = Context::create();
        let module = context.create_module("test");
        let mut b = IrBuilder::new(&context, &module);
        entry(&mut b);

        let v = b.const_int(8, -3);
        assert_eq!(b.int_cast(v, Type::Int(8), true).unwrap(), v);
        let wide = b.int_cast(v, Type::I64, true).unwrap();
        let zext = b.int_cast(v, Type::I64, false).unwrap();
        let narrow = b.int_cast(wide, Type::Int(4), true).unwrap();
        assert_eq!(b.value_type(wide), Type::I64);
        assert_eq!(b.value_type(narrow), Type::Int(4));

        let print = |id| b.arena.value(id).print_to_string().to_string();
        assert_eq!(print(wide), "i64 -3");
        assert_eq!(print(zext), "i64 253");
        assert_eq!(print(narrow), "i4 -3");

        let half = b.const_float(Type::F32, 0.5);
        let double = b.float_cast(half, Type::F64).unwrap();
        assert_eq!(b.value_type(double), Type::F64);
        assert_eq!(b.float_cast(double, Type::F64).unwrap(), double);
    }

    #[test]
    fn operand_kinds_are_checked() {
        let context = Context::create();
        let module = context.create_module("test");
        let mut b = IrBuilder::new(&context, &module);
        entry(&mut b);

        let int = b.const_int(32, 1);
        let float = b.const_float(Type::F64, 1.0);
        assert_eq!(
            b.binary(BinOp::Add, int, float),
            Err(IrError::Operand {
                op: "add",
                expected: "integer",
            })
        );
        assert_eq!(
            b.fcmp(FloatPredicate::OEQ, int, float),
            Err(IrError::Operand {
                op: "fcmp",
                expected: "floating-point",
            })
        );
    }

    #[test]
    fn building_without_a_position_fails() {
        let context = Context::create();
        let module = context.create_module("test");
        let mut b = IrBuilder::new(&context, &module);
        assert!(matches!(b.global_string("x"), Err(IrError::Builder(_))));
        assert!(!b.is_terminated());
    }

    #[test]
    fn verifier_rejects_a_second_terminator() {
        let context = Context::create();
        let module = context.create_module("test");
        let mut b = IrBuilder::new(&context, &module);
        entry(&mut b);
        let zero = b.const_int(32, 0);
        b.ret(Some(zero)).unwrap();
        assert!(b.is_terminated());
        assert_eq!(verify(&module), Ok(()));

        b.ret(Some(zero)).unwrap();
        assert!(verify(&module).is_err());
    }

    #[test]
    fn void_calls_have_no_value() {
        let context = Context::create();
        let module = context.create_module("test");
        let mut b = IrBuilder::new(&context, &module);
        entry(&mut b);
        let wait = b.declare_function("wait", &[], Type::Void, false);
        assert_eq!(b.call(wait, &[]), Ok(None));
        assert!(b.call_value(wait, &[]).is_err());
        assert_eq!(b.declare_function("wait", &[], Type::Void, false), wait);
    }
}
