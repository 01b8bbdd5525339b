use crate::{
    ast::{self, BinaryOp, EqualityOp, Expr, ExprKind, LogicOp, UnaryOp},
    codegen::{generator::Generator, profile::Profile, runtime::RuntimeFn, InternalError},
    ir::{BinOp, FloatPredicate, IntPredicate, Type, ValueId},
    types::{self, DataType},
};

fn lowered(ty: DataType) -> Result<Type, InternalError> {
    ty.ir_type().ok_or(InternalError::UnknownType)
}

/// Reinterprets a literal as a two's-complement value of `bits` width, the
/// way an unchecked literal of an unsafe block wraps around.
fn wrap(value: i128, bits: u32) -> i128 {
    let shift = 128 - bits;
    (value << shift) >> shift
}

impl<P> Generator<'_, '_, P>
where
    P: Profile,
{
    pub(super) fn g_expr(&mut self, expr: &Expr) -> Result<ValueId, InternalError> {
        match &expr.kind {
            ExprKind::Bool(value) => Ok(self.builder.const_bool(*value)),
            ExprKind::Int { value, width } | ExprKind::UInt { value, width } => {
                let bits = width.bits();
                Ok(self.builder.const_int(bits, wrap(*value, bits)))
            }
            ExprKind::Float { .. } | ExprKind::String(_) => self.g_constant(expr),
            ExprKind::Unary { op, expr } => self.g_unary(*op, expr),
            ExprKind::Binary { op, lhs, rhs } => self.g_binary(*op, lhs, rhs),
            ExprKind::Logic { op, lhs, rhs } => self.g_logic(*op, lhs, rhs),
            ExprKind::Equality { op, lhs, rhs } => self.g_equality(*op, lhs, rhs),
        }
    }

    fn g_constant(&mut self, expr: &Expr) -> Result<ValueId, InternalError> {
        match &expr.kind {
            ExprKind::Float { value, .. } => {
                let ty = lowered(expr.static_type())?;
                Ok(self.builder.const_float(ty, *value))
            }
            ExprKind::String(content) => Ok(self.builder.global_string(content)?),
            _ => Err(InternalError::UnknownType),
        }
    }

    fn g_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<ValueId, InternalError> {
        let (lt, rt) = (lhs.static_type(), rhs.static_type());
        let result = ast::binary_type(op, lt, rt);
        if result == DataType::Unknown {
            return Err(invalid_or_unknown(lt, rt, || InternalError::InvalidBinary {
                op: op.symbol(),
                lhs: lt,
                rhs: rt,
            }));
        }
        let l = self.g_expr(lhs)?;
        let r = self.g_expr(rhs)?;

        if result == DataType::String {
            let invalid = InternalError::InvalidBinary {
                op: op.symbol(),
                lhs: lt,
                rhs: rt,
            };
            let l = self.to_text(l, lt)?.ok_or_else(|| invalid.clone())?;
            let r = self.to_text(r, rt)?.ok_or(invalid)?;
            let concat = RuntimeFn::ConcatStr.get_or_declare(&mut self.builder);
            return Ok(self.builder.call_value(concat, &[l, r])?);
        }

        let ty = lowered(result)?;
        if result.is_float() {
            let l = self.to_float(l, lt, ty)?;
            let r = self.to_float(r, rt, ty)?;
            let op = match op {
                BinaryOp::Add => BinOp::FAdd,
                BinaryOp::Sub => BinOp::FSub,
                BinaryOp::Mul => BinOp::FMul,
                BinaryOp::Div => BinOp::FDiv,
                BinaryOp::Rem => BinOp::FRem,
                BinaryOp::Shl | BinaryOp::Shr | BinaryOp::LShr => {
                    return Err(InternalError::InvalidBinary {
                        op: op.symbol(),
                        lhs: lt,
                        rhs: rt,
                    })
                }
            };
            return Ok(self.builder.binary(op, l, r)?);
        }

        let signed = result.is_int();
        let l = self.builder.int_cast(l, ty, lt.is_int())?;
        let r = self.builder.int_cast(r, ty, rt.is_int())?;
        let op = match op {
            BinaryOp::Add => BinOp::Add,
            BinaryOp::Sub => BinOp::Sub,
            BinaryOp::Mul => BinOp::Mul,
            BinaryOp::Div if signed => BinOp::SDiv,
            BinaryOp::Div => BinOp::UDiv,
            BinaryOp::Rem if signed => BinOp::SRem,
            BinaryOp::Rem => BinOp::URem,
            BinaryOp::Shl => BinOp::Shl,
            BinaryOp::Shr if signed => BinOp::AShr,
            BinaryOp::Shr | BinaryOp::LShr => BinOp::LShr,
        };
        Ok(self.builder.binary(op, l, r)?)
    }

    fn g_logic(&mut self, op: LogicOp, lhs: &Expr, rhs: &Expr) -> Result<ValueId, InternalError> {
        let (lt, rt) = (lhs.static_type(), rhs.static_type());
        let invalid = || InternalError::InvalidLogic {
            op: op.symbol(),
            lhs: lt,
            rhs: rt,
        };
        let bin = match op {
            LogicOp::BitAnd | LogicOp::And => BinOp::And,
            LogicOp::BitOr | LogicOp::Or => BinOp::Or,
        };

        if op.is_bitwise() {
            let result = ast::logic_type(op, lt, rt);
            if result == DataType::Unknown {
                return Err(invalid_or_unknown(lt, rt, invalid));
            }
            let ty = lowered(result)?;
            let l = self.g_expr(lhs)?;
            let r = self.g_expr(rhs)?;
            let l = self.builder.int_cast(l, ty, true)?;
            let r = self.builder.int_cast(r, ty, true)?;
            return Ok(self.builder.binary(bin, l, r)?);
        }

        // Both operands are always evaluated.
        let l = self.g_expr(lhs)?;
        let r = self.g_expr(rhs)?;
        let l = self
            .truth_value(l, lt)?
            .ok_or_else(|| invalid_or_unknown(lt, rt, invalid))?;
        let r = self
            .truth_value(r, rt)?
            .ok_or_else(|| invalid_or_unknown(lt, rt, invalid))?;
        Ok(self.builder.binary(bin, l, r)?)
    }

    /// Narrows a value to `i1`, comparing non-boolean values against zero.
    fn truth_value(&mut self, value: ValueId, ty: DataType) -> Result<Option<ValueId>, InternalError> {
        let truth = match ty {
            DataType::Bool => value,
            ty if ty.is_integral() => {
                let zero = self.builder.const_int(ty.bits(), 0);
                self.builder.icmp(IntPredicate::NE, value, zero)?
            }
            ty if ty.is_float() => {
                let zero = self.builder.const_float(self.builder.value_type(value), 0.0);
                self.builder.fcmp(FloatPredicate::ONE, value, zero)?
            }
            DataType::String => self.builder.is_not_null(value)?,
            _ => return Ok(None),
        };
        Ok(Some(truth))
    }

    fn g_equality(
        &mut self,
        op: EqualityOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<ValueId, InternalError> {
        use DataType::{Bool, String};

        let (lt, rt) = (lhs.static_type(), rhs.static_type());
        let (int_pred, float_pred) = match op {
            EqualityOp::Eq => (IntPredicate::EQ, FloatPredicate::OEQ),
            EqualityOp::Ne => (IntPredicate::NE, FloatPredicate::ONE),
        };
        let invalid = || InternalError::InvalidEquality {
            op: op.symbol(),
            lhs: lt,
            rhs: rt,
        };
        if lt == DataType::Unknown || rt == DataType::Unknown {
            return Err(InternalError::UnknownType);
        }

        match (lt, rt) {
            (l, r) if l.is_integral() && l.family() == r.family() => {
                let ty = lowered(types::greater_integral_type(l, r))?;
                let lv = self.g_expr(lhs)?;
                let rv = self.g_expr(rhs)?;
                let lv = self.builder.int_cast(lv, ty, l.is_int())?;
                let rv = self.builder.int_cast(rv, ty, r.is_int())?;
                Ok(self.builder.icmp(int_pred, lv, rv)?)
            }
            (l, r) if l.is_numeric() && r.is_numeric() && (l.is_float() || r.is_float()) => {
                let ty = if l.is_float() && r.is_float() {
                    types::greater_float_type(l, r)
                } else if l.is_float() {
                    l
                } else {
                    r
                };
                let ty = lowered(ty)?;
                let lv = self.g_expr(lhs)?;
                let rv = self.g_expr(rhs)?;
                let lv = self.to_float(lv, l, ty)?;
                let rv = self.to_float(rv, r, ty)?;
                Ok(self.builder.fcmp(float_pred, lv, rv)?)
            }
            (Bool, Bool) => {
                let lv = self.g_expr(lhs)?;
                let rv = self.g_expr(rhs)?;
                Ok(self.builder.icmp(int_pred, lv, rv)?)
            }
            (String, String) => {
                let lv = self.g_expr(lhs)?;
                let rv = self.g_expr(rhs)?;
                let strcmp = RuntimeFn::Strcmp.get_or_declare(&mut self.builder);
                let order = self.builder.call_value(strcmp, &[lv, rv])?;
                let zero = self.builder.const_int(32, 0);
                Ok(self.builder.icmp(int_pred, order, zero)?)
            }
            _ => Err(invalid()),
        }
    }

    fn g_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<ValueId, InternalError> {
        let ty = operand.static_type();
        let result = ast::unary_type(op, ty);
        if result == DataType::Unknown {
            return Err(invalid_or_unknown(ty, ty, || InternalError::InvalidUnary {
                op: op.symbol(),
                ty,
            }));
        }
        let value = self.g_expr(operand)?;

        match op {
            UnaryOp::Neg if ty == DataType::Bool => {
                let negated = self.builder.neg(value)?;
                Ok(self.builder.int_cast(negated, lowered(result)?, true)?)
            }
            UnaryOp::Neg => Ok(self.builder.neg(value)?),
            UnaryOp::Abs => self.g_abs(value, ty),
            UnaryOp::BitNot => Ok(self.builder.not(value)?),
            UnaryOp::Not if ty == DataType::Bool => Ok(self.builder.not(value)?),
            UnaryOp::Not => {
                let zero = self.builder.const_int(ty.bits(), 0);
                let is_zero = self.builder.icmp(IntPredicate::EQ, value, zero)?;
                Ok(self.builder.int_cast(is_zero, lowered(result)?, false)?)
            }
        }
    }

    /// Absolute value through the C library: `abs` for integers up to 32
    /// bits, `llabs` for 64 bits and `fabs` for floats. Unsigned values are
    /// their own absolute value.
    fn g_abs(&mut self, value: ValueId, ty: DataType) -> Result<ValueId, InternalError> {
        let lowered_ty = lowered(ty)?;
        if ty.is_uint() {
            return Ok(value);
        }
        if ty.is_float() {
            let wide = self.builder.float_cast(value, Type::F64)?;
            let fabs = RuntimeFn::Fabs.get_or_declare(&mut self.builder);
            let abs = self.builder.call_value(fabs, &[wide])?;
            return Ok(self.builder.float_cast(abs, lowered_ty)?);
        }
        let (helper, wide_ty) = if ty.bits() == 64 {
            (RuntimeFn::LlAbs, Type::I64)
        } else {
            (RuntimeFn::Abs, Type::I32)
        };
        let wide = self.builder.int_cast(value, wide_ty, true)?;
        let helper = helper.get_or_declare(&mut self.builder);
        let abs = self.builder.call_value(helper, &[wide])?;
        Ok(self.builder.int_cast(abs, lowered_ty, true)?)
    }

    /// Converts a numeric value to the float type `to`, preserving its value.
    fn to_float(&mut self, value: ValueId, from: DataType, to: Type) -> Result<ValueId, InternalError> {
        let value = if from.is_float() {
            self.builder.float_cast(value, to)?
        } else {
            self.builder.int_to_float(value, to, from.is_int())?
        };
        Ok(value)
    }
}

fn invalid_or_unknown(
    lhs: DataType,
    rhs: DataType,
    invalid: impl FnOnce() -> InternalError,
) -> InternalError {
    if lhs == DataType::Unknown || rhs == DataType::Unknown {
        InternalError::UnknownType
    } else {
        invalid()
    }
}

#[cfg(test)]
mod tests {
    use indoc::formatdoc;
    use inkwell::context::Context;
    use pretty_assertions::assert_eq;

    use crate::{
        codegen::{generate, CodegenOptions, InternalError, Target},
        ir,
        types::DataType,
        util::test_utils::{callees, lower_to_ir, read_program, rendered},
    };

    fn lower(src: &str) -> String {
        lower_to_ir(src, Target::Hosted)
    }

    #[test]
    fn end_to_end_sample() {
        let ir = lower(r#"main { render + "The output is " ( & 101 99 ); }"#);
        assert_eq!(
            callees(&ir),
            ["__yttria_conv_i2s", "__yttria_concat_str", "printf"]
        );
        let expected = formatdoc! {"
            entry:
              %0 = call ptr @__yttria_conv_i2s(i64 97)
              %1 = call ptr @__yttria_concat_str(ptr @{text}, ptr %0)
              %2 = call i32 (ptr, ...) @printf(ptr @{format}, ptr %1)
              ret i32 0
            ",
            text = ir::string_symbol("The output is "),
            format = ir::string_symbol("%s"),
        };
        assert!(ir.contains(&expected), "{ir}");
    }

    #[test]
    fn arithmetic_widens_to_the_greater_type() {
        assert_eq!(rendered("main { render + i8 1 i32 2; }"), ["i32 3"]);
        assert_eq!(rendered("main { render / u8 9 u16 2; }"), ["i32 4"]);
        assert_eq!(rendered("main { render % i16 - 9 i16 2; }"), ["i32 -1"]);
        assert_eq!(rendered("main { render << i8 3 i8 2; }"), ["i32 12"]);
    }

    #[test]
    fn shifts_follow_the_signedness_of_the_result() {
        assert_eq!(rendered("main { render >> i8 - 16 i8 1; }"), ["i32 -8"]);
        assert_eq!(rendered("main { render >> u8 240 u8 1; }"), ["i32 120"]);
        assert_eq!(rendered("main { render >>> i8 - 16 i8 1; }"), ["i32 120"]);
    }

    #[test]
    fn mixed_arithmetic_converts_integers_to_float() {
        assert_eq!(
            rendered("main { render * 3 f32 1.5; }"),
            ["double 4.500000e+00"]
        );
        assert_eq!(
            rendered("main { render - 2.5 u8 1; }"),
            ["double 1.500000e+00"]
        );
        assert_eq!(
            rendered("main { render + f32 1.5 2.5; }"),
            ["double 4.000000e+00"]
        );
    }

    #[test]
    fn string_concatenation_converts_numbers() {
        let ir = lower("main { render + 2.5 'x'; render + 's' u8 1; }");
        assert_eq!(
            callees(&ir),
            [
                "__yttria_conv_f2s",
                "__yttria_concat_str",
                "printf",
                "__yttria_conv_i2s",
                "__yttria_concat_str",
                "printf",
            ]
        );
        assert!(ir.contains("@__yttria_conv_f2s(double 2.500000e+00)"), "{ir}");
        assert!(ir.contains("@__yttria_conv_i2s(i64 1)"), "{ir}");
    }

    #[test]
    fn logical_operators_evaluate_both_sides() {
        assert_eq!(rendered("main { render && true false; }"), ["i32 0"]);
        assert_eq!(rendered("main { render || false true; }"), ["i32 1"]);
        assert_eq!(rendered("main { unsafe { render || true 3; } }"), ["i32 1"]);
        assert_eq!(rendered("main { unsafe { render || false 0; } }"), ["i32 0"]);
    }

    #[test]
    fn bitwise_operators_widen_their_operands() {
        assert_eq!(rendered("main { render & 12 10; }"), ["i32 8"]);
        assert_eq!(rendered("main { render | i8 1 i32 6; }"), ["i32 7"]);
    }

    #[test]
    fn equality_dispatches_on_operand_families() {
        assert_eq!(rendered("main { render == i8 1 i32 1; }"), ["i32 1"]);
        assert_eq!(rendered("main { render != u8 1 u16 1; }"), ["i32 0"]);
        assert_eq!(rendered("main { render != 1.5 2; }"), ["i32 1"]);
        assert_eq!(rendered("main { render == f32 1.5 f32 1.5; }"), ["i32 1"]);
        assert_eq!(rendered("main { render == true false; }"), ["i32 0"]);

        let ir = lower("main { render == 'a' 'b'; }");
        assert_eq!(callees(&ir), ["strcmp", "printf"]);
        assert!(ir.contains("icmp eq i32 %0, 0"), "{ir}");
    }

    #[test]
    fn unary_operators() {
        assert_eq!(rendered("main { render neg 2.5; }"), ["double -2.500000e+00"]);
        assert_eq!(rendered("main { render neg i16 2; }"), ["i32 -2"]);
        assert_eq!(rendered("main { render ~ 5; }"), ["i32 -6"]);
        assert_eq!(rendered("main { render ! true; }"), ["i32 0"]);
        assert_eq!(rendered("main { unsafe { render neg true; } }"), ["i32 -1"]);
        assert_eq!(rendered("main { unsafe { render ! u8 4; } }"), ["i32 0"]);
        assert_eq!(rendered("main { unsafe { render ! u8 0; } }"), ["i32 1"]);
    }

    #[test]
    fn absolute_value_goes_through_the_c_library() {
        let ir = lower("main { render abs i8 - 3; }");
        assert_eq!(callees(&ir), ["abs", "printf"]);
        assert!(ir.contains("%0 = call i32 @abs(i32 -3)"), "{ir}");
        assert!(ir.contains("%1 = trunc i32 %0 to i8"), "{ir}");

        let ir = lower("main { render abs i64 - 3; }");
        assert_eq!(callees(&ir), ["llabs", "printf"]);
        assert!(ir.contains("call i64 @llabs(i64 -3)"), "{ir}");

        let ir = lower("main { render abs f32 1.5; }");
        assert_eq!(callees(&ir), ["fabs", "printf"]);
        assert!(ir.contains("call double @fabs(double 1.500000e+00)"), "{ir}");

        assert_eq!(rendered("main { render abs u8 3; }"), ["i32 3"]);
    }

    #[test]
    fn unchecked_literals_wrap_to_their_width() {
        assert_eq!(rendered("main { unsafe { render i8 200; } }"), ["i32 -56"]);
        assert_eq!(
            rendered("main { render u64 18446744073709551615; }"),
            ["i64 -1"]
        );
    }

    #[test]
    fn ill_typed_trees_are_internal_errors() {
        let context = Context::create();
        let lower_err = |src: &str| {
            generate(&context, "test", &read_program(src), &CodegenOptions::default()).map(|_| ())
        };
        assert_eq!(
            lower_err("main { render + true 1; }"),
            Err(InternalError::InvalidBinary {
                op: "+",
                lhs: DataType::Bool,
                rhs: DataType::I32,
            })
        );
        assert_eq!(
            lower_err("main { render + 1 + true 1; }"),
            Err(InternalError::UnknownType)
        );
        assert_eq!(
            lower_err("main { render ~ 'a'; }"),
            Err(InternalError::InvalidUnary {
                op: "~",
                ty: DataType::String,
            })
        );
        assert_eq!(
            lower_err("main { render == 'a' 1; }"),
            Err(InternalError::InvalidEquality {
                op: "==",
                lhs: DataType::String,
                rhs: DataType::I32,
            })
        );
        assert_eq!(
            lower_err("main { render | 1.5 2; }"),
            Err(InternalError::InvalidLogic {
                op: "|",
                lhs: DataType::F64,
                rhs: DataType::I32,
            })
        );
    }
}
