use inkwell::{
    basic_block::BasicBlock,
    values::{BasicValueEnum, FunctionValue},
};

/// Handle to a value stored in an [`IrBuilder`](super::IrBuilder).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ValueId(u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionId(u32);

macro_rules! impl_index {
    ($($id:ident),*) => {
        $(
            impl $id {
                fn new(index: usize) -> $id {
                    $id(u32::try_from(index).unwrap_or(u32::MAX))
                }

                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

impl_index!(ValueId, BlockId, FunctionId);

/// Owns the `'ctx` handles behind the ids.
pub(super) struct ValueArena<'ctx> {
    values: Vec<BasicValueEnum<'ctx>>,
    blocks: Vec<BasicBlock<'ctx>>,
    functions: Vec<FunctionValue<'ctx>>,
}

impl<'ctx> ValueArena<'ctx> {
    pub(super) fn new() -> ValueArena<'ctx> {
        ValueArena {
            values: Vec::new(),
            blocks: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub(super) fn push_value(&mut self, value: BasicValueEnum<'ctx>) -> ValueId {
        self.values.push(value);
        ValueId::new(self.values.len() - 1)
    }

    pub(super) fn value(&self, id: ValueId) -> BasicValueEnum<'ctx> {
        self.values[id.index()]
    }

    pub(super) fn push_block(&mut self, block: BasicBlock<'ctx>) -> BlockId {
        self.blocks.push(block);
        BlockId::new(self.blocks.len() - 1)
    }

    pub(super) fn block(&self, id: BlockId) -> BasicBlock<'ctx> {
        self.blocks[id.index()]
    }

    /// Functions are interned: the same function always gets the same id.
    pub(super) fn intern_function(&mut self, function: FunctionValue<'ctx>) -> FunctionId {
        if let Some(index) = self.functions.iter().position(|f| *f == function) {
            return FunctionId::new(index);
        }
        self.functions.push(function);
        FunctionId::new(self.functions.len() - 1)
    }

    pub(super) fn function(&self, id: FunctionId) -> FunctionValue<'ctx> {
        self.functions[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use inkwell::context::Context;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn functions_are_interned_and_values_are_not() {
        let context = Context::create();
        let module = context.create_module("test");
        let ty = context.void_type().fn_type(&[], false);
        let first = module.add_function("first", ty, None);
        let second = module.add_function("second", ty, None);

        let mut arena = ValueArena::new();
        let id = arena.intern_function(first);
        assert_eq!(arena.intern_function(second).index(), 1);
        assert_eq!(arena.intern_function(first), id);
        assert_eq!(arena.function(id), first);

        let one = context.i32_type().const_int(1, false);
        let a = arena.push_value(one.into());
        let b = arena.push_value(one.into());
        assert_ne!(a, b);
        assert_eq!(arena.value(b), BasicValueEnum::from(one));
    }
}
