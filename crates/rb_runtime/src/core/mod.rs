pub mod class;
pub mod dispatch;
pub mod env;
pub mod method;
pub mod value;

pub use class::{AllocKind, ClassData, MethodTables, ModelError, Visibility};
pub use dispatch::{CallerContext, Holder, Miss, Resolved};
pub use env::{Activation, Frame, MethodInfo, PendingMethod, Scope, ScopeKind};
pub use method::{Callable, ClosureFn, Code, CompiledMethod, MethodDef, NativeFn, Params, Pattern};
pub use value::{
    BlockCode, Data, FastHashMap, HashData, NativeBlockFn, OrderedMap, ProcBody, ProcData,
    RangeData, RegexpData, Value, fast_map_new, key_eql, ordered_map_new,
};
