//! The interpreter instance: heap, intern cache, builtin prototypes, the
//! current scope chain, frame stack, and the GC root stacks.
//!
//! A `Vm` is created per run and owns every piece of mutable interpreter
//! state; builtin constructors and prototypes are per-VM, never process
//! global.

use std::rc::Rc;

use crate::{
    ast::Pos,
    heap::{value_edge, Heap, HeapId},
    intern::Interns,
    object::{JsObject, ObjKind, PropAttrs},
    types::function::{JsFunction, NativeFn},
    value::Value,
};

/// One entry of the bounded stack-trace frame stack.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub function_name: Rc<str>,
    pub source_path: Rc<str>,
    pub line: u32,
    pub column: u32,
}

/// Call depth limit; exceeding it raises `RangeError` well before the
/// native stack can overflow (the tree walker burns several native frames
/// per script call).
pub(crate) const MAX_CALL_DEPTH: usize = 200;

/// Pre-interned hot property names. These are strong GC roots: the intern
/// cache itself is weak, but the names below must never be swept.
#[derive(Debug)]
pub(crate) struct Names {
    pub length: HeapId,
    pub prototype: HeapId,
    pub this_: HeapId,
    pub arguments_: HeapId,
    pub callee: HeapId,
    pub name: HeapId,
    pub message: HeapId,
    pub stack: HeapId,
    pub constructor: HeapId,
    pub to_string: HeapId,
    pub value_of: HeapId,
    pub index: HeapId,
    pub input: HeapId,
    pub last_index: HeapId,
    pub source: HeapId,
    pub global_: HeapId,
    pub ignore_case: HeapId,
    pub cause: HeapId,
    pub code: HeapId,
    pub line: HeapId,
    pub column: HeapId,
    pub file: HeapId,
}

impl Names {
    fn new(heap: &mut Heap, interns: &mut Interns) -> Self {
        Self {
            length: interns.intern(heap, "length"),
            prototype: interns.intern(heap, "prototype"),
            this_: interns.intern(heap, "this"),
            arguments_: interns.intern(heap, "arguments"),
            callee: interns.intern(heap, "callee"),
            name: interns.intern(heap, "name"),
            message: interns.intern(heap, "message"),
            stack: interns.intern(heap, "stack"),
            constructor: interns.intern(heap, "constructor"),
            to_string: interns.intern(heap, "toString"),
            value_of: interns.intern(heap, "valueOf"),
            index: interns.intern(heap, "index"),
            input: interns.intern(heap, "input"),
            last_index: interns.intern(heap, "lastIndex"),
            source: interns.intern(heap, "source"),
            global_: interns.intern(heap, "global"),
            ignore_case: interns.intern(heap, "ignoreCase"),
            cause: interns.intern(heap, "cause"),
            code: interns.intern(heap, "code"),
            line: interns.intern(heap, "line"),
            column: interns.intern(heap, "column"),
            file: interns.intern(heap, "file"),
        }
    }

    fn roots(&self, out: &mut Vec<HeapId>) {
        out.extend([
            self.length,
            self.prototype,
            self.this_,
            self.arguments_,
            self.callee,
            self.name,
            self.message,
            self.stack,
            self.constructor,
            self.to_string,
            self.value_of,
            self.index,
            self.input,
            self.last_index,
            self.source,
            self.global_,
            self.ignore_case,
            self.cause,
            self.code,
            self.line,
            self.column,
            self.file,
        ]);
    }
}

/// Builtin prototype objects, one per specialized kind plus the error
/// hierarchy.
#[derive(Debug)]
pub(crate) struct Protos {
    pub object: HeapId,
    pub function: HeapId,
    pub array: HeapId,
    pub string: HeapId,
    pub number: HeapId,
    pub boolean: HeapId,
    pub date: HeapId,
    pub regexp: HeapId,
    pub buffer: HeapId,
    pub buffer32: HeapId,
    pub error: HeapId,
    pub type_error: HeapId,
    pub range_error: HeapId,
    pub reference_error: HeapId,
    pub syntax_error: HeapId,
    pub eval_error: HeapId,
}

impl Protos {
    fn roots(&self, out: &mut Vec<HeapId>) {
        out.extend([
            self.object,
            self.function,
            self.array,
            self.string,
            self.number,
            self.boolean,
            self.date,
            self.regexp,
            self.buffer,
            self.buffer32,
            self.error,
            self.type_error,
            self.range_error,
            self.reference_error,
            self.syntax_error,
            self.eval_error,
        ]);
    }
}

/// Host callback signature for the extension interface: values cross the
/// boundary as [`crate::ScriptValue`]; returning `Err` raises an `Error`
/// exception inside the interpreter.
pub type HostFn = fn(&mut Vm, &[crate::ScriptValue]) -> Result<crate::ScriptValue, String>;

pub struct Vm {
    pub(crate) heap: Heap,
    pub(crate) interns: Interns,
    pub(crate) names: Names,
    pub(crate) protos: Protos,
    pub(crate) global: HeapId,
    /// Current innermost environment.
    pub(crate) env: HeapId,
    /// The module-level environment; `Function` construction closes over it.
    pub(crate) global_env: HeapId,
    /// Registered host callbacks, indexed by `FnKind::Host`.
    pub(crate) host_fns: Vec<HostFn>,
    /// Temporary value roots pushed around sub-evaluations.
    pub(crate) roots: Vec<Value>,
    /// Saved environments across calls.
    pub(crate) env_roots: Vec<HeapId>,
    /// Host module objects registered through the extension interface.
    pub(crate) host_roots: Vec<HeapId>,
    pub(crate) frames: Vec<Frame>,
    /// Position of the node currently being evaluated; feeds error objects.
    pub(crate) current_pos: Option<Pos>,
    /// Set while a constructor body runs under `new`.
    pub(crate) constructing: bool,
    pub(crate) rng_state: u64,
}

impl Vm {
    pub(crate) fn create() -> Self {
        let mut heap = Heap::new();
        let mut interns = Interns::new();
        let names = Names::new(&mut heap, &mut interns);

        let object = heap.alloc_object(JsObject::plain(None));
        let proto = |heap: &mut Heap| heap.alloc_object(JsObject::plain(Some(object)));
        let function = proto(&mut heap);
        let array = proto(&mut heap);
        let string = proto(&mut heap);
        let number = proto(&mut heap);
        let boolean = proto(&mut heap);
        let date = proto(&mut heap);
        let regexp = proto(&mut heap);
        let buffer = proto(&mut heap);
        let buffer32 = proto(&mut heap);
        let error = proto(&mut heap);
        let error_proto = |heap: &mut Heap| heap.alloc_object(JsObject::plain(Some(error)));
        let type_error = error_proto(&mut heap);
        let range_error = error_proto(&mut heap);
        let reference_error = error_proto(&mut heap);
        let syntax_error = error_proto(&mut heap);
        let eval_error = error_proto(&mut heap);
        let protos = Protos {
            object,
            function,
            array,
            string,
            number,
            boolean,
            date,
            regexp,
            buffer,
            buffer32,
            error,
            type_error,
            range_error,
            reference_error,
            syntax_error,
            eval_error,
        };

        let global = heap.alloc_object(JsObject::plain(Some(object)));
        let env = heap.alloc_env(crate::scope::ScopeRecord::object_env(None, global));

        let seed = chrono::Utc::now().timestamp_millis() as u64 | 1;
        Self {
            heap,
            interns,
            names,
            protos,
            global,
            env,
            global_env: env,
            host_fns: Vec::new(),
            roots: Vec::new(),
            env_roots: Vec::new(),
            host_roots: Vec::new(),
            frames: Vec::new(),
            current_pos: None,
            constructing: false,
            rng_state: seed,
        }
    }

    // ------------------------------------------------------------------
    // Allocation helpers
    // ------------------------------------------------------------------

    pub(crate) fn intern(&mut self, text: &str) -> HeapId {
        self.interns.intern(&mut self.heap, text)
    }

    /// Uninterned string value; concatenation results and the like.
    pub(crate) fn str_value(&mut self, text: impl Into<Box<str>>) -> Value {
        Value::Str(self.heap.alloc_string(text))
    }

    pub(crate) fn new_object(&mut self) -> HeapId {
        let proto = self.protos.object;
        self.heap.alloc_object(JsObject::plain(Some(proto)))
    }

    /// Fresh array object with its `length` bookkeeping property in place.
    pub(crate) fn new_array(&mut self) -> HeapId {
        let proto = self.protos.array;
        let id = self.heap.alloc_object(JsObject::array(Some(proto)));
        let length = self.names.length;
        self.heap
            .define_prop(id, length, Value::Number(0.0), PropAttrs::LOCKED);
        id
    }

    /// Builds an array object from a slice of values.
    pub(crate) fn array_from(&mut self, values: &[Value]) -> HeapId {
        let id = self.new_array();
        for (index, &value) in values.iter().enumerate() {
            self.heap.array_set_index(id, index as u32, value);
        }
        id
    }

    /// Native function object carrying the standard `name` and `length`
    /// metadata properties.
    pub(crate) fn new_native_fn(&mut self, name: &'static str, arity: u32, func: NativeFn) -> HeapId {
        let proto = self.protos.function;
        let id = self.heap.alloc_object(JsObject::with_kind(
            Some(proto),
            ObjKind::Function(Box::new(JsFunction::native(func))),
        ));
        let name_value = self.str_value(name);
        let name_key = self.names.name;
        let length_key = self.names.length;
        self.heap
            .define_prop(id, name_key, name_value, PropAttrs::LOCKED);
        self.heap.define_prop(
            id,
            length_key,
            Value::Number(f64::from(arity)),
            PropAttrs::LOCKED,
        );
        id
    }

    /// Installs a native function as a property of `target`.
    pub(crate) fn define_native(
        &mut self,
        target: HeapId,
        name: &'static str,
        arity: u32,
        func: NativeFn,
    ) {
        let fn_obj = self.new_native_fn(name, arity, func);
        let key = self.intern(name);
        self.heap
            .define_prop(target, key, Value::Object(fn_obj), PropAttrs::HIDDEN);
    }

    // ------------------------------------------------------------------
    // GC discipline
    // ------------------------------------------------------------------

    /// Checked at the top of every evaluated node. Only ever collects; it
    /// never transfers control.
    pub(crate) fn safe_point(&mut self) {
        if self.heap.wants_gc() {
            self.collect_now();
        }
    }

    pub(crate) fn collect_now(&mut self) {
        let mut roots: Vec<HeapId> = Vec::with_capacity(64);
        roots.push(self.global);
        roots.push(self.env);
        self.protos.roots(&mut roots);
        self.names.roots(&mut roots);
        roots.extend(self.env_roots.iter().copied());
        roots.extend(self.host_roots.iter().copied());
        for &value in &self.roots {
            value_edge(value, &mut roots);
        }
        self.heap.collect(roots, &mut self.interns);
    }

    // ------------------------------------------------------------------
    // Host-extension interface
    // ------------------------------------------------------------------

    /// Installs `module` on the global object under `name` and registers it
    /// as a GC root for the lifetime of the VM.
    pub(crate) fn register_module_object(&mut self, name: &str, module: HeapId) {
        let key = self.intern(name);
        self.heap
            .define_prop(self.global, key, Value::Object(module), PropAttrs::HIDDEN);
        self.host_roots.push(module);
    }

    // ------------------------------------------------------------------
    // Misc
    // ------------------------------------------------------------------

    /// xorshift step for `Math.random`; good enough for scripts, no RNG
    /// dependency needed.
    pub(crate) fn next_random(&mut self) -> f64 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng_state = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}
