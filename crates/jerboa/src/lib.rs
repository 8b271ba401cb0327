//! jerboa: an embeddable interpreter for a small, dynamically-typed
//! scripting language with first-edition ECMAScript semantics — prototype
//! objects, `var` hoisting, `with`, `for-in`, `try/catch/finally`, regular
//! expressions, and the classic abstract-equality coercions.
//!
//! Source text is parsed to an AST and evaluated by a tree walker against a
//! heap of objects managed by a tracing mark/sweep collector. A [`Vm`] owns
//! every piece of run state; nothing is process-global.
//!
//! ```
//! let mut vm = jerboa::Vm::new();
//! let result = vm.eval("function mk(){ var i = 0; return function(){ return ++i; }; }\n\
//!                       var c = mk(); c(); c(); c();", "demo.js").unwrap();
//! assert_eq!(result, jerboa::ScriptValue::Number(3.0));
//! ```

mod ast;
mod builtins;
mod convert;
mod eval;
mod exception;
mod heap;
mod intern;
mod lexer;
mod object;
mod parser;
mod scope;
mod types;
mod value;
mod vm;

use std::fmt;

pub use exception::{ErrorKind, Exception};
pub use lexer::ParseError;
pub use vm::{HostFn, Vm};

use crate::{
    heap::HeapData,
    object::PropAttrs,
    types::function::JsFunction,
    value::Value,
};

/// A value exported across the embedding boundary. Objects do not cross;
/// they are rendered to their class tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Rendered form of an object value, e.g. `[object Array]`.
    Object(String),
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{}", value::number_to_string(*n)),
            Self::String(s) | Self::Object(s) => write!(f, "{s}"),
        }
    }
}

impl Vm {
    /// Creates a VM with the full builtin library installed.
    #[must_use]
    pub fn new() -> Self {
        let mut vm = Self::create();
        builtins::install(&mut vm);
        vm
    }

    /// Parses and runs `source`, returning the value of the program's last
    /// statement. Parse failures and uncaught exceptions surface as
    /// [`Exception`].
    pub fn eval(&mut self, source: &str, path: &str) -> Result<ScriptValue, Exception> {
        let program = parser::parse_program(source, path).map_err(|err| Exception {
            name: "SyntaxError".to_owned(),
            message: err.message.clone(),
            stack: String::new(),
            line: err.line,
            column: err.column,
            file: path.to_owned(),
        })?;
        match eval::eval_program(self, &program) {
            Ok(value) => Ok(self.export_value(value)),
            Err(thrown) => Err(self.exception_from_thrown(&thrown)),
        }
    }

    /// Reads and runs a script file.
    pub fn eval_file(&mut self, path: &str) -> Result<ScriptValue, Exception> {
        let source = std::fs::read_to_string(path).map_err(|err| Exception {
            name: "Error".to_owned(),
            message: format!("Could not read file: {path}: {err}"),
            stack: String::new(),
            line: 0,
            column: 0,
            file: path.to_owned(),
        })?;
        self.eval(&source, path)
    }

    /// Host-extension interface: installs an object named `name` on the
    /// global, populated with the given native-function wrappers. The
    /// module stays a GC root for the VM's lifetime.
    pub fn register_module(&mut self, name: &str, functions: &[(&'static str, HostFn)]) {
        let module = self.new_object();
        for &(fn_name, host_fn) in functions {
            let index = self.host_fns.len();
            self.host_fns.push(host_fn);
            let fn_proto = self.protos.function;
            let fn_obj = self.heap.alloc_object(object::JsObject::with_kind(
                Some(fn_proto),
                object::ObjKind::Function(Box::new(JsFunction::host(index))),
            ));
            let name_value = self.str_value(fn_name);
            let name_key = self.names.name;
            self.heap
                .define_prop(fn_obj, name_key, name_value, PropAttrs::LOCKED);
            let length_key = self.names.length;
            self.heap.define_prop(
                fn_obj,
                length_key,
                Value::Number(0.0),
                PropAttrs::LOCKED,
            );
            let key = self.intern(fn_name);
            self.heap
                .define_prop(module, key, Value::Object(fn_obj), PropAttrs::HIDDEN);
        }
        self.register_module_object(name, module);
    }

    pub(crate) fn export_value(&self, value: Value) -> ScriptValue {
        match value {
            Value::Undefined => ScriptValue::Undefined,
            Value::Null => ScriptValue::Null,
            Value::Bool(b) => ScriptValue::Bool(b),
            Value::Number(n) => ScriptValue::Number(n),
            Value::Str(id) => ScriptValue::String(self.heap.str(id).as_str().to_owned()),
            Value::Object(id) => {
                let tag = match self.heap.get(id) {
                    HeapData::Object(o) => o.kind.tag(),
                    _ => "Object",
                };
                ScriptValue::Object(format!("[object {tag}]"))
            }
        }
    }

    pub(crate) fn import_value(&mut self, value: &ScriptValue) -> Value {
        match value {
            ScriptValue::Undefined | ScriptValue::Object(_) => Value::Undefined,
            ScriptValue::Null => Value::Null,
            ScriptValue::Bool(b) => Value::Bool(*b),
            ScriptValue::Number(n) => Value::Number(*n),
            ScriptValue::String(s) => self.str_value(s.as_str()),
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
