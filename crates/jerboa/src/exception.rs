//! Language exceptions and the public error surface.
//!
//! A throw is an ordinary value carried in [`Thrown`]; evaluator code
//! threads it through `Exec<T>` with `?`. Error objects are built here with
//! `name`, `message`, a `stack` string captured from the frame stack at
//! construction time, and `line`/`column`/`file` from the node being
//! evaluated.

use std::fmt::{self, Write};

use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    heap::{HeapData, HeapId},
    object::{JsObject, PropAttrs},
    value::{number_to_string, Value},
    vm::Vm,
};

/// Builtin error kinds. The string form matches the variant name exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
    EvalError,
}

/// A thrown language value unwinding through the evaluator.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Thrown(pub Value);

pub(crate) type Exec<T> = Result<T, Thrown>;

/// Error surfaced across the public API boundary: an uncaught exception, a
/// parse failure, or an I/O problem while loading source.
#[derive(Debug, Clone)]
pub struct Exception {
    pub name: String,
    pub message: String,
    pub stack: String,
    pub line: u32,
    pub column: u32,
    pub file: String,
}

impl fmt::Display for Exception {
    /// The uncaught-exception report: `file:line:column Uncaught <Name>:
    /// <message>` followed by the captured stack.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} Uncaught {}: {}",
            self.file, self.line, self.column, self.name, self.message
        )?;
        if !self.stack.is_empty() {
            write!(f, "\n{}", self.stack)?;
        }
        Ok(())
    }
}

impl std::error::Error for Exception {}

impl Vm {
    fn error_proto(&self, kind: ErrorKind) -> HeapId {
        match kind {
            ErrorKind::Error => self.protos.error,
            ErrorKind::TypeError => self.protos.type_error,
            ErrorKind::RangeError => self.protos.range_error,
            ErrorKind::ReferenceError => self.protos.reference_error,
            ErrorKind::SyntaxError => self.protos.syntax_error,
            ErrorKind::EvalError => self.protos.eval_error,
        }
    }

    /// Builds an error object of `kind`, capturing position and stack.
    pub(crate) fn make_error(&mut self, kind: ErrorKind, message: &str) -> Value {
        let proto = self.error_proto(kind);
        let id = self.heap.alloc_object(JsObject::plain(Some(proto)));
        let name_value = self.str_value(<&'static str>::from(kind));
        let message_value = self.str_value(message);
        let stack_value = {
            let stack = self.build_stack();
            self.str_value(stack)
        };
        let names = [
            (self.names.name, name_value),
            (self.names.message, message_value),
            (self.names.stack, stack_value),
        ];
        for (key, value) in names {
            self.heap.define_prop(id, key, value, PropAttrs::HIDDEN);
        }
        if let Some(pos) = self.current_pos.clone() {
            let file_value = self.str_value(&*pos.path);
            let line_key = self.names.line;
            let column_key = self.names.column;
            let file_key = self.names.file;
            self.heap.define_prop(
                id,
                line_key,
                Value::Number(f64::from(pos.line)),
                PropAttrs::HIDDEN,
            );
            self.heap.define_prop(
                id,
                column_key,
                Value::Number(f64::from(pos.column)),
                PropAttrs::HIDDEN,
            );
            self.heap
                .define_prop(id, file_key, file_value, PropAttrs::HIDDEN);
        }
        Value::Object(id)
    }

    pub(crate) fn throw(&mut self, kind: ErrorKind, message: &str) -> Thrown {
        Thrown(self.make_error(kind, message))
    }

    pub(crate) fn type_error(&mut self, message: &str) -> Thrown {
        self.throw(ErrorKind::TypeError, message)
    }

    pub(crate) fn range_error(&mut self, message: &str) -> Thrown {
        self.throw(ErrorKind::RangeError, message)
    }

    pub(crate) fn reference_error(&mut self, message: &str) -> Thrown {
        self.throw(ErrorKind::ReferenceError, message)
    }

    pub(crate) fn syntax_error(&mut self, message: &str) -> Thrown {
        self.throw(ErrorKind::SyntaxError, message)
    }

    /// Renders the frame stack, innermost frame first.
    pub(crate) fn build_stack(&self) -> String {
        let mut out = String::new();
        if let Some(pos) = &self.current_pos {
            let _ = write!(out, "    at {}:{}:{}", pos.path, pos.line, pos.column);
        }
        for frame in self.frames.iter().rev() {
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = write!(
                out,
                "    at {} ({}:{}:{})",
                frame.function_name, frame.source_path, frame.line, frame.column
            );
        }
        out
    }

    /// Best-effort rendering for error reporting; never calls back into
    /// script code.
    pub(crate) fn debug_print(&self, value: Value) -> String {
        match value {
            Value::Undefined => "undefined".to_owned(),
            Value::Null => "null".to_owned(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(n),
            Value::Str(id) => self.heap.str(id).as_str().to_owned(),
            Value::Object(id) => match self.heap.get(id) {
                HeapData::Object(o) => format!("[object {}]", o.kind.tag()),
                _ => "[object Object]".to_owned(),
            },
        }
    }

    /// Converts a thrown value into the public [`Exception`], pulling
    /// `name`/`message`/`stack`/position off error-shaped objects.
    pub(crate) fn exception_from_thrown(&mut self, thrown: &Thrown) -> Exception {
        let value = thrown.0;
        let mut exception = Exception {
            name: "Error".to_owned(),
            message: self.debug_print(value),
            stack: String::new(),
            line: self.current_pos.as_ref().map_or(0, |p| p.line),
            column: self.current_pos.as_ref().map_or(0, |p| p.column),
            file: self
                .current_pos
                .as_ref()
                .map_or_else(String::new, |p| p.path.to_string()),
        };
        let Value::Object(id) = value else {
            return exception;
        };
        let read = |vm: &Self, key: HeapId| vm.heap.get_prop(id, key);
        if let Some(Value::Str(name)) = read(self, self.names.name) {
            exception.name = self.heap.str(name).as_str().to_owned();
        }
        if let Some(Value::Str(message)) = read(self, self.names.message) {
            exception.message = self.heap.str(message).as_str().to_owned();
        }
        if let Some(Value::Str(stack)) = read(self, self.names.stack) {
            exception.stack = self.heap.str(stack).as_str().to_owned();
        }
        if let Some(Value::Number(line)) = read(self, self.names.line) {
            exception.line = line as u32;
        }
        if let Some(Value::Number(column)) = read(self, self.names.column) {
            exception.column = column as u32;
        }
        if let Some(Value::Str(file)) = read(self, self.names.file) {
            exception.file = self.heap.str(file).as_str().to_owned();
        }
        exception
    }
}
