//! Variable scoping for the interpreter.
//!
//! A stack of frames with the global frame at the bottom. Blocks and calls
//! push a frame on top of whatever is currently visible, so lookup walks
//! from the innermost frame down to the globals.

use crate::runtime::value::ScriptValue;
use rustc_hash::FxHashMap;

type Frame = FxHashMap<String, ScriptValue>;

pub struct Environment {
    frames: Vec<Frame>,
}

impl Environment {
    /// Create an environment holding only an empty global frame
    pub fn new() -> Self {
        Environment { frames: vec![Frame::default()] }
    }

    pub fn push_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pop the innermost frame. The global frame is never popped.
    pub fn pop_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of frames including the global one
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drop every frame above `depth`
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth.max(1));
    }

    pub fn lookup(&self, name: &str) -> Option<&ScriptValue> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut ScriptValue> {
        self.frames.iter_mut().rev().find_map(|frame| frame.get_mut(name))
    }

    /// Bind `name` in the innermost frame, shadowing outer bindings
    pub fn define_local(&mut self, name: impl Into<String>, value: ScriptValue) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    pub fn define_global(&mut self, name: impl Into<String>, value: ScriptValue) {
        self.frames[0].insert(name.into(), value);
    }

    /// Update the nearest existing binding, or create a global
    pub fn assign(&mut self, name: &str, value: ScriptValue) {
        match self.lookup_mut(name) {
            Some(slot) => *slot = value,
            None => self.define_global(name, value),
        }
    }

    pub fn get_global(&self, name: &str) -> Option<&ScriptValue> {
        self.frames[0].get(name)
    }

    /// Discard all frames and globals
    pub fn clear(&mut self) {
        self.frames.clear();
        self.frames.push(Frame::default());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
