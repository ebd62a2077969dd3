//! In-memory [`Runtime`] for unit tests.
//!
//! Models just enough of a script VM to drive the binding layer: a slot
//! stack, module variables, classes (script or foreign), a foreign heap with
//! finalizers, persistent handles and a reachability-based collector.
//! Script-side methods are Rust closures registered per class and signature.

use std::alloc::{self, Layout};
use std::borrow::Cow;
use std::ptr::NonNull;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::core::state::HostState;
use crate::ffi::registry::ClassMethods;
use crate::internal::utils::signature_arity;
use crate::runtime::Runtime;
use crate::types::enums::{ErrorType, InterpretResult, SlotType};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MockValue {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    /// Index into the class table.
    Class(usize),
    /// Index into the foreign heap.
    Foreign(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MockHandle(u32);

pub(crate) type ScriptMethod = Rc<dyn Fn(&[MockValue]) -> Result<MockValue, String>>;
pub(crate) type Interpreter = Rc<dyn Fn(&mut MockRuntime, &str, &str) -> InterpretResult>;

struct MockClass {
    module: String,
    name: String,
    /// `None` for script classes. Foreign classes resolve their allocator
    /// once, when they are defined.
    foreign: Option<ClassMethods<MockRuntime>>,
}

struct ForeignBlock {
    class: usize,
    data: NonNull<u8>,
    layout: Layout,
}

enum HandleTarget {
    Value(MockValue),
    Call(String),
}

pub(crate) struct MockRuntime {
    host: NonNull<HostState<MockRuntime>>,
    slots: Vec<MockValue>,
    classes: Vec<MockClass>,
    variables: FxHashMap<(String, String), MockValue>,
    objects: Vec<Option<ForeignBlock>>,
    handles: FxHashMap<u32, HandleTarget>,
    next_handle: u32,
    released: Vec<MockHandle>,
    script_methods: FxHashMap<(String, String, bool, String), ScriptMethod>,
    interpreter: Option<Interpreter>,
    interpreted: Vec<(String, String)>,
}

impl MockRuntime {
    fn new(host: NonNull<HostState<MockRuntime>>) -> Self {
        Self {
            host,
            slots: Vec::new(),
            classes: Vec::new(),
            variables: FxHashMap::default(),
            objects: Vec::new(),
            handles: FxHashMap::default(),
            next_handle: 0,
            released: Vec::new(),
            script_methods: FxHashMap::default(),
            interpreter: None,
            interpreted: Vec::new(),
        }
    }

    pub(crate) fn host(&self) -> &HostState<MockRuntime> {
        unsafe { self.host.as_ref() }
    }

    /// Declares a script class and stores it in the module variable `name`.
    pub(crate) fn define_class(&mut self, module: &str, name: &str) -> usize {
        self.push_class(module, name, None)
    }

    /// Declares a foreign class, resolving its allocator through the host.
    pub(crate) fn define_foreign_class(&mut self, module: &str, name: &str) -> usize {
        let methods = self.host().bind_foreign_class(module, name);
        self.push_class(module, name, Some(methods))
    }

    fn push_class(
        &mut self,
        module: &str,
        name: &str,
        foreign: Option<ClassMethods<MockRuntime>>,
    ) -> usize {
        let index = self.classes.len();
        self.classes.push(MockClass {
            module: module.to_owned(),
            name: name.to_owned(),
            foreign,
        });
        self.set_variable(module, name, MockValue::Class(index));
        index
    }

    /// Adds a script-side method. `args[0]` is the receiver.
    pub(crate) fn define_script_method(
        &mut self,
        module: &str,
        class: &str,
        is_static: bool,
        signature: &str,
        f: impl Fn(&[MockValue]) -> Result<MockValue, String> + 'static,
    ) {
        let key = (module.to_owned(), class.to_owned(), is_static, signature.to_owned());
        self.script_methods.insert(key, Rc::new(f));
    }

    pub(crate) fn set_variable(&mut self, module: &str, name: &str, value: MockValue) {
        self.variables
            .insert((module.to_owned(), name.to_owned()), value);
    }

    /// Replaces the default interpreter, which accepts any source.
    pub(crate) fn set_interpreter(
        &mut self,
        f: impl Fn(&mut MockRuntime, &str, &str) -> InterpretResult + 'static,
    ) {
        self.interpreter = Some(Rc::new(f));
    }

    pub(crate) fn set_slot(&mut self, slot: usize, value: MockValue) {
        *self.slot_mut(slot) = value;
    }

    pub(crate) fn slot(&self, slot: usize) -> &MockValue {
        match self.slots.get(slot) {
            Some(value) => value,
            None => panic!("slot {slot} out of range ({} slots)", self.slots.len()),
        }
    }

    fn slot_mut(&mut self, slot: usize) -> &mut MockValue {
        let count = self.slots.len();
        match self.slots.get_mut(slot) {
            Some(value) => value,
            None => panic!("slot {slot} out of range ({count} slots)"),
        }
    }

    /// Drops every slot, as the VM does when a foreign call returns.
    pub(crate) fn reset_slots(&mut self) {
        self.slots.clear();
    }

    pub(crate) fn live_objects(&self) -> usize {
        self.objects.iter().flatten().count()
    }

    pub(crate) fn live_handles(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn released(&self) -> &[MockHandle] {
        &self.released
    }

    pub(crate) fn interpreted(&self) -> &[(String, String)] {
        &self.interpreted
    }

    /// Reports a runtime error the way the VM does and fails the call.
    pub(crate) fn runtime_error(&mut self, message: &str) -> InterpretResult {
        self.host().report_error(ErrorType::Runtime, None, -1, message);
        InterpretResult::RuntimeError
    }

    fn object(&self, index: usize) -> &ForeignBlock {
        match self.objects.get(index) {
            Some(Some(block)) => block,
            _ => panic!("foreign object {index} used after finalization"),
        }
    }

    fn new_handle(&mut self, target: HandleTarget) -> MockHandle {
        let id = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(id, target);
        MockHandle(id)
    }

    fn finalize_object(&mut self, index: usize) {
        let Some(block) = self.objects[index].take() else {
            return;
        };
        if let Some(ClassMethods {
            finalize: Some(finalize),
            ..
        }) = self.classes[block.class].foreign
        {
            unsafe { finalize(block.data.as_ptr().cast()) };
        }
        unsafe { alloc::dealloc(block.data.as_ptr(), block.layout) };
    }
}

impl Runtime for MockRuntime {
    type Handle = MockHandle;

    fn create(host: NonNull<HostState<Self>>) -> Option<NonNull<Self>> {
        Some(NonNull::from(Box::leak(Box::new(MockRuntime::new(host)))))
    }

    unsafe fn destroy(vm: NonNull<Self>) {
        drop(unsafe { Box::from_raw(vm.as_ptr()) });
    }

    fn ensure_slots(&mut self, count: usize) {
        if self.slots.len() < count {
            self.slots.resize(count, MockValue::Null);
        }
    }

    fn slot_count(&mut self) -> usize {
        self.slots.len()
    }

    fn slot_type(&mut self, slot: usize) -> SlotType {
        match self.slot(slot) {
            MockValue::Null => SlotType::Null,
            MockValue::Bool(_) => SlotType::Bool,
            MockValue::Num(_) => SlotType::Num,
            MockValue::Str(_) => SlotType::String,
            MockValue::Class(_) => SlotType::Unknown,
            MockValue::Foreign(_) => SlotType::Foreign,
        }
    }

    fn get_slot_bool(&mut self, slot: usize) -> bool {
        match self.slot(slot) {
            MockValue::Bool(value) => *value,
            other => panic!("slot {slot} holds {other:?}, expected a bool"),
        }
    }

    fn set_slot_bool(&mut self, slot: usize, value: bool) {
        self.set_slot(slot, MockValue::Bool(value));
    }

    fn get_slot_double(&mut self, slot: usize) -> f64 {
        match self.slot(slot) {
            MockValue::Num(value) => *value,
            other => panic!("slot {slot} holds {other:?}, expected a number"),
        }
    }

    fn set_slot_double(&mut self, slot: usize, value: f64) {
        self.set_slot(slot, MockValue::Num(value));
    }

    fn get_slot_string(&mut self, slot: usize) -> Cow<'_, str> {
        match self.slot(slot) {
            MockValue::Str(value) => Cow::Borrowed(value.as_str()),
            other => panic!("slot {slot} holds {other:?}, expected a string"),
        }
    }

    fn set_slot_string(&mut self, slot: usize, value: &str) {
        self.set_slot(slot, MockValue::Str(value.to_owned()));
    }

    fn set_slot_null(&mut self, slot: usize) {
        self.set_slot(slot, MockValue::Null);
    }

    fn get_slot_handle(&mut self, slot: usize) -> MockHandle {
        let value = self.slot(slot).clone();
        self.new_handle(HandleTarget::Value(value))
    }

    fn set_slot_handle(&mut self, slot: usize, handle: MockHandle) {
        let value = match self.handles.get(&handle.0) {
            Some(HandleTarget::Value(value)) => value.clone(),
            Some(HandleTarget::Call(signature)) => {
                panic!("{handle:?} is a call handle for '{signature}', not a value")
            }
            None => panic!("{handle:?} used after release"),
        };
        self.set_slot(slot, value);
    }

    fn get_slot_foreign(&mut self, slot: usize) -> NonNull<u8> {
        match self.slot(slot) {
            MockValue::Foreign(index) => self.object(*index).data,
            other => panic!("slot {slot} holds {other:?}, expected a foreign object"),
        }
    }

    fn set_slot_new_foreign(
        &mut self,
        slot: usize,
        class_slot: usize,
        layout: Layout,
    ) -> NonNull<u8> {
        let class = match self.slot(class_slot) {
            MockValue::Class(class) => *class,
            other => panic!("slot {class_slot} holds {other:?}, expected a class"),
        };
        assert!(
            self.classes[class].foreign.is_some(),
            "{} is not a foreign class",
            self.classes[class].name
        );
        let data = NonNull::new(unsafe { alloc::alloc(layout) })
            .unwrap_or_else(|| alloc::handle_alloc_error(layout));
        let index = self.objects.len();
        self.objects.push(Some(ForeignBlock {
            class,
            data,
            layout,
        }));
        self.set_slot(slot, MockValue::Foreign(index));
        data
    }

    fn get_variable(&mut self, module: &str, name: &str, slot: usize) {
        let value = match self.variables.get(&(module.to_owned(), name.to_owned())) {
            Some(value) => value.clone(),
            None => panic!("module '{module}' has no variable '{name}'"),
        };
        self.set_slot(slot, value);
    }

    fn has_variable(&mut self, module: &str, name: &str) -> bool {
        self.variables
            .contains_key(&(module.to_owned(), name.to_owned()))
    }

    fn make_call_handle(&mut self, signature: &str) -> MockHandle {
        self.new_handle(HandleTarget::Call(signature.to_owned()))
    }

    fn call(&mut self, method: MockHandle) -> InterpretResult {
        let signature = match self.handles.get(&method.0) {
            Some(HandleTarget::Call(signature)) => signature.clone(),
            Some(HandleTarget::Value(_)) => panic!("{method:?} is not a call handle"),
            None => panic!("{method:?} used after release"),
        };
        let (class, is_static) = match self.slots.first() {
            Some(MockValue::Class(class)) => (*class, true),
            Some(MockValue::Foreign(index)) => (self.object(*index).class, false),
            other => {
                let message = format!("{other:?} does not implement '{signature}'.");
                return self.runtime_error(&message);
            }
        };
        self.ensure_slots(signature_arity(&signature) + 1);

        let module = self.classes[class].module.clone();
        let name = self.classes[class].name.clone();
        let key = (module, name, is_static, signature);

        if let Some(script) = self.script_methods.get(&key).cloned() {
            let args = self.slots[..=signature_arity(&key.3)].to_vec();
            return match script(&args) {
                Ok(value) => {
                    self.set_slot(0, value);
                    InterpretResult::Success
                }
                Err(message) => self.runtime_error(&message),
            };
        }

        let (module, name, is_static, signature) = key;
        if is_static && signature.starts_with("new") {
            if let Some(ClassMethods {
                allocate: Some(allocate),
                ..
            }) = self.classes[class].foreign
            {
                unsafe { allocate(self) };
                return InterpretResult::Success;
            }
        }

        let native = self
            .host()
            .bind_foreign_method(&module, &name, is_static, &signature);
        match native {
            Some(f) => {
                unsafe { f(self) };
                InterpretResult::Success
            }
            None => self.runtime_error(&format!("{name} does not implement '{signature}'.")),
        }
    }

    fn release_handle(&mut self, handle: MockHandle) {
        if self.handles.remove(&handle.0).is_none() {
            panic!("{handle:?} released twice");
        }
        self.released.push(handle);
    }

    fn interpret(&mut self, module: &str, source: &str) -> InterpretResult {
        self.interpreted.push((module.to_owned(), source.to_owned()));
        match self.interpreter.clone() {
            Some(interpreter) => interpreter(self, module, source),
            None => InterpretResult::Success,
        }
    }

    fn collect_garbage(&mut self) {
        let mut reachable = vec![false; self.objects.len()];
        let mut mark = |value: &MockValue| {
            if let MockValue::Foreign(index) = value {
                reachable[*index] = true;
            }
        };
        self.slots.iter().for_each(&mut mark);
        self.variables.values().for_each(&mut mark);
        for target in self.handles.values() {
            if let HandleTarget::Value(value) = target {
                mark(value);
            }
        }

        for (index, live) in reachable.into_iter().enumerate() {
            if !live {
                self.finalize_object(index);
            }
        }
    }
}

impl Drop for MockRuntime {
    fn drop(&mut self) {
        for index in 0..self.objects.len() {
            self.finalize_object(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vm::Vm;

    #[test]
    fn slots_grow_and_hold_values() {
        let vm = Vm::<MockRuntime>::new().unwrap();
        let rt = vm.runtime();
        rt.ensure_slots(2);
        assert_eq!(rt.slot_count(), 2);
        rt.set_slot_double(1, 2.0);
        assert_eq!(rt.slot_type(1), SlotType::Num);
        assert_eq!(rt.slot_type(0), SlotType::Null);
        rt.ensure_slots(1);
        assert_eq!(rt.slot_count(), 2);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn writing_past_the_slots_panics() {
        let vm = Vm::<MockRuntime>::new().unwrap();
        vm.runtime().set_slot_bool(3, true);
    }

    #[test]
    fn handles_are_tracked_until_released() {
        let vm = Vm::<MockRuntime>::new().unwrap();
        let rt = vm.runtime();
        rt.ensure_slots(1);
        rt.set_slot_string(0, "kept");
        let handle = rt.get_slot_handle(0);
        rt.set_slot_null(0);
        rt.set_slot_handle(0, handle);
        assert_eq!(rt.slot(0), &MockValue::Str("kept".into()));
        assert_eq!(rt.live_handles(), 1);
        rt.release_handle(handle);
        assert_eq!(rt.live_handles(), 0);
        assert_eq!(rt.released(), &[handle]);
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn double_release_panics() {
        let vm = Vm::<MockRuntime>::new().unwrap();
        let rt = vm.runtime();
        let handle = rt.make_call_handle("go()");
        rt.release_handle(handle);
        rt.release_handle(handle);
    }

    #[test]
    fn script_methods_receive_arguments() {
        let vm = Vm::<MockRuntime>::new().unwrap();
        let rt = vm.runtime();
        rt.define_class("main", "Math");
        rt.define_script_method("main", "Math", true, "add(_,_)", |args| {
            match (&args[1], &args[2]) {
                (MockValue::Num(a), MockValue::Num(b)) => Ok(MockValue::Num(a + b)),
                _ => Err("expected numbers".into()),
            }
        });
        rt.ensure_slots(3);
        rt.get_variable("main", "Math", 0);
        rt.set_slot_double(1, 2.0);
        rt.set_slot_double(2, 5.0);
        let add = rt.make_call_handle("add(_,_)");
        assert_eq!(rt.call(add), InterpretResult::Success);
        assert_eq!(rt.slot(0), &MockValue::Num(7.0));
    }

    #[test]
    fn unknown_method_is_a_runtime_error() {
        let vm = Vm::<MockRuntime>::new().unwrap();
        let rt = vm.runtime();
        rt.define_class("main", "Empty");
        rt.ensure_slots(1);
        rt.get_variable("main", "Empty", 0);
        let missing = rt.make_call_handle("missing()");
        assert_eq!(rt.call(missing), InterpretResult::RuntimeError);
    }
}
