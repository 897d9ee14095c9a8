//! [`Program`]: the top-level container a frontend hands to the core (§6
//! "Frontend → Core") -- a set of methods sharing one type registry.

use std::collections::HashMap;

use crate::id::MethodId;
use crate::method::Method;
use crate::type_id::TypeRegistry;

#[derive(Debug, Default)]
pub struct Program {
    pub types: TypeRegistry,
    pub methods: HashMap<MethodId, Method>,
    next_method: u32,
}

impl Program {
    pub fn new() -> Self {
        Program {
            types: TypeRegistry::new(),
            methods: HashMap::new(),
            next_method: 0,
        }
    }

    pub fn fresh_method_id(&mut self) -> MethodId {
        let id = MethodId(self.next_method);
        self.next_method += 1;
        id
    }

    pub fn insert_method(&mut self, method: Method) {
        self.methods.insert(method.id, method);
    }

    pub fn method(&self, id: MethodId) -> Option<&Method> {
        self.methods.get(&id)
    }

    pub fn method_by_name(&self, name: &str) -> Option<&Method> {
        self.methods.values().find(|m| m.name == name)
    }

    pub fn kernels(&self) -> impl Iterator<Item = &Method> {
        self.methods.values().filter(|m| m.is_kernel())
    }
}
