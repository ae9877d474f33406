use std::collections::HashMap;

use crate::compiler::{Span, StringId};

use super::{File, Spec, TypeSpec};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjKind {
    Const,
    Type,
}

/// Locates the spec which declared an object: `decls[decl].specs[spec]`, and
/// for constants, the position of the name within the spec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeclRef {
    pub decl: usize,
    pub spec: usize,
    pub index: usize,
}

/// A declared name.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Object {
    pub kind: ObjKind,
    pub span: Span,
    pub decl: DeclRef,
}

/// The flat scope of every package level declaration.
#[derive(Debug, Default)]
pub struct PackageScope {
    objects: HashMap<StringId, Object>,
}

impl PackageScope {
    pub fn new() -> PackageScope {
        PackageScope::default()
    }

    /// Declares `name`.  If the name is already declared then the scope is not
    /// changed and the prior declaration is returned.
    pub fn declare(&mut self, name: StringId, obj: Object) -> Result<(), Object> {
        match self.objects.get(&name) {
            Some(prior) => Err(*prior),
            None => {
                self.objects.insert(name, obj);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, name: StringId) -> Option<&Object> {
        self.objects.get(&name)
    }

    /// Returns the type spec which declared `name`, if `name` is a type.
    pub fn type_spec<'f>(&self, file: &'f File, name: StringId) -> Option<&'f TypeSpec> {
        let obj = self.lookup(name).filter(|o| o.kind == ObjKind::Type)?;
        match file.decls.get(obj.decl.decl)?.specs.get(obj.decl.spec)? {
            Spec::Type(ts) => Some(ts),
            Spec::Const(_) => None,
        }
    }
}
