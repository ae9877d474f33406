/*!
Generates the Rust module for a sized type table.

Every declared type becomes a group of items:

* a bitfield becomes a value struct with one public field per named field, a
  `<name>_reg` register type wrapping the register's storage, shift and mask
  constants, and `get`/`set` accessors for registers which are declared with
  `func` or used as the field of another type,
* a struct becomes a `#[repr(C)]` struct with explicit padding and a
  compile time assertion of its size,
* every other type becomes a type alias.

The items are assembled with `quote`, parsed with `syn` and printed with
`prettyplease`.
 */

use std::{collections::HashSet, fmt::Display};

use log::debug;
use proc_macro2::TokenStream;
use quote::quote;

use crate::compiler::layout::{NodeKind, TypeNode, TypeTable};

use names::{alias_type, doc_attrs, ident, memory_type};

mod bitfield;
mod names;
pub mod runtime;
mod structure;
mod tests;

pub use bitfield::{access_plan, Access, Backing};

/// Source of the bit helpers emitted into modules which need them.
const RUNTIME: &str = include_str!("runtime.rs");

#[derive(Debug, PartialEq)]
pub enum CodegenError {
    /// The bit helpers could not be tokenized.
    Runtime(String),
    /// The generated tokens are not a valid Rust file.
    Format(String),
}

impl Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodegenError::Runtime(msg) => write!(f, "cannot embed the bit helpers: {}", msg),
            CodegenError::Format(msg) => write!(f, "cannot format the generated code: {}", msg),
        }
    }
}

/// Generates the formatted Rust source for `table`, in a module named
/// `package`.
pub fn generate(table: &TypeTable, package: &str, source: &str) -> Result<String, CodegenError> {
    let tokens = module_tokens(table, package)?;
    let file =
        syn::parse2::<syn::File>(tokens).map_err(|e| CodegenError::Format(e.to_string()))?;
    Ok(format!(
        "// autogenerated: do not edit!\n// generated from {}\n{}",
        source,
        prettyplease::unparse(&file)
    ))
}

/// Generates the unformatted module for `table`.
pub fn module_tokens(table: &TypeTable, package: &str) -> Result<TokenStream, CodegenError> {
    debug!("Generating {} types into {}", table.len(), package);
    let mut gen = Generator::new(table);
    for node in table.iter() {
        gen.declared(node);
    }

    let runtime = if gen.needs_runtime {
        RUNTIME
            .parse::<TokenStream>()
            .map_err(|e| CodegenError::Runtime(e.to_string()))?
    } else {
        quote!()
    };

    let pkg = ident(package);
    let items = &gen.items;
    Ok(quote! {
        #[allow(non_camel_case_types, non_upper_case_globals, non_snake_case, dead_code, unused_mut, unused_variables)]
        pub mod #pkg {
            #(#items)*
            #runtime
        }
    })
}

/// Walks the type table and collects the items of the module.
pub struct Generator<'t> {
    table: &'t TypeTable,

    /// Types used as the field or element of another type.
    referenced: HashSet<&'t str>,

    /// Set once an accessor needs the bit helpers.
    needs_runtime: bool,
    items: Vec<TokenStream>,
}

impl<'t> Generator<'t> {
    pub fn new(table: &'t TypeTable) -> Generator<'t> {
        let mut referenced = HashSet::new();
        for node in table.iter() {
            if let Some(n) = node.named() {
                referenced.insert(n);
            }
            collect_references(&node.fields, &mut referenced);
        }

        Generator {
            table,
            referenced,
            needs_runtime: false,
            items: vec![],
        }
    }

    fn declared(&mut self, node: &'t TypeNode) {
        let name = node.name.as_str();
        let doc = doc_attrs(node.doc.as_deref(), &[]);

        if self.table.is_default(name) {
            let alias = ident(name);
            let ty = memory_type(self.table.register_size);
            self.items.push(quote! {
                #doc
                pub type #alias = #ty;
            });
            return;
        }

        match node.kind {
            NodeKind::Bitfield => {
                let accessors = node.is_func || self.referenced.contains(name);
                self.bitfield(name, node, accessors);
            }
            NodeKind::Struct => self.structure(name, node, node.elem_size()),
            NodeKind::Array => {
                let alias = ident(name);
                let (elem, _) = self.elem_type(&node.type_of, node.elem_size());
                let len = names::dec(node.length);
                self.items.push(quote! {
                    #doc
                    pub type #alias = [#elem; #len];
                });
            }
            NodeKind::Bits => {
                let alias = ident(name);
                let ty = alias_type(node.size);
                self.items.push(quote! {
                    #doc
                    pub type #alias = #ty;
                });
            }
        }
    }
}

fn collect_references<'t>(fields: &'t [TypeNode], referenced: &mut HashSet<&'t str>) {
    for f in fields {
        if let Some(n) = f.named() {
            referenced.insert(n);
        }
        collect_references(&f.fields, referenced);
    }
}
