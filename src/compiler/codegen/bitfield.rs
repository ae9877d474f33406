use log::trace;
use proc_macro2::TokenStream;
use quote::quote;

use crate::compiler::layout::{storage_bits, TypeNode, TypeOf, TypeTable};

use super::{
    names::{const_ident, dec, doc_attrs, hex, ident, mask, narrowest, reg_ident, value_type, words},
    Generator,
};

/// How the bits of a register are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backing {
    /// One integer of the given width.
    Scalar(u64),
    /// The given number of 32 bit words.
    Words(u64),
}

impl Backing {
    pub fn of(table: &TypeTable, node: &TypeNode) -> Backing {
        if node.is_func && table.default.is_some() {
            Backing::Scalar(table.register_size)
        } else if node.size <= 64 {
            Backing::Scalar(storage_bits(node.size.max(1)))
        } else {
            Backing::Words(words(node.size))
        }
    }

    /// Alignment in bytes.
    pub fn align(&self) -> u64 {
        match self {
            Backing::Scalar(bits) => bits / 8,
            Backing::Words(_) => 4,
        }
    }
}

/// One run of bits read or written by a register accessor.
#[derive(Clone, Debug, PartialEq)]
pub struct Access {
    /// Field names leading from the value struct to the bits.
    pub path: Vec<String>,
    /// The lowest bit within the register.
    pub lo: u64,
    pub size: u64,
}

impl Access {
    pub fn hi(&self) -> u64 {
        self.lo + self.size - 1
    }
}

/// Lists the bits moved by the accessors of a bitfield.  Fields whose type
/// is itself a bitfield are flattened into the accesses of their fields.
pub fn access_plan(table: &TypeTable, node: &TypeNode) -> Vec<Access> {
    let mut plan = vec![];
    plan_fields(table, &node.fields, 0, &mut vec![], &mut plan);
    plan
}

fn plan_fields(
    table: &TypeTable,
    fields: &[TypeNode],
    base: u64,
    path: &mut Vec<String>,
    plan: &mut Vec<Access>,
) {
    for f in fields.iter().filter(|f| !f.is_blank()) {
        path.push(f.name.clone());
        let lo = base + f.offset;
        match nested_bitfield(table, f) {
            Some(nested) => plan_fields(table, &nested.fields, lo, path, plan),
            None if f.size > 0 => plan.push(Access {
                path: path.clone(),
                lo,
                size: f.size,
            }),
            None => (),
        }
        path.pop();
    }
}

/// The bitfield a field is made of, if any.
fn nested_bitfield<'t>(table: &'t TypeTable, f: &'t TypeNode) -> Option<&'t TypeNode> {
    match &f.type_of {
        TypeOf::Named(n) => table.get(n).filter(|t| t.is_bitfield()),
        TypeOf::Inline(_) if f.is_bitfield() => Some(f),
        _ => None,
    }
}

impl<'t> Generator<'t> {
    /// Emits the value struct, register type and constants of a bitfield,
    /// and its accessors if asked to.
    pub(super) fn bitfield(&mut self, name: &str, node: &'t TypeNode, accessors: bool) {
        for f in &node.fields {
            if let TypeOf::Inline(n) = &f.type_of {
                if f.is_bitfield() && !f.is_blank() {
                    self.bitfield(n, f, true);
                }
            }
        }

        let value = ident(name);
        let reg = reg_ident(name);
        let doc = doc_attrs(node.doc.as_deref(), &[]);
        let backing = Backing::of(self.table, node);
        let backing_ty = self.backing_type(node, backing);

        let members = node
            .fields
            .iter()
            .filter(|f| !f.is_blank())
            .map(|f| {
                let fname = ident(&f.name);
                let fdoc = doc_attrs(f.doc.as_deref(), &f.tags);
                let ty = match nested_bitfield(self.table, f) {
                    Some(_) => match &f.type_of {
                        TypeOf::Named(n) | TypeOf::Inline(n) => {
                            let n = ident(n);
                            quote!(#n)
                        }
                        _ => value_type(f.size),
                    },
                    None => value_type(f.size),
                };
                quote! {
                    #fdoc
                    pub #fname: #ty,
                }
            })
            .collect::<Vec<_>>();

        let consts = node
            .fields
            .iter()
            .filter(|f| !f.is_blank())
            .map(|f| self.field_consts(name, node, f, &backing_ty))
            .collect::<Vec<_>>();

        self.items.push(quote! {
            #doc
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
            pub struct #value {
                #(#members)*
            }

            #[repr(transparent)]
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
            pub struct #reg(pub #backing_ty);

            #(#consts)*
        });

        if accessors {
            trace!("Accessors for {} over {:?}", name, backing);
            let plan = access_plan(self.table, node);
            let body = self.accessors(&value, &backing_ty, backing, &plan);
            self.items.push(quote! {
                impl #reg {
                    #body
                }
            });
        }
    }

    fn backing_type(&self, node: &TypeNode, backing: Backing) -> TokenStream {
        match (&self.table.default, backing) {
            (Some(d), _) if node.is_func => {
                let d = ident(d);
                quote!(#d)
            }
            (_, Backing::Scalar(bits)) => {
                let t = narrowest(bits);
                quote!(#t)
            }
            (_, Backing::Words(n)) => {
                let n = dec(n);
                quote!([u32; #n])
            }
        }
    }

    fn field_consts(
        &self,
        parent: &str,
        node: &TypeNode,
        f: &TypeNode,
        backing_ty: &TokenStream,
    ) -> TokenStream {
        if node.size <= 64 {
            let shift = dec(f.offset);
            if f.size == 1 {
                let name = const_ident(parent, &f.name, "");
                quote!(pub const #name: #backing_ty = 1 << #shift;)
            } else {
                let shift_name = const_ident(parent, &f.name, "_shift");
                let mask_name = const_ident(parent, &f.name, "_mask");
                let mask = hex(mask(f.size));
                quote! {
                    pub const #shift_name: u32 = #shift;
                    pub const #mask_name: #backing_ty = #mask;
                }
            }
        } else {
            let lo_name = const_ident(parent, &f.name, "_lo");
            let hi_name = const_ident(parent, &f.name, "_hi");
            let size_name = const_ident(parent, &f.name, "_size");
            let (lo, hi, size) = (
                dec(f.offset),
                dec((f.offset + f.size).saturating_sub(1)),
                dec(f.size),
            );
            quote! {
                pub const #lo_name: u32 = #lo;
                pub const #hi_name: u32 = #hi;
                pub const #size_name: u32 = #size;
            }
        }
    }

    fn accessors(
        &mut self,
        value: &proc_macro2::Ident,
        backing_ty: &TokenStream,
        backing: Backing,
        plan: &[Access],
    ) -> TokenStream {
        let mut gets = vec![];
        let mut sets = vec![];

        for a in plan {
            let segs = a.path.iter().map(ident);
            let target = quote!(v #(. #segs)*);
            let ty = value_type(a.size);
            let lo = dec(a.lo);
            let hi = dec(a.hi());

            match backing {
                Backing::Scalar(_) => {
                    if a.size == 1 {
                        gets.push(quote!(#target = reg & (1 << #lo) != 0;));
                        sets.push(quote!(if #target { reg |= 1 << #lo; }));
                    } else {
                        let mask = hex(mask(a.size));
                        gets.push(quote!(#target = ((reg >> #lo) & #mask) as #ty;));
                        sets.push(quote!(reg |= ((#target as #backing_ty) & #mask) << #lo;));
                    }
                }
                Backing::Words(_) => {
                    self.needs_runtime = true;
                    if a.size == 1 {
                        gets.push(quote!(#target = get1(&reg, #lo);));
                        sets.push(quote!(set1(&mut reg, #lo, #target);));
                    } else if a.size <= 64 {
                        gets.push(quote!(#target = get_range(&reg, #lo, #hi) as #ty;));
                        sets.push(quote!(set_range(&mut reg, #lo, #hi, #target as u64);));
                    } else {
                        gets.push(quote!(#target = get_words(&reg, #lo, #hi);));
                        sets.push(quote!(set_words(&mut reg, #lo, #hi, &#target);));
                    }
                }
            }
        }

        let init = match backing {
            Backing::Scalar(_) => quote!(let mut reg: #backing_ty = 0;),
            Backing::Words(n) => {
                let n = dec(n);
                quote!(let mut reg = [0u32; #n];)
            }
        };

        quote! {
            /// Reads the register.
            pub fn get(&self) -> #value {
                let reg = unsafe { core::ptr::read_volatile(&self.0) };
                let mut v = #value::default();
                #(#gets)*
                v
            }

            /// Writes every field of the register.
            pub fn set(&mut self, v: #value) {
                #init
                #(#sets)*
                unsafe { core::ptr::write_volatile(&mut self.0, reg) }
            }
        }
    }
}
