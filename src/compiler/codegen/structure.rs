use proc_macro2::TokenStream;
use quote::quote;

use crate::compiler::layout::{NodeKind, TypeNode, TypeOf};

use super::{
    bitfield::Backing,
    names::{dec, doc_attrs, ident, memory_align, memory_type, reg_ident},
    Generator,
};

/// The Rust layout of a struct: its members, with padding filling every gap.
struct StructLayout {
    members: Vec<TokenStream>,
    align: u64,
    packed: bool,
}

impl<'t> Generator<'t> {
    /// Emits a struct whose elements are `elem_size` bits.  A struct repeated
    /// more than once is emitted as `<name>_elem` with `name` aliasing the
    /// array.
    pub(super) fn structure(&mut self, name: &str, node: &'t TypeNode, elem_size: u64) {
        for f in node.fields.iter().filter(|f| !f.is_blank()) {
            if let TypeOf::Inline(n) = &f.type_of {
                if f.is_bitfield() {
                    self.bitfield(n, f, true);
                } else {
                    self.structure(n, f, f.elem_size());
                }
            }
        }

        let layout = self.layout(node, elem_size);
        let members = &layout.members;
        let repr = if layout.packed {
            quote!(#[repr(C, packed)])
        } else {
            quote!(#[repr(C)])
        };
        let doc = doc_attrs(node.doc.as_deref(), &[]);
        let bytes = dec(elem_size / 8);

        let struct_name = if node.length > 1 {
            ident(format!("{}_elem", name))
        } else {
            ident(name)
        };

        self.items.push(quote! {
            #doc
            #repr
            pub struct #struct_name {
                #(#members)*
            }

            const _: () = assert!(core::mem::size_of::<#struct_name>() == #bytes);
        });

        if node.length > 1 {
            let alias = ident(name);
            let len = dec(node.length);
            self.items.push(quote! {
                pub type #alias = [#struct_name; #len];
            });
        }
    }

    fn layout(&self, node: &TypeNode, elem_size: u64) -> StructLayout {
        let mut layout = StructLayout {
            members: vec![],
            align: 1,
            packed: false,
        };
        let mut cursor = 0;
        let mut pads = 0;

        for f in node.fields.iter().filter(|f| !f.is_blank()) {
            if f.offset > cursor {
                self.padding(&mut layout, &mut pads, cursor, f.offset);
            }

            let (ty, align) = self.field_type(f);
            if (f.offset / 8) % align != 0 {
                layout.packed = true;
            }
            layout.align = layout.align.max(align);

            let fname = ident(&f.name);
            let doc = doc_attrs(f.doc.as_deref(), &f.tags);
            layout.members.push(quote! {
                #doc
                pub #fname: #ty,
            });
            cursor = f.end();
        }

        if elem_size > cursor {
            self.padding(&mut layout, &mut pads, cursor, elem_size);
        }
        if (elem_size / 8) % layout.align != 0 {
            layout.packed = true;
        }
        if layout.packed {
            layout.align = 1;
        }
        layout
    }

    /// Fills the bits from `from` to `to` with a private array, made of
    /// registers where the gap is whole registers on a register boundary.
    fn padding(&self, layout: &mut StructLayout, pads: &mut u64, from: u64, to: u64) {
        let name = ident(format!("_pad{}", pads));
        *pads += 1;

        let reg = self.table.register_size;
        let (ty, align) = match &self.table.default {
            Some(d) if from % reg == 0 && (to - from) % reg == 0 => {
                let d = ident(d);
                let n = dec((to - from) / reg);
                (quote!([#d; #n]), reg / 8)
            }
            _ => {
                let n = dec((to - from) / 8);
                (quote!([u8; #n]), 1)
            }
        };
        if (from / 8) % align != 0 {
            layout.packed = true;
        }
        layout.align = layout.align.max(align);
        layout.members.push(quote!(#name: #ty,));
    }

    /// The Rust type of a struct field, and its alignment in bytes.
    fn field_type(&self, f: &TypeNode) -> (TokenStream, u64) {
        match (&f.kind, &f.type_of) {
            (NodeKind::Array, type_of) => {
                let (elem, align) = self.elem_type(type_of, f.elem_size());
                let len = dec(f.length);
                (quote!([#elem; #len]), align)
            }
            (_, TypeOf::Inline(n)) if f.is_bitfield() => {
                let reg = reg_ident(n);
                (quote!(#reg), Backing::of(self.table, f).align())
            }
            (_, TypeOf::Inline(n)) => {
                let n = ident(n);
                (quote!(#n), self.layout(f, f.elem_size()).align)
            }
            (_, type_of) => self.elem_type(type_of, f.size),
        }
    }

    /// The Rust type of `bits` bits made of `type_of`, and its alignment.
    pub(super) fn elem_type(&self, type_of: &TypeOf, bits: u64) -> (TokenStream, u64) {
        if let TypeOf::Named(n) = type_of {
            if let Some(t) = self.table.get(n) {
                return if t.is_bitfield() {
                    let reg = reg_ident(n);
                    (quote!(#reg), Backing::of(self.table, t).align())
                } else {
                    let name = ident(n);
                    (quote!(#name), self.align_of(t))
                };
            }
        }
        (memory_type(bits), memory_align(bits))
    }

    /// The alignment of a declared type.
    fn align_of(&self, t: &TypeNode) -> u64 {
        match t.kind {
            NodeKind::Bitfield => Backing::of(self.table, t).align(),
            NodeKind::Struct => self.layout(t, t.elem_size()).align,
            NodeKind::Array => self.elem_type(&t.type_of, t.elem_size()).1,
            NodeKind::Bits => memory_align(t.size),
        }
    }
}
