use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote};
use syn::LitInt;

/// Words which cannot be used as plain identifiers in Rust.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords which cannot be raw identifiers either.
const RESERVED: &[&str] = &["self", "Self", "super", "crate"];

/// Turns a name from the source into a Rust identifier.
pub fn ident(name: impl AsRef<str>) -> Ident {
    let name = name.as_ref();
    if RESERVED.contains(&name) {
        format_ident!("{}_", name)
    } else if KEYWORDS.contains(&name) {
        Ident::new_raw(name, Span::call_site())
    } else {
        Ident::new(name, Span::call_site())
    }
}

/// The register type of the bitfield named `name`.
pub fn reg_ident(name: &str) -> Ident {
    ident(format!("{}_reg", name))
}

/// The name of a constant describing `field` of the bitfield `parent`.
pub fn const_ident(parent: &str, field: &str, suffix: &str) -> Ident {
    ident(format!("{}_{}{}", parent, field, suffix))
}

/// An unsuffixed integer literal written in hex.
pub fn hex(v: u64) -> LitInt {
    LitInt::new(&format!("{:#x}", v), Span::call_site())
}

/// An unsuffixed integer literal written in decimal.
pub fn dec(v: u64) -> LitInt {
    LitInt::new(&v.to_string(), Span::call_site())
}

/// The unsigned integer type of exactly `bits` bits, if Rust has one.
pub fn native(bits: u64) -> Option<Ident> {
    match bits {
        8 | 16 | 32 | 64 | 128 => Some(format_ident!("u{}", bits)),
        _ => None,
    }
}

/// The narrowest unsigned integer holding `bits` bits, up to 64.
pub fn narrowest(bits: u64) -> Option<Ident> {
    match bits {
        0..=8 => native(8),
        9..=16 => native(16),
        17..=32 => native(32),
        33..=64 => native(64),
        _ => None,
    }
}

/// The number of 32 bit words needed for `bits` bits.
pub fn words(bits: u64) -> u64 {
    (bits + 31) / 32
}

/// The type of a value of `bits` bits inside of a bitfield value struct.
pub fn value_type(bits: u64) -> TokenStream {
    if bits == 1 {
        return quote!(bool);
    }
    match narrowest(bits) {
        Some(t) => quote!(#t),
        None => {
            let n = dec(words(bits));
            quote!([u32; #n])
        }
    }
}

/// The type of `bits` bits laid out in memory: an integer of exactly that
/// width, or a byte array.
pub fn memory_type(bits: u64) -> TokenStream {
    match native(bits) {
        Some(t) => quote!(#t),
        None => {
            let n = dec(bits / 8);
            quote!([u8; #n])
        }
    }
}

/// The alignment in bytes of [`memory_type`].
pub fn memory_align(bits: u64) -> u64 {
    match native(bits) {
        Some(_) => bits / 8,
        None => 1,
    }
}

/// A mask of the low `bits` bits.
pub fn mask(bits: u64) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Documentation attributes for a doc comment and a field's tags.
pub fn doc_attrs(doc: Option<&str>, tags: &[String]) -> TokenStream {
    let mut lines: Vec<String> = doc
        .map(|d| d.lines().map(|l| format!(" {}", l.trim())).collect())
        .unwrap_or_default();
    if !tags.is_empty() {
        lines.push(format!(" Tags: {}.", tags.join(", ")));
    }
    quote!(#(#[doc = #lines])*)
}

/// The type a declared `uint<N>` or `[N]` type is aliased to. Whole bytes
/// keep their exact width so the alias can be a struct field.
pub fn alias_type(bits: u64) -> TokenStream {
    if bits % 8 == 0 {
        memory_type(bits)
    } else {
        value_type(bits.max(2))
    }
}
