use std::collections::HashMap;

use serde::Serialize;

use crate::compiler::Span;

/// How the bits of a node are organized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    /// Plain bits without any inner structure.
    Bits,
    /// `length` repetitions of the element named by `type_of`.
    Array,
    /// Byte aligned fields.
    Struct,
    /// Densely packed fields inside of a register.
    Bitfield,
}

/// What a node is made of.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TypeOf {
    /// The node is the declaration of a named struct or bitfield.
    Declared,
    /// A declared type.
    Named(String),
    /// An anonymous struct or bitfield, emitted under the given name.
    Inline(String),
    /// An opaque `uint<N>`.
    Opaque(u64),
    /// A single bit, a bit range, or a bare `[N]`.
    Bits,
}

/// A sized type or field.  Offsets and sizes are in bits.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeNode {
    pub name: String,
    pub kind: NodeKind,
    pub type_of: TypeOf,

    /// Position within the parent.
    pub offset: u64,

    /// The total size, including every repetition.
    pub size: u64,
    pub length: u64,

    /// A top level register declared with `func`.
    pub is_func: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<TypeNode>,
}

impl TypeNode {
    pub fn new(name: &str, kind: NodeKind, type_of: TypeOf, size: u64) -> TypeNode {
        TypeNode {
            name: name.into(),
            kind,
            type_of,
            offset: 0,
            size,
            length: 1,
            is_func: false,
            tags: vec![],
            doc: None,
            fields: vec![],
        }
    }

    pub fn bits(name: &str, size: u64) -> TypeNode {
        TypeNode::new(name, NodeKind::Bits, TypeOf::Bits, size)
    }

    pub fn is_bitfield(&self) -> bool {
        self.kind == NodeKind::Bitfield
    }

    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }

    /// Where this node ends in its parent.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }

    /// The size of one element of an array.
    pub fn elem_size(&self) -> u64 {
        if self.length == 0 {
            0
        } else {
            self.size / self.length
        }
    }

    /// The name of the declared type this node refers to.
    pub fn named(&self) -> Option<&str> {
        match &self.type_of {
            TypeOf::Named(n) => Some(n),
            _ => None,
        }
    }
}

/// The number of bits used to store a register of `size` bits: the narrowest
/// of 8, 16, 32 and 64 bits, or a whole number of 32 bit words.
pub fn storage_bits(size: u64) -> u64 {
    match size {
        0 => 0,
        1..=8 => 8,
        9..=16 => 16,
        17..=32 => 32,
        33..=64 => 64,
        _ => (size + 31) / 32 * 32,
    }
}

/// Every declared type, sized.
#[derive(Debug, Default)]
pub struct TypeTable {
    nodes: HashMap<String, TypeNode>,

    /// Type names in the order they were first visited.
    order: Vec<String>,
    spans: HashMap<String, Span>,

    /// The name of the default element type, if one was declared.
    pub default: Option<String>,

    /// The width of a register, in bits.
    pub register_size: u64,

    /// The initial unit of offset directives inside of structs, in bits.
    pub address_size: u64,
}

#[derive(Serialize)]
struct TableDump<'a> {
    register_size: u64,
    address_size: u64,
    default: Option<&'a str>,
    types: Vec<&'a TypeNode>,
}

impl TypeTable {
    pub fn get(&self, name: &str) -> Option<&TypeNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Stores a node.  The first insert of a name fixes its position in the
    /// emission order.
    pub fn insert(&mut self, node: TypeNode, span: Span) {
        if !self.nodes.contains_key(&node.name) {
            self.order.push(node.name.clone());
            self.spans.insert(node.name.clone(), span);
        }
        self.nodes.insert(node.name.clone(), node);
    }

    /// Iterates over the types in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeNode> {
        self.order.iter().filter_map(move |n| self.nodes.get(n))
    }

    pub fn span(&self, name: &str) -> Option<Span> {
        self.spans.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_default(&self, name: &str) -> bool {
        self.default.as_deref() == Some(name)
    }

    /// The number of bits a named bitfield occupies when it is used as a
    /// field of a struct: a `func` register fills a whole register when there
    /// is a default element type, other bitfields use their narrowest storage.
    pub fn register_bits(&self, node: &TypeNode) -> u64 {
        if node.is_func && self.default.is_some() {
            self.register_size
        } else {
            storage_bits(node.size)
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let dump = TableDump {
            register_size: self.register_size,
            address_size: self.address_size,
            default: self.default.as_deref(),
            types: self.iter().collect(),
        };
        serde_json::to_value(dump).unwrap_or_default()
    }
}
