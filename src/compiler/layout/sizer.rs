use log::{debug, trace};

use crate::compiler::{
    ast::{uint_width, ArrayLen, Expr, FieldDecl, File, Ident, Keyword, ObjKind, Spec, TypeExpr, TypeSpec},
    eval::{Constants, Evaluator},
    CompilerError, ErrorList, Halt, HwError, SourceMap, Span, StringId, StringTable,
};

use super::{LayoutError, NodeKind, TypeNode, TypeOf, TypeTable};

/// The register size used when the file declares no default element type.
pub const DEFAULT_REGISTER_SIZE: u64 = 32;

type SizeResult<T> = Result<T, Halt>;

/// Sizes every type declared in `file`.
///
/// Errors are recorded into `errors` and sizing continues with whatever
/// could be computed, so that one run reports as many problems as possible.
pub fn size_types(
    file: &File,
    consts: &Constants,
    sm: &SourceMap,
    st: &StringTable,
    errors: &mut ErrorList,
) -> Result<TypeTable, Halt> {
    let mut sizer = Sizer {
        file,
        sm,
        st,
        errors,
        eval: Evaluator::with_constants(file, st, consts),
        table: TypeTable::default(),
    };
    sizer.table.register_size = DEFAULT_REGISTER_SIZE;
    sizer.table.address_size = consts.address_size(st);

    sizer.default_type()?;
    for (spec, keyword) in file.type_specs() {
        sizer.named_type(spec, keyword)?;
    }

    debug!(
        "Sized {} types, register size {}, address size {}",
        sizer.table.len(),
        sizer.table.register_size,
        sizer.table.address_size
    );
    Ok(sizer.table)
}

struct Sizer<'a> {
    file: &'a File,
    sm: &'a SourceMap,
    st: &'a StringTable,
    errors: &'a mut ErrorList,
    eval: Evaluator<'a>,
    table: TypeTable,
}

impl<'a> Sizer<'a> {
    fn report<E: Into<HwError>>(&mut self, err: CompilerError<E>) -> SizeResult<()> {
        self.errors.record(self.sm, err)
    }

    fn error(&mut self, span: Span, err: LayoutError) -> SizeResult<()> {
        self.report(CompilerError::new(span, err))
    }

    fn unsupported<T>(&mut self, span: Span, what: &'static str) -> SizeResult<Option<T>> {
        self.error(span, LayoutError::Unsupported(what))?;
        Ok(None)
    }

    /// Evaluates a constant expression, recording the error if it fails.
    fn eval(&mut self, expr: &Expr) -> SizeResult<Option<u64>> {
        match self.eval.eval(expr) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                self.report(e)?;
                Ok(None)
            }
        }
    }

    fn name(&self, sid: StringId) -> String {
        self.st.get(sid).unwrap_or_default()
    }

    /// Sizes the `default` declaration, which fixes the register size and the
    /// address size for every other type.
    fn default_type(&mut self) -> SizeResult<()> {
        let file = self.file;
        let defaults: Vec<&TypeSpec> = file
            .type_specs()
            .filter_map(|(spec, _)| if spec.is_default { Some(spec) } else { None })
            .collect();

        for (idx, spec) in defaults.into_iter().enumerate() {
            if idx > 0 {
                self.error(spec.name.span, LayoutError::DuplicateDefault)?;
                continue;
            }

            let size = match &spec.ty {
                TypeExpr::BitArray { len, .. } => self.eval(len)?,
                TypeExpr::Name(id) => self.opaque_width(id)?,
                ty => self.unsupported(ty.span(), "default type which is not a scalar")?,
            };
            let size = match size {
                Some(s) => s,
                None => continue,
            };
            if !matches!(size, 8 | 16 | 32 | 64) {
                self.error(spec.ty.span(), LayoutError::RegisterWidth(size))?;
                continue;
            }

            let name = self.name(spec.name.name);
            debug!("Default element type {} of {} bits", name, size);
            self.table.register_size = size;
            self.table.address_size = size;
            self.table.default = Some(name.clone());
            let mut node = TypeNode::new(&name, NodeKind::Bits, TypeOf::Opaque(size), size);
            node.doc = self.doc(spec.doc);
            self.table.insert(node, spec.name.span);
        }

        Ok(())
    }

    /// The width of a `uint<N>` type used where only scalars are allowed.
    fn opaque_width(&mut self, id: &Ident) -> SizeResult<Option<u64>> {
        let name = self.name(id.name);
        match self.file.scope.lookup(id.name) {
            Some(obj) if obj.kind == ObjKind::Const => {
                self.error(id.span, LayoutError::NotAType(id.name))?;
                Ok(None)
            }
            Some(_) => {
                self.error(id.span, LayoutError::UnknownType(id.name))?;
                Ok(None)
            }
            None => match uint_width(&name) {
                Some(w) => Ok(Some(w)),
                None => {
                    self.error(id.span, LayoutError::Undefined(id.name))?;
                    Ok(None)
                }
            },
        }
    }

    fn doc(&self, doc: Option<StringId>) -> Option<String> {
        doc.and_then(|d| self.st.get(d).ok())
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
    }

    /// Finds the type spec which declared `name`.
    fn spec_of(&self, name: StringId) -> Option<(&'a TypeSpec, Keyword)> {
        let file = self.file;
        let obj = file.scope.lookup(name).filter(|o| o.kind == ObjKind::Type)?;
        let decl = file.decls.get(obj.decl.decl)?;
        match decl.specs.get(obj.decl.spec)? {
            Spec::Type(ts) => Some((ts, decl.keyword)),
            Spec::Const(_) => None,
        }
    }

    /// Sizes a declared type, unless it was already sized.
    fn named_type(&mut self, spec: &'a TypeSpec, keyword: Keyword) -> SizeResult<()> {
        let name = self.name(spec.name.name);
        let blank = name == "_";
        if spec.is_default || (!blank && self.table.contains(&name)) {
            return Ok(());
        }

        let is_func = keyword == Keyword::Func;
        if !blank {
            // Stored before the fields are sized so that a type which refers
            // back to itself finds this node, and is then reported as a cycle.
            let mut placeholder = TypeNode::new(&name, NodeKind::Bits, TypeOf::Declared, 0);
            placeholder.is_func = is_func;
            self.table.insert(placeholder, spec.name.span);
        }

        let mut node = self.declared(&name, &spec.ty)?;
        node.is_func = is_func;
        node.doc = self.doc(spec.doc);
        trace!("{}: {} bits {:?}", name, node.size, node.kind);

        if is_func && node.is_bitfield() && node.size > self.table.register_size {
            self.error(
                spec.ty.span(),
                LayoutError::TooLarge {
                    size: node.size,
                    limit: self.table.register_size,
                },
            )?;
        }

        if !blank {
            self.table.insert(node, spec.name.span);
        }
        Ok(())
    }

    /// Sizes the type expression of a declaration.
    fn declared(&mut self, name: &str, ty: &'a TypeExpr) -> SizeResult<TypeNode> {
        let mut node = TypeNode::new(name, NodeKind::Bits, TypeOf::Declared, 0);

        match ty {
            TypeExpr::Name(id) => {
                if let Some(w) = self.opaque_width(id)? {
                    node.type_of = TypeOf::Opaque(w);
                    node.size = w;
                }
            }
            TypeExpr::Struct {
                bitfield, fields, ..
            } => {
                let (fields, size) = self.fields(name, fields, *bitfield)?;
                node.kind = if *bitfield {
                    NodeKind::Bitfield
                } else {
                    NodeKind::Struct
                };
                node.size = size;
                node.fields = fields;
                if !*bitfield {
                    self.check_bytes(ty.span(), size)?;
                }
            }
            TypeExpr::Array { len, elem, span } => {
                let count = match len {
                    None => None,
                    Some(ArrayLen::Count(e)) | Some(ArrayLen::BitPosition(e)) => match self.eval(e)? {
                        Some(n) => Some(n),
                        None => return Ok(node),
                    },
                    Some(ArrayLen::BitRange { hi, .. }) => {
                        self.error(hi.span(), LayoutError::RangeOutsideBitfield)?;
                        return Ok(node);
                    }
                };
                self.declared_array(&mut node, count, elem.as_deref(), *span)?;
            }
            TypeExpr::BitArray { span, .. } => {
                self.unsupported::<()>(*span, "bit array outside of the default declaration")?;
            }
            TypeExpr::Bad(span) => {
                self.unsupported::<()>(*span, "malformed type")?;
            }
        }

        Ok(node)
    }

    fn declared_array(
        &mut self,
        node: &mut TypeNode,
        count: Option<u64>,
        elem: Option<&'a TypeExpr>,
        span: Span,
    ) -> SizeResult<()> {
        let name = node.name.clone();
        match elem {
            // `[N]` is an opaque N bit type.
            None => match count {
                Some(n) => {
                    node.type_of = TypeOf::Bits;
                    node.size = n;
                }
                None => {
                    self.unsupported::<()>(span, "array type without a length or element")?;
                }
            },

            // `[N]{...}` is a register of N bits.
            Some(TypeExpr::Struct {
                bitfield: true,
                fields,
                span: elem_span,
            }) => {
                let (fields, size) = self.fields(&name, fields, true)?;
                node.kind = NodeKind::Bitfield;
                node.fields = fields;
                node.size = match count {
                    Some(width) => {
                        if size > width {
                            self.error(*elem_span, LayoutError::TooWide { size, width })?;
                        }
                        width
                    }
                    None => size,
                };
                if node.size > self.table.register_size {
                    self.error(
                        *elem_span,
                        LayoutError::TooLarge {
                            size: node.size,
                            limit: self.table.register_size,
                        },
                    )?;
                }
            }

            // `[N]struct{...}` repeats the struct N times.
            Some(TypeExpr::Struct {
                bitfield: false,
                fields,
                span: elem_span,
            }) => {
                let (fields, size) = self.fields(&name, fields, false)?;
                self.check_bytes(*elem_span, size)?;
                node.kind = NodeKind::Struct;
                node.fields = fields;
                node.length = count.unwrap_or(1);
                node.size = size.saturating_mul(node.length);
            }

            Some(TypeExpr::Name(id)) => {
                if let Some(elem) = self.named_field(&name, id, false)? {
                    node.kind = NodeKind::Array;
                    node.type_of = elem.type_of;
                    node.length = count.unwrap_or(1);
                    node.size = elem.size.saturating_mul(node.length);
                }
            }

            Some(other) => {
                self.unsupported::<()>(other.span(), "array of arrays")?;
            }
        }
        Ok(())
    }

    /// Lays out a list of fields.  Returns the sized fields and the total size.
    fn fields(
        &mut self,
        parent: &str,
        decls: &'a [FieldDecl],
        bitfield: bool,
    ) -> SizeResult<(Vec<TypeNode>, u64)> {
        let mut nodes: Vec<TypeNode> = vec![];
        let mut cursor = 0u64;
        let mut size = 0u64;

        for decl in decls {
            match decl {
                FieldDecl::Offset { expr, unit, .. } => {
                    let count = match self.eval(expr)? {
                        Some(c) => c,
                        None => continue,
                    };
                    let unit_bits = match unit {
                        Some(u) => match self.unit_size(u)? {
                            Some(bits) => bits,
                            None => continue,
                        },
                        None if bitfield => 1,
                        None => self.table.address_size,
                    };
                    cursor = count.saturating_mul(unit_bits);
                    size = size.max(cursor);
                    trace!("{}: cursor moved to bit {}", parent, cursor);
                }

                FieldDecl::Field {
                    doc,
                    names,
                    ty,
                    tags,
                    span,
                } => {
                    let tags: Vec<String> = tags.iter().map(|t| self.name(t.name)).collect();
                    let doc = self.doc(*doc);

                    for id in names {
                        let name = self.name(id.name);
                        let (mut node, at) =
                            match self.field(parent, &name, ty.as_ref(), bitfield, *span)? {
                                Some(placed) => placed,
                                None => continue,
                            };

                        node.offset = at.unwrap_or(cursor);
                        node.tags = tags.clone();
                        node.doc = doc.clone();
                        let end = node.end();

                        if !bitfield {
                            let prev_end = nodes.iter().map(|n| n.end()).max().unwrap_or(0);
                            if node.offset < prev_end {
                                self.error(id.span, LayoutError::Overlap(name.clone()))?;
                            } else if node.offset % 8 != 0 || node.size % 8 != 0 {
                                self.error(
                                    id.span,
                                    LayoutError::Misaligned {
                                        field: name.clone(),
                                        offset: node.offset,
                                    },
                                )?;
                            }
                        }

                        // Explicitly placed bits never move the cursor back.
                        cursor = if at.is_some() { cursor.max(end) } else { end };
                        size = size.max(end);
                        nodes.push(node);
                    }
                }
            }
        }

        Ok((nodes, size))
    }

    /// Sizes one field.  Returns the node and, for bits placed at an explicit
    /// position, that position.
    fn field(
        &mut self,
        parent: &str,
        name: &str,
        ty: Option<&'a TypeExpr>,
        bitfield: bool,
        span: Span,
    ) -> SizeResult<Option<(TypeNode, Option<u64>)>> {
        let ty = match ty {
            None if bitfield => return Ok(Some((TypeNode::bits(name, 1), None))),
            None => return Ok(Some((self.default_element(name), None))),
            Some(ty) => ty,
        };

        match ty {
            TypeExpr::Name(id) => Ok(self.named_field(name, id, bitfield)?.map(|n| (n, None))),

            TypeExpr::Array { len, elem, span } => {
                self.array_field(name, len.as_ref(), elem.as_deref(), bitfield, *span)
            }

            TypeExpr::Struct {
                bitfield: inner,
                fields,
                span,
            } => {
                if bitfield && !*inner {
                    return self.unsupported(*span, "struct inside of a bitfield");
                }

                let type_name = inline_name(parent, name);
                let (fields, size) = self.fields(&type_name, fields, *inner)?;
                let mut node = TypeNode::new(name, NodeKind::Struct, TypeOf::Inline(type_name), size);
                node.fields = fields;

                if *inner {
                    // A nested bitfield always fills a whole register.
                    let limit = self.table.register_size;
                    if size > limit {
                        self.error(*span, LayoutError::TooLarge { size, limit })?;
                    }
                    node.kind = NodeKind::Bitfield;
                    node.size = limit;
                } else {
                    self.check_bytes(*span, size)?;
                }
                Ok(Some((node, None)))
            }

            TypeExpr::BitArray { span, .. } => self.unsupported(*span, "bit array field"),
            TypeExpr::Bad(_) => self.unsupported(span, "malformed field type"),
        }
    }

    fn array_field(
        &mut self,
        name: &str,
        len: Option<&'a ArrayLen>,
        elem: Option<&'a TypeExpr>,
        bitfield: bool,
        span: Span,
    ) -> SizeResult<Option<(TypeNode, Option<u64>)>> {
        let count = match len {
            Some(ArrayLen::BitRange { hi, lo }) => {
                if !bitfield {
                    self.error(hi.span(), LayoutError::RangeOutsideBitfield)?;
                    return Ok(None);
                }
                let (hi_v, lo_v) = match (self.eval(hi)?, self.eval(lo)?) {
                    (Some(h), Some(l)) => (h, l),
                    _ => return Ok(None),
                };
                if hi_v < lo_v {
                    self.error(hi.span(), LayoutError::RangeReversed { hi: hi_v, lo: lo_v })?;
                    return Ok(None);
                }
                return Ok(Some((TypeNode::bits(name, hi_v - lo_v + 1), Some(lo_v))));
            }

            // Inside of a bitfield `[n]` is the single bit at position n.
            Some(ArrayLen::BitPosition(e)) => {
                return Ok(self.eval(e)?.map(|pos| (TypeNode::bits(name, 1), Some(pos))));
            }

            Some(ArrayLen::Count(e)) => match self.eval(e)? {
                Some(n) => n,
                None => return Ok(None),
            },
            None => 1,
        };

        let elem = match elem {
            None => self.default_element(name),
            Some(TypeExpr::Name(id)) => match self.named_field(name, id, bitfield)? {
                Some(n) => n,
                None => return Ok(None),
            },
            Some(other) => return self.unsupported(other.span(), "array of anonymous types"),
        };
        if elem.kind == NodeKind::Array {
            return self.unsupported(span, "array of arrays");
        }

        let mut node = TypeNode::new(name, NodeKind::Array, elem.type_of, 0);
        node.length = count;
        node.size = elem.size.saturating_mul(count);
        Ok(Some((node, None)))
    }

    /// A field of the default element type.
    fn default_element(&self, name: &str) -> TypeNode {
        let size = self.table.register_size;
        let type_of = match &self.table.default {
            Some(d) => TypeOf::Named(d.clone()),
            None => TypeOf::Opaque(size),
        };
        TypeNode::new(name, NodeKind::Bits, type_of, size)
    }

    /// A field whose type is written as a name: a declared type or `uint<N>`.
    fn named_field(&mut self, name: &str, id: &Ident, bitfield: bool) -> SizeResult<Option<TypeNode>> {
        let type_name = self.name(id.name);

        match self.file.scope.lookup(id.name).map(|o| o.kind) {
            Some(ObjKind::Const) => {
                self.error(id.span, LayoutError::NotAType(id.name))?;
                Ok(None)
            }
            Some(ObjKind::Type) => {
                let (spec, keyword) = match self.spec_of(id.name) {
                    Some(found) => found,
                    None => return Ok(None),
                };
                if bitfield && is_struct(&spec.ty) {
                    return self.unsupported(id.span, "struct inside of a bitfield");
                }
                self.named_type(spec, keyword)?;

                let target = match self.table.get(&type_name) {
                    Some(t) => t,
                    None => return Ok(None),
                };
                let kind = target.kind;
                let size = if !bitfield && target.is_bitfield() {
                    self.table.register_bits(target)
                } else {
                    target.size
                };
                if bitfield && kind == NodeKind::Struct {
                    return self.unsupported(id.span, "struct inside of a bitfield");
                }
                Ok(Some(TypeNode::new(name, kind, TypeOf::Named(type_name), size)))
            }
            None => match uint_width(&type_name) {
                Some(w) => Ok(Some(TypeNode::new(name, NodeKind::Bits, TypeOf::Opaque(w), w))),
                None => {
                    self.error(id.span, LayoutError::Undefined(id.name))?;
                    Ok(None)
                }
            },
        }
    }

    /// The width of the unit named by an offset directive.
    fn unit_size(&mut self, unit: &Ident) -> SizeResult<Option<u64>> {
        Ok(self.named_field("", unit, false)?.map(|n| n.size))
    }

    fn check_bytes(&mut self, span: Span, size: u64) -> SizeResult<()> {
        if size % 8 != 0 {
            self.error(span, LayoutError::SizeNotBytes(size))?;
        }
        Ok(())
    }
}

/// Whether a type expression declares a struct, or an array of one.
fn is_struct(ty: &TypeExpr) -> bool {
    match ty {
        TypeExpr::Struct { bitfield, .. } => !bitfield,
        TypeExpr::Array { elem: Some(elem), .. } => is_struct(elem),
        _ => false,
    }
}

/// The name given to an anonymous type declared inline as a field.
pub fn inline_name(parent: &str, field: &str) -> String {
    if field == "_" {
        field.into()
    } else {
        format!("{}_{}", parent, field)
    }
}
