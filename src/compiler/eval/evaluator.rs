use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace};

use crate::compiler::{
    ast::{BinaryOp, ConstSpec, Expr, File, Ident, ObjKind, Spec},
    CompilerError, ErrorList, Halt, SourceMap, StringId, StringTable,
};

use super::{EvalError, EvalResult};

/// The unit of an offset directive when no `address` constant is declared.
const DEFAULT_ADDRESS_SIZE: u64 = 8;

/// The value of every constant declared in a file.
#[derive(Clone, Debug, Default)]
pub struct Constants {
    values: HashMap<StringId, u64>,
}

impl Constants {
    pub fn get(&self, name: StringId) -> Option<u64> {
        self.values.get(&name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The initial unit of offset directives, in bits.
    pub fn address_size(&self, st: &StringTable) -> u64 {
        st.find("address")
            .and_then(|sid| self.get(sid))
            .unwrap_or(DEFAULT_ADDRESS_SIZE)
    }

    /// The constants keyed by name, in name order.
    pub fn named(&self, st: &StringTable) -> BTreeMap<String, u64> {
        self.values
            .iter()
            .filter_map(|(sid, v)| st.get(*sid).ok().map(|n| (n, *v)))
            .collect()
    }
}


/// Evaluates every constant of `file`.  Errors are recorded into `errors`;
/// evaluation carries on with the next constant after an error.
pub fn evaluate_constants(
    file: &File,
    sm: &SourceMap,
    st: &StringTable,
    errors: &mut ErrorList,
) -> Result<Constants, Halt> {
    let mut evaluator = Evaluator::new(file, st);
    let mut reported: Vec<CompilerError<EvalError>> = vec![];

    for spec in file.const_specs() {
        if let Err(e) = check_value_count(spec) {
            errors.record(sm, e)?;
        }

        for (name, value) in spec.names.iter().zip(&spec.values) {
            let result = if st.get(name.name).map_or(true, |n| n == "_") {
                evaluator.eval(value)
            } else {
                evaluator.constant(name)
            };

            match result {
                Ok(v) => trace!("const {} = {}", name.name, v),
                Err(e) => {
                    // A constant which depends on a failed constant fails
                    // with the same error.
                    if !reported.contains(&e) {
                        reported.push(e.clone());
                        errors.record(sm, e)?;
                    }
                }
            }
        }
    }

    debug!("Evaluated {} constants", evaluator.values.len());
    Ok(Constants {
        values: evaluator.values,
    })
}

fn check_value_count(spec: &ConstSpec) -> EvalResult<()> {
    let (names, values) = (spec.names.len(), spec.values.len());
    if values < names {
        let missing = &spec.names[values];
        err!(missing.span, EvalError::MissingValue(missing.name))
    } else if values > names {
        err!(spec.values[names].span(), EvalError::ExtraValue)
    } else {
        Ok(())
    }
}

/// Computes the value of constant expressions.
///
/// Named constants are evaluated on demand from their declaration and
/// cached, so constants may be declared in any order.
pub struct Evaluator<'a> {
    file: &'a File,
    st: &'a StringTable,
    values: HashMap<StringId, u64>,
    failed: HashMap<StringId, CompilerError<EvalError>>,

    /// Constants currently being evaluated.
    visiting: HashSet<StringId>,
}

impl<'a> Evaluator<'a> {
    pub fn new(file: &'a File, st: &'a StringTable) -> Evaluator<'a> {
        Evaluator {
            file,
            st,
            values: HashMap::new(),
            failed: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// An evaluator which starts from constants that were already evaluated.
    pub fn with_constants(file: &'a File, st: &'a StringTable, consts: &Constants) -> Evaluator<'a> {
        let mut ev = Evaluator::new(file, st);
        ev.values = consts.values.clone();
        ev
    }

    pub fn eval(&mut self, expr: &Expr) -> EvalResult<u64> {
        match expr {
            Expr::Int(lit, span) => {
                let text = self.st.get(*lit).unwrap_or_default();
                match parse_literal(&text) {
                    Some(v) => Ok(v),
                    None => err!(*span, EvalError::BadLiteral(*lit)),
                }
            }
            Expr::Ident(id) => self.constant(id),
            Expr::Paren(inner, _) => self.eval(inner),
            Expr::Binary(l, op, r, span) => {
                // The right operand is not evaluated if the left one fails.
                let x = self.eval(l)?;
                let y = self.eval(r)?;
                binary(*op, x, y).ok_or_else(|| CompilerError::new(*span, EvalError::DivisionByZero))
            }
            Expr::Unary(_, _, span) => err!(*span, EvalError::Unsupported("unary operator")),
            Expr::Bad(span) => err!(*span, EvalError::Unsupported("malformed expression")),
        }
    }

    /// The value of the constant named by `id`.
    pub fn constant(&mut self, id: &Ident) -> EvalResult<u64> {
        if let Some(v) = self.values.get(&id.name) {
            return Ok(*v);
        }
        if let Some(e) = self.failed.get(&id.name) {
            return Err(e.clone());
        }

        let obj = match self.file.scope.lookup(id.name) {
            Some(obj) => *obj,
            None => return err!(id.span, EvalError::Undefined(id.name)),
        };
        if obj.kind != ObjKind::Const {
            return err!(id.span, EvalError::NotAConstant(id.name));
        }
        if !self.visiting.insert(id.name) {
            return err!(id.span, EvalError::Cycle(id.name));
        }

        let spec = match self
            .file
            .decls
            .get(obj.decl.decl)
            .and_then(|d| d.specs.get(obj.decl.spec))
        {
            Some(Spec::Const(spec)) => spec,
            _ => {
                self.visiting.remove(&id.name);
                return err!(id.span, EvalError::NotAConstant(id.name));
            }
        };

        let result = match spec.values.get(obj.decl.index) {
            Some(expr) => self.eval(expr),
            None => err!(id.span, EvalError::MissingValue(id.name)),
        };
        self.visiting.remove(&id.name);

        match &result {
            Ok(v) => {
                self.values.insert(id.name, *v);
            }
            Err(e) => {
                self.failed.insert(id.name, e.clone());
            }
        }
        result
    }
}

/// Applies a binary operator with unsigned 64 bit wrapping arithmetic.
/// Returns `None` on division by zero.
fn binary(op: BinaryOp, x: u64, y: u64) -> Option<u64> {
    Some(match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Sub => x.wrapping_sub(y),
        BinaryOp::Mul => x.wrapping_mul(y),
        BinaryOp::Div => x.checked_div(y)?,
        BinaryOp::Rem => x.checked_rem(y)?,
        BinaryOp::And => x & y,
        BinaryOp::AndNot => x & !y,
        BinaryOp::Or => x | y,
        BinaryOp::Xor => x ^ y,
        BinaryOp::Shl => {
            if y >= 64 {
                0
            } else {
                x << y
            }
        }
        BinaryOp::Shr => {
            if y >= 64 {
                0
            } else {
                x >> y
            }
        }
    })
}

/// Parses an integer literal: decimal, `0x` hex, `0o` or leading `0` octal,
/// `0b` binary, with optional `_` separators.
pub fn parse_literal(text: &str) -> Option<u64> {
    let s = text.replace('_', "");
    let lower = s.to_ascii_lowercase();

    let (digits, radix) = if let Some(d) = lower.strip_prefix("0x") {
        (d, 16)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (d, 8)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (d, 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}
