use std::collections::HashSet;

use log::debug;

use crate::compiler::{CompilerError, ErrorList, Halt, SourceMap, Span};

use super::{LayoutError, TypeNode, TypeOf, TypeTable};

/// Reports every named type which contains itself, directly or through other
/// named types.  Each type is reported at most once, at its declaration.
pub fn check_cycles(table: &TypeTable, sm: &SourceMap, errors: &mut ErrorList) -> Result<(), Halt> {
    for node in table.iter() {
        let mut visited = HashSet::new();
        if reaches(table, &node.name, node, &mut visited) {
            debug!("Type {} refers to itself", node.name);
            let span = table.span(&node.name).unwrap_or_else(Span::zero);
            errors.record(sm, CompilerError::new(span, LayoutError::Cycle(node.name.clone())))?;
        }
    }
    Ok(())
}

/// True if `node`, or anything it is made of, refers to the type `target`.
fn reaches<'t>(
    table: &'t TypeTable,
    target: &str,
    node: &'t TypeNode,
    visited: &mut HashSet<&'t str>,
) -> bool {
    if let TypeOf::Named(name) = &node.type_of {
        if name == target {
            return true;
        }
        if visited.insert(name.as_str()) {
            if let Some(named) = table.get(name) {
                if reaches(table, target, named, visited) {
                    return true;
                }
            }
        }
    }

    node.fields
        .iter()
        .any(|f| reaches(table, target, f, visited))
}
