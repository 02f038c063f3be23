//! Object Tree Text
//!
//! Parent/child structure is stored as a small bracketed language:
//!
//! ```text
//! 0 { 1 2 { 3 } } 4\0
//! ```
//!
//! - a decimal number `N` attaches object `N` (0-based) to the current node
//! - `{` saves the current node and makes the last attached object current
//! - `}` restores the saved node
//! - whitespace separates numbers
//! - a `0` byte ends the tree
//!
//! The current node starts at the root. Nesting depth is bounded and walked
//! with a [`BoundedStack`], never by recursion.

use crate::core::BoundedStack;
use crate::errors::{Result, ThirtyError};

use super::{ObjectHandle, Scene};

/// Terminates the tree text.
pub const SENTINEL: u8 = 0;

fn syntax(offset: usize, reason: impl Into<String>) -> ThirtyError {
    ThirtyError::TreeSyntax {
        offset,
        reason: reason.into(),
    }
}

/// Parses tree text from the start of `text` and reports every
/// `(parent, child)` edge to `attach`, in text order.
///
/// `object_count` bounds the valid indices, and each index may appear at
/// most once. Returns the number of bytes consumed, sentinel included.
pub fn parse<F>(text: &[u8], object_count: usize, max_depth: usize, mut attach: F) -> Result<usize>
where
    F: FnMut(ObjectHandle, ObjectHandle),
{
    let mut stack: BoundedStack<ObjectHandle> = BoundedStack::new(max_depth);
    // each object has exactly one parent, which also rules out cycles
    let mut listed = vec![false; object_count];
    let mut current = ObjectHandle::ROOT;
    let mut last = ObjectHandle::ROOT;
    let mut pos = 0;

    loop {
        let Some(&c) = text.get(pos) else {
            return Err(ThirtyError::UnexpectedEof {
                context: "object tree",
                offset: pos,
            });
        };
        match c {
            b'0'..=b'9' => {
                let start = pos;
                let mut index: usize = 0;
                while let Some(d @ b'0'..=b'9') = text.get(pos).copied() {
                    index = index
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(usize::from(d - b'0')))
                        .ok_or_else(|| syntax(start, "object index overflows"))?;
                    pos += 1;
                }
                if index >= object_count {
                    return Err(syntax(
                        start,
                        format!("object index {index} out of range ({object_count} objects)"),
                    ));
                }
                if std::mem::replace(&mut listed[index], true) {
                    return Err(syntax(start, format!("object index {index} listed twice")));
                }
                let child = ObjectHandle::from_array_index(index);
                attach(current, child);
                last = child;
                continue;
            }
            b'{' => {
                if stack.push(current).is_err() {
                    return Err(ThirtyError::TreeTooDeep(max_depth));
                }
                current = last;
            }
            b'}' => {
                current = stack.pop().ok_or_else(|| syntax(pos, "unbalanced '}'"))?;
            }
            SENTINEL => {
                if !stack.is_empty() {
                    return Err(syntax(pos, format!("{} unclosed '{{'", stack.len())));
                }
                return Ok(pos + 1);
            }
            c if c.is_ascii_whitespace() => {}
            c => {
                return Err(syntax(pos, format!("unexpected character {:?}", char::from(c))));
            }
        }
        pos += 1;
    }
}

struct Frame {
    children: Vec<ObjectHandle>,
    next: usize,
}

/// Encodes the tree below the root, sentinel included.
///
/// `file_index` maps an object to its 0-based position in the encoded
/// object list; objects it maps to `None` are skipped with their subtree.
pub fn encode<F>(scene: &Scene, max_depth: usize, file_index: F) -> Result<Vec<u8>>
where
    F: Fn(ObjectHandle) -> Option<usize>,
{
    let children_of = |h: ObjectHandle| -> Vec<ObjectHandle> {
        scene
            .object(h)
            .map(|o| o.children().filter(|c| file_index(*c).is_some()).collect())
            .unwrap_or_default()
    };

    let mut out = Vec::new();
    let mut stack: BoundedStack<Frame> = BoundedStack::new(max_depth + 1);
    let _ = stack.push(Frame {
        children: children_of(ObjectHandle::ROOT),
        next: 0,
    });

    while let Some(frame) = stack.pop() {
        let Some(&child) = frame.children.get(frame.next) else {
            if !stack.is_empty() {
                out.push(b'}');
            }
            continue;
        };
        let Frame { children, next } = frame;
        if next > 0 {
            out.push(b' ');
        }
        if let Some(index) = file_index(child) {
            out.extend_from_slice(index.to_string().as_bytes());
        }
        let _ = stack.push(Frame {
            children,
            next: next + 1,
        });

        let grandchildren = children_of(child);
        if !grandchildren.is_empty() {
            out.push(b'{');
            if stack
                .push(Frame {
                    children: grandchildren,
                    next: 0,
                })
                .is_err()
            {
                return Err(ThirtyError::TreeTooDeep(max_depth));
            }
        }
    }
    out.push(SENTINEL);
    Ok(out)
}
