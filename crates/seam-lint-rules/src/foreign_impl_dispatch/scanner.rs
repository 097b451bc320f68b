//! Selects dynamic-dispatch calls of indexed methods.

use seam_lint_core::program::{Function, Op, Position, ValueId};

use super::locator::MethodSetIndex;

/// A dispatch call whose method name is in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite<'f> {
    /// The call instruction.
    pub call: ValueId,
    /// Position of the call, if recorded.
    pub pos: Option<&'f Position>,
    /// Invoked method name.
    pub method: &'f str,
    /// Interface-typed receiver.
    pub receiver: ValueId,
}

/// Returns the matching call sites of `function` in instruction order.
#[must_use]
pub fn scan<'f>(function: &'f Function, index: &MethodSetIndex) -> Vec<CallSite<'f>> {
    function
        .instructions()
        .filter_map(|(id, value)| {
            let Op::Call(call) = &value.op else {
                return None;
            };
            let (receiver, method) = call.invoked()?;
            index.contains(method).then_some(CallSite {
                call: id,
                pos: value.pos.as_ref(),
                method,
                receiver,
            })
        })
        .collect()
}
