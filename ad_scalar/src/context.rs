//! Scratch space linking an operation's forward pass to its backward pass.

use smallvec::SmallVec;

use crate::error::{AutodiffError, Result};

/// Values saved by one forward call for the matching backward call.
///
/// A fresh `Context` is created for every operation invocation. Forward gets it
/// mutably; once the result node is built the context is moved into that node's
/// [`History`](crate::History) and only handed out by shared reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    no_grad: bool,
    saved_values: SmallVec<[f64; 2]>,
}

impl Context {
    /// Create an empty context. With `no_grad` set, nothing is ever saved.
    pub fn new(no_grad: bool) -> Self {
        Context {
            no_grad,
            saved_values: SmallVec::new(),
        }
    }

    /// Whether saving is suppressed.
    pub fn no_grad(&self) -> bool {
        self.no_grad
    }

    /// Store `values` for the backward pass.
    ///
    /// A second call replaces the first. Does nothing under `no_grad`.
    pub fn save_for_backward(&mut self, values: &[f64]) {
        if self.no_grad {
            return;
        }
        self.saved_values = SmallVec::from_slice(values);
    }

    /// The saved values, in the order they were passed to [`save_for_backward`](Self::save_for_backward).
    pub fn saved_values(&self) -> &[f64] {
        &self.saved_values
    }

    /// Destructure the saved values into a fixed-size array.
    ///
    /// Fails when forward saved a different number of values, including the
    /// case where `no_grad` suppressed saving altogether.
    pub fn saved<const N: usize>(&self) -> Result<[f64; N]> {
        <[f64; N]>::try_from(self.saved_values.as_slice()).map_err(|_| {
            AutodiffError::MissingSavedValues {
                expected: N,
                actual: self.saved_values.len(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_read_back() {
        let mut ctx = Context::new(false);
        ctx.save_for_backward(&[1.0, 2.0]);
        assert_eq!(ctx.saved_values(), &[1.0, 2.0]);
        assert_eq!(ctx.saved::<2>(), Ok([1.0, 2.0]));
    }

    #[test]
    fn test_second_save_overwrites() {
        let mut ctx = Context::new(false);
        ctx.save_for_backward(&[1.0, 2.0]);
        ctx.save_for_backward(&[3.0]);
        assert_eq!(ctx.saved_values(), &[3.0]);
    }

    #[test]
    fn test_no_grad_skips_saving() {
        let mut ctx = Context::new(true);
        ctx.save_for_backward(&[1.0]);
        assert!(ctx.saved_values().is_empty());
        assert_eq!(
            ctx.saved::<1>(),
            Err(AutodiffError::MissingSavedValues {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn test_saved_wrong_count() {
        let mut ctx = Context::default();
        ctx.save_for_backward(&[1.0, 2.0, 3.0]);
        assert!(ctx.saved::<2>().is_err());
    }
}
