//! The primitive differentiable operations.
//!
//! Each operation saves what its backward pass needs in the [`Context`] during
//! forward, and reads only that (plus the upstream derivative) in backward.

use crate::context::Context;
use crate::error::Result;
use crate::function::{Derivatives, ScalarFunction};
use crate::operators;

/// f(a, b) = a + b
#[derive(Debug, Clone, Copy)]
pub struct Add;

impl ScalarFunction for Add {
    fn name(&self) -> &'static str {
        "Add"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, _ctx: &mut Context, inputs: &[f64]) -> f64 {
        inputs[0] + inputs[1]
    }

    fn backward(&self, _ctx: &Context, d_output: f64) -> Result<Derivatives> {
        // dz/da = 1, dz/db = 1
        Ok((d_output, d_output).into())
    }
}

/// f(a, b) = a * b
#[derive(Debug, Clone, Copy)]
pub struct Mul;

impl ScalarFunction for Mul {
    fn name(&self) -> &'static str {
        "Mul"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, ctx: &mut Context, inputs: &[f64]) -> f64 {
        ctx.save_for_backward(&[inputs[0], inputs[1]]);
        inputs[0] * inputs[1]
    }

    fn backward(&self, ctx: &Context, d_output: f64) -> Result<Derivatives> {
        // dz/da = b, dz/db = a
        let [a, b] = ctx.saved()?;
        Ok((b * d_output, a * d_output).into())
    }
}

/// f(a) = 1 / a
#[derive(Debug, Clone, Copy)]
pub struct Inv;

impl ScalarFunction for Inv {
    fn name(&self) -> &'static str {
        "Inv"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, ctx: &mut Context, inputs: &[f64]) -> f64 {
        ctx.save_for_backward(&[inputs[0]]);
        operators::inv(inputs[0])
    }

    fn backward(&self, ctx: &Context, d_output: f64) -> Result<Derivatives> {
        let [a] = ctx.saved()?;
        Ok(operators::inv_back(a, d_output).into())
    }
}

/// f(a) = -a
#[derive(Debug, Clone, Copy)]
pub struct Neg;

impl ScalarFunction for Neg {
    fn name(&self) -> &'static str {
        "Neg"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, _ctx: &mut Context, inputs: &[f64]) -> f64 {
        -inputs[0]
    }

    fn backward(&self, _ctx: &Context, d_output: f64) -> Result<Derivatives> {
        Ok((-d_output).into())
    }
}

/// f(a) = 1 / (1 + e^-a)
#[derive(Debug, Clone, Copy)]
pub struct Sigmoid;

impl ScalarFunction for Sigmoid {
    fn name(&self) -> &'static str {
        "Sigmoid"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, ctx: &mut Context, inputs: &[f64]) -> f64 {
        let s = operators::sigmoid(inputs[0]);
        ctx.save_for_backward(&[s]);
        s
    }

    fn backward(&self, ctx: &Context, d_output: f64) -> Result<Derivatives> {
        // sigmoid'(a) = s * (1 - s)
        let [s] = ctx.saved()?;
        Ok((d_output * s * (1.0 - s)).into())
    }
}

/// f(a) = max(0, a)
#[derive(Debug, Clone, Copy)]
pub struct ReLU;

impl ScalarFunction for ReLU {
    fn name(&self) -> &'static str {
        "ReLU"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, ctx: &mut Context, inputs: &[f64]) -> f64 {
        ctx.save_for_backward(&[inputs[0]]);
        operators::relu(inputs[0])
    }

    fn backward(&self, ctx: &Context, d_output: f64) -> Result<Derivatives> {
        let [a] = ctx.saved()?;
        Ok(operators::relu_back(a, d_output).into())
    }
}

/// f(a) = e^a
#[derive(Debug, Clone, Copy)]
pub struct Exp;

impl ScalarFunction for Exp {
    fn name(&self) -> &'static str {
        "Exp"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, ctx: &mut Context, inputs: &[f64]) -> f64 {
        let e = operators::exp(inputs[0]);
        ctx.save_for_backward(&[e]);
        e
    }

    fn backward(&self, ctx: &Context, d_output: f64) -> Result<Derivatives> {
        let [e] = ctx.saved()?;
        Ok((e * d_output).into())
    }
}

/// f(a) = ln(a)
#[derive(Debug, Clone, Copy)]
pub struct Log;

impl ScalarFunction for Log {
    fn name(&self) -> &'static str {
        "Log"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, ctx: &mut Context, inputs: &[f64]) -> f64 {
        ctx.save_for_backward(&[inputs[0]]);
        operators::log(inputs[0])
    }

    fn backward(&self, ctx: &Context, d_output: f64) -> Result<Derivatives> {
        let [a] = ctx.saved()?;
        Ok(operators::log_back(a, d_output).into())
    }
}

/// f(a, b) = 1.0 if a < b else 0.0
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy)]
pub struct LT;

impl ScalarFunction for LT {
    fn name(&self) -> &'static str {
        "LT"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, _ctx: &mut Context, inputs: &[f64]) -> f64 {
        operators::lt(inputs[0], inputs[1])
    }

    fn backward(&self, _ctx: &Context, _d_output: f64) -> Result<Derivatives> {
        // step function: flat almost everywhere
        Ok((0.0, 0.0).into())
    }
}

/// f(a, b) = 1.0 if a == b else 0.0
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy)]
pub struct EQ;

impl ScalarFunction for EQ {
    fn name(&self) -> &'static str {
        "EQ"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, _ctx: &mut Context, inputs: &[f64]) -> f64 {
        operators::eq(inputs[0], inputs[1])
    }

    fn backward(&self, _ctx: &Context, _d_output: f64) -> Result<Derivatives> {
        Ok((0.0, 0.0).into())
    }
}
