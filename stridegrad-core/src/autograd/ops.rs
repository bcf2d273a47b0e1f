use super::{graph::Node, ComputeGraph, Op, TapeEntry, Tensor};
use crate::{DType, Error, NArray, Order, Result, Shape};

impl<T: DType> ComputeGraph<T> {
    /// Stores `value` as the output of `op`. The output requires grad iff
    /// some input does, and only then is the operation taped.
    fn record(&mut self, op: Op<T>, inputs: &[Tensor], value: NArray<T>) -> Result<Tensor> {
        let mut requires_grad = false;
        for &t in inputs {
            requires_grad |= self.requires_grad(t)?;
        }
        let out = self.alloc(Node {
            value,
            grad: None,
            requires_grad,
            name: None,
            leaf: false,
            seeded: false,
        });
        if requires_grad {
            self.tape.push(TapeEntry {
                op,
                inputs: inputs.to_vec(),
                outputs: vec![out],
            });
        }
        Ok(out)
    }

    pub fn add(&mut self, a: Tensor, b: Tensor) -> Result<Tensor> {
        let value = self.value(a)?.add(self.value(b)?)?;
        self.record(Op::Add, &[a, b], value)
    }

    pub fn sub(&mut self, a: Tensor, b: Tensor) -> Result<Tensor> {
        let value = self.value(a)?.sub(self.value(b)?)?;
        self.record(Op::Sub, &[a, b], value)
    }

    pub fn mul(&mut self, a: Tensor, b: Tensor) -> Result<Tensor> {
        let value = self.value(a)?.mul(self.value(b)?)?;
        self.record(Op::Mul, &[a, b], value)
    }

    pub fn div(&mut self, a: Tensor, b: Tensor) -> Result<Tensor> {
        let value = self.value(a)?.div(self.value(b)?)?;
        self.record(Op::Div, &[a, b], value)
    }

    pub fn add_scalar(&mut self, a: Tensor, value: T) -> Result<Tensor> {
        let out = self.value(a)?.add_scalar(value);
        self.record(Op::AddScalar { value }, &[a], out)
    }

    pub fn mul_scalar(&mut self, a: Tensor, value: T) -> Result<Tensor> {
        let out = self.value(a)?.mul_scalar(value);
        self.record(Op::MulScalar { value }, &[a], out)
    }

    pub fn pow(&mut self, a: Tensor, p: f64) -> Result<Tensor> {
        let value = self.value(a)?.pow(p);
        self.record(Op::Pow { p }, &[a], value)
    }

    pub fn sqrt(&mut self, a: Tensor) -> Result<Tensor> {
        let value = self.value(a)?.sqrt();
        self.record(Op::Sqrt, &[a], value)
    }

    pub fn neg(&mut self, a: Tensor) -> Result<Tensor> {
        let value = self.value(a)?.neg();
        self.record(Op::Neg, &[a], value)
    }

    pub fn exp(&mut self, a: Tensor) -> Result<Tensor> {
        let value = self.value(a)?.exp();
        self.record(Op::Exp, &[a], value)
    }

    pub fn log(&mut self, a: Tensor) -> Result<Tensor> {
        let value = self.value(a)?.log();
        self.record(Op::Log, &[a], value)
    }

    /// Differentiable view of `start..end` along `axis`.
    pub fn narrow(&mut self, a: Tensor, axis: usize, start: usize, end: usize) -> Result<Tensor> {
        let value = self.value(a)?.narrow(axis, start, end)?;
        self.record(Op::Narrow { axis, start, end }, &[a], value)
    }

    /// Consecutive narrows along `axis`, see [`NArray::split`].
    pub fn split(&mut self, a: Tensor, axis: usize, indices: &[usize]) -> Result<Vec<Tensor>> {
        let pieces = self.value(a)?.split(axis, indices)?;
        let mut out = Vec::with_capacity(pieces.len());
        for (i, piece) in pieces.into_iter().enumerate() {
            let start = indices[i];
            let end = start + piece.dims()[axis];
            out.push(self.record(Op::Narrow { axis, start, end }, &[a], piece)?);
        }
        Ok(out)
    }

    pub fn reshape(&mut self, a: Tensor, shape: impl Into<Shape>) -> Result<Tensor> {
        let x = self.value(a)?;
        let input_shape = x.shape().clone();
        let order = x.layout().resolve(Order::Auto);
        let value = x.reshape_with(shape, order)?;
        self.record(Op::Reshape { input_shape, order }, &[a], value)
    }

    pub fn permute(&mut self, a: Tensor, axes: &[usize]) -> Result<Tensor> {
        let value = self.value(a)?.permute(axes)?;
        self.record(
            Op::Permute {
                axes: axes.to_vec(),
            },
            &[a],
            value,
        )
    }

    fn values(&self, tensors: &[Tensor]) -> Result<Vec<&NArray<T>>> {
        tensors.iter().map(|&t| self.value(t)).collect()
    }

    pub fn cat(&mut self, axis: usize, tensors: &[Tensor]) -> Result<Tensor> {
        let values = self.values(tensors)?;
        let value = NArray::concat(axis, &values)?;
        let sizes = values.iter().map(|v| v.dims()[axis]).collect();
        self.record(Op::Cat { axis, sizes }, tensors, value)
    }

    pub fn stack(&mut self, axis: usize, tensors: &[Tensor]) -> Result<Tensor> {
        let value = NArray::stack(axis, &self.values(tensors)?)?;
        let count = tensors.len();
        self.record(Op::Stack { axis, count }, tensors, value)
    }

    /// Sum of all elements, as a rank 0 tensor.
    pub fn sum(&mut self, a: Tensor) -> Result<Tensor> {
        let value = NArray::scalar(self.value(a)?.sum());
        self.record(Op::Sum, &[a], value)
    }

    pub fn sum_axis(&mut self, a: Tensor, axis: usize) -> Result<Tensor> {
        let x = self.value(a)?;
        let dim = x.dim(axis)?;
        let value = x.sum_axis(axis)?;
        self.record(Op::SumAxis { axis, dim }, &[a], value)
    }

    /// Mean of all elements, as a rank 0 tensor.
    pub fn mean(&mut self, a: Tensor) -> Result<Tensor> {
        let x = self.value(a)?;
        if x.size() == 0 {
            return Err(Error::shape_mismatch("mean", x.dims(), &[1]));
        }
        let value = NArray::scalar(x.mean());
        self.record(Op::Mean, &[a], value)
    }

    pub fn matmul(&mut self, a: Tensor, b: Tensor) -> Result<Tensor> {
        let value = self.value(a)?.mm(self.value(b)?)?;
        self.record(Op::MatMul, &[a, b], value)
    }
}
