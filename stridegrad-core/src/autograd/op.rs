use crate::{DType, Error, NArray, Order, Result, Shape};

/// A differentiable operation as recorded on the tape. Variants carry only
/// the plain data needed to run the local gradient rule.
#[derive(Clone, Debug, PartialEq)]
pub enum Op<T: DType> {
    Add,
    Sub,
    Mul,
    Div,
    AddScalar { value: T },
    MulScalar { value: T },
    Pow { p: f64 },
    Sqrt,
    Neg,
    Exp,
    Log,
    Narrow { axis: usize, start: usize, end: usize },
    /// `order` is the read order the forward reshape resolved to.
    Reshape { input_shape: Shape, order: Order },
    Permute { axes: Vec<usize> },
    Cat { axis: usize, sizes: Vec<usize> },
    Stack { axis: usize, count: usize },
    Sum,
    SumAxis { axis: usize, dim: usize },
    Mean,
    MatMul,
}

fn input<'a, T: DType>(inputs: &[&'a NArray<T>], i: usize) -> Result<&'a NArray<T>> {
    inputs
        .get(i)
        .copied()
        .ok_or_else(|| Error::IllegalGraphState(format!("missing input {i} on the tape")).bt())
}

/// Fills the input shape with the single value of a scalar gradient.
fn broadcast_scalar<T: DType>(g: &NArray<T>, shape: &Shape, value: T) -> Result<NArray<T>> {
    debug_assert_eq!(g.size(), 1);
    Ok(NArray::full(shape.clone(), value, Order::C))
}

impl<T: DType> Op<T> {
    pub fn label(&self) -> String {
        match self {
            Self::Add => "Add".to_string(),
            Self::Sub => "Sub".to_string(),
            Self::Mul => "Mul".to_string(),
            Self::Div => "Div".to_string(),
            Self::AddScalar { value } => format!("AddScalar({value})"),
            Self::MulScalar { value } => format!("MulScalar({value})"),
            Self::Pow { p } => format!("Pow({p})"),
            Self::Sqrt => "Sqrt".to_string(),
            Self::Neg => "Neg".to_string(),
            Self::Exp => "Exp".to_string(),
            Self::Log => "Log".to_string(),
            Self::Narrow { axis, start, end } => format!("Narrow(axis={axis}, {start}..{end})"),
            Self::Reshape { input_shape, .. } => format!("Reshape(from={input_shape})"),
            Self::Permute { axes } => format!("Permute({axes:?})"),
            Self::Cat { axis, .. } => format!("Cat(axis={axis})"),
            Self::Stack { axis, .. } => format!("Stack(axis={axis})"),
            Self::Sum => "Sum".to_string(),
            Self::SumAxis { axis, .. } => format!("SumAxis({axis})"),
            Self::Mean => "Mean".to_string(),
            Self::MatMul => "MatMul".to_string(),
        }
    }

    /// Local gradient rule: one optional contribution per input, given the
    /// gradients of the outputs. Inputs whose `needs` flag is false get `None`.
    pub fn backward(
        &self,
        inputs: &[&NArray<T>],
        outputs: &[&NArray<T>],
        out_grads: &[&NArray<T>],
        needs: &[bool],
    ) -> Result<Vec<Option<NArray<T>>>> {
        let g = *out_grads
            .first()
            .ok_or_else(|| Error::MissingGradient("no output gradient".to_string()).bt())?;
        let need = |i: usize| needs.get(i).copied().unwrap_or(false);
        let when = |i: usize, f: &dyn Fn() -> Result<NArray<T>>| -> Result<Option<NArray<T>>> {
            if need(i) {
                f().map(Some)
            } else {
                Ok(None)
            }
        };

        let grads = match self {
            Self::Add => vec![when(0, &|| Ok(g.clone()))?, when(1, &|| Ok(g.clone()))?],
            Self::Sub => vec![when(0, &|| Ok(g.clone()))?, when(1, &|| Ok(g.neg()))?],
            Self::Mul => {
                let (a, b) = (input(inputs, 0)?, input(inputs, 1)?);
                vec![when(0, &|| g.mul(b))?, when(1, &|| g.mul(a))?]
            }
            Self::Div => {
                let (a, b) = (input(inputs, 0)?, input(inputs, 1)?);
                vec![
                    when(0, &|| g.div(b))?,
                    when(1, &|| Ok(g.mul(a)?.div(&b.mul(b)?)?.neg()))?,
                ]
            }
            Self::AddScalar { .. } => vec![when(0, &|| Ok(g.clone()))?],
            Self::MulScalar { value } => vec![when(0, &|| Ok(g.mul_scalar(*value)))?],
            Self::Pow { p } => {
                let x = input(inputs, 0)?;
                vec![when(0, &|| {
                    let out = x.pow(p - 1.0);
                    out.mul_scalar_(T::from_f64(*p)).mul_(g)?;
                    Ok(out)
                })?]
            }
            Self::Sqrt => {
                let y = input(outputs, 0)?;
                vec![when(0, &|| sqrt_grad(g, y))?]
            }
            Self::Neg => vec![when(0, &|| Ok(g.neg()))?],
            Self::Exp => {
                let y = input(outputs, 0)?;
                vec![when(0, &|| g.mul(y))?]
            }
            Self::Log => {
                let x = input(inputs, 0)?;
                vec![when(0, &|| g.div(x))?]
            }
            Self::Narrow { axis, start, end } => {
                let x = input(inputs, 0)?;
                vec![when(0, &|| {
                    let out = x.zeros_like();
                    out.narrow(*axis, *start, *end)?.assign_(g)?;
                    Ok(out)
                })?]
            }
            Self::Reshape { input_shape, order } => {
                vec![when(0, &|| g.reshape_with(input_shape.clone(), *order))?]
            }
            Self::Permute { axes } => {
                let mut inverse = vec![0; axes.len()];
                for (i, &a) in axes.iter().enumerate() {
                    inverse[a] = i;
                }
                vec![when(0, &|| g.permute(&inverse))?]
            }
            Self::Cat { axis, sizes } => {
                let mut start = 0;
                let mut grads = Vec::with_capacity(sizes.len());
                for (i, size) in sizes.iter().enumerate() {
                    let s = start;
                    grads.push(when(i, &|| g.narrow(*axis, s, s + size))?);
                    start += size;
                }
                grads
            }
            Self::Stack { axis, count } => (0..*count)
                .map(|i| when(i, &|| g.narrow(*axis, i, i + 1)?.squeeze_axis(*axis)))
                .collect::<Result<Vec<_>>>()?,
            Self::Sum => {
                let x = input(inputs, 0)?;
                vec![when(0, &|| broadcast_scalar(g, x.shape(), g.item()?))?]
            }
            Self::SumAxis { axis, dim } => {
                vec![when(0, &|| {
                    Ok(g.unsqueeze(*axis)?.expand(*axis, *dim)?.copy(Order::C))
                })?]
            }
            Self::Mean => {
                let x = input(inputs, 0)?;
                vec![when(0, &|| {
                    let n = x.size().max(1) as f64;
                    broadcast_scalar(g, x.shape(), T::from_f64(g.item()?.to_f64() / n))
                })?]
            }
            Self::MatMul => {
                let (a, b) = (input(inputs, 0)?, input(inputs, 1)?);
                vec![when(0, &|| g.mm(&b.t()))?, when(1, &|| a.t().mm(g))?]
            }
        };
        Ok(grads)
    }
}

/// `0.5 * g / sqrt(x)`, from the forward output `y = sqrt(x)`.
///
/// At `x = 0` the result is `+inf`. Integral types take the `f64` route so
/// that the division by zero saturates instead of trapping.
fn sqrt_grad<T: DType>(g: &NArray<T>, y: &NArray<T>) -> Result<NArray<T>> {
    if T::INTEGRAL {
        let gf = g.cast::<f64>();
        gf.mul_scalar_(0.5).div_(&y.cast::<f64>())?;
        return Ok(gf.cast::<T>());
    }
    g.mul_scalar(T::from_f64(0.5)).div(y)
}
