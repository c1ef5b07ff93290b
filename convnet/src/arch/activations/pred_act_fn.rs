use ndarray::{Array2, Axis};

/// The activation applied to the classification layer's output, row by row.
#[derive(Clone, Debug)]
pub enum PredActFn {
    Softmax,
    Sigmoid,
}

impl PredActFn {
    pub fn forward(&self, mut x: Array2<f32>) -> Array2<f32> {
        match self {
            PredActFn::Softmax => {
                for mut row in x.axis_iter_mut(Axis(0)) {
                    let max = row.fold(f32::NEG_INFINITY, |m, &z| m.max(z));
                    row.mapv_inplace(|z| (z - max).exp());
                    let sum = row.sum();
                    row /= sum;
                }
                x
            }
            PredActFn::Sigmoid => x.mapv_into(|z| 1. / (1. + (-z).exp())),
        }
    }
}
