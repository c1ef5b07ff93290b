use ndarray::{linalg, prelude::*};

use super::Param;
use crate::{
    error::{MlErr, Result},
    shape::Shape,
};

/// A fully connected layer over `(batch, features)` arrays.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),

    // [weight, bias]
    params: [Param; 2],
}

impl Dense {
    /// Creates a new `Dense`.
    ///
    /// # Arguments
    /// * `weight` - The weights, shaped `(in_features, out_features)`.
    /// * `bias` - One bias per output feature.
    ///
    /// # Returns
    /// A new `Dense` or an error if the parameters are inconsistent.
    pub fn new(weight: Array2<f32>, bias: Array1<f32>) -> Result<Self> {
        let dim = weight.dim();

        if bias.len() != dim.1 {
            return Err(MlErr::InvalidConfig(format!(
                "dense layer has {} outputs but {} biases",
                dim.1,
                bias.len()
            )));
        }

        Ok(Self {
            dim,
            params: [
                Param::new(weight.into_dyn()),
                Param::new(bias.into_dyn()),
            ],
        })
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut [Param] {
        &mut self.params
    }

    /// Returns the shape of a sample after this layer, `None` if it doesn't fit.
    pub fn out_shape(&self, input: Shape) -> Option<Shape> {
        match input {
            Shape::Flat(features) if features == self.dim.0 => Some(Shape::Flat(self.dim.1)),
            _ => None,
        }
    }

    pub fn forward(&self, x: ArrayD<f32>) -> Result<Array2<f32>> {
        let x = x.into_dimensionality::<Ix2>()?;

        if x.ncols() != self.dim.0 {
            return Err(MlErr::Shape(format!(
                "dense layer expects {} features, got {}",
                self.dim.0,
                x.ncols()
            )));
        }

        let w = self.params[0].value().view().into_dimensionality::<Ix2>()?;
        let b = self.params[1].value().view().into_dimensionality::<Ix1>()?;

        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut z);
        z += &b;

        Ok(z)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn forward_affine() {
        let dense = Dense::new(array![[1., 2.], [3., 4.], [5., 6.]], array![0.5, -0.5]).unwrap();
        let x = array![[1., 1., 1.], [1., 0., 0.]].into_dyn();

        let z = dense.forward(x).unwrap();

        assert_eq!(z, array![[9.5, 11.5], [1.5, 1.5]]);
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let dense = Dense::new(Array2::zeros((3, 2)), Array1::zeros(2)).unwrap();

        assert_eq!(dense.out_shape(Shape::Flat(4)), None);
        assert!(dense.forward(ArrayD::zeros(vec![1, 4])).is_err());
    }
}
