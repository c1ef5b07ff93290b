use ndarray::{prelude::*, s};

use crate::{
    error::{MlErr, Result},
    shape::{Shape, pool_out},
};

/// Max pooling whose stride equals its window, any remainder at the borders is dropped.
#[derive(Debug, Clone)]
pub struct MaxPool2d {
    window: (usize, usize),
}

impl MaxPool2d {
    pub fn new(window: (usize, usize)) -> Result<Self> {
        if window.0 == 0 || window.1 == 0 {
            return Err(MlErr::InvalidConfig("pool_size must be positive".into()));
        }

        Ok(Self { window })
    }

    fn out_size(&self, (h, w): (usize, usize)) -> Option<(usize, usize)> {
        Some((pool_out(h, self.window.0)?, pool_out(w, self.window.1)?))
    }

    /// Returns the shape of a sample after this layer, `None` if it doesn't fit.
    pub fn out_shape(&self, input: Shape) -> Option<Shape> {
        if !input.is_spatial() {
            return None;
        }

        input.resized(input.channels(), self.out_size(input.spatial())?)
    }

    pub fn forward(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let (n, c, h, w) = x.dim();
        let (wh, ww) = self.window;

        let Some((oh, ow)) = self.out_size((h, w)) else {
            return Err(MlErr::Shape(format!(
                "pool window {:?} doesn't fit an input of {h}x{w}",
                self.window
            )));
        };

        let out = Array4::from_shape_fn((n, c, oh, ow), |(b, ch, i, j)| {
            x.slice(s![b, ch, i * wh..(i + 1) * wh, j * ww..(j + 1) * ww])
                .fold(f32::NEG_INFINITY, |m, &v| m.max(v))
        });

        Ok(out.into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_window_maximum() {
        let pool = MaxPool2d::new((2, 2)).unwrap();
        let x = ArrayD::from_shape_vec(vec![1, 1, 4, 4], (0..16).map(|v| v as f32).collect())
            .unwrap();

        let y = pool.forward(x).unwrap();

        assert_eq!(y.shape(), &[1, 1, 2, 2]);
        assert_eq!(y.into_raw_vec_and_offset().0, vec![5., 7., 13., 15.]);
    }

    #[test]
    fn drops_remainder() {
        let pool = MaxPool2d::new((2, 2)).unwrap();
        let input = Shape::from_dims(&[16, 13, 13]).unwrap();

        assert_eq!(pool.out_shape(input), Shape::from_dims(&[16, 6, 6]));
    }

    #[test]
    fn window_too_large() {
        let pool = MaxPool2d::new((4, 4)).unwrap();

        assert_eq!(pool.out_shape(Shape::from_dims(&[1, 3, 3]).unwrap()), None);
        assert!(pool.forward(ArrayD::zeros(vec![1, 1, 3, 3])).is_err());
    }
}
