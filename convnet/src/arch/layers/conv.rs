use ndarray::{Zip, linalg, prelude::*};

use super::Param;
use crate::{
    error::{MlErr, Result},
    shape::{Shape, conv_out},
};

/// A 2D convolution over `(batch, channels, height, width)` arrays.
///
/// The forward pass lowers every sample to a column matrix (im2col) and multiplies it by the
/// kernel matrix, samples are processed in parallel.
#[derive(Debug, Clone)]
pub struct Conv2d {
    in_channels: usize,
    out_channels: usize,
    kernel: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),

    // [weight, bias]
    params: [Param; 2],
}

impl Conv2d {
    /// Creates a new `Conv2d`.
    ///
    /// # Arguments
    /// * `weight` - The kernels, shaped `(out_channels, in_channels, kernel_h, kernel_w)`.
    /// * `bias` - One bias per output channel.
    /// * `stride` - The vertical and horizontal stride.
    /// * `padding` - The zero padding added to each side, vertically and horizontally.
    ///
    /// # Returns
    /// A new `Conv2d` or an error if the parameters are inconsistent.
    pub fn new(
        weight: Array4<f32>,
        bias: Array1<f32>,
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Self> {
        let (out_channels, in_channels, kh, kw) = weight.dim();

        if weight.is_empty() {
            return Err(MlErr::InvalidConfig(format!(
                "convolution kernel can't be empty, got {:?}",
                weight.shape()
            )));
        }

        if bias.len() != out_channels {
            return Err(MlErr::InvalidConfig(format!(
                "convolution has {out_channels} output channels but {} biases",
                bias.len()
            )));
        }

        if stride.0 == 0 || stride.1 == 0 {
            return Err(MlErr::InvalidConfig("stride must be positive".into()));
        }

        Ok(Self {
            in_channels,
            out_channels,
            kernel: (kh, kw),
            stride,
            padding,
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

    /// Returns the output spatial size for the given input spatial size.
    fn out_size(&self, (h, w): (usize, usize)) -> Option<(usize, usize)> {
        let oh = conv_out(h, self.kernel.0, self.stride.0, self.padding.0)?;
        let ow = conv_out(w, self.kernel.1, self.stride.1, self.padding.1)?;
        Some((oh, ow))
    }

    /// Returns the shape of a sample after this layer, `None` if it doesn't fit.
    pub fn out_shape(&self, input: Shape) -> Option<Shape> {
        if !input.is_spatial() || input.channels() != self.in_channels {
            return None;
        }

        input.resized(self.out_channels, self.out_size(input.spatial())?)
    }

    pub fn forward(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let (n, c, h, w) = x.dim();

        if c != self.in_channels {
            return Err(MlErr::Shape(format!(
                "convolution expects {} input channels, got {c}",
                self.in_channels
            )));
        }

        let Some((oh, ow)) = self.out_size((h, w)) else {
            return Err(MlErr::Shape(format!(
                "kernel {:?} doesn't fit an input of {h}x{w} with padding {:?}",
                self.kernel, self.padding
            )));
        };

        let (kh, kw) = self.kernel;
        let weight = self.params[0].value().view().into_dimensionality::<Ix4>()?;
        let weight = weight.to_shape((self.out_channels, c * kh * kw))?;
        let bias = self.params[1].value().view().into_dimensionality::<Ix1>()?;
        let bias = bias.insert_axis(Axis(1));

        let mut out = Array3::zeros((n, self.out_channels, oh * ow));
        Zip::from(out.outer_iter_mut())
            .and(x.outer_iter())
            .par_for_each(|mut o, xi| {
                let cols = self.im2col(xi, (oh, ow));
                linalg::general_mat_mul(1.0, &weight, &cols, 0.0, &mut o);
                o += &bias;
            });

        Ok(out
            .into_shape_with_order((n, self.out_channels, oh, ow))?
            .into_dyn())
    }

    /// Lays out every receptive field of `x` as a column.
    ///
    /// # Arguments
    /// * `x` - A single sample, `(channels, height, width)`.
    /// * `out_size` - The output spatial size.
    ///
    /// # Returns
    /// A `(channels * kernel_h * kernel_w, out_h * out_w)` matrix, padded positions are zero.
    fn im2col(&self, x: ArrayView3<f32>, (oh, ow): (usize, usize)) -> Array2<f32> {
        let (c, h, w) = x.dim();
        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;
        let (ph, pw) = self.padding;
        let mut cols = Array2::zeros((c * kh * kw, oh * ow));

        for ci in 0..c {
            for ki in 0..kh {
                for kj in 0..kw {
                    let row = (ci * kh + ki) * kw + kj;

                    for oy in 0..oh {
                        let Some(iy) = (oy * sh + ki).checked_sub(ph).filter(|&iy| iy < h) else {
                            continue;
                        };

                        for ox in 0..ow {
                            let Some(ix) = (ox * sw + kj).checked_sub(pw).filter(|&ix| ix < w)
                            else {
                                continue;
                            };

                            cols[[row, oy * ow + ox]] = x[[ci, iy, ix]];
                        }
                    }
                }
            }
        }

        cols
    }
}
