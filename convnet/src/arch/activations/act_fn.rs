use ndarray::ArrayD;

use super::Sigmoid;

/// An element wise activation function.
#[derive(Clone, Debug)]
pub enum ActFn {
    Relu,
    Sigmoid(Sigmoid),
    Tanh,
}
use ActFn::*;

impl ActFn {
    pub fn relu() -> Self {
        Relu
    }

    pub fn sigmoid(amp: f32) -> Self {
        Sigmoid(Sigmoid::new(amp))
    }

    pub fn tanh() -> Self {
        Tanh
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            Relu => z.max(0.),
            Sigmoid(a) => a.f(z),
            Tanh => z.tanh(),
        }
    }

    pub fn forward(&self, mut x: ArrayD<f32>) -> ArrayD<f32> {
        x.mapv_inplace(|z| self.f(z));
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clamps_negatives() {
        let relu = ActFn::relu();

        assert_eq!(relu.f(-2.), 0.);
        assert_eq!(relu.f(3.), 3.);
    }

    #[test]
    fn sigmoid_amplitude() {
        let sigmoid = ActFn::sigmoid(2.);

        assert_eq!(sigmoid.f(0.), 1.);
        assert!(sigmoid.f(50.) <= 2.);
    }
}
