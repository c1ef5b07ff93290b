use model_specs::InitSpec;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal, Uniform};

use crate::error::{MlErr, Result};

/// Generates the initial values of a model's parameters.
pub struct ParamGen<R: Rng> {
    spec: InitSpec,
    rng: R,
}

impl ParamGen<StdRng> {
    /// Creates a new `ParamGen` seeded from `seed`, or from the os when it's `None`.
    pub fn seeded(spec: InitSpec, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self::new(spec, rng)
    }
}

impl<R: Rng> ParamGen<R> {
    pub fn new(spec: InitSpec, rng: R) -> Self {
        Self { spec, rng }
    }

    /// Samples `n` values for a parameter tensor.
    ///
    /// # Arguments
    /// * `n` - The amount of values to generate.
    /// * `fan_in` - The number of input units feeding each output unit.
    /// * `fan_out` - The number of output units each input unit feeds.
    ///
    /// # Returns
    /// The sampled values or an error if the distribution is invalid.
    pub fn sample(&mut self, n: usize, fan_in: usize, fan_out: usize) -> Result<Vec<f32>> {
        match self.spec {
            InitSpec::Const { value } => Ok(vec![value; n]),
            InitSpec::LecunUniform => {
                let range = (3. / fan_in as f32).sqrt();
                self.uniform(n, range)
            }
            InitSpec::XavierUniform => {
                let range = (6. / (fan_in + fan_out) as f32).sqrt();
                self.uniform(n, range)
            }
            InitSpec::Kaiming => {
                let std_dev = (2. / fan_in as f32).sqrt();
                self.normal(n, 0., std_dev)
            }
            InitSpec::Normal { mean, std_dev } => self.normal(n, mean, std_dev),
        }
    }

    fn uniform(&mut self, n: usize, range: f32) -> Result<Vec<f32>> {
        let distribution = Uniform::new(-range, range)
            .map_err(|e| MlErr::InvalidConfig(format!("invalid uniform init range {range}: {e}")))?;
        Ok(self.draw(n, distribution))
    }

    fn normal(&mut self, n: usize, mean: f32, std_dev: f32) -> Result<Vec<f32>> {
        let distribution = Normal::new(mean, std_dev)
            .map_err(|e| MlErr::InvalidConfig(format!("invalid normal init: {e}")))?;
        Ok(self.draw(n, distribution))
    }

    fn draw<D: Distribution<f32>>(&mut self, n: usize, distribution: D) -> Vec<f32> {
        (0..n).map(|_| distribution.sample(&mut self.rng)).collect()
    }
}
