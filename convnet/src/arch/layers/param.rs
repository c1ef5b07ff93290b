use ndarray::ArrayD;

/// A parameter tensor of a layer and whether training may update it.
#[derive(Debug, Clone)]
pub struct Param {
    value: ArrayD<f32>,
    trainable: bool,
}

impl Param {
    /// Creates a new trainable `Param`.
    pub fn new(value: ArrayD<f32>) -> Self {
        Self {
            value,
            trainable: true,
        }
    }

    pub fn value(&self) -> &ArrayD<f32> {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut ArrayD<f32> {
        &mut self.value
    }

    pub fn trainable(&self) -> bool {
        self.trainable
    }

    pub fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }

    /// Returns the amount of scalars in this parameter.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}
