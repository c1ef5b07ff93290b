use std::fmt;

/// The shape of a single sample flowing through a model, without the batch axis.
///
/// One dimensional sequences are laid out internally as images of height 1, so every
/// convolution and pooling works over `(batch, channels, height, width)` arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Flat(usize),
    Seq {
        channels: usize,
        len: usize,
    },
    Image {
        channels: usize,
        height: usize,
        width: usize,
    },
}

impl Shape {
    /// Creates a `Shape` from its dimensions.
    ///
    /// # Returns
    /// `None` if there are not between 1 and 3 dimensions or any of them is zero.
    pub fn from_dims(dims: &[usize]) -> Option<Self> {
        if dims.contains(&0) {
            return None;
        }

        match *dims {
            [features] => Some(Self::Flat(features)),
            [channels, len] => Some(Self::Seq { channels, len }),
            [channels, height, width] => Some(Self::Image {
                channels,
                height,
                width,
            }),
            _ => None,
        }
    }

    /// Returns the dimensions of this shape, channels first.
    pub fn dims(&self) -> Vec<usize> {
        match *self {
            Self::Flat(features) => vec![features],
            Self::Seq { channels, len } => vec![channels, len],
            Self::Image {
                channels,
                height,
                width,
            } => vec![channels, height, width],
        }
    }

    /// Returns the dimensions of a batch of `n` samples of this shape.
    pub fn batched(&self, n: usize) -> Vec<usize> {
        let mut dims = self.dims();
        dims.insert(0, n);
        dims
    }

    /// Returns the dimensions of a batch of `n` samples as laid out inside the layers.
    pub(crate) fn internal(&self, n: usize) -> Vec<usize> {
        match *self {
            Self::Flat(features) => vec![n, features],
            Self::Seq { channels, len } => vec![n, channels, 1, len],
            Self::Image {
                channels,
                height,
                width,
            } => vec![n, channels, height, width],
        }
    }

    /// Whether this shape has channels and spatial dimensions.
    pub fn is_spatial(&self) -> bool {
        !matches!(self, Self::Flat(_))
    }

    pub fn channels(&self) -> usize {
        match *self {
            Self::Flat(features) => features,
            Self::Seq { channels, .. } | Self::Image { channels, .. } => channels,
        }
    }

    /// Returns the `(height, width)` of this shape, sequences have height 1.
    pub fn spatial(&self) -> (usize, usize) {
        match *self {
            Self::Flat(_) => (1, 1),
            Self::Seq { len, .. } => (1, len),
            Self::Image { height, width, .. } => (height, width),
        }
    }

    /// Returns a shape of the same kind with the given channels and spatial size.
    ///
    /// # Returns
    /// `None` if any of the resulting dimensions is zero.
    pub fn resized(&self, channels: usize, (height, width): (usize, usize)) -> Option<Self> {
        if channels == 0 || height == 0 || width == 0 {
            return None;
        }

        match *self {
            Self::Flat(_) => Some(Self::Flat(channels * height * width)),
            Self::Seq { .. } => Some(Self::Seq {
                channels,
                len: width,
            }),
            Self::Image { .. } => Some(Self::Image {
                channels,
                height,
                width,
            }),
        }
    }

    /// Returns the amount of elements in a single sample.
    pub fn size(&self) -> usize {
        self.dims().iter().product()
    }

    /// Like `size`, `None` if the amount doesn't fit in a `usize`.
    pub fn checked_size(&self) -> Option<usize> {
        self.dims()
            .iter()
            .try_fold(1usize, |size, &dim| size.checked_mul(dim))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.dims().iter().map(ToString::to_string).collect();
        write!(f, "({})", dims.join(", "))
    }
}

/// Output length of a convolution along one axis.
///
/// # Returns
/// `None` if the kernel doesn't fit in the padded input or the padded input overflows.
pub(crate) fn conv_out(
    input: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
) -> Option<usize> {
    padding
        .checked_mul(2)
        .and_then(|p| input.checked_add(p))?
        .checked_sub(kernel)
        .map(|span| span / stride + 1)
}

/// Output length of a max pooling along one axis, window and stride being equal.
pub(crate) fn pool_out(input: usize, window: usize) -> Option<usize> {
    Some(input / window).filter(|&out| out > 0)
}
