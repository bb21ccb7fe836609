use burn::tensor::backend::Backend;
use burn::tensor::ops::ConvOptions;
use burn::tensor::Tensor;

/// Gaussian smoothing filter for `[batch, channels, height, width]` frames.
///
/// Applies separable 1D convolutions along height and width. Each channel is
/// filtered on its own and samples outside the frame read as zero.
pub struct GaussianBlur<B: Backend> {
    sigma: f64,
    max_kernel_width: usize,
    _b: std::marker::PhantomData<B>,
}

impl<B: Backend> GaussianBlur<B> {
    /// Create a new Gaussian blur with the given standard deviation in pixels.
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            max_kernel_width: 15,
            _b: std::marker::PhantomData,
        }
    }

    /// Set the maximum kernel width (radius * 2 + 1).
    pub fn with_max_kernel_width(mut self, width: usize) -> Self {
        self.max_kernel_width = width.max(1);
        self
    }

    /// Standard deviation in pixels.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Width of the sampled kernel after clamping to the maximum width.
    pub fn kernel_width(&self) -> usize {
        let radius = (3.0 * self.sigma).ceil() as usize;
        let width = (2 * radius + 1).min(self.max_kernel_width);
        // keep the kernel centred
        if width % 2 == 0 { width - 1 } else { width }
    }

    /// Apply the filter to a frame tensor.
    pub fn apply(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        if self.sigma <= 1e-6 {
            return input;
        }

        let [batch, channels, height, width] = input.dims();
        let device = input.device();

        let radius = (self.kernel_width() - 1) / 2;
        let kernel = self.sample_taps(radius);
        let size = kernel.len();
        let kernel = Tensor::<B, 1>::from_floats(kernel.as_slice(), &device);

        // Fold channels into the batch so one single-channel kernel serves all
        let planes = input.reshape([batch * channels, 1, height, width]);

        let vertical = kernel.clone().reshape([1, 1, size, 1]);
        let planes = burn::tensor::module::conv2d(
            planes,
            vertical,
            None,
            ConvOptions::new([1, 1], [radius, 0], [1, 1], 1),
        );

        let horizontal = kernel.reshape([1, 1, 1, size]);
        let planes = burn::tensor::module::conv2d(
            planes,
            horizontal,
            None,
            ConvOptions::new([1, 1], [0, radius], [1, 1], 1),
        );

        planes.reshape([batch, channels, height, width])
    }

    /// Sampled Gaussian taps at offsets `-radius..=radius`, summing to one.
    fn sample_taps(&self, radius: usize) -> Vec<f32> {
        let inv_two_var = 0.5 / (self.sigma * self.sigma);
        let radius = radius as i64;
        let weights: Vec<f64> = (-radius..=radius)
            .map(|offset| (-((offset * offset) as f64) * inv_two_var).exp())
            .collect();
        let total: f64 = weights.iter().sum();

        weights.into_iter().map(|w| (w / total) as f32).collect()
    }
}
