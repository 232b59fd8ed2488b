//! Tensor aliases shared by the preprocessing and inference stages.

/// Image input tensor in NCHW layout.
pub type Tensor4D = ndarray::Array4<f32>;

/// Tensor of any rank, used for bindings and model outputs.
pub type TensorD = ndarray::ArrayD<f32>;
