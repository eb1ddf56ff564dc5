//! Backend type aliases and device management
//!
//! Training runs on Burn's NdArray backend wrapped in `Autodiff`; inference
//! drops the gradient tracking. The dense 1600-512-2 policy is small enough
//! that CPU tensors are not a bottleneck next to the environment itself.

use burn::backend::{
    ndarray::{NdArray, NdArrayDevice},
    Autodiff,
};

/// Backend type for training (with autodiff)
pub type TrainingBackend = Autodiff<NdArray<f32>>;

/// Backend type for inference (without autodiff)
pub type InferenceBackend = NdArray<f32>;

/// Get the default device for computation.
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}
