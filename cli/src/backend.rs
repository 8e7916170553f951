//! Backend selection for the evaluation binary.
//!
//! Exactly one backend is compiled in, chosen by feature flag with CUDA taking
//! precedence over WGPU and NdArray as the fallback.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "cuda")] {
        use burn::backend::cuda::{Cuda, CudaDevice};

        /// Selected backend type
        pub type SelectedBackend = Cuda;
        /// Selected device type
        pub type SelectedDevice = CudaDevice;

        pub fn create_device() -> SelectedDevice {
            CudaDevice::default()
        }

        pub const fn get_backend_name() -> &'static str {
            "CUDA (NVIDIA GPU)"
        }
    } else if #[cfg(feature = "wgpu")] {
        use burn::backend::wgpu::{Wgpu, WgpuDevice};

        /// Selected backend type
        pub type SelectedBackend = Wgpu;
        /// Selected device type
        pub type SelectedDevice = WgpuDevice;

        pub fn create_device() -> SelectedDevice {
            WgpuDevice::default()
        }

        pub const fn get_backend_name() -> &'static str {
            "WGPU (GPU)"
        }
    } else {
        use burn::backend::ndarray::{NdArray, NdArrayDevice};

        /// Selected backend type
        pub type SelectedBackend = NdArray;
        /// Selected device type
        pub type SelectedDevice = NdArrayDevice;

        pub fn create_device() -> SelectedDevice {
            NdArrayDevice::default()
        }

        pub const fn get_backend_name() -> &'static str {
            "NdArray (CPU)"
        }
    }
}
