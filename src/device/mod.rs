pub mod errors;
pub mod traits;
pub mod types;

pub use errors::DeviceError;
pub use traits::DeviceControl;
pub use types::{DeviceBinding, Observation, Orientation, ScreenSize, UiElement};
