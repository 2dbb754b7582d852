pub mod f32;
pub mod io;
pub mod traits;
pub mod volume;

pub use self::f32::ImageF32;
pub use self::traits::{ImageView, ImageViewMut, VolumeView};
pub use self::volume::VolumeF32;
