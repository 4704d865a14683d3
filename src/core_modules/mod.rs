pub mod advice;
pub mod blob;
pub mod classifier;
pub mod forecaster;
pub mod grayscale;
pub mod heat_stress;
pub mod labeler;
pub mod pixel;
pub mod segmenter;
pub mod trend;
