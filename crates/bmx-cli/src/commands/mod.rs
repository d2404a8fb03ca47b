pub mod estimate;
pub mod sample;
pub mod score;
