pub mod partitioner;
pub mod ppm;
pub mod raster;
pub mod status;
pub mod tokenizer;
