pub mod probe;
pub mod raster;
