pub mod bounding_box;
pub mod box_clusterer;
pub mod mask;
pub mod utils;
