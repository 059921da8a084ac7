pub mod box_writer;
pub mod image_helper;
