pub mod blob_extractor;
pub mod blob_filter;
pub mod frame;
pub mod pixel;
pub mod segmenter;
pub mod stability_tracker;
pub mod status;
