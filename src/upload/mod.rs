//! Record upload
//!
//! Builds one record per cycle from the sensor snapshot and submits it with
//! the post-submit gap script attached.

mod uploader;

pub use uploader::RecordUploader;
