pub mod audio;
pub mod config;
pub mod data_uri;
pub mod frame;
pub mod gallery;
pub mod gallery_cache;
pub mod gallery_wall;
pub mod geometry;
pub mod image;
pub mod image_loader;
pub mod layout;
pub mod local_storage;
pub mod placard;
pub mod scene;
