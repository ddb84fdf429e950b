pub mod dirs;
pub mod encoding;
pub mod ffprobe;
pub mod file_name;
pub mod futures;
pub mod id;
pub mod media;
pub mod temp_dir;
pub mod temp_file;
