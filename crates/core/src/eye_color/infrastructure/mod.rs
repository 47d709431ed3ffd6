pub mod palette_file;
