pub mod column_access; // dense/sparse column and row extraction
pub mod common_io; // gz-aware line readers and writers
pub mod dmatrix_io; // named matrix files
pub mod grouped_stat; // per-group row statistics
pub mod knn_match; // HNSW correlation index
pub mod ranking; // average ranks and scaled rank vectors
pub mod traits;
pub mod utils; // thread pools and partitions
