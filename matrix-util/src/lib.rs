pub mod common_io;
pub mod dmatrix_io;
pub mod membership;
