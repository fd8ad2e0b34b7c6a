pub mod pagination;
pub mod retry;
pub mod shutdown;

pub use pagination::*;
pub use retry::*;
pub use shutdown::*;
