pub mod active;
pub mod cache;
pub mod error;
pub mod index;
pub mod invalidate;
pub mod resolver;
pub mod schema;
pub mod selection;
pub mod session;
pub mod store;

pub use active::*;
pub use cache::*;
pub use error::*;
pub use index::*;
pub use invalidate::*;
pub use resolver::*;
pub use schema::*;
pub use selection::*;
pub use session::*;
pub use store::*;
