pub mod codec;
pub mod schema;
