//! Shared protocol models for provider backends

mod data_source;
mod diagnostic;
mod provider;
mod resource;
mod rpc;
mod schema;
mod value;

pub use data_source::*;
pub use diagnostic::*;
pub use provider::*;
pub use resource::*;
pub use rpc::*;
pub use schema::*;
pub use value::*;
