//! Clients for the hosted data platform the dashboard talks to: the
//! conversational NL-to-SQL engine, the SQL warehouse, and the LLM serving
//! endpoint. All three share one authenticated HTTP transport and one error
//! taxonomy; none of them keep global state — construct a client, pass it
//! where it is needed.

mod client;
pub mod error;
pub mod nlq;
pub mod serving;
pub mod warehouse;

pub use error::PlatformError;
pub use nlq::{PollResult, QueryEngine, QueryStatus, RestQueryEngine, SessionHandle};
pub use serving::ServingClient;
pub use warehouse::{Table, WarehouseClient};
