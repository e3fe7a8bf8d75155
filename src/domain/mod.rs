mod account;
mod customer;
mod money;
mod policy;
mod task;
mod transaction;

pub use account::*;
pub use customer::*;
pub use money::*;
pub use policy::*;
pub use task::*;
pub use transaction::*;
