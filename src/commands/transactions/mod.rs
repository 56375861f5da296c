mod discard;
mod exec;
mod multi;

pub use discard::{DiscardArguments, discard};
pub use exec::{ExecArguments, TransactionResult, exec};
pub use multi::{MultiArguments, multi};
