pub mod ledger;
pub mod utils;

pub use ledger::LogLedger;
pub use utils::atomic_write;
