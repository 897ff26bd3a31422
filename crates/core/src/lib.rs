pub mod cache;
pub mod confirmation;
pub mod reorg;
pub mod retry;
pub mod rpc;
pub mod supervisor;
pub mod worker;
