/// Score ledger model.
pub mod models;
/// Persistence of the score ledger.
pub mod score_store;
/// Storage error shared by persistence backends.
pub mod storage;
