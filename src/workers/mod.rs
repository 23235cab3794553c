pub mod ledger;
pub mod reaper;
