pub mod garden;
pub mod ledger;
pub mod rules;
