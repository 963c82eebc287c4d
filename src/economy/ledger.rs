use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The focus-point balance. A plain unsigned count wrapped so the only way
/// down is [FocusLedger::debit], which refuses to cross zero; whatever
/// sequence of operations runs, the balance is never negative.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize, Clone, Copy, Default)]
#[serde(transparent)]
pub struct FocusLedger(u64);

#[derive(Error, PartialEq, Eq, Debug, Clone, Copy)]
#[error("not enough focus points: need {required}, have {balance}")]
pub struct InsufficientFunds {
    pub required: u64,
    pub balance: u64,
}

impl FocusLedger {
    pub fn balance(&self) -> u64 {
        self.0
    }

    /// Returns the new balance. Credits never fail and never wrap.
    pub fn credit(&mut self, amount: u64) -> u64 {
        self.0 = self.0.saturating_add(amount);
        self.0
    }

    /// Returns the new balance, or leaves the old one untouched when `amount`
    /// exceeds it.
    pub fn debit(&mut self, amount: u64) -> Result<u64, InsufficientFunds> {
        if amount > self.0 {
            return Err(InsufficientFunds {
                required: amount,
                balance: self.0,
            });
        }
        self.0 -= amount;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_is_the_sum_of_credits_minus_successful_debits() {
        let mut ledger = FocusLedger::default();
        let mut expected: u64 = 0;

        let operations: [(bool, u64); 8] = [
            (true, 15),
            (true, 5),
            (false, 10),
            (false, 30),
            (true, 50),
            (false, 10),
            (false, 21),
            (true, 0),
        ];

        for (is_credit, amount) in operations {
            if is_credit {
                ledger.credit(amount);
                expected += amount;
            } else if ledger.debit(amount).is_ok() {
                expected -= amount;
            }
            assert_eq!(ledger.balance(), expected);
        }
    }

    #[test]
    fn failed_debits_leave_the_balance_alone() {
        let mut ledger = FocusLedger::default();
        ledger.credit(9);

        let error = ledger.debit(10).unwrap_err();

        assert_eq!(
            error,
            InsufficientFunds {
                required: 10,
                balance: 9
            }
        );
        assert_eq!(ledger.balance(), 9);
    }

    #[test]
    fn credits_saturate_instead_of_wrapping() {
        let mut ledger = FocusLedger::default();
        ledger.credit(u64::MAX);

        assert_eq!(ledger.credit(10), u64::MAX);
    }

    #[test]
    fn serializes_as_a_bare_number() {
        let mut ledger = FocusLedger::default();
        ledger.credit(25);

        assert_eq!(serde_json::to_string(&ledger).unwrap(), "25");
        assert_eq!(serde_json::from_str::<FocusLedger>("25").unwrap(), ledger);
    }
}
