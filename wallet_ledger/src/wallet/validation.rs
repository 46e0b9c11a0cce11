//! Input validation and balance arithmetic.
//!
//! Everything here is pure: validation runs before a transaction is opened,
//! and [`apply_operation`] runs while the wallet row is locked.

use std::num::IntErrorKind;

use super::{
    errors::{WalletError, WalletResult},
    models::{OperationRequest, OperationType, ValidatedOperation},
};

/// Validate a raw operation request
///
/// # Errors
///
/// * `WalletError::UnknownOperationType` - type is not `DEPOSIT` or `WITHDRAW`
/// * `WalletError::InvalidAmount` - amount is zero or negative
pub fn validate(request: &OperationRequest) -> WalletResult<ValidatedOperation> {
    let operation_type: OperationType = request.operation_type.parse()?;
    let amount = validate_amount(request.amount)?;
    Ok(ValidatedOperation {
        operation_type,
        amount,
    })
}

/// Amounts are accepted in `1..=i64::MAX`
pub fn validate_amount(amount: i64) -> WalletResult<i64> {
    if amount <= 0 {
        return Err(WalletError::InvalidAmount(amount));
    }
    Ok(amount)
}

/// Parse an amount given in textual form, e.g. a JSON number or string
///
/// Only plain base-10 integers are accepted. Positivity is checked later by
/// [`validate_amount`].
///
/// # Errors
///
/// * `WalletError::AmountOutOfRange` - integer does not fit in `i64`
/// * `WalletError::InvalidAmountFormat` - anything that is not an integer
pub fn parse_amount(raw: &str) -> WalletResult<i64> {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            WalletError::AmountOutOfRange(trimmed.to_string())
        }
        _ => WalletError::InvalidAmountFormat(raw.to_string()),
    })
}

/// Compute the balance after applying `operation` to `balance`
///
/// # Errors
///
/// * `WalletError::BalanceOverflow` - deposit would exceed `i64::MAX`
/// * `WalletError::InsufficientBalance` - withdrawal larger than the balance
pub fn apply_operation(balance: i64, operation: &ValidatedOperation) -> WalletResult<i64> {
    match operation.operation_type {
        OperationType::Deposit => balance
            .checked_add(operation.amount)
            .ok_or(WalletError::BalanceOverflow),
        OperationType::Withdraw => {
            if balance >= operation.amount {
                Ok(balance - operation.amount)
            } else {
                Err(WalletError::InsufficientBalance {
                    available: balance,
                    required: operation.amount,
                })
            }
        }
    }
}
