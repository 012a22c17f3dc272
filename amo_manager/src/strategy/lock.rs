//! Reentrancy Guard
//!
//! A scoped flag that is raised before the first pool read of an operation and lowered when
//! the operation returns, whatever the outcome.
//!
//! ```plain
//! Guard State Machine:
//!
//!                  ┌──────────┐
//!             ┌────► Vacant   │
//!             │    └──────────┘
//!             │         │
//!  GuardToken │       enter
//!  dropped    │         │
//!             │         ▼
//!             │    ┌──────────┐
//!             └────┤ Entered  ├──── enter ──► Err(Reentrancy)
//!                  └──────────┘
//! ```

use std::{cell::Cell, rc::Rc};

use crate::utils::error::{AmoError, AmoResult};

/// Runtime guard shared by every entry point of the strategy.
#[derive(Clone, Debug, Default)]
pub struct ReentrancyGuard {
    entered: Rc<Cell<bool>>,
}

impl ReentrancyGuard {
    /// Raises the flag, failing if it is already raised.
    ///
    /// # Returns
    /// * `Ok(GuardToken)` - Flag raised, lowered again when the token drops
    /// * `Err(AmoError::Reentrancy)` - Another operation is in flight
    pub fn enter(&self) -> AmoResult<GuardToken> {
        if self.entered.get() {
            return Err(AmoError::Reentrancy);
        }
        self.entered.set(true);
        Ok(GuardToken {
            entered: Rc::clone(&self.entered),
        })
    }

    /// Fails while an operation is in flight
    pub fn assert_vacant(&self) -> AmoResult<()> {
        if self.entered.get() {
            Err(AmoError::Reentrancy)
        } else {
            Ok(())
        }
    }

    pub fn is_entered(&self) -> bool {
        self.entered.get()
    }
}

/// Proof that the guard is held. Lowers the flag on drop.
#[derive(Debug)]
pub struct GuardToken {
    entered: Rc<Cell<bool>>,
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.entered.set(false);
    }
}
