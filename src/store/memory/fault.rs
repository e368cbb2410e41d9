//! Fault injection for exercising rollback paths

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{EcommerceError, Result};

/// Write sites a test can make fail
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    InsertCart,
    InsertCartItem,
    InsertCartItemVariant,
    UpdateCartItem,
    SaveCartTotals,
    CheckoutCart,
    InsertOrder,
    InsertOrderItem,
    InsertOrderItemVariant,
    SetOrderStatus,
}

#[derive(Debug, Default)]
pub(crate) struct FaultInjector {
    // hits left before the point fails
    armed: Mutex<HashMap<FaultPoint, u32>>,
}

impl FaultInjector {
    /// Fails the `nth` (1-based) write at `point` from now on, once.
    pub(crate) fn arm(&self, point: FaultPoint, nth: u32) {
        let mut armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());
        armed.insert(point, nth.max(1));
    }

    pub(crate) fn check(&self, point: FaultPoint) -> Result<()> {
        let mut armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());
        let Some(remaining) = armed.get_mut(&point) else {
            return Ok(());
        };
        *remaining -= 1;
        if *remaining > 0 {
            return Ok(());
        }
        armed.remove(&point);
        tracing::debug!(?point, "Injected storage fault");
        Err(EcommerceError::Storage(format!("injected fault at {point:?}")))
    }
}
