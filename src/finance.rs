//! General functions related to finance.
use crate::units::{Carbon, CarbonPerCapacity, Dimensionless, Money, MoneyPerCapacity};

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualise capital costs over the lifetime of an investment.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(lifetime as f64);
    }

    #[allow(clippy::cast_possible_wrap)]
    let factor = (Dimensionless(1.0) + discount_rate).powi(lifetime as i32);
    (discount_rate * factor) / (factor - Dimensionless(1.0))
}

/// Calculates the annual capital cost per unit of capacity
pub fn annual_capital_cost(
    capital_cost: MoneyPerCapacity,
    lifetime: u32,
    discount_rate: Dimensionless,
) -> MoneyPerCapacity {
    capital_cost * capital_recovery_factor(lifetime, discount_rate)
}

/// Annualise a lump-sum cost (e.g. a fixed installation or retrofit cost)
pub fn annualised_cost(cost: Money, lifetime: u32, discount_rate: Dimensionless) -> Money {
    cost * capital_recovery_factor(lifetime, discount_rate)
}

/// Spread embodied emissions per unit of capacity evenly over the lifetime
pub fn annual_embodied_carbon(embodied: CarbonPerCapacity, lifetime: u32) -> CarbonPerCapacity {
    if lifetime == 0 {
        return CarbonPerCapacity(0.0);
    }

    embodied / Dimensionless(lifetime as f64)
}

/// Annualise a lump of embodied emissions over the lifetime
pub fn annualised_carbon(carbon: Carbon, lifetime: u32) -> Carbon {
    if lifetime == 0 {
        return Carbon(0.0);
    }

    carbon / Dimensionless(lifetime as f64)
}
