//! Static contingency rates used when the live carrier is unavailable.
//!
//! 2026 estimates for a 1 kg parcel shipped from São Paulo.

use rust_decimal::Decimal;

use vitrine_core::StateCode;

/// PAC and SEDEX price and lead time for one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackRate {
    pub pac: Decimal,
    pub pac_days: u32,
    pub sedex: Decimal,
    pub sedex_days: u32,
}

fn rate(pac_cents: i64, pac_days: u32, sedex_cents: i64, sedex_days: u32) -> FallbackRate {
    FallbackRate {
        pac: Decimal::new(pac_cents, 2),
        pac_days,
        sedex: Decimal::new(sedex_cents, 2),
        sedex_days,
    }
}

/// Contingency rate for `state`.
#[must_use]
pub fn rate_for(state: StateCode) -> FallbackRate {
    match state {
        StateCode::Sp => rate(2280, 5, 2850, 1),
        StateCode::Rj => rate(2640, 7, 4290, 2),
        StateCode::Mg => rate(2710, 7, 4520, 2),
        StateCode::Es => rate(3250, 8, 5860, 3),
        StateCode::Pr => rate(2830, 7, 4810, 2),
        StateCode::Sc => rate(3290, 8, 6240, 3),
        StateCode::Rs => rate(3560, 9, 7580, 3),
        StateCode::Df => rate(3520, 8, 6510, 2),
        StateCode::Go => rate(3840, 9, 7250, 3),
        StateCode::Ms => rate(4210, 10, 8530, 3),
        StateCode::Mt => rate(5570, 11, 9890, 4),
        StateCode::Ba => rate(5230, 12, 9540, 4),
        StateCode::Pe => rate(6580, 14, 11520, 4),
        StateCode::Ce => rate(6850, 15, 12060, 4),
        StateCode::Rn => rate(7210, 16, 12590, 5),
        StateCode::Pb => rate(7040, 15, 12230, 5),
        StateCode::Al => rate(6890, 14, 11870, 4),
        StateCode::Se => rate(6520, 13, 11510, 4),
        StateCode::Ma => rate(7560, 16, 13050, 5),
        StateCode::Pi => rate(7280, 15, 12840, 5),
        StateCode::Pa => rate(7890, 18, 13520, 5),
        StateCode::Am => rate(9540, 22, 15580, 6),
        StateCode::Ap => rate(8510, 20, 14530, 6),
        StateCode::Ro => rate(8870, 18, 15090, 6),
        StateCode::Rr => rate(9850, 25, 16510, 7),
        StateCode::Ac => rate(9230, 22, 16040, 7),
        StateCode::To => rate(6550, 12, 11020, 4),
    }
}
