use serde::Serialize;

use crate::models::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub base: Money,
    pub surcharge: Money,
    pub total: Money,
    pub days: u32,
    pub daily_rate: Money,
    pub extra_guests: u32,
}

/// Party size covered by the base rate: 80% of capacity, rounded up.
pub fn base_capacity(capacity: u32) -> u32 {
    // Never above `capacity`, so narrowing back is lossless.
    (u64::from(capacity) * 4).div_ceil(5) as u32
}

/// Per-day fee for each guest above base capacity: 20% of the daily rate,
/// rounded half up to the minor unit.
pub fn extra_guest_daily_fee(daily_rate: Money) -> Money {
    let fee = (i128::from(daily_rate.minor()) * 2 + 5) / 10;
    Money::from_minor(fee as i64)
}

/// Prices a stay. Inputs are assumed validated: non-negative rate,
/// `party_size >= 1`, `capacity >= 1`. Amounts saturate at `i64::MAX`
/// instead of overflowing.
pub fn compute_price(daily_rate: Money, days: u32, party_size: u32, capacity: u32) -> PriceBreakdown {
    let base = daily_rate * i64::from(days);

    let extra_guests = party_size.saturating_sub(base_capacity(capacity));
    let surcharge = extra_guest_daily_fee(daily_rate) * i64::from(extra_guests) * i64::from(days);

    PriceBreakdown {
        base,
        surcharge,
        total: base + surcharge,
        days,
        daily_rate,
        extra_guests,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_capacity_rounds_up() {
        assert_eq!(base_capacity(1), 1);
        assert_eq!(base_capacity(4), 4);
        assert_eq!(base_capacity(5), 4);
        assert_eq!(base_capacity(6), 5);
        assert_eq!(base_capacity(10), 8);
        assert_eq!(base_capacity(11), 9);
    }

    #[test]
    fn test_extra_guest_fee_rounds_half_up() {
        assert_eq!(extra_guest_daily_fee(Money::from_minor(10000)), Money::from_minor(2000));
        assert_eq!(extra_guest_daily_fee(Money::from_minor(12)), Money::from_minor(2));
        assert_eq!(extra_guest_daily_fee(Money::from_minor(13)), Money::from_minor(3));
        assert_eq!(extra_guest_daily_fee(Money::from_minor(0)), Money::ZERO);
    }

    #[test]
    fn test_full_party_surcharge() {
        // capacity 6, ¥100.00/day, 2 days, party of 6
        let price = compute_price(Money::from_minor(10000), 2, 6, 6);
        assert_eq!(price.base, Money::from_minor(20000));
        assert_eq!(price.extra_guests, 1);
        assert_eq!(price.surcharge, Money::from_minor(4000));
        assert_eq!(price.total, Money::from_minor(24000));
        assert_eq!(price.days, 2);
        assert_eq!(price.daily_rate, Money::from_minor(10000));
    }

    #[test]
    fn test_no_surcharge_within_base_capacity() {
        for capacity in 1..=20 {
            for party_size in 1..=base_capacity(capacity) {
                let price = compute_price(Money::from_minor(8888), 3, party_size, capacity);
                assert_eq!(price.total, price.base, "capacity {capacity}, party {party_size}");
                assert_eq!(price.surcharge, Money::ZERO);
                assert_eq!(price.extra_guests, 0);
            }
        }
    }

    #[test]
    fn test_total_never_below_base() {
        for capacity in 1..=12 {
            for party_size in 1..=capacity {
                for days in 0..=4 {
                    let price = compute_price(Money::from_minor(4550), days, party_size, capacity);
                    assert!(price.total >= price.base);
                    assert_eq!(price.total, price.base + price.surcharge);
                }
            }
        }
    }

    #[test]
    fn test_surcharge_strictly_increases_past_base_capacity() {
        for capacity in 2..=30 {
            let mut previous = None;
            for party_size in (base_capacity(capacity) + 1)..=capacity {
                let surcharge = compute_price(Money::from_minor(10000), 2, party_size, capacity).surcharge;
                if let Some(prev) = previous {
                    assert!(surcharge > prev, "capacity {capacity}, party {party_size}");
                }
                previous = Some(surcharge);
            }
        }
    }

    #[test]
    fn test_zero_days_costs_nothing() {
        let price = compute_price(Money::from_minor(10000), 0, 6, 6);
        assert_eq!(price.total, Money::ZERO);
    }

    #[test]
    fn test_huge_capacity_does_not_overflow() {
        assert_eq!(base_capacity(u32::MAX), 3_435_973_836);
        let price = compute_price(Money::from_minor(10000), 2, 6, 2_000_000_000);
        assert_eq!(price.extra_guests, 0);
        assert_eq!(price.total, Money::from_minor(20000));
    }

    #[test]
    fn test_huge_rate_saturates() {
        let rate = Money::from_minor(i64::MAX / 2);
        assert_eq!(extra_guest_daily_fee(rate), Money::from_minor(922_337_203_685_477_581));

        let price = compute_price(rate, 2, 1, 6);
        assert_eq!(price.base, Money::from_minor(i64::MAX - 1));
        assert_eq!(price.total, Money::from_minor(i64::MAX - 1));

        let price = compute_price(rate, 30, 50, 6);
        assert_eq!(price.base, Money::from_minor(i64::MAX));
        assert_eq!(price.total, Money::from_minor(i64::MAX));
    }
}
