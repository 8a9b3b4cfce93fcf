use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Manual discount layer: a percentage and a fixed amount, both computed
/// against the gross eligible base (never against the tier-discounted
/// remainder), with the fixed part clamped so the combined manual discount
/// can never exceed the eligible base.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraDiscount {
    pub eligible_base: Decimal,
    pub pct_extra: Decimal,
    pub fixed_extra: Decimal,
}

impl ExtraDiscount {
    pub fn total(&self) -> Decimal {
        self.pct_extra + self.fixed_extra
    }
}

pub fn extra_discount(eligible_base: Decimal, rate: Decimal, fixed: Decimal) -> ExtraDiscount {
    let pct_extra = eligible_base * rate;
    let max_fixed = (eligible_base - pct_extra).max(Decimal::ZERO);
    let fixed_extra = fixed.min(max_fixed);
    ExtraDiscount { eligible_base, pct_extra, fixed_extra }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::extra_discount;

    #[test]
    fn percentage_and_fixed_are_added() {
        let extra = extra_discount(Decimal::new(800, 0), Decimal::new(10, 2), Decimal::new(50, 0));
        assert_eq!(extra.pct_extra, Decimal::new(80, 0));
        assert_eq!(extra.fixed_extra, Decimal::new(50, 0));
        assert_eq!(extra.total(), Decimal::new(130, 0));
    }

    #[test]
    fn fixed_part_is_clamped_to_remaining_base() {
        let extra =
            extra_discount(Decimal::new(800, 0), Decimal::new(10, 2), Decimal::new(5_000, 0));
        // max_fixed = 800 - 80 = 720
        assert_eq!(extra.fixed_extra, Decimal::new(720, 0));
        assert_eq!(extra.total(), Decimal::new(800, 0));
    }

    #[test]
    fn full_rate_leaves_no_room_for_fixed() {
        let extra = extra_discount(Decimal::new(500, 0), Decimal::ONE, Decimal::new(100, 0));
        assert_eq!(extra.pct_extra, Decimal::new(500, 0));
        assert_eq!(extra.fixed_extra, Decimal::ZERO);
    }

    #[test]
    fn never_exceeds_eligible_base() {
        let bases = [Decimal::ZERO, Decimal::new(1, 0), Decimal::new(123_456, 2)];
        let rates = [Decimal::ZERO, Decimal::new(33, 2), Decimal::ONE];
        let fixeds = [Decimal::ZERO, Decimal::new(99_999, 0)];
        for base in bases {
            for rate in rates {
                for fixed in fixeds {
                    let extra = extra_discount(base, rate, fixed);
                    assert!(
                        extra.total() <= base,
                        "base={base} rate={rate} fixed={fixed} total={}",
                        extra.total()
                    );
                }
            }
        }
    }
}
