use rust_decimal::Decimal;

/// Automatic day-count discount as a step function over rental days.
/// Boundaries are inclusive; rates are never interpolated.
pub fn day_discount_rate(days: u32) -> Decimal {
    match days {
        0 | 1 => Decimal::ZERO,
        2 => Decimal::new(15, 2),
        3..=6 => Decimal::new(20, 2),
        7..=29 => Decimal::new(50, 2),
        _ => Decimal::new(60, 2),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::day_discount_rate;

    #[test]
    fn tier_table_is_exact_at_boundaries() {
        let expected = [
            (1u32, Decimal::ZERO),
            (2, Decimal::new(15, 2)),
            (3, Decimal::new(20, 2)),
            (6, Decimal::new(20, 2)),
            (7, Decimal::new(50, 2)),
            (29, Decimal::new(50, 2)),
            (30, Decimal::new(60, 2)),
        ];
        for (days, rate) in expected {
            assert_eq!(day_discount_rate(days), rate, "days={days}");
        }
    }

    #[test]
    fn rate_is_always_a_known_step() {
        let steps = [
            Decimal::ZERO,
            Decimal::new(15, 2),
            Decimal::new(20, 2),
            Decimal::new(50, 2),
            Decimal::new(60, 2),
        ];
        for days in 1..=120 {
            assert!(steps.contains(&day_discount_rate(days)), "days={days}");
        }
    }

    #[test]
    fn long_rentals_cap_at_sixty_percent() {
        assert_eq!(day_discount_rate(365), Decimal::new(60, 2));
    }
}
