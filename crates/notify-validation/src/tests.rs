//! Property-based tests with proptest.

use crate::*;
use proptest::prelude::*;

fn operator() -> impl Strategy<Value = MatchOperator> {
    prop_oneof![
        Just(MatchOperator::Equal),
        Just(MatchOperator::NotEqual),
        Just(MatchOperator::Regex),
        Just(MatchOperator::NotRegex),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // -------------------------------------------------------------------------
    // Durations
    // -------------------------------------------------------------------------

    #[test]
    fn prop_format_then_parse_is_identity(secs in 0u64..=10 * 365 * 24 * 3600) {
        let ms = secs * 1000;
        prop_assert_eq!(parse_duration(&format_duration(ms)).ok(), Some(ms));
    }

    #[test]
    fn prop_human_duration_text_round_trip(secs in 0u64..=1_000_000_000) {
        let duration = HumanDuration::from_secs(secs);
        let parsed: HumanDuration = duration.to_string().parse().unwrap();
        prop_assert_eq!(parsed, duration);
    }

    #[test]
    fn prop_unknown_units_fail(value in 1u64..10_000, unit in "[a-zA-Z&&[^yMwdhms]]") {
        let input = format!("{value}{unit}");
        prop_assert!(parse_duration(&input).is_err());
    }

    // -------------------------------------------------------------------------
    // Time interval lists
    // -------------------------------------------------------------------------

    #[test]
    fn prop_days_in_range_pass(day in 1i32..=31, negative in any::<bool>()) {
        let day = if negative { -day } else { day };
        prop_assert!(validate_day_of_month_list(&day.to_string()).is_ok());
    }

    #[test]
    fn prop_days_out_of_range_fail(day in 32i32..=99, negative in any::<bool>()) {
        let day = if negative { -day } else { day };
        prop_assert!(validate_day_of_month_list(&day.to_string()).is_err());
    }

    #[test]
    fn prop_four_digit_years_pass(start in 1000i32..=9999, end in 1000i32..=9999) {
        let input = format!("{start}:{end}");
        prop_assert!(validate_year_list(&input).is_ok());
    }

    #[test]
    fn prop_valid_time_ranges_pass(start in 0u32..1439, len in 1u32..=1440) {
        let end = (start + len).min(MINUTES_PER_DAY);
        prop_assume!(end > start);
        let range = TimeRange::new(
            format!("{:02}:{:02}", start / 60, start % 60),
            format!("{:02}:{:02}", end / 60, end % 60),
        );
        prop_assert!(validate_time_range(&range).is_ok());
        prop_assert_eq!(range.minutes().ok(), Some((start, end)));
    }

    // -------------------------------------------------------------------------
    // Matchers
    // -------------------------------------------------------------------------

    #[test]
    fn prop_matcher_display_round_trip(
        name in "[a-zA-Z_][a-zA-Z0-9_]{0,15}",
        op in operator(),
        value in "[ -~]{0,20}",
    ) {
        let matcher = Matcher::new(name, op, value);
        prop_assume!(matcher.is_ok());
        let matcher = matcher.unwrap();
        let text = matcher_to_display_string(&matcher);
        prop_assert_eq!(parse_matcher(&text).unwrap(), matcher.clone());
        prop_assert_eq!(parse_matcher_list(&text).unwrap(), vec![matcher]);
    }

    #[test]
    fn prop_matcher_list_preserves_order(names in prop::collection::vec("[a-z]{1,8}", 1..6)) {
        let text = names
            .iter()
            .map(|n| format!("{n}=v"))
            .collect::<Vec<_>>()
            .join(",");
        let parsed = parse_matcher_list(&text).unwrap();
        let parsed_names: Vec<_> = parsed.into_iter().map(|m| m.name).collect();
        prop_assert_eq!(parsed_names, names);
    }

    #[test]
    fn prop_equal_matches_own_value(name in "[a-z]{1,8}", value in "[a-zA-Z0-9 ]{0,12}") {
        let matcher = Matcher::new(name.clone(), MatchOperator::Equal, value.clone()).unwrap();
        let labels: Labels = [(name, value)].into_iter().collect();
        prop_assert!(matcher.matches(&labels));
    }
}
