use jiff::{Span, Zoned, civil::Date};

use crate::reconcile::AgeFilter;

/// Builds the SEARCH criteria for an age window. Deleted-but-unexpunged
/// messages never participate. The maximum age bounds the send date, the
/// minimum age bounds the arrival date.
pub fn search_criteria(filter: &AgeFilter, today: Date) -> String {
    let mut criteria = String::from("(UNDELETED");
    if let Some(max_days) = filter.max_days {
        criteria.push_str(" SENTSINCE ");
        criteria.push_str(&imap_date(today, max_days));
    }
    if let Some(min_days) = filter.min_days {
        criteria.push_str(" SINCE ");
        criteria.push_str(&imap_date(today, min_days));
    }
    criteria.push(')');
    criteria
}

pub fn today() -> Date {
    Zoned::now().date()
}

fn imap_date(today: Date, days_back: u32) -> String {
    let date = today.saturating_sub(Span::new().days(i64::from(days_back)));
    date.strftime("%d-%b-%Y").to_string()
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::empty(AgeFilter::default(), "(UNDELETED)")]
    #[case::max_only(
        AgeFilter { min_days: None, max_days: Some(30) },
        "(UNDELETED SENTSINCE 15-Feb-2026)"
    )]
    #[case::min_only(
        AgeFilter { min_days: Some(7), max_days: None },
        "(UNDELETED SINCE 10-Mar-2026)"
    )]
    #[case::both(
        AgeFilter { min_days: Some(7), max_days: Some(30) },
        "(UNDELETED SENTSINCE 15-Feb-2026 SINCE 10-Mar-2026)"
    )]
    fn test_search_criteria(#[case] filter: AgeFilter, #[case] expected: &str) {
        let today = date(2026, 3, 17);
        assert_eq!(expected, search_criteria(&filter, today));
    }

    #[test]
    fn test_imap_date_crosses_year_boundaries() {
        assert_eq!("22-Dec-2025", imap_date(date(2026, 1, 5), 14));
    }
}
