//! Opportunistic extraction of budget amounts and contact numbers.
//!
//! Runs on every reply regardless of the classified intent. Operates on the
//! normalized (lower-cased, trimmed) text.

use std::ops::Range;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use super::types::ExtractedInfo;

/// A currency-adjacent number: "bd 20", "$15", "20 bd", "1,200 dinars".
static BUDGET: LazyLock<Regex> = LazyLock::new(|| {
    const AMOUNT: &str = r"(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)";
    Regex::new(&format!(
        r"(?:(?:\b(?:bd|bhd|usd)|\$)\s*{AMOUNT})|(?:{AMOUNT}\s*(?:\$|(?:bd|bhd|usd|dinars?|dollars?)\b))"
    ))
    .unwrap()
});

/// Phone-like run: digit groups joined by at most one space, dash or dot,
/// with an optional leading '+' and parenthesized area codes.
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?(?:\(\d+\)|\d+)(?:[ \-.]?(?:\(\d+\)|\d+))*").unwrap()
});

static DIGIT_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// ISO dates look like phone numbers once the dashes are gone.
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// Extract everything we know how to find. `None` when nothing was found.
pub fn extract(normalized: &str) -> Option<ExtractedInfo> {
    let budget = extract_budget(normalized);
    let contact = extract_contact(normalized);

    if budget.is_none() && contact.is_none() {
        return None;
    }
    Some(ExtractedInfo { budget, contact })
}

/// First positive currency amount in the text.
pub fn extract_budget(normalized: &str) -> Option<Decimal> {
    BUDGET.captures_iter(normalized).find_map(|caps| {
        let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
        let amount = Decimal::from_str(&raw.replace(',', "")).ok()?;
        (amount > Decimal::ZERO).then_some(amount)
    })
}

/// First phone-like token with 7–15 digits, formatting stripped. Digits
/// that belong to a budget amount are never part of a contact.
pub fn extract_contact(normalized: &str) -> Option<String> {
    let budgets: Vec<Range<usize>> = BUDGET.find_iter(normalized).map(|m| m.range()).collect();

    PHONE.find_iter(normalized).find_map(|m| {
        if ISO_DATE.is_match(m.as_str()) {
            return None;
        }

        let groups = DIGIT_GROUP.find_iter(m.as_str()).filter(|g| {
            let (start, end) = (m.start() + g.start(), m.start() + g.end());
            !budgets.iter().any(|b| start < b.end && b.start < end)
        });
        phone_run(groups.map(|g| (g.start(), g.as_str())), m.as_str().starts_with('+'))
    })
}

/// First run of consecutive digit groups within the phone length limits.
/// A run that would grow past the limit ends there if it is already long
/// enough, otherwise it restarts at the next group.
fn phone_run<'a>(groups: impl Iterator<Item = (usize, &'a str)>, plus: bool) -> Option<String> {
    let mut run = String::new();
    let mut run_start = 0;

    for (offset, group) in groups {
        if run.len() + group.len() > MAX_PHONE_DIGITS {
            if run.len() >= MIN_PHONE_DIGITS {
                break;
            }
            run.clear();
            if group.len() > MAX_PHONE_DIGITS {
                continue;
            }
        }
        if run.is_empty() {
            run_start = offset;
        }
        run.push_str(group);
    }

    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&run.len()) {
        return None;
    }
    // The '+' only belongs to a run that starts right after it.
    if plus && run_start == 1 {
        Some(format!("+{run}"))
    } else {
        Some(run)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn budget_with_prefix_currency() {
        assert_eq!(extract_budget("i need bd 20 for parking"), Some(dec!(20)));
        assert_eq!(extract_budget("taxi was $15.50"), Some(dec!(15.50)));
        assert_eq!(extract_budget("bhd7.5 for lunch"), Some(dec!(7.5)));
    }

    #[test]
    fn budget_with_suffix_currency() {
        assert_eq!(extract_budget("it costs 20 bd"), Some(dec!(20)));
        assert_eq!(extract_budget("about 1,200 dinars total"), Some(dec!(1200)));
        assert_eq!(extract_budget("30 dollars"), Some(dec!(30)));
    }

    #[test]
    fn budget_takes_first_candidate() {
        assert_eq!(extract_budget("bd 5 now and bd 10 later"), Some(dec!(5)));
    }

    #[test]
    fn budget_skips_zero_amounts() {
        assert_eq!(extract_budget("bd 0 so far, then bd 12"), Some(dec!(12)));
        assert_eq!(extract_budget("$0"), None);
    }

    #[test]
    fn bare_numbers_are_not_budgets() {
        assert_eq!(extract_budget("be there in 20 minutes"), None);
        assert_eq!(extract_budget("abd 20"), None);
    }

    #[test]
    fn contact_normalizes_formatting() {
        assert_eq!(
            extract_contact("call him on +973 3312-3456"),
            Some("+97333123456".into())
        );
        assert_eq!(
            extract_contact("number is (039) 555.1234"),
            Some("0395551234".into())
        );
        assert_eq!(extract_contact("reach me 33123456"), Some("33123456".into()));
    }

    #[test]
    fn short_numbers_are_not_contacts() {
        assert_eq!(extract_contact("room 12345"), None);
        assert_eq!(extract_contact("in 10 minutes"), None);
    }

    #[test]
    fn budget_digits_stay_out_of_contact() {
        assert_eq!(extract_contact("bd 20 33123456"), Some("33123456".into()));
        let info = extract("bd 20 33123456").unwrap();
        assert_eq!(info.budget, Some(dec!(20)));
        assert_eq!(info.contact.as_deref(), Some("33123456"));
    }

    #[test]
    fn adjacent_numbers_yield_the_first() {
        assert_eq!(
            extract_contact("call 33123456 39987766"),
            Some("33123456".into())
        );
        assert_eq!(
            extract_contact("+973 33123456 39987766"),
            Some("+97333123456".into())
        );
    }

    #[test]
    fn times_are_not_contacts() {
        assert_eq!(extract_contact("meeting 10.30 - 11.45"), None);
        assert_eq!(extract_contact("from 9-5 then 10.30"), None);
    }

    #[test]
    fn overlong_digit_runs_are_skipped() {
        assert_eq!(extract_contact("ref 12345678901234567"), None);
        assert_eq!(
            extract_contact("ref 12345678901234567 33123456"),
            Some("33123456".into())
        );
    }

    #[test]
    fn dates_are_not_contacts() {
        assert_eq!(extract_contact("filed on 2024-10-19"), None);
    }

    #[test]
    fn extract_none_when_nothing_found() {
        assert!(extract("on my way").is_none());
    }

    #[test]
    fn extract_both_fields() {
        let info = extract("need bd 20, call +97333123456").unwrap();
        assert_eq!(info.budget, Some(dec!(20)));
        assert_eq!(info.contact.as_deref(), Some("+97333123456"));
    }
}
