//! CBS period codes.
//!
//! Annual periods are written `YYYYJJ00` ("jaar"); some exports carry a bare
//! `YYYY`. Quarterly (`KW`) and monthly (`MM`) codes are not annual and
//! yield no year.

/// Extracts the calendar year from a period code, or `None` if the code is
/// not an annual period.
pub fn year_from_period(period: &str) -> Option<i32> {
    let p = period.trim();
    let (year, rest) = p.split_at_checked(4)?;
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let annual = rest.is_empty()
        || rest
            .strip_prefix("JJ")
            .is_some_and(|n| n.len() == 2 && n.bytes().all(|b| b.is_ascii_digit()));
    if annual { year.parse().ok() } else { None }
}
