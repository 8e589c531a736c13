//! Lenient translation of external field values.
//!
//! External records carry one-letter direction and status codes and loosely
//! formatted dates. Nothing here fails: unknown codes map to the default and
//! unusable dates become absent.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::case::{Direction, Status};

/// `I` → in, `U` → out; anything else (including empty) → internal.
pub fn map_direction(code: &str) -> Direction {
  match code.trim() {
    "I" => Direction::In,
    "U" => Direction::Out,
    _ => Direction::Internal,
  }
}

/// `Ö` → in progress, `A` → closed; anything else (including empty) → new.
pub fn map_status(code: &str) -> Status {
  match code.trim() {
    "Ö" => Status::InProgress,
    "A" => Status::Closed,
    _ => Status::New,
  }
}

/// An ISO `YYYY-MM-DD` date, or `None` when blank or malformed.
pub fn normalize_date(value: &str) -> Option<NaiveDate> {
  let value = value.trim();
  if value.is_empty() {
    return None;
  }
  NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// The date portion of a `YYYY-MM-DDThh:mm:ss` timestamp, as midnight.
///
/// Everything after the date/time separator is discarded.
pub fn normalize_timestamp(value: &str) -> Option<NaiveDateTime> {
  let date_part = value.trim().split(['T', ' ']).next()?;
  normalize_date(date_part).map(|d| d.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn direction_codes() {
    assert_eq!(map_direction("I"), Direction::In);
    assert_eq!(map_direction("U"), Direction::Out);
    assert_eq!(map_direction(""), Direction::Internal);
    assert_eq!(map_direction("X"), Direction::Internal);
  }

  #[test]
  fn status_codes() {
    assert_eq!(map_status("Ö"), Status::InProgress);
    assert_eq!(map_status("A"), Status::Closed);
    assert_eq!(map_status(""), Status::New);
    assert_eq!(map_status("?"), Status::New);
  }

  #[test]
  fn dates_pass_through_or_vanish() {
    assert_eq!(normalize_date("2023-11-05"), NaiveDate::from_ymd_opt(2023, 11, 5));
    assert_eq!(normalize_date(""), None);
    assert_eq!(normalize_date("5 nov 2023"), None);
  }

  #[test]
  fn timestamps_are_truncated_to_their_date() {
    let expected = NaiveDate::from_ymd_opt(2023, 11, 5)
      .unwrap()
      .and_hms_opt(0, 0, 0);
    assert_eq!(normalize_timestamp("2023-11-05T14:22:09"), expected);
    assert_eq!(normalize_timestamp("2023-11-05"), expected);
    assert_eq!(normalize_timestamp("T14:22"), None);
    assert_eq!(normalize_timestamp(""), None);
  }
}
