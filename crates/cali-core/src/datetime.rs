use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  Months,
  NaiveDate,
  NaiveDateTime,
  NaiveTime
};
use regex::Regex;

use crate::config::Locale;

fn hms(
  hour: u32,
  minute: u32,
  second: u32
) -> NaiveTime {
  NaiveTime::from_hms_opt(
    hour, minute, second
  )
  .unwrap_or(NaiveTime::MIN)
}

#[must_use]
pub fn day_start(
  date: NaiveDate
) -> NaiveDateTime {
  date.and_time(NaiveTime::MIN)
}

/// Last covered instant of `date`.
/// View ranges carry inclusive
/// 23:59:59 day-end bounds.
#[must_use]
pub fn day_end(
  date: NaiveDate
) -> NaiveDateTime {
  date.and_time(hms(23, 59, 59))
}

/// Day 0 of the week containing
/// `date` (Sunday-start weeks).
#[must_use]
pub fn week_start(
  date: NaiveDate
) -> NaiveDate {
  let back = date
    .weekday()
    .num_days_from_sunday()
    as i64;
  date
    .checked_sub_signed(
      Duration::days(back)
    )
    .unwrap_or(date)
}

#[must_use]
pub fn week_end(
  date: NaiveDate
) -> NaiveDate {
  week_start(date)
    .checked_add_signed(
      Duration::days(6)
    )
    .unwrap_or(date)
}

#[must_use]
pub fn month_start(
  date: NaiveDate
) -> NaiveDate {
  date.with_day(1).unwrap_or(date)
}

#[must_use]
pub fn month_end(
  date: NaiveDate
) -> NaiveDate {
  let next = add_months(
    month_start(date),
    1
  );
  next
    .checked_sub_signed(
      Duration::days(1)
    )
    .unwrap_or(date)
}

#[must_use]
pub fn year_start(
  date: NaiveDate
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    date.year(),
    1,
    1
  )
  .unwrap_or(date)
}

#[must_use]
pub fn year_end(
  date: NaiveDate
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    date.year(),
    12,
    31
  )
  .unwrap_or(date)
}

/// Calendar-month stepping. The day
/// of month is preserved where valid
/// and clamped to the destination
/// month's last day otherwise, so a
/// Jan 31 round-trip comes back
/// clamped to February's length.
#[must_use]
pub fn add_months(
  date: NaiveDate,
  delta: i32
) -> NaiveDate {
  if delta >= 0 {
    date
      .checked_add_months(Months::new(
        delta as u32
      ))
      .unwrap_or(date)
  } else {
    date
      .checked_sub_months(Months::new(
        delta.unsigned_abs()
      ))
      .unwrap_or(date)
  }
}

/// Locale-table date formatter with
/// the title tokens `YYYY`,
/// `MMMM`, `MMM`, `dddd`, `ddd`, `D`.
/// Tokens are scanned left to right,
/// so substituted names (eg
/// "December") are never re-matched.
#[must_use]
pub fn format_date(
  date: NaiveDate,
  pattern: &str,
  locale: &Locale
) -> String {
  let month =
    date.month0() as usize;
  let dow = date
    .weekday()
    .num_days_from_sunday()
    as usize;

  let mut out = String::with_capacity(
    pattern.len()
  );
  let mut rest = pattern;
  while !rest.is_empty() {
    if let Some(tail) =
      rest.strip_prefix("YYYY")
    {
      out.push_str(
        &date.year().to_string()
      );
      rest = tail;
    } else if let Some(tail) =
      rest.strip_prefix("MMMM")
    {
      out.push_str(
        &locale.month_names[month]
      );
      rest = tail;
    } else if let Some(tail) =
      rest.strip_prefix("MMM")
    {
      out.push_str(
        &locale.month_names_short
          [month]
      );
      rest = tail;
    } else if let Some(tail) =
      rest.strip_prefix("dddd")
    {
      out.push_str(
        &locale.day_names[dow]
      );
      rest = tail;
    } else if let Some(tail) =
      rest.strip_prefix("ddd")
    {
      out.push_str(
        &locale.day_names_short[dow]
      );
      rest = tail;
    } else if let Some(tail) =
      rest.strip_prefix('D')
    {
      out.push_str(
        &date.day().to_string()
      );
      rest = tail;
    } else {
      let mut chars = rest.chars();
      if let Some(ch) = chars.next()
      {
        out.push(ch);
      }
      rest = chars.as_str();
    }
  }

  out
}

#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  now: NaiveDateTime
) -> anyhow::Result<NaiveDateTime> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "now" => return Ok(now),
    | "today" => {
      return Ok(day_start(now.date()));
    }
    | "tomorrow" => {
      return Ok(
        day_start(now.date())
          + Duration::days(1)
      );
    }
    | "yesterday" => {
      return Ok(
        day_start(now.date())
          - Duration::days(1)
      );
    }
    | _ => {}
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let duration = match unit {
      | "d" => Duration::days(num),
      | "w" => Duration::days(7 * num),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };

    return Ok(
      if sign == "-" {
        now - duration
      } else {
        now + duration
      }
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(day_start(date));
  }

  for fmt in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt);
    }
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     +Nd/-Nd, +Nw/-Nw, YYYY-MM-DD, \
     YYYY-MM-DDTHH:MM, \
     YYYY-MM-DD HH:MM"
  })
}

pub mod wall_time_serde {
  use chrono::NaiveDateTime;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  const WRITE_FORMAT: &str =
    "%Y-%m-%d %H:%M:%S";
  const READ_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S"
  ];

  pub fn serialize<S>(
    dt: &NaiveDateTime,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &dt
        .format(WRITE_FORMAT)
        .to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDateTime, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    for fmt in READ_FORMATS {
      if let Ok(ndt) =
        NaiveDateTime::parse_from_str(
          &raw, fmt
        )
      {
        return Ok(ndt);
      }
    }
    Err(serde::de::Error::custom(
      format!(
        "unrecognized wall-clock \
         datetime: {raw}"
      )
    ))
  }
}
