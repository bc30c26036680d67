use std::collections::{
  BTreeMap,
  HashMap
};
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

/// Raw key/value configuration in the
/// calirc file format. Typed access
/// goes through [`CalendarConfig`].
#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  #[tracing::instrument(skip(
    calirc_override
  ))]
  pub fn load(
    calirc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    cfg.map.insert(
      "view.default".to_string(),
      "week".to_string()
    );
    cfg.map.insert(
      "color".to_string(),
      "on".to_string()
    );
    cfg.map.insert(
      "class.prefix".to_string(),
      "cali".to_string()
    );
    cfg.map.insert(
      "row.height".to_string(),
      "25".to_string()
    );
    cfg.map.insert(
      "month.row.height".to_string(),
      "25".to_string()
    );
    cfg.map.insert(
      "end.margin".to_string(),
      "50".to_string()
    );
    cfg.map.insert(
      "header.buttons".to_string(),
      "year,month,week,day,today,\
       prev,next"
        .to_string()
    );

    let calirc = resolve_calirc_path(
      calirc_override
    )?;
    if let Some(path) = calirc {
      info!(calirc = %path.display(), "loading calirc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no calirc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Month and day name tables used by
/// view titles. Day 0 is Sunday.
#[derive(Debug, Clone)]
pub struct Locale {
  pub month_names:       Vec<String>,
  pub month_names_short: Vec<String>,
  pub day_names:         Vec<String>,
  pub day_names_short:   Vec<String>
}

impl Default for Locale {
  fn default() -> Self {
    Self {
      month_names:       names(&[
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
      ]),
      month_names_short: names(&[
        "Jan", "Feb", "Mar", "Apr",
        "May", "June", "July", "Aug",
        "Sep", "Oct", "Nov", "Dec",
      ]),
      day_names:         names(&[
        "Sunday",
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
      ]),
      day_names_short:   names(&[
        "Sun", "Mon", "Tue", "Wed",
        "Thu", "Fri", "Sat",
      ])
    }
  }
}

fn names(
  raw: &[&str]
) -> Vec<String> {
  raw
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Typed projection of [`Config`],
/// passed into the controller at
/// construction. Geometry fields are
/// parameters only, never control
/// logic.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
  /// Attribute-name prefix for
  /// hosts that emit markup. Carried
  /// as data only; the terminal
  /// renderer never consumes it.
  pub class_prefix:     String,
  pub default_view:     String,
  pub header_buttons:   Vec<String>,
  pub button_labels:
    BTreeMap<String, String>,
  pub locale:           Locale,
  pub row_height:       f32,
  pub month_row_height: f32,
  pub end_margin:       f32,
  pub right_to_left:    bool
}

impl Default for CalendarConfig {
  fn default() -> Self {
    Self {
      class_prefix:     "cali"
        .to_string(),
      default_view:     "week"
        .to_string(),
      header_buttons:   names(&[
        "year", "month", "week",
        "day", "today", "prev",
        "next",
      ]),
      button_labels:
        BTreeMap::new(),
      locale:           Locale::default(
      ),
      row_height:       25.0,
      month_row_height: 25.0,
      end_margin:       50.0,
      right_to_left:    false
    }
  }
}

impl CalendarConfig {
  #[tracing::instrument(skip(cfg))]
  pub fn from_config(
    cfg: &Config
  ) -> Self {
    let mut out = Self::default();

    if let Some(v) =
      cfg.get("class.prefix")
    {
      out.class_prefix = v;
    }
    if let Some(v) =
      cfg.get("view.default")
    {
      out.default_view = v;
    }
    if let Some(v) =
      cfg.get("header.buttons")
    {
      out.header_buttons = v
        .split(',')
        .map(|b| {
          b.trim().to_string()
        })
        .filter(|b| !b.is_empty())
        .collect();
    }
    if let Some(v) = cfg.get("rtl") {
      out.right_to_left =
        parse_bool(&v);
    }

    out.row_height = numeric_field(
      cfg,
      "row.height",
      out.row_height
    );
    out.month_row_height =
      numeric_field(
        cfg,
        "month.row.height",
        out.month_row_height
      );
    out.end_margin = numeric_field(
      cfg,
      "end.margin",
      out.end_margin
    );

    out.locale = locale_from_config(
      cfg,
      Locale::default()
    );

    for (key, value) in cfg.iter() {
      if let Some(name) =
        key.strip_prefix(
          "button.label."
        )
      {
        out.button_labels.insert(
          name.to_string(),
          value.clone()
        );
      }
    }

    out
  }
}

fn numeric_field(
  cfg: &Config,
  key: &str,
  default: f32
) -> f32 {
  let Some(raw) = cfg.get(key) else {
    return default;
  };
  match raw.trim().parse::<f32>() {
    | Ok(v) if v.is_finite() => v,
    | _ => {
      warn!(
        key,
        value = %raw,
        "ignoring non-numeric \
         geometry setting"
      );
      default
    }
  }
}

fn locale_from_config(
  cfg: &Config,
  mut locale: Locale
) -> Locale {
  if let Some(v) = locale_table(
    cfg,
    "locale.month.names",
    12
  ) {
    locale.month_names = v;
  }
  if let Some(v) = locale_table(
    cfg,
    "locale.month.names.short",
    12
  ) {
    locale.month_names_short = v;
  }
  if let Some(v) = locale_table(
    cfg,
    "locale.day.names",
    7
  ) {
    locale.day_names = v;
  }
  if let Some(v) = locale_table(
    cfg,
    "locale.day.names.short",
    7
  ) {
    locale.day_names_short = v;
  }
  locale
}

fn locale_table(
  cfg: &Config,
  key: &str,
  expected: usize
) -> Option<Vec<String>> {
  let raw = cfg.get(key)?;
  let values: Vec<String> = raw
    .split(',')
    .map(|v| v.trim().to_string())
    .collect();
  if values.len() == expected {
    Some(values)
  } else {
    warn!(
      key,
      got = values.len(),
      expected,
      "ignoring locale table of \
       wrong length"
    );
    None
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_calirc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(calirc_env) =
    std::env::var("CALIRC")
  {
    if calirc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      calirc_env
    )));
  }

  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  let candidate = home.join(".calirc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

pub fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn defaults() -> Config {
    Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    }
  }

  #[test]
  fn typed_defaults_match_widget() {
    let ccfg =
      CalendarConfig::default();
    assert_eq!(
      ccfg.class_prefix,
      "cali"
    );
    assert_eq!(
      ccfg.default_view,
      "week"
    );
    assert_eq!(ccfg.row_height, 25.0);
    assert!(!ccfg.right_to_left);
    assert_eq!(
      ccfg.locale.day_names[0],
      "Sunday"
    );
  }

  #[test]
  fn overrides_reach_typed_config() {
    let mut cfg = defaults();
    cfg.apply_overrides(vec![
      (
        "rc.view.default".to_string(),
        "month".to_string()
      ),
      (
        "rtl".to_string(),
        "yes".to_string()
      ),
      (
        "row.height".to_string(),
        "40".to_string()
      ),
    ]);

    let ccfg =
      CalendarConfig::from_config(
        &cfg
      );
    assert_eq!(
      ccfg.default_view,
      "month"
    );
    assert!(ccfg.right_to_left);
    assert_eq!(ccfg.row_height, 40.0);
  }

  #[test]
  fn bad_geometry_value_keeps_default()
  {
    let mut cfg = defaults();
    cfg.apply_overrides(vec![(
      "end.margin".to_string(),
      "wide".to_string()
    )]);

    let ccfg =
      CalendarConfig::from_config(
        &cfg
      );
    assert_eq!(
      ccfg.end_margin,
      50.0
    );
  }

  #[test]
  fn short_locale_table_is_ignored() {
    let mut cfg = defaults();
    cfg.apply_overrides(vec![(
      "locale.day.names".to_string(),
      "Dim,Lun".to_string()
    )]);

    let ccfg =
      CalendarConfig::from_config(
        &cfg
      );
    assert_eq!(
      ccfg.locale.day_names.len(),
      7
    );
    assert_eq!(
      ccfg.locale.day_names[0],
      "Sunday"
    );
  }

  #[test]
  fn button_labels_are_collected() {
    let mut cfg = defaults();
    cfg.apply_overrides(vec![(
      "button.label.today"
        .to_string(),
      "Now".to_string()
    )]);

    let ccfg =
      CalendarConfig::from_config(
        &cfg
      );
    assert_eq!(
      ccfg
        .button_labels
        .get("today")
        .map(String::as_str),
      Some("Now")
    );
  }
}
