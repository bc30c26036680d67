pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod datetime;
pub mod error;
pub mod event;
pub mod overlap;
pub mod render;
pub mod store;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::{
  debug,
  info,
  warn
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting cali CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.calirc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let calendar_cfg =
    config::CalendarConfig::from_config(
      &cfg
    );

  let events_path = cli
    .events
    .clone()
    .or_else(|| {
      cfg
        .get("events.file")
        .map(|raw| {
          config::expand_tilde(
            std::path::Path::new(&raw)
          )
        })
    });

  let store = match events_path {
    | Some(path) => {
      let events =
        store::load_events(&path)
          .with_context(|| {
            format!(
              "failed to load events \
               from {}",
              path.display()
            )
          })?;
      store::EventStore::with_events(
        events
      )?
    }
    | None => {
      warn!(
        "no events file configured; \
         starting empty"
      );
      store::EventStore::new()
    }
  };

  let now =
    Local::now().naive_local();
  let active = match cli.date.as_deref()
  {
    | Some(expr) => {
      datetime::parse_date_expr(
        expr, now
      )?
    }
    | None => now
  };

  let mut controller =
    controller::CalendarController::new(
      store,
      calendar_cfg
    )
    .with_active_date(active);

  let mut renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    &mut controller,
    &mut renderer,
    inv
  )?;

  info!("done");
  Ok(())
}
