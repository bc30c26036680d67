use anyhow::bail;
use tracing::{debug, instrument};

use crate::cli::{Invocation, NavOp};
use crate::controller::CalendarController;
use crate::render::Renderer;

/// Applies an invocation to the controller: select the view, replay
/// the navigation ops in order, then run the output command. This is
/// the only place the CLI touches controller state.
#[instrument(skip(controller, renderer, inv), fields(view = %inv.view, command = %inv.command))]
pub fn dispatch(
    controller: &mut CalendarController,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    controller.set_view(&inv.view)?;

    for op in &inv.nav {
        match op {
            NavOp::Next => controller.next(),
            NavOp::Prev => controller.prev(),
            NavOp::Today => controller.today(),
        }
    }
    debug!(active = %controller.active_date(), "navigation applied");

    match inv.command.as_str() {
        "show" => {
            renderer.print_header(
                &controller.title()?,
                controller.config(),
                controller.current_view(),
            )?;
            renderer.print_layout(&controller.layout()?)?;
        }
        "title" => {
            println!("{}", controller.title()?);
        }
        "range" => {
            renderer.print_range(&controller.view_range()?)?;
        }
        other => bail!("unknown command: {other}"),
    }

    Ok(())
}
