//! Push payload resolution: show what a notification points at.

use alarmist_api::Alarm;
use alarmist_config::Config;
use alarmist_core::{AlarmFilter, FeedKind, NavigationTarget, PushNotification};

use crate::cli::{GlobalOpts, OpenArgs, PagingArgs};
use crate::config::CliSession;
use crate::error::CliError;
use crate::output;

use super::{alarms, util};

pub async fn handle(
    session: &CliSession,
    args: OpenArgs,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let raw = util::read_input(&args.payload)?;
    let notification = PushNotification::from_json(&raw)?;

    // A payload carrying the whole alarm needs no session.
    let notification = match notification {
        PushNotification::Alarm(alarm) => return show_alarm(&alarm, global),
        other => other,
    };

    let client = util::restored_client(session).await?;
    match notification.resolve(client.as_ref()).await? {
        NavigationTarget::AlarmDetails(alarm) => show_alarm(&alarm, global),
        NavigationTarget::DeviceAlarms { device_id } => {
            let paging = PagingArgs {
                pages: 1,
                all: false,
            };
            let kind = FeedKind::Device {
                source_id: device_id,
            };
            alarms::list_feed(client, kind, AlarmFilter::default(), &paging, cfg, global).await
        }
    }
}

fn show_alarm(alarm: &Alarm, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, alarm, alarms::detail, |a| a.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
