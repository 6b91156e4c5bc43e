//! Alarm command handlers.

use std::sync::Arc;

use alarmist_api::{Alarm, AlarmStatus, PlatformClient, retry};
use alarmist_config::{Config, load_config_from, save_config_to};
use alarmist_core::{AlarmFeed, AlarmFilter, AlarmSummary, FeedKind, FetchOutcome, SeverityCount};
use tabled::Tabled;
use tracing::warn;

use crate::cli::{AlarmsArgs, AlarmsCommand, GlobalOpts, OutputFormat, PagingArgs};
use crate::config::{self, CliSession};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct AlarmRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Type")]
    alarm_type: String,
    #[tabled(rename = "Text")]
    text: String,
    #[tabled(rename = "Count")]
    count: String,
}

impl AlarmRow {
    fn new(a: &Alarm, color: bool) -> Self {
        Self {
            id: a.id.clone(),
            time: a
                .time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            severity: output::paint_severity(a.severity, color),
            status: output::paint_status(a.status, color),
            device: a
                .source
                .as_ref()
                .map(|s| s.name.clone().unwrap_or_else(|| s.id.clone()))
                .unwrap_or_default(),
            alarm_type: a.alarm_type.clone(),
            text: a.text.clone(),
            count: a.count.map(|c| c.to_string()).unwrap_or_default(),
        }
    }
}

pub(super) fn detail(a: &Alarm) -> String {
    let mut lines = vec![
        format!("ID:        {}", a.id),
        format!("Severity:  {}", a.severity),
        format!("Status:    {}", a.status),
        format!("Type:      {}", a.alarm_type),
        format!("Text:      {}", a.text),
    ];
    if let Some(ref source) = a.source {
        lines.push(format!(
            "Device:    {} ({})",
            source.name.as_deref().unwrap_or("-"),
            source.id
        ));
    }
    if let Some(time) = a.time {
        lines.push(format!("Time:      {}", time.to_rfc3339()));
    }
    if let Some(count) = a.count {
        lines.push(format!("Count:     {count}"));
    }
    let actions: Vec<&str> = AlarmStatus::ALL
        .into_iter()
        .filter(|s| *s != a.status)
        .map(AlarmStatus::verb)
        .collect();
    lines.push(format!("Actions:   {}", actions.join(", ")));
    for comment in &a.comments {
        lines.push(format!(
            "Comment:   {} ({})",
            comment.text,
            comment.user.as_deref().unwrap_or("-")
        ));
    }
    lines.join("\n")
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl SummaryRow {
    fn new(c: &SeverityCount, color: bool) -> Self {
        Self {
            severity: output::paint_severity(c.severity, color),
            active: c.count.map_or_else(|| "?".into(), |n| n.to_string()),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &CliSession,
    args: AlarmsArgs,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        AlarmsCommand::List(list) => {
            let filter = util::filter_from_args(&list.filter, list.device)?;
            let client = util::restored_client(session).await?;
            list_feed(client, FeedKind::All, filter, &list.paging, cfg, global).await
        }

        AlarmsCommand::Device {
            device_id,
            filter,
            paging,
        } => {
            let filter = util::filter_from_args(&filter, None)?;
            let client = util::restored_client(session).await?;
            let kind = FeedKind::Device {
                source_id: device_id,
            };
            list_feed(client, kind, filter, &paging, cfg, global).await
        }

        AlarmsCommand::Subscribed { paging } => {
            let client = util::restored_client(session).await?;
            let filter = cfg.subscription.clone();
            list_feed(client, FeedKind::Subscribed, filter, &paging, cfg, global).await
        }

        AlarmsCommand::Subscribe { device, filter } => {
            let subscription = util::filter_from_args(&filter, device)?;
            let path = config::effective_path(global);
            // Re-read the file so flag overrides are not persisted with it.
            let mut stored = load_config_from(&path)?;
            stored.subscription = subscription;
            save_config_to(&stored, &path)?;
            if !global.quiet {
                eprintln!("Subscription saved to {}", path.display());
            }
            Ok(())
        }

        AlarmsCommand::Get { id } => {
            let client = util::restored_client(session).await?;
            let alarm = client.get_alarm(&id).await?;
            let out = output::render_single(&global.output, &alarm, detail, |a| a.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlarmsCommand::SetStatus { id, status } => {
            let status = AlarmStatus::from(status);
            let client = util::restored_client(session).await?;
            let source = client.as_ref();
            let id = id.as_str();
            let updated = retry(
                cfg.retry_policy(),
                |e: &alarmist_api::Error, attempt| {
                    let transient = e.is_transient();
                    if transient {
                        warn!(attempt, error = %e, "status change failed, retrying");
                    }
                    transient
                },
                move || source.update_alarm_status(id, status),
            )
            .await?;
            if !global.quiet {
                eprintln!("Alarm {} is now {}", updated.id, updated.status);
            }
            let out = output::render_single(&global.output, &updated, detail, |a| a.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlarmsCommand::Summary { device } => {
            let client = util::restored_client(session).await?;
            let summary = AlarmSummary::fetch(client.as_ref(), device.as_deref()).await?;
            print_summary(&summary, global)
        }
    }
}

// ── Listing ─────────────────────────────────────────────────────────

/// Load pages into a feed and print what was loaded.
pub(super) async fn list_feed(
    client: Arc<PlatformClient>,
    kind: FeedKind,
    filter: AlarmFilter,
    paging: &PagingArgs,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let feed = AlarmFeed::new(client, kind, filter).with_page_size(cfg.defaults.page_size);
    load_pages(&feed, paging).await?;

    let snapshot = feed.snapshot();
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &snapshot.alarms,
        |a| AlarmRow::new(a, color),
        |a| a.id.clone(),
    )?;
    output::print_output(&out, global.quiet);

    if matches!(global.output, OutputFormat::Table) && !global.quiet {
        let more = if feed.has_more() { " (more available)" } else { "" };
        eprintln!(
            "{} of {} alarms{more}",
            snapshot.alarms.len(),
            snapshot.row_count
        );
    }
    Ok(())
}

/// Fetch the first page, then up to `paging` more.
///
/// Only a failure of the first page is an error; later failures end the
/// listing with what was loaded.
async fn load_pages(feed: &AlarmFeed<PlatformClient>, paging: &PagingArgs) -> Result<(), CliError> {
    if let Err(err) = feed.reload().await {
        return Err(if err.requires_login() {
            err.into()
        } else {
            CliError::ListFailed {
                message: err.to_string(),
            }
        });
    }

    let mut loaded = 1;
    while paging.all || loaded < paging.pages {
        match feed.fetch_next().await {
            Ok(FetchOutcome::Applied(_)) => loaded += 1,
            Ok(_) => break,
            Err(err) => {
                warn!(error = %err, pages = loaded, "stopping listing after fetch failure");
                break;
            }
        }
    }
    Ok(())
}

fn print_summary(summary: &AlarmSummary, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &summary.counts,
        |c| SummaryRow::new(c, color),
        |c| {
            format!(
                "{} {}",
                c.severity,
                c.count.map_or_else(|| "?".into(), |n| n.to_string())
            )
        },
    )?;
    output::print_output(&out, global.quiet);
    if matches!(global.output, OutputFormat::Table) && !global.quiet {
        eprintln!("{} active alarms", summary.total());
    }
    Ok(())
}
