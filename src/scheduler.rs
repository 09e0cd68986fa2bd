// src/scheduler.rs
//! Daily trigger: `M H * * *` in a named time zone.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;

use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub hour: u32,
    pub minute: u32,
    pub tz: Tz,
}

impl DailySchedule {
    /// Accepts only daily cron expressions: numeric minute and hour, `*` elsewhere.
    pub fn parse(cron: &str, timezone: &str) -> Result<Self> {
        let fields: Vec<&str> = cron.split_whitespace().collect();
        let &[minute, hour, dom, month, dow] = fields.as_slice() else {
            bail!("expected 5 cron fields, got {}", fields.len());
        };
        if [dom, month, dow].iter().any(|f| *f != "*") {
            bail!("only daily schedules are supported (day/month/weekday must be `*`)");
        }
        let minute: u32 = minute
            .parse()
            .with_context(|| format!("cron minute `{minute}`"))?;
        let hour: u32 = hour.parse().with_context(|| format!("cron hour `{hour}`"))?;
        if minute > 59 || hour > 23 {
            bail!("cron time {hour:02}:{minute:02} out of range");
        }
        let tz: Tz = timezone
            .trim()
            .parse()
            .map_err(|_| anyhow!("unknown time zone `{timezone}`"))?;
        Ok(Self { hour, minute, tz })
    }

    /// First trigger strictly after `now`. Days whose local time falls in a DST gap are skipped.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let at = NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN);
        let today = now.with_timezone(&self.tz).date_naive();
        for offset in 0..=3 {
            let day = today + ChronoDuration::days(offset);
            if let Some(local) = self.tz.from_local_datetime(&day.and_time(at)).earliest() {
                let utc = local.with_timezone(&Utc);
                if utc > now {
                    return utc;
                }
            }
        }
        now + ChronoDuration::days(1)
    }
}

/// Spawn the daily loop. Each trigger runs in its own task, so a slow or
/// failed run never delays the next trigger.
pub fn spawn_daily(
    schedule: DailySchedule,
    pipeline: Arc<Pipeline>,
    run_on_startup: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if run_on_startup {
            tracing::info!("startup run");
            fire(Arc::clone(&pipeline));
        }
        loop {
            let now = Utc::now();
            let next = schedule.next_after(now);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(next = %next.with_timezone(&schedule.tz), "next scheduled run");
            tokio::time::sleep(wait).await;
            fire(Arc::clone(&pipeline));
        }
    })
}

fn fire(pipeline: Arc<Pipeline>) {
    tokio::spawn(async move { deliver_once(&pipeline).await });
}

async fn deliver_once(pipeline: &Pipeline) {
    match pipeline.scheduled_run().await {
        Ok(receipt) => tracing::info!(
            channel = receipt.channel,
            status = ?receipt.status,
            message_id = ?receipt.message_id,
            "scheduled digest delivered"
        ),
        Err(e) => tracing::error!(error = %e, kind = e.kind().as_str(), "scheduled digest failed"),
    }
}
