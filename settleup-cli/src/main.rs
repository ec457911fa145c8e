#![warn(clippy::uninlined_format_args)]

mod config;
mod output;

use std::{borrow::Cow, process};

use clap::Parser;
use config::{Cli, OutputFormat, Report};
use serde::Serialize;
use settleup_application::{LedgerError, LedgerService, SessionContext};
use settleup_domain::{Member, MemberId};
use settleup_infrastructure::{InMemoryGroupStore, LedgerSnapshot, RpcDispatcher, SystemClock};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Cow<'static, str>>;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let snapshot = LedgerSnapshot::load(&cli.snapshot).map_err(|err| {
        format!("Failed to load '{}': {err}", cli.snapshot.display())
    })?;
    let store = InMemoryGroupStore::new();
    snapshot
        .replay(&store, &SystemClock)
        .map_err(|err| err.to_string())?;

    let actor = pick_actor(&snapshot.members, cli.actor)?;
    let ctx = SessionContext::new(snapshot.group, actor);
    let ledger = LedgerService::new(&store, &SystemClock);
    tracing::debug!(group = %ctx.group, actor = %ctx.actor, "Session ready");

    let reports = cli.reports();
    for (index, report) in reports.iter().enumerate() {
        if index > 0 && cli.format == OutputFormat::Table {
            println!();
        }
        let rendered = render(&ledger, ctx, &snapshot.members, report, cli.format)?;
        print!("{rendered}");
    }
    Ok(())
}

fn pick_actor(members: &[Member], requested: Option<u64>) -> CliResult<MemberId> {
    match requested {
        Some(id) if members.iter().any(|member| member.id.0 == id) => Ok(MemberId(id)),
        Some(id) => Err(format!("Member #{id} is not part of this group").into()),
        None => members
            .first()
            .map(|member| member.id)
            .ok_or_else(|| "Snapshot has no members".into()),
    }
}

fn render(
    ledger: &LedgerService<'_>,
    ctx: SessionContext,
    members: &[Member],
    report: &Report,
    format: OutputFormat,
) -> CliResult<String> {
    match report {
        Report::Balances { filter, sort } => {
            let rows = ledger
                .balance_rows(ctx, (*filter).into(), (*sort).into())
                .map_err(ledger_error)?;
            match format {
                OutputFormat::Table => Ok(output::balances_table(&rows)),
                OutputFormat::Json => to_json(&rows),
            }
        }
        Report::Plan => {
            let plan = ledger.optimal_settlements(ctx).map_err(ledger_error)?;
            match format {
                OutputFormat::Table => Ok(output::plan_table(members, &plan)),
                OutputFormat::Json => to_json(&plan),
            }
        }
        Report::Summary => {
            let summary = ledger.group_summary(ctx).map_err(ledger_error)?;
            match format {
                OutputFormat::Table => Ok(output::summary_text(&summary)),
                OutputFormat::Json => to_json(&summary),
            }
        }
        Report::Settlements { status } => {
            let settlements = ledger
                .group_settlements(ctx, status.map(Into::into))
                .map_err(ledger_error)?;
            match format {
                OutputFormat::Table => Ok(output::settlements_table(members, &settlements)),
                OutputFormat::Json => to_json(&settlements),
            }
        }
        Report::Expenses => {
            let expenses = ledger.group_expenses(ctx).map_err(ledger_error)?;
            match format {
                OutputFormat::Table => Ok(output::expenses_table(members, &expenses)),
                OutputFormat::Json => to_json(&expenses),
            }
        }
        Report::Rpc { request } => {
            let request: serde_json::Value = serde_json::from_str(request)
                .map_err(|err| format!("Invalid request JSON: {err}"))?;
            let response = RpcDispatcher::new(*ledger)
                .dispatch_json(ctx, request)
                .map_err(|err| format!("{}: {}", err.code, err.message))?;
            to_json(&response)
        }
    }
}

fn ledger_error(err: LedgerError) -> Cow<'static, str> {
    err.to_string().into()
}

fn to_json<T: Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map(|json| format!("{json}\n"))
        .map_err(|err| format!("Failed to encode JSON: {err}").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn roster() -> Vec<Member> {
        vec![Member::new(MemberId(4), "Dana"), Member::new(MemberId(7), "Eli")]
    }

    #[rstest]
    #[case::first_member_by_default(None, Ok(MemberId(4)))]
    #[case::requested_member(Some(7), Ok(MemberId(7)))]
    #[case::stranger(Some(9), Err("Member #9 is not part of this group"))]
    fn actor_selection(
        #[case] requested: Option<u64>,
        #[case] expected: Result<MemberId, &'static str>,
    ) {
        let actual = pick_actor(&roster(), requested).map_err(|err| err.into_owned());
        assert_eq!(actual, expected.map_err(str::to_string));
    }
}
