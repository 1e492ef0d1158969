use crate::args::Command;
use anyhow::{Context, Result};
use chrono::SecondsFormat;
use loft_domain::constants::DEFAULT_MODE;
use loft_domain::{FileInfo, PropPatch, PropStatus};
use loft_metadata::MetadataStore;
use loft_namespace::{NamespaceEngine, SweepReport};
use loft_storage::PhysicalStore;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::warn;

/// Runs one command against `engine`, writing its output to `out`.
///
/// `grace` is the sweep grace period used when the command does not set one.
///
/// # Errors
/// Fails with the engine error of the operation, wrapped with the command that
/// caused it, or with an I/O error of the local file or the output.
pub async fn execute<M, P, W>(
    engine: &NamespaceEngine<M, P>,
    command: Command,
    grace: Duration,
    out: &mut W,
) -> Result<()>
where
    M: MetadataStore,
    P: PhysicalStore,
    W: AsyncWrite + Unpin,
{
    match command {
        Command::Mkdir { path } => {
            engine.mkdir(&path, DEFAULT_MODE).await.with_context(|| format!("mkdir {path}"))?;
        },
        Command::Put { local, remote } => {
            let source = open_local(&local).await?;
            let info = engine
                .create_or_update(&remote, source)
                .await
                .with_context(|| format!("put {} {remote}", local.display()))?;
            write_line(out, &format!("{remote}: {} bytes", info.size)).await?;
        },
        Command::Cat { path } => {
            let mut handle = engine.open_read(&path).await.with_context(|| format!("cat {path}"))?;
            tokio::io::copy(&mut handle, &mut *out).await.with_context(|| format!("cat {path}"))?;
        },
        Command::Ls { path } => {
            let listing = engine.list(&path).await.with_context(|| format!("ls {path}"))?;
            for info in &listing {
                write_line(out, &render_row(info)).await?;
            }
        },
        Command::Stat { path } => {
            let info = engine.stat(&path).await.with_context(|| format!("stat {path}"))?;
            out.write_all(render_stat(&path, &info).as_bytes()).await?;
        },
        Command::Rm { path } => {
            engine.remove_all(&path).await.with_context(|| format!("rm {path}"))?;
        },
        Command::Mv { from, to } => {
            engine.rename(&from, &to).await.with_context(|| format!("mv {from} {to}"))?;
        },
        Command::Propset { path, key, value } => {
            engine
                .patch_properties(&path, &[PropPatch::Set { key, value }])
                .await
                .with_context(|| format!("propset {path}"))?;
        },
        Command::Propdel { path, key } => {
            let stats = engine
                .patch_properties(&path, &[PropPatch::Remove { key: key.clone() }])
                .await
                .with_context(|| format!("propdel {path}"))?;
            if stats.iter().any(|stat| stat.status == PropStatus::Absent) {
                warn!(%path, %key, "Property was not set");
            }
        },
        Command::Props { path } => {
            let props = engine.dead_props(&path).await.with_context(|| format!("props {path}"))?;
            for (key, value) in &props {
                write_line(out, &format!("{key} = {value}")).await?;
            }
        },
        Command::Sweep { grace_secs } => {
            let grace = grace_secs.map_or(grace, Duration::from_secs);
            let report = engine.sweep_orphans(grace).await.context("sweep")?;
            write_line(out, &render_sweep(&report)).await?;
        },
    }

    out.flush().await.context("Failed to flush output")
}

async fn open_local(local: &Path) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if local == Path::new("-") {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = File::open(local)
        .await
        .with_context(|| format!("Failed to open {}", local.display()))?;
    Ok(Box::new(file))
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    Ok(())
}

fn timestamp(info: &FileInfo) -> String {
    info.modified.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One `ls` line: kind, size, modification time and name, directories suffixed by `/`.
fn render_row(info: &FileInfo) -> String {
    let (kind, suffix) = if info.is_dir { ('d', "/") } else { ('-', "") };
    format!("{kind} {:>12} {} {}{suffix}", info.size, timestamp(info), info.name)
}

fn render_stat(path: &str, info: &FileInfo) -> String {
    let kind = if info.is_dir { "directory" } else { "file" };
    format!(
        "path:     {path}\nkind:     {kind}\nsize:     {}\nmodified: {}\nmode:     {:#o}\n",
        info.size,
        timestamp(info),
        info.mode(),
    )
}

fn render_sweep(report: &SweepReport) -> String {
    format!(
        "scanned {}, referenced {}, recent {}, deleted {}, failed {}, purged {}",
        report.scanned,
        report.referenced,
        report.recent,
        report.deleted,
        report.failed,
        report.purged
    )
}
