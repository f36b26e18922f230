use std::fs::File;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use hangar_store::{conformance, Backend, FileBackend, FileBackendConfig, MemoryBackend, StoreConfig};
use hangar_types::{
    Deploy, DeployLookup, Dev, DevLookup, Infra, InfraLookup, RecordId,
};
use serde::Serialize;
use tracing::warn;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    if matches!(cli.command, Command::Check) {
        return cmd_check();
    }
    let backend = open_backend(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Blob(args) => cmd_blob(backend.as_ref(), args.action),
        Command::Infra(args) => cmd_infra(backend.as_ref(), format, args.action),
        Command::Deploy(args) => cmd_deploy(backend.as_ref(), format, args.action),
        Command::Dev(args) => cmd_dev(backend.as_ref(), format, args.action),
        Command::Check => cmd_check(),
    }
}

fn open_backend(cli: &Cli) -> anyhow::Result<Box<dyn Backend>> {
    let config = match (&cli.config, &cli.dir) {
        (Some(path), _) => StoreConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        (None, Some(dir)) => StoreConfig {
            backend: hangar_store::BackendConfig::File(FileBackendConfig::new(dir)),
        },
        (None, None) => {
            warn!("no --config or --dir given; using an ephemeral in-memory backend");
            StoreConfig::default()
        }
    };
    config.open().context("opening backend")
}

fn print_record<T: Serialize>(format: OutputFormat, record: &T, text: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn print_not_found(format: OutputFormat, what: &str) {
    match format {
        OutputFormat::Json => println!("null"),
        OutputFormat::Text => println!("{} {what} not found", "✗".red()),
    }
}

fn id_text(id: Option<&RecordId>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".into())
}

// ---- Blobs ----

fn cmd_blob(backend: &dyn Backend, action: BlobAction) -> anyhow::Result<()> {
    match action {
        BlobAction::Get { key, output } => {
            let Some(mut blob) = backend.get_blob(&key)? else {
                bail!("blob {key} not found");
            };
            match output {
                Some(path) => {
                    let mut file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    let n = io::copy(&mut blob, &mut file)?;
                    eprintln!("{} wrote {n} bytes to {}", "✓".green(), path.display());
                }
                None => {
                    let stdout = io::stdout();
                    let mut lock = stdout.lock();
                    io::copy(&mut blob, &mut lock)?;
                    lock.flush()?;
                }
            }
            blob.close();
            Ok(())
        }
        BlobAction::Put { key, file } => {
            match file {
                Some(path) => put_blob_file(backend, &key, &path)?,
                None => backend.put_blob(&key, &mut io::stdin().lock())?,
            }
            println!("{} stored blob {}", "✓".green(), key.bold());
            Ok(())
        }
    }
}

fn put_blob_file(backend: &dyn Backend, key: &str, path: &Path) -> anyhow::Result<()> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    backend.put_blob(key, &mut file)?;
    Ok(())
}

// ---- Infra ----

fn cmd_infra(backend: &dyn Backend, format: OutputFormat, action: InfraAction) -> anyhow::Result<()> {
    match action {
        InfraAction::Get { infra, foundation } => {
            let lookup = InfraLookup { infra, foundation };
            match backend.get_infra(&lookup)? {
                Some(infra) => print_record(format, &infra, || print_infra(&infra)),
                None => {
                    print_not_found(format, &format!("infra {lookup}"));
                    Ok(())
                }
            }
        }
        InfraAction::Put {
            infra,
            foundation,
            state,
            outputs,
        } => {
            let mut record = Infra::new(InfraLookup { infra, foundation }).with_state(state.into());
            record.outputs.extend(outputs);
            let record = backend.put_infra(record)?;
            print_record(format, &record, || {
                println!("{} stored infra", "✓".green().bold());
                print_infra(&record);
            })
        }
    }
}

fn print_infra(infra: &Infra) {
    println!("{}  {}", "Infra".bold(), infra.lookup.to_string().yellow());
    println!("  ID:    {}", id_text(infra.id.as_ref()).cyan());
    println!("  State: {}", infra.state);
    for (key, value) in &infra.outputs {
        println!("  {} = {}", key.dimmed(), value);
    }
}

// ---- Deploy ----

fn cmd_deploy(backend: &dyn Backend, format: OutputFormat, action: DeployAction) -> anyhow::Result<()> {
    match action {
        DeployAction::Get { app, infra, flavor } => {
            let lookup = DeployLookup::new(app, infra, flavor);
            match backend.get_deploy(&lookup)? {
                Some(deploy) => print_record(format, &deploy, || print_deploy(&deploy)),
                None => {
                    print_not_found(format, &format!("deploy {lookup}"));
                    Ok(())
                }
            }
        }
        DeployAction::Put {
            app,
            infra,
            flavor,
            state,
            deploy_id,
        } => {
            let mut record = Deploy::new(DeployLookup::new(app, infra, flavor)).with_state(state.into());
            record.deploy_id = deploy_id;
            let record = backend.put_deploy(record)?;
            print_record(format, &record, || {
                println!("{} stored deploy", "✓".green().bold());
                print_deploy(&record);
            })
        }
    }
}

fn print_deploy(deploy: &Deploy) {
    println!("{}  {}", "Deploy".bold(), deploy.lookup.to_string().yellow());
    println!("  ID:        {}", id_text(deploy.id.as_ref()).cyan());
    println!("  State:     {}", deploy.state);
    if let Some(deploy_id) = &deploy.deploy_id {
        println!("  Deploy ID: {deploy_id}");
    }
}

// ---- Dev ----

fn cmd_dev(backend: &dyn Backend, format: OutputFormat, action: DevAction) -> anyhow::Result<()> {
    match action {
        DevAction::Get { app } => {
            let lookup = DevLookup::new(app);
            match backend.get_dev(&lookup)? {
                Some(dev) => print_record(format, &dev, || print_dev(&dev)),
                None => {
                    print_not_found(format, &format!("dev {lookup}"));
                    Ok(())
                }
            }
        }
        DevAction::Put { app, state } => {
            let record = backend.put_dev(Dev::new(DevLookup::new(app)).with_state(state.into()))?;
            print_record(format, &record, || {
                println!("{} stored dev", "✓".green().bold());
                print_dev(&record);
            })
        }
        DevAction::Delete { app } => {
            let lookup = DevLookup::new(app);
            backend.delete_dev(&lookup)?;
            println!("{} deleted dev {}", "✓".green(), lookup.to_string().yellow());
            Ok(())
        }
    }
}

fn print_dev(dev: &Dev) {
    println!("{}  {}", "Dev".bold(), dev.lookup.to_string().yellow());
    println!("  ID:    {}", id_text(dev.id.as_ref()).cyan());
    println!("  State: {}", dev.state);
}

// ---- Check ----

fn cmd_check() -> anyhow::Result<()> {
    let scratch = tempfile::tempdir().context("creating scratch directory")?;
    let file = FileBackend::open_dir(scratch.path())?;
    let memory = MemoryBackend::new();

    let backends: [(&str, &dyn Backend); 2] = [("memory", &memory), ("file", &file)];
    let mut failed = 0;
    for (name, backend) in backends {
        let result = panic::catch_unwind(AssertUnwindSafe(|| conformance::check_backend(backend)));
        match result {
            Ok(()) => println!("{} {name} backend conforms", "✓".green().bold()),
            Err(_) => {
                println!("{} {name} backend failed conformance", "✗".red().bold());
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} backend(s) failed conformance");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_put_get_delete_through_commands() {
        let backend = MemoryBackend::new();
        cmd_dev(
            &backend,
            OutputFormat::Text,
            DevAction::Put {
                app: "web".into(),
                state: DevStateArg::Ready,
            },
        )
        .unwrap();
        let stored = backend.get_dev(&DevLookup::new("web")).unwrap().unwrap();
        assert!(stored.is_ready());

        cmd_dev(&backend, OutputFormat::Json, DevAction::Get { app: "web".into() }).unwrap();
        cmd_dev(&backend, OutputFormat::Text, DevAction::Delete { app: "web".into() }).unwrap();
        assert!(backend.get_dev(&DevLookup::new("web")).unwrap().is_none());
        // Missing records are reported, not failed.
        cmd_dev(&backend, OutputFormat::Text, DevAction::Get { app: "web".into() }).unwrap();
    }

    #[test]
    fn infra_put_collects_outputs() {
        let backend = MemoryBackend::new();
        cmd_infra(
            &backend,
            OutputFormat::Json,
            InfraAction::Put {
                infra: "aws".into(),
                foundation: None,
                state: InfraStateArg::Partial,
                outputs: vec![("addr".into(), "10.0.0.1".into())],
            },
        )
        .unwrap();
        let stored = backend.get_infra(&InfraLookup::new("aws")).unwrap().unwrap();
        assert!(stored.is_partial());
        assert_eq!(stored.outputs.get("addr").map(String::as_str), Some("10.0.0.1"));
    }

    #[test]
    fn blob_put_from_file_and_get_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.bin");
        let dst = dir.path().join("out.bin");
        std::fs::write(&src, b"artifact").unwrap();

        let backend = MemoryBackend::new();
        cmd_blob(
            &backend,
            BlobAction::Put {
                key: "art".into(),
                file: Some(src),
            },
        )
        .unwrap();
        cmd_blob(
            &backend,
            BlobAction::Get {
                key: "art".into(),
                output: Some(dst.clone()),
            },
        )
        .unwrap();
        assert_eq!(std::fs::read(dst).unwrap(), b"artifact");
    }

    #[test]
    fn missing_blob_is_an_error() {
        let backend = MemoryBackend::new();
        let err = cmd_blob(
            &backend,
            BlobAction::Get {
                key: "nope".into(),
                output: None,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn check_passes_for_shipped_backends() {
        cmd_check().unwrap();
    }
}
