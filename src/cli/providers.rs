use futures::future::join_all;
use std::path::Path;

use crate::cli::{build_registry, load_config, ProvidersArgs};
use crate::config::ProviderName;
use crate::prompt::PROBE_PROMPT;
use crate::schema::ProbeReply;

pub async fn execute(config_path: &Path, args: ProvidersArgs) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = build_registry(&config)?;
    let directory = registry.directory();
    let usable = directory.list_usable_providers();

    println!("\n=== Providers ===\n");
    for name in ProviderName::ALL {
        let marker = if usable.contains(&name) {
            "usable"
        } else {
            "no credentials"
        };
        println!(
            "  - {:<8} {:<28} {} [{}]",
            name.as_str(),
            directory.selected_model(name),
            directory.base_url(name),
            marker
        );
    }
    println!();

    if !args.check {
        return Ok(());
    }

    let adapters = registry.list_usable(None);
    if adapters.is_empty() {
        anyhow::bail!("No usable providers to check");
    }

    let probes = adapters.iter().map(|adapter| async move {
        (adapter.name(), adapter.call::<ProbeReply>(PROBE_PROMPT).await)
    });

    let mut failed = 0;
    for (name, result) in join_all(probes).await {
        match result {
            Ok(outcome) => println!(
                "  {:<8} ok ({} attempt(s), {:.1}s)",
                name.as_str(),
                outcome.attempts,
                outcome.duration.as_secs_f64()
            ),
            Err(e) => {
                failed += 1;
                println!("  {:<8} failed: {}", name.as_str(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} providers failed the check", failed, adapters.len());
    }
    Ok(())
}
