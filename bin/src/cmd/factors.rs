//! Factor listing command implementation.

use super::{OutputFormat, print_banner};
use anyhow::{Result, bail};
use factorlab_factors::{FactorCategory, FactorExpression, FactorRegistry};
use std::collections::BTreeMap;

/// List registered factor definitions, optionally filtered by category.
pub(crate) fn list_factors(
    category: Option<&str>,
    verbose: bool,
    format: OutputFormat,
) -> Result<()> {
    let registry = FactorRegistry::builtin();

    let categories: Vec<FactorCategory> = match category {
        Some(filter) => {
            let filter = filter.to_lowercase();
            let matched: Vec<_> = FactorCategory::ALL
                .into_iter()
                .filter(|c| c.as_str().contains(&filter))
                .collect();
            if matched.is_empty() {
                bail!("unknown factor category '{filter}', expected technical, fundamental or custom");
            }
            matched
        }
        None => FactorCategory::ALL.to_vec(),
    };

    if format == OutputFormat::Json {
        let listing: BTreeMap<&str, BTreeMap<&str, String>> = categories
            .iter()
            .map(|&cat| {
                let entries = registry
                    .by_category(cat)
                    .map(|(name, def)| (name, def.expression()))
                    .collect();
                (cat.as_str(), entries)
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    print_banner("Available Factors");

    for cat in categories {
        println!("{} ({}):", cat, cat.description());
        println!("{}", "-".repeat(60));

        for (name, def) in registry.by_category(cat) {
            if verbose {
                println!("  {name:25} - {}", def.description());
                println!("  {:25}   {}", "", def.expression());
            } else {
                println!("  {name}");
            }
        }
        println!();
    }

    if !verbose {
        println!("Use --verbose to show descriptions and expressions.\n");
    }

    Ok(())
}
