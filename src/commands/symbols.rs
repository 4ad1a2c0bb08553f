//! Symbols command implementation
//!
//! Loads the library without initializing it and reports which export
//! each known entry point resolves through.

use crate::cli::args::{OutputFormat, SymbolsArgs};
use crate::cli::output::{print_output, SymbolEntry, SymbolReport};
use crate::config::Config;
use crate::dl::symbols::in_group;
use crate::dl::{Group, LibraryLoader, Resolver, SymbolSource};
use crate::error::Result;

/// Execute the symbols command
pub fn run_symbols(args: &SymbolsArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let library = config.loader().load()?;
    let path = library.path().to_string();
    let resolver = Resolver::new(library);

    let report = probe(&resolver, path, args.group.map(Group::from), args.missing);
    print_output(&report, format)?;

    LibraryLoader::unload(resolver.into_source())?;
    Ok(())
}

/// Check every entry point (optionally one group) against `resolver`
pub fn probe<S: SymbolSource>(
    resolver: &Resolver<S>,
    library: String,
    group: Option<Group>,
    missing_only: bool,
) -> SymbolReport {
    let groups: Vec<Group> = match group {
        Some(group) => vec![group],
        None => Group::ALL.to_vec(),
    };

    let entries: Vec<SymbolEntry> = groups
        .into_iter()
        .flat_map(in_group)
        .map(|entry| SymbolEntry {
            name: entry.name,
            group: entry.group,
            resolved: entry.candidates().find(|name| resolver.contains(name)),
        })
        .collect();

    let total = entries.len();
    let resolved = entries.iter().filter(|e| e.resolved.is_some()).count();
    log::debug!("{}: {}/{} entry points resolved", library, resolved, total);

    let entries = if missing_only {
        entries.into_iter().filter(|e| e.resolved.is_none()).collect()
    } else {
        entries
    };

    SymbolReport {
        library,
        resolved,
        total,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FakeLibrary;

    fn entry<'a>(report: &'a SymbolReport, name: &str) -> &'a SymbolEntry {
        report.entries.iter().find(|e| e.name == name).unwrap()
    }

    #[test]
    fn test_probe_prefers_versioned_export() {
        let library = FakeLibrary::new();
        let resolver = Resolver::new(&library);

        let report = probe(&resolver, "fake".to_string(), Some(Group::Initialization), false);
        assert_eq!(entry(&report, "nvmlInit").resolved, Some("nvmlInit_v2"));
        assert_eq!(entry(&report, "nvmlShutdown").resolved, Some("nvmlShutdown"));
        assert!(report.entries.iter().all(|e| e.group == Group::Initialization));
    }

    #[test]
    fn test_probe_falls_back_to_base_name() {
        let library = FakeLibrary::new().without_export("nvmlInit_v2");
        let resolver = Resolver::new(&library);

        let report = probe(&resolver, "fake".to_string(), Some(Group::Initialization), false);
        assert_eq!(entry(&report, "nvmlInit").resolved, Some("nvmlInit"));
    }

    #[test]
    fn test_probe_missing_only() {
        let library = FakeLibrary::new();
        let resolver = Resolver::new(&library);

        let report = probe(&resolver, "fake".to_string(), None, true);
        assert!(report.resolved > 0);
        assert!(report.total > report.resolved);
        assert_eq!(report.entries.len(), report.total - report.resolved);
        assert!(report.entries.iter().all(|e| e.resolved.is_none()));
        assert!(report.entries.iter().all(|e| e.name != "nvmlInit"));
    }

    #[test]
    fn test_probe_does_not_initialize() {
        let library = FakeLibrary::new();
        let resolver = Resolver::new(&library);

        probe(&resolver, "fake".to_string(), None, false);
        assert_eq!(library.init_calls(), 0);
    }
}
