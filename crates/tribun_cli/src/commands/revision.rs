//! Revision commands.

use std::path::Path;
use tracing::info;
use tribun_core::{
    discover, order, ConfigStore, DirectorySource, Revision, RevisionId, RevisionRunResult,
};
use tribun_store::KvStore;

/// Prints the revision chain from root to head.
pub fn list(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let chain = order(discover(dir)?)?;

    println!("Revisions");
    println!("=========");

    if chain.is_empty() {
        println!("  No revisions found.");
        return Ok(());
    }

    for (position, revision) in chain.iter().enumerate() {
        let down = revision
            .down_revision()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let marker = if position + 1 == chain.len() { " (head)" } else { "" };
        println!(
            "  {}: {} <- {}{}",
            revision.revision(),
            revision.description(),
            down,
            marker
        );
    }

    Ok(())
}

/// Applies revisions, up to `target` when given.
pub fn upgrade<S: KvStore>(
    store: &ConfigStore<S>,
    dir: &Path,
    target: Option<&RevisionId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let chain = order(discover(dir)?)?;
    let result = match target {
        Some(target) => chain.upgrade_to(store, target)?,
        None => chain.upgrade(store)?,
    };
    report("applied", &result);
    Ok(())
}

/// Rolls back revisions, down to `target` excluded when given.
pub fn downgrade<S: KvStore>(
    store: &ConfigStore<S>,
    dir: &Path,
    target: Option<&RevisionId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let chain = order(discover(dir)?)?;
    let result = match target {
        Some(target) => chain.downgrade_to(store, target)?,
        None => chain.downgrade(store)?,
    };
    report("rolled back", &result);
    Ok(())
}

/// Writes an empty revision file following `down`, or the current head.
pub fn new(
    dir: &Path,
    description: &str,
    down: Option<RevisionId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let down = match down {
        Some(down) => Some(down),
        None => order(discover(dir)?)?
            .head()
            .map(|head| head.revision().clone()),
    };

    let path = DirectorySource::new(dir).create(description, down)?;
    println!("{}", path.display());
    Ok(())
}

fn report(action: &str, result: &RevisionRunResult) {
    info!(
        revisions = result.revisions.len(),
        keys = result.key_count,
        "revisions {action}"
    );
    for id in &result.revisions {
        println!("  {action} {id}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tribun_core::RevisionSource;
    use tribun_store::InMemoryStore;

    #[test]
    fn new_follows_the_head() {
        let dir = TempDir::new().unwrap();

        new(dir.path(), "first", None).unwrap();
        new(dir.path(), "second", None).unwrap();
        new(dir.path(), "third", None).unwrap();

        let chain = order(DirectorySource::new(dir.path()).load().unwrap()).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.head().unwrap().description(), "third");

        list(dir.path()).unwrap();
    }

    #[test]
    fn upgrade_and_downgrade_a_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("aaaa0001_first.json"),
            r#"{"down_revision": null,
                "upgrade": [{"key": "app/name", "value": "tribun"}],
                "downgrade": [{"key": "app/name"}]}"#,
        )
        .unwrap();

        let store = InMemoryStore::new();
        let config = ConfigStore::new(&store);

        upgrade(&config, dir.path(), None).unwrap();
        assert!(store.contains_key("app/name"));

        let target = RevisionId::parse("aaaa0001").unwrap();
        downgrade(&config, dir.path(), Some(&target)).unwrap();
        assert!(store.contains_key("app/name"));

        downgrade(&config, dir.path(), None).unwrap();
        assert!(store.is_empty());
    }
}
