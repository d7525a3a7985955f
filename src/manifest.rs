use crate::annotation::{Event, Feature};
use crate::batch::BuiltConstruct;
use crate::construct::{BaseComposition, Construct};
use crate::gc_contents::GcContents;
use anyhow::{Result, anyhow};
use bio::io::fasta;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE_NAME: &str = "construct_manifest.json";

/// Everything downstream analysis needs to know about one construct: the
/// FASTA it was written to, its annotations, and composition summaries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub construct: String,
    pub length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fasta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filler_seed: Option<u64>,
    pub composition: BaseComposition,
    pub gc: GcContents,
    pub features: Vec<Feature>,
    pub events: Vec<Event>,
}

impl ManifestEntry {
    pub fn from_construct(name: &str, construct: &Construct, filler_seed: Option<u64>) -> Self {
        Self {
            construct: name.to_string(),
            length: construct.len(),
            fasta: None,
            filler_seed,
            composition: construct.composition(),
            gc: GcContents::new_from_sequence(construct.sequence()),
            features: construct.features().to_vec(),
            events: construct.events().to_vec(),
        }
    }
}

/// The persisted record of a batch run, consumed by the prediction runner
/// (feature spans map to analysis windows) and the analysis layer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn load_from_path(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| anyhow!("Could not read manifest '{path}': {e}"))?;
        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Could not parse manifest JSON '{path}': {e}"))
    }

    pub fn save_to_path(&self, path: &str) -> Result<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| anyhow!("Could not serialize manifest: {e}"))?;
        fs::write(path, text).map_err(|e| anyhow!("Could not write manifest '{path}': {e}"))
    }
}

/// Writes one construct as a single-record FASTA file.
pub fn write_fasta(path: &Path, name: &str, construct: &Construct) -> Result<()> {
    let mut writer = fasta::Writer::to_file(path)?;
    writer.write(name, None, construct.sequence())?;
    Ok(())
}

/// Persists a finished batch: one `<name>_construct.fa` per construct plus
/// a manifest describing them all. Returns the manifest; callers choose
/// where (or whether) to save it.
pub fn emit_batch(directory: &Path, built: &[BuiltConstruct]) -> Result<Manifest> {
    fs::create_dir_all(directory)?;
    let mut manifest = Manifest::default();
    for item in built {
        let file_name = format!("{}_construct.fa", item.name);
        write_fasta(&directory.join(&file_name), &item.name, &item.construct)?;
        let mut entry = ManifestEntry::from_construct(&item.name, &item.construct, item.filler_seed);
        entry.fasta = Some(file_name);
        manifest.entries.push(entry);
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Metadata;

    fn test_construct() -> Construct {
        Construct::new(
            b"ACGTACGTGGCC".to_vec(),
            vec![Feature::new("promoter", 8, 12, Metadata::new())],
            vec![Event::new("anchor_inverted", 8, Metadata::new())],
        )
    }

    #[test]
    fn manifest_round_trips_through_json_file() {
        let construct = test_construct();
        let entry = ManifestEntry::from_construct("Test", &construct, Some(42));
        let manifest = Manifest {
            entries: vec![entry],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        manifest.save_to_path(path.to_str().unwrap()).unwrap();

        let loaded = Manifest::load_from_path(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.entries.len(), 1);
        let entry = &loaded.entries[0];
        assert_eq!(entry.construct, "Test");
        assert_eq!(entry.length, 12);
        assert_eq!(entry.filler_seed, Some(42));
        assert_eq!(entry.features, construct.features());
        assert_eq!(entry.events, construct.events());
        assert_eq!(
            entry.composition,
            crate::construct::BaseComposition {
                a: 2,
                c: 4,
                g: 4,
                t: 2
            }
        );
    }

    #[test]
    fn fasta_emission_writes_single_record() {
        let construct = test_construct();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Test_construct.fa");
        write_fasta(&path, "Test", &construct).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(">Test"));
        assert!(text.contains("ACGTACGTGGCC"));
    }

    #[test]
    fn emit_batch_writes_fasta_and_manifest_entries() {
        let built = vec![BuiltConstruct {
            name: "Test".to_string(),
            filler_seed: None,
            construct: test_construct(),
        }];
        let dir = tempfile::tempdir().unwrap();
        let manifest = emit_batch(dir.path(), &built).unwrap();

        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(
            manifest.entries[0].fasta.as_deref(),
            Some("Test_construct.fa")
        );
        assert!(dir.path().join("Test_construct.fa").exists());
    }
}
