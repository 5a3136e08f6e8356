#![allow(dead_code)]

use canon_index::{Archive, ArchiveConfig};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway archive on disk.
///
/// `FixtureArchive::standard()` lays out two published sites in the `Flex`
/// family, one `wip` site in an unlisted family, a small registry, credits,
/// and one relation file. Tests tweak individual files with `write_json`.
pub struct FixtureArchive {
    dir: TempDir,
}

impl FixtureArchive {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("fixture temp dir"),
        }
    }

    pub fn standard() -> Self {
        let fixture = Self::empty();
        fixture.write_json(
            "canon.json",
            &json!({
                "family_order": ["Flex"],
                "families": {
                    "Flex": {
                        "flex/alpha": "data/flex/alpha/site.json",
                        "flex/beta": {
                            "name": "Beta",
                            "dates": ["2010", "2014"],
                            "tags": ["show_dates"],
                            "primary_info_file": "data/flex/beta/info.json",
                            "models_file": "data/flex/beta/models.json"
                        }
                    },
                    "Indie": {
                        "indie/gamma": {
                            "name": "Gamma",
                            "tags": ["wip"],
                            "primary_info_file": "data/indie/gamma/info.json"
                        }
                    }
                }
            }),
        );
        fixture.write_json(
            "data/flex/alpha/site.json",
            &json!({
                "name": "Alpha",
                "primary_info_file": "data/flex/alpha/info.json",
                "extra_info_files": ["data/flex/alpha/extra.json"],
                "models_file": "data/flex/alpha/models.json",
                "notes_file": "data/flex/alpha/notes.json"
            }),
        );
        fixture.write_json(
            "data/flex/alpha/info.json",
            &json!({
                "vid_10": {"name": "Tenth", "date": "2012-03-01", "size": {"duration": {"size": 12, "units": "min"}}},
                "vid_2": {"name": "Second", "date": "2011-05-01", "previews": ["https://cdn.example.com/p/2.jpg"]},
                "photo_01": {"name": "Set One", "size": [{"type": "images", "size": 40}]},
                "old_name": {"item_id": "vid_1", "name": "First"}
            }),
        );
        fixture.write_json(
            "data/flex/alpha/extra.json",
            &json!({"vid_2": {"size": {"duration": "8:30"}, "url": "https://alpha.example.com/2"}}),
        );
        fixture.write_json(
            "data/flex/alpha/models.json",
            &json!({
                "anna0001": ["vid_*"],
                "bea00002": [{"items": ["photo_01", "vid_1{0}"], "credited_as": "Bee"}]
            }),
        );
        fixture.write_json("data/flex/alpha/notes.json", &json!(["Scans from the 2012 DVD."]));
        fixture.write_json(
            "data/flex/beta/info.json",
            &json!({"b1": {"name": "Beta One"}, "b2": {}}),
        );
        fixture.write_json("data/flex/beta/models.json", &json!({"anna0001": ["b1"]}));
        fixture.write_json("data/indie/gamma/info.json", &json!({"g1": {}}));
        fixture.write_json(
            "model-info.json",
            &json!({
                "anna0001": {
                    "name": "Anna",
                    "biography": "<p>Private bio</p>",
                    "links": [
                        "<a href=\"https://www.facebook.com/anna\">Facebook</a>",
                        "<a href=\"https://anna.example.com\">Home</a>"
                    ],
                    "aliases": ["Annie"]
                },
                "bea00002": {"name": "Beatrix", "display_name": "Bea", "biography": "", "links": []},
                "cara0003": {"name": "#cara0003", "biography": "", "links": []}
            }),
        );
        fixture.write_json(
            "relations/flex.json",
            &json!({"flex": [["alpha/vid_1", "beta/b1", "alpha/vid_1"]]}),
        );
        fixture.write_text(".private-models", "bea00002\n");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn write_json(&self, relative: &str, value: &Value) {
        self.write_text(
            relative,
            &serde_json::to_string_pretty(value).expect("fixture json"),
        );
    }

    pub fn write_text(&self, relative: &str, text: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("fixture dirs");
        }
        fs::write(&path, text).expect("fixture file");
    }

    pub fn read_text(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("fixture read")
    }

    pub fn read_json(&self, relative: &str) -> Value {
        serde_json::from_str(&self.read_text(relative)).expect("fixture json read")
    }

    pub fn config(&self) -> ArchiveConfig {
        ArchiveConfig::load(self.root()).expect("fixture config loads")
    }

    pub fn archive(&self) -> Archive {
        Archive::load(self.config()).expect("fixture archive loads")
    }

    /// Run the `canon` binary against this archive.
    pub fn canon(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_canon"))
            .args(args)
            .env("CANON_ROOT", self.root())
            .env_remove("CANON_LOG")
            .output()
            .expect("failed to run canon")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
