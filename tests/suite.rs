// Integration suite over a fixture archive: config -> catalogs -> registry ->
// credits -> relations -> views, plus the `canon` binary end to end.
mod support;

use canon_index::association::ItemCredit;
use canon_index::catalog::Size;
use canon_index::views::{GlobalIndexView, ModelIndexView, ModelPageView, SiteView};
use canon_index::{
    CatalogError, ItemId, JsonRenderer, ModelId, ModelRegistry, Publisher, QualifiedItem, SiteId,
    natural_sort, pattern::preprocess,
};
use serde_json::{Value, json};
use std::fs;
use support::{FixtureArchive, stderr, stdout};

fn site(id: &str) -> SiteId {
    SiteId::from(id)
}

fn item(id: &str) -> ItemId {
    ItemId::from(id)
}

fn model(id: &str) -> ModelId {
    ModelId::from(id)
}

#[test]
fn config_resolves_sites_and_family_order() {
    let fixture = FixtureArchive::standard();
    let config = fixture.config();

    assert_eq!(config.family_order, vec!["Flex".to_string(), "Other".to_string()]);
    assert_eq!(config.sites.len(), 3);
    let beta = config.site(&site("flex/beta")).expect("beta configured");
    assert_eq!(beta.config.display_name(), "Beta (2010–2014)");
    assert_eq!(beta.config.primary_info_file, fixture.path("data/flex/beta/info.json"));
    assert_eq!(config.family_rank("Indie"), 1);
    assert_eq!(config.model_registry, fixture.path("model-info.json"));
}

#[test]
fn config_rejects_unknown_site_keys() {
    let fixture = FixtureArchive::standard();
    fixture.write_json(
        "data/flex/alpha/site.json",
        &json!({"name": "Alpha", "primary_info_file": "info.json", "colour": "red"}),
    );
    let err = canon_index::ArchiveConfig::load(fixture.root()).unwrap_err();
    assert!(format!("{err:#}").contains("site.json"), "{err:#}");
}

#[test]
fn catalog_merges_layers_rekeys_and_orders_naturally() {
    let fixture = FixtureArchive::standard();
    let archive = fixture.archive();
    let alpha = archive.catalog(&site("flex/alpha")).expect("alpha loaded");

    let ids: Vec<&str> = alpha.ids().map(ItemId::as_str).collect();
    assert_eq!(ids, vec!["photo_01", "vid_1", "vid_2", "vid_10"]);

    let vid_1 = alpha.get(&item("vid_1")).unwrap();
    assert_eq!(vid_1.record.name, "First");
    assert_eq!(vid_1.internal_url, "flex/alpha/index.html#vid_1");

    let vid_2 = alpha.get(&item("vid_2")).unwrap();
    assert_eq!(vid_2.record.url, "https://alpha.example.com/2");
    assert_eq!(vid_2.record.size["duration"].to_string(), "8:30");
    assert!(vid_2.is_video());

    let photo = alpha.get(&item("photo_01")).unwrap();
    assert!(matches!(photo.record.size["images"], Size::Bare(_)));
    assert_eq!(alpha.latest_video().map(|i| i.id.as_str()), Some("vid_10"));
    assert_eq!(alpha.source_urls(), vec!["https://alpha.example.com/2"]);
}

#[test]
fn duplicate_key_in_one_layer_aborts_load() {
    let fixture = FixtureArchive::standard();
    fixture.write_text(
        "data/flex/beta/info.json",
        r#"{"b1": {"name": "x"}, "b1": {"name": "y"}}"#,
    );
    let err = canon_index::Archive::load(fixture.config()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<CatalogError>(),
        Some(&CatalogError::DuplicateKey {
            key: "b1".to_string()
        })
    );
}

#[test]
fn rekey_collision_is_duplicate_item() {
    let fixture = FixtureArchive::standard();
    fixture.write_json(
        "data/flex/beta/info.json",
        &json!({"b1": {}, "legacy": {"item_id": "b1"}}),
    );
    let err = canon_index::Archive::load(fixture.config()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CatalogError>(),
        Some(CatalogError::DuplicateItem { item_id }) if item_id == "b1"
    ));
}

#[test]
fn unknown_item_field_names_the_offender() {
    let fixture = FixtureArchive::standard();
    fixture.write_json("data/flex/beta/info.json", &json!({"b1": {"models": []}}));
    let err = canon_index::Archive::load(fixture.config()).unwrap_err();
    match err.downcast_ref::<CatalogError>() {
        Some(CatalogError::UnknownField { record, id, fields }) => {
            assert_eq!(*record, "item");
            assert_eq!(id, "b1");
            assert_eq!(fields, &vec!["models".to_string()]);
        }
        other => panic!("expected UnknownField, got {other:?}"),
    }
}

#[test]
fn associations_project_both_directions() {
    let fixture = FixtureArchive::standard();
    let archive = fixture.archive();
    let alpha = archive.associations(&site("flex/alpha")).expect("alpha credits");

    assert_eq!(
        alpha.items_for_model(&model("anna0001")),
        &[item("vid_1"), item("vid_2"), item("vid_10")]
    );
    assert_eq!(
        alpha.items_for_model(&model("bea00002")),
        &[item("photo_01"), item("vid_10")]
    );
    assert_eq!(
        alpha.credits_for_item(&item("vid_10")),
        &[
            ItemCredit {
                display_name: "Anna".to_string(),
                model_id: model("anna0001"),
            },
            ItemCredit {
                display_name: "Bea (as Bee)".to_string(),
                model_id: model("bea00002"),
            },
        ]
    );

    // Every model -> item edge shows up as an item -> model credit.
    for model_id in alpha.models() {
        for item_id in alpha.items_for_model(model_id) {
            assert!(
                alpha
                    .credits_for_item(item_id)
                    .iter()
                    .any(|credit| &credit.model_id == model_id)
            );
        }
    }

    let gamma = archive.associations(&site("indie/gamma")).expect("empty credits");
    assert_eq!(gamma.models().count(), 0);
}

#[test]
fn unresolved_credit_pattern_fails_the_load() {
    let fixture = FixtureArchive::standard();
    fixture.write_json("data/flex/beta/models.json", &json!({"anna0001": ["nomatch_*"]}));
    let err = canon_index::Archive::load(fixture.config()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<CatalogError>(),
        Some(&CatalogError::UnresolvedPattern {
            site: site("flex/beta"),
            model: model("anna0001"),
            pattern: "nomatch_*".to_string(),
        })
    );
}

#[test]
fn relations_link_items_across_sites() {
    let fixture = FixtureArchive::standard();
    let archive = fixture.archive();

    let vid_1 = archive
        .catalogs
        .resolve(&QualifiedItem::new("flex/alpha", "vid_1"))
        .unwrap();
    assert_eq!(vid_1.related, vec![QualifiedItem::new("flex/beta", "b1")]);
    let b1 = archive.catalogs.resolve(&vid_1.related[0]).unwrap();
    assert_eq!(b1.record.name, "Beta One");
    assert_eq!(b1.related, vec![QualifiedItem::new("flex/alpha", "vid_1")]);
    assert!(
        archive
            .relations
            .related(&QualifiedItem::new("flex/beta", "b2"))
            .is_empty()
    );
}

#[test]
fn malformed_relation_file_is_reported() {
    let fixture = FixtureArchive::standard();
    fixture.write_json("relations/bad.json", &json!({"flex": [["alpha"]]}));
    let err = canon_index::Archive::load(fixture.config()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CatalogError>(),
        Some(CatalogError::RelationFile { .. })
    ));
}

#[test]
fn registry_resolution_contract() {
    let fixture = FixtureArchive::standard();
    fixture.write_json(
        "model-info.json",
        &json!({
            "A": {"name": "Alice", "biography": "", "links": []},
            "B": {"name": "Alice", "biography": "", "links": []}
        }),
    );
    let registry = ModelRegistry::load(&fixture.path("model-info.json")).unwrap();

    assert_eq!(
        registry.resolve_id("Alice"),
        Err(CatalogError::AmbiguousName {
            query: "Alice".to_string(),
            candidates: vec![model("A"), model("B")],
        })
    );
    match registry.resolve_id("alice") {
        Err(CatalogError::NotFound { suggestion, .. }) => {
            assert!(suggestion.is_some_and(|s| !s.is_empty()))
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(registry.resolve_id("A"), Ok(model("A")));
}

#[test]
fn site_view_carries_credits_related_and_notes() {
    let fixture = FixtureArchive::standard();
    let archive = fixture.archive();
    let view = SiteView::build(&archive, &site("flex/alpha")).unwrap();
    let value = serde_json::to_value(&view).unwrap();

    assert_eq!(value["name"], "Alpha");
    assert_eq!(value["notes"], json!(["Scans from the 2012 DVD."]));
    let items = value["items"].as_array().unwrap();
    assert_eq!(items[1]["id"], "vid_1");
    assert_eq!(items[1]["related_items"][0]["name"], "Beta (2010–2014) b1");
    assert_eq!(items[1]["related_items"][0]["url"], "flex/beta/index.html#b1");
    assert_eq!(items[2]["preview_links"][0]["is_image"], true);
    assert_eq!(items[3]["credits"][1]["display_name"], "Bea (as Bee)");
}

#[test]
fn public_model_page_hides_private_details() {
    let fixture = FixtureArchive::standard();
    let archive = fixture.archive();
    let anna = model("anna0001");
    let view = ModelPageView::build(&archive, &anna).unwrap();

    assert!(!view.private);
    assert_eq!(view.biography, "");
    assert_eq!(
        view.links,
        vec!["<a href=\"https://anna.example.com\">Home</a>".to_string()]
    );
    let sites: Vec<&str> = view.appearances.iter().map(|a| a.site_id.as_str()).collect();
    assert_eq!(sites, vec!["flex/alpha", "flex/beta"]);
    let alpha_items: Vec<&str> = view.appearances[0].items.iter().map(|i| i.item_id).collect();
    assert_eq!(alpha_items, vec!["vid_1", "vid_2", "vid_10"]);

    let bea = model("bea00002");
    let private_view = ModelPageView::build(&archive, &bea).unwrap();
    assert!(private_view.private);
    assert_eq!(private_view.display_name, "Bea");
}

#[test]
fn model_index_groups_by_family() {
    let fixture = FixtureArchive::standard();
    let archive = fixture.archive();
    let view = ModelIndexView::build(&archive);

    let families: Vec<&str> = view.families.iter().map(|f| f.family).collect();
    assert_eq!(families, vec!["Flex", "Other"]);
    let flex: Vec<&str> = view.families[0]
        .rows
        .iter()
        .flatten()
        .map(|card| card.model_id.as_str())
        .collect();
    assert_eq!(flex, vec!["anna0001", "bea00002"]);
    let other: Vec<&str> = view.families[1]
        .rows
        .iter()
        .flatten()
        .map(|card| card.model_id.as_str())
        .collect();
    assert_eq!(other, vec!["cara0003"]);
    assert!(view.families[0].rows[0][1].is_private);
}

#[test]
fn global_index_skips_wip_sites() {
    let fixture = FixtureArchive::standard();
    let config = fixture.config();
    let view = GlobalIndexView::build(&config);
    let value = serde_json::to_value(&view).unwrap();
    assert_eq!(
        value,
        json!({"families": [{
            "family": "Flex",
            "sites": [
                {"site_id": "flex/alpha", "name": "Alpha", "url": "sites/flex/alpha/index.html"},
                {"site_id": "flex/beta", "name": "Beta (2010–2014)", "url": "sites/flex/beta/index.html"}
            ]
        }]})
    );
}

#[test]
fn publisher_writes_pages_and_reports_missing_sites() {
    let fixture = FixtureArchive::standard();
    let archive = fixture.archive();
    let publisher = Publisher::new(&archive, &JsonRenderer);

    assert_eq!(publisher.missing_site_pages().len(), 2);
    let path = publisher.publish_site(&site("flex/alpha")).unwrap();
    assert_eq!(path, fixture.path("html/sites/flex/alpha/index.html"));
    assert_eq!(publisher.missing_site_pages(), vec![&site("flex/beta")]);

    publisher.publish_index().unwrap();
    publisher.publish_model_index().unwrap();
    publisher.publish_model(&model("cara0003")).unwrap();
    let page: Value = fixture.read_json("html/models/cara0003.html");
    assert_eq!(page["image"], "static/default-model-img.jpg");
    assert!(fixture.path("html/index.html").is_file());
    assert!(fixture.path("html/models/index.html").is_file());
}

#[test]
fn documented_examples_hold() {
    let mut names = vec!["item2", "item10", "item1"];
    natural_sort(&mut names);
    assert_eq!(names, vec!["item1", "item2", "item10"]);
    assert_eq!(preprocess("{a,b}_{1,2,3}").len(), 6);
}

#[test]
fn cli_search_returns_json_hits() {
    let fixture = FixtureArchive::standard();
    let output = fixture.canon(&["search", "annie"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let hits: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(hits[0]["model_id"], "anna0001");
    assert_eq!(hits[0]["name"], "Anna");

    let empty = fixture.canon(&["search", ""]);
    assert_eq!(stdout(&empty).trim(), "[]");
}

#[test]
fn cli_credit_and_new_model_round_trip() {
    let fixture = FixtureArchive::standard();

    let created = fixture.canon(&["models", "new", "Dora"]);
    assert!(created.status.success(), "{}", stderr(&created));
    let id = stdout(&created).trim().to_string();
    assert_eq!(id.len(), 8);

    let credited = fixture.canon(&["credit", "flex/beta", "b2,b1", "Dora"]);
    assert!(credited.status.success(), "{}", stderr(&credited));
    let credits = fixture.read_json("data/flex/beta/models.json");
    assert_eq!(credits[&id], json!(["b2", "b1"]));

    let again = fixture.canon(&["credit", "flex/beta", "b2", &id]);
    assert!(again.status.success());
    assert!(stderr(&again).contains("already registered"));

    let registry = fs::read_to_string(fixture.path("model-info.json")).unwrap();
    assert!(registry.contains("\"Dora\""));
}

#[test]
fn cli_credit_refuses_items_missing_from_the_catalog() {
    let fixture = FixtureArchive::standard();
    let before = fixture.read_text("data/flex/beta/models.json");

    let missing = fixture.canon(&["credit", "flex/beta", "b1,no_such_item", "Anna"]);
    assert!(!missing.status.success());
    assert!(
        stderr(&missing).contains("\"no_such_item\" for model anna0001 matched no items"),
        "{}",
        stderr(&missing)
    );
    assert_eq!(fixture.read_text("data/flex/beta/models.json"), before);

    let glob = fixture.canon(&["credit", "flex/beta", "b*", "Anna"]);
    assert!(glob.status.success(), "{}", stderr(&glob));
    let credits = fixture.read_json("data/flex/beta/models.json");
    assert_eq!(credits["anna0001"], json!(["b1", "b*"]));

    let rendered = fixture.canon(&["render", "index"]);
    assert!(rendered.status.success(), "{}", stderr(&rendered));
}

#[test]
fn cli_reports_ambiguous_and_unknown_names() {
    let fixture = FixtureArchive::standard();
    let unknown = fixture.canon(&["credit", "flex/beta", "b2", "Ana"]);
    assert!(!unknown.status.success());
    assert!(stderr(&unknown).contains("Did you mean \"Anna\"?"), "{}", stderr(&unknown));

    fixture.write_json(
        "model-info.json",
        &json!({
            "anna0001": {"name": "Anna", "biography": "", "links": []},
            "anna0002": {"name": "Anna", "biography": "", "links": []},
            "bea00002": {"name": "Beatrix", "biography": "", "links": []}
        }),
    );
    let ambiguous = fixture.canon(&["models", "private", "Anna"]);
    assert!(!ambiguous.status.success());
    assert!(stderr(&ambiguous).contains("anna0001, anna0002"));
}

#[test]
fn cli_private_toggles_marker_file() {
    let fixture = FixtureArchive::standard();
    let output = fixture.canon(&["models", "private", "Anna"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(fixture.read_text(".private-models"), "anna0001\nbea00002");

    let page = fixture.read_json("html/models/anna0001.html");
    assert_eq!(page["biography"], "<p>Private bio</p>");

    let public = fixture.canon(&["models", "private", "bea00002", "--public"]);
    assert!(public.status.success(), "{}", stderr(&public));
    assert_eq!(fixture.read_text(".private-models"), "anna0001");
}
